//! State Store Adapter: the LED mailbox on top of a [`KeyValue`] backend.
//!
//! The app writes desired LED states and arms one-shot flags; the device records
//! heartbeats and consumes the flags. Liveness is derived on read and never stored.

use std::{future::Future, sync::Arc, time::Duration};

use ledbridge_common::{
    keys::{Flag, DEFAULTS, LAST_HEARTBEAT_KEY},
    liveness::{decode_bool, encode_bool, encode_heartbeat, is_online},
    DesiredState, LedId, StatusPayload,
};
use tracing::{debug, warn};

use crate::kv::KeyValue;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out")]
    Timeout,
}

#[derive(Clone)]
pub struct StateStore {
    kv: Arc<dyn KeyValue>,
    timeout: Duration,
}

impl StateStore {
    pub fn new(kv: Arc<dyn KeyValue>, timeout: Duration) -> Self {
        Self { kv, timeout }
    }

    /// Writes the first-boot default for every fixed key that is missing.
    /// Returns how many keys were created.
    pub async fn initialize(&self) -> Result<usize, StoreError> {
        let mut created = 0;
        for (key, default) in DEFAULTS {
            if self.call(self.kv.set_if_absent(key, default)).await? {
                debug!(key, default, "initialized missing key");
                created += 1;
            }
        }
        Ok(created)
    }

    pub async fn desired_state(&self) -> Result<DesiredState, StoreError> {
        let keys = LedId::ALL.map(LedId::state_key);
        let values = self.call(self.kv.get_many(&keys)).await?;
        Ok(decode_desired(&values))
    }

    /// Desired state, liveness and the pending Wi-Fi flag in one round trip.
    /// The flag is only peeked at.
    pub async fn status(
        &self,
        now_unix: i64,
        timeout_secs: u64,
    ) -> Result<StatusPayload, StoreError> {
        let keys = [
            LedId::One.state_key(),
            LedId::Two.state_key(),
            LAST_HEARTBEAT_KEY,
            Flag::ClearWifi.key(),
        ];
        let values = self.call(self.kv.get_many(&keys)).await?;
        let desired = decode_desired(&values);
        let last_heartbeat = values.get(2).and_then(|raw| raw.as_deref());
        let clear_wifi = decode_flag(values.get(3).and_then(|raw| raw.as_deref()));

        Ok(StatusPayload {
            led1: desired.led1,
            led2: desired.led2,
            online: is_online(now_unix, last_heartbeat, timeout_secs),
            clear_wifi,
        })
    }

    pub async fn set_led_state(&self, led: LedId, on: bool) -> Result<(), StoreError> {
        self.call(self.kv.set(led.state_key(), encode_bool(on)))
            .await
    }

    pub async fn record_heartbeat(&self, now_unix: i64) -> Result<(), StoreError> {
        self.call(self.kv.set(LAST_HEARTBEAT_KEY, &encode_heartbeat(now_unix)))
            .await
    }

    /// Consumes several flags in one atomic step. On failure no flag is
    /// cleared, so nothing armed is lost.
    pub async fn read_and_clear_flags<const N: usize>(
        &self,
        flags: [Flag; N],
    ) -> Result<[bool; N], StoreError> {
        let keys = flags.map(Flag::key);
        let previous = self
            .call(self.kv.swap_many(&keys, encode_bool(false)))
            .await?;
        let mut observed = [false; N];
        for (slot, raw) in observed.iter_mut().zip(&previous) {
            *slot = decode_flag(raw.as_deref());
        }
        Ok(observed)
    }

    pub async fn set_flag(&self, flag: Flag, armed: bool) -> Result<(), StoreError> {
        self.call(self.kv.set(flag.key(), encode_bool(armed))).await
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.call(self.kv.get(LAST_HEARTBEAT_KEY)).await.map(|_| ())
    }

    async fn call<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(StoreError::Unavailable(format!("{err:#}"))),
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

fn decode_desired(values: &[Option<String>]) -> DesiredState {
    let raw = |index: usize| values.get(index).and_then(|raw| raw.as_deref());
    DesiredState {
        led1: decode_led(LedId::One, raw(0)),
        led2: decode_led(LedId::Two, raw(1)),
    }
}

fn decode_led(led: LedId, raw: Option<&str>) -> bool {
    match raw {
        None => false,
        Some(value) => decode_bool(value).unwrap_or_else(|| {
            warn!(key = led.state_key(), value, "unreadable led state, treating as off");
            false
        }),
    }
}

fn decode_flag(raw: Option<&str>) -> bool {
    raw.and_then(decode_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use ledbridge_common::keys::{CLEAR_WIFI_KEY, LED1_STATE_KEY};

    use super::*;
    use crate::kv::{
        memory::MemoryKv,
        testing::{SwapFailsKv, UnreachableKv},
    };

    fn store_with(kv: Arc<dyn KeyValue>) -> StateStore {
        StateStore::new(kv, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn initialize_is_idempotent_and_keeps_existing_values() {
        let kv = Arc::new(MemoryKv::new());
        kv.set(LED1_STATE_KEY, "true").await.unwrap();
        let store = store_with(kv.clone());

        assert_eq!(store.initialize().await.unwrap(), DEFAULTS.len() - 1);
        assert_eq!(store.initialize().await.unwrap(), 0);

        let state = store.desired_state().await.unwrap();
        assert!(state.led1);
        assert!(!state.led2);
        assert_eq!(kv.get(CLEAR_WIFI_KEY).await.unwrap().as_deref(), Some("false"));
    }

    #[tokio::test]
    async fn missing_keys_read_as_off() {
        let store = store_with(Arc::new(MemoryKv::new()));
        assert_eq!(store.desired_state().await.unwrap(), DesiredState::default());

        let status = store.status(100, 15).await.unwrap();
        assert!(!status.led1);
        assert!(!status.led2);
        assert!(!status.online);
        assert!(!status.clear_wifi);
    }

    #[tokio::test]
    async fn read_after_write_for_one_led() {
        let store = store_with(Arc::new(MemoryKv::new()));
        store.initialize().await.unwrap();

        store.set_led_state(LedId::One, true).await.unwrap();
        let state = store.desired_state().await.unwrap();
        assert!(state.led1);
        assert!(!state.led2);
        assert!(store.status(0, 15).await.unwrap().led1);

        store.set_led_state(LedId::One, false).await.unwrap();
        assert!(!store.desired_state().await.unwrap().led1);
    }

    #[tokio::test]
    async fn legacy_integer_led_values_decode() {
        let kv = Arc::new(MemoryKv::new());
        kv.set(LED1_STATE_KEY, "1").await.unwrap();
        let store = store_with(kv);
        assert!(store.desired_state().await.unwrap().led1);
    }

    #[tokio::test]
    async fn heartbeat_drives_liveness() {
        let store = store_with(Arc::new(MemoryKv::new()));
        store.initialize().await.unwrap();
        assert!(!store.status(100, 15).await.unwrap().online);

        store.record_heartbeat(100).await.unwrap();
        assert!(store.status(100, 15).await.unwrap().online);
        assert!(store.status(110, 15).await.unwrap().online);
        assert!(!store.status(115, 15).await.unwrap().online);
        assert!(!store.status(120, 15).await.unwrap().online);
    }

    #[derive(Default)]
    struct CountingKv {
        inner: MemoryKv,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl CountingKv {
        fn hit(&self) {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl KeyValue for CountingKv {
        async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.hit();
            self.inner.get(key).await
        }
        async fn get_many(&self, keys: &[&str]) -> anyhow::Result<Vec<Option<String>>> {
            self.hit();
            self.inner.get_many(keys).await
        }
        async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            self.hit();
            self.inner.set(key, value).await
        }
        async fn set_if_absent(&self, key: &str, value: &str) -> anyhow::Result<bool> {
            self.hit();
            self.inner.set_if_absent(key, value).await
        }
        async fn swap_many(
            &self,
            keys: &[&str],
            value: &str,
        ) -> anyhow::Result<Vec<Option<String>>> {
            self.hit();
            self.inner.swap_many(keys, value).await
        }
    }

    #[tokio::test]
    async fn status_is_one_backend_read() {
        let kv = Arc::new(CountingKv::default());
        let store = store_with(kv.clone());
        store.set_led_state(LedId::Two, true).await.unwrap();
        store.record_heartbeat(100).await.unwrap();
        store.set_flag(Flag::ClearWifi, true).await.unwrap();
        let before = kv.calls();

        let status = store.status(105, 15).await.unwrap();
        assert_eq!(kv.calls() - before, 1);
        assert_eq!(
            status,
            StatusPayload {
                led1: false,
                led2: true,
                online: true,
                clear_wifi: true,
            }
        );
    }

    #[tokio::test]
    async fn flag_is_observed_once_per_arming() {
        let store = store_with(Arc::new(MemoryKv::new()));
        store.initialize().await.unwrap();

        assert_eq!(store.read_and_clear_flags([Flag::ClearWifi]).await.unwrap(), [false]);

        store.set_flag(Flag::ClearWifi, true).await.unwrap();
        assert!(store.status(0, 15).await.unwrap().clear_wifi);
        assert!(store.status(0, 15).await.unwrap().clear_wifi);
        assert_eq!(store.read_and_clear_flags([Flag::ClearWifi]).await.unwrap(), [true]);
        assert_eq!(store.read_and_clear_flags([Flag::ClearWifi]).await.unwrap(), [false]);
        assert!(!store.status(0, 15).await.unwrap().clear_wifi);

        store.set_flag(Flag::ClearWifi, true).await.unwrap();
        assert_eq!(store.read_and_clear_flags([Flag::ClearWifi]).await.unwrap(), [true]);
    }

    #[tokio::test]
    async fn flags_are_independent() {
        let store = store_with(Arc::new(MemoryKv::new()));
        store.set_flag(Flag::Reset, true).await.unwrap();

        assert_eq!(
            store
                .read_and_clear_flags([Flag::ClearWifi, Flag::Reset])
                .await
                .unwrap(),
            [false, true]
        );
        assert_eq!(
            store
                .read_and_clear_flags([Flag::ClearWifi, Flag::Reset])
                .await
                .unwrap(),
            [false, false]
        );
    }

    #[tokio::test]
    async fn failed_consume_keeps_flags_armed() {
        let kv = Arc::new(MemoryKv::new());
        let store = store_with(Arc::new(SwapFailsKv(kv.clone())));
        store.set_flag(Flag::ClearWifi, true).await.unwrap();

        let err = store
            .read_and_clear_flags([Flag::ClearWifi, Flag::Reset])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(kv.get(CLEAR_WIFI_KEY).await.unwrap().as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn backend_failure_surfaces_as_unavailable() {
        let store = StateStore::new(Arc::new(UnreachableKv), Duration::from_secs(1));
        let err = store.desired_state().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(msg) if msg.contains("refused")));
    }

    struct StalledKv;

    #[async_trait]
    impl KeyValue for StalledKv {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            std::future::pending().await
        }
        async fn get_many(&self, _keys: &[&str]) -> anyhow::Result<Vec<Option<String>>> {
            std::future::pending().await
        }
        async fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            std::future::pending().await
        }
        async fn set_if_absent(&self, _key: &str, _value: &str) -> anyhow::Result<bool> {
            std::future::pending().await
        }
        async fn swap_many(
            &self,
            _keys: &[&str],
            _value: &str,
        ) -> anyhow::Result<Vec<Option<String>>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn stalled_backend_times_out() {
        let store = StateStore::new(Arc::new(StalledKv), Duration::from_millis(20));
        assert!(matches!(store.ping().await, Err(StoreError::Timeout)));
    }
}
