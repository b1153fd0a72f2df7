use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const MEMORY_STORE_URL: &str = "memory://";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub client_id: String,
}

impl MqttConfig {
    fn with_host(host: String) -> Self {
        Self {
            host,
            port: 1883,
            user: "ledbridge".to_string(),
            client_id: "ledbridge-api".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub http_host: String,
    pub http_port: u16,
    pub redis_url: String,
    pub store_timeout_ms: u64,
    pub heartbeat_timeout_secs: u64,
    pub api_key: Option<String>,
    pub mqtt: Option<MqttConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 5000,
            redis_url: "redis://localhost:6379/0".to_string(),
            store_timeout_ms: 2_000,
            heartbeat_timeout_secs: 15,
            api_key: None,
            mqtt: None,
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from a variable lookup. Unparsable numbers keep their
    /// defaults and empty strings count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let mqtt = get("MQTT_HOST").map(|host| {
            let mut mqtt = MqttConfig::with_host(host);
            if let Some(port) = get("MQTT_PORT").and_then(|value| value.parse::<u16>().ok()) {
                mqtt.port = port;
            }
            if let Some(user) = get("MQTT_USER") {
                mqtt.user = user;
            }
            if let Some(client_id) = get("MQTT_CLIENT_ID") {
                mqtt.client_id = client_id;
            }
            mqtt
        });

        Self {
            http_host: get("BRIDGE_HTTP_HOST").unwrap_or(defaults.http_host),
            http_port: get("BRIDGE_HTTP_PORT")
                .or_else(|| get("PORT"))
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(defaults.http_port),
            redis_url: get("REDIS_URL").unwrap_or(defaults.redis_url),
            store_timeout_ms: get("STORE_TIMEOUT_MS")
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.store_timeout_ms),
            heartbeat_timeout_secs: get("HEARTBEAT_TIMEOUT_SECS")
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(defaults.heartbeat_timeout_secs),
            api_key: get("API_KEY"),
            mqtt,
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn uses_memory_store(&self) -> bool {
        self.redis_url == MEMORY_STORE_URL
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn config_from(vars: &[(&str, &str)]) -> BridgeConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BridgeConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        assert_eq!(config_from(&[]), BridgeConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("REDIS_URL", "redis://cache:6380/1"),
            ("PORT", "8080"),
            ("HEARTBEAT_TIMEOUT_SECS", "30"),
            ("API_KEY", "s3cret"),
            ("MQTT_HOST", "broker.local"),
            ("MQTT_PORT", "8883"),
        ]);

        assert_eq!(config.redis_url, "redis://cache:6380/1");
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.heartbeat_timeout_secs, 30);
        assert_eq!(config.api_key.as_deref(), Some("s3cret"));

        let mqtt = config.mqtt.expect("mqtt should be enabled");
        assert_eq!(mqtt.host, "broker.local");
        assert_eq!(mqtt.port, 8883);
        assert_eq!(mqtt.user, "ledbridge");
    }

    #[test]
    fn explicit_bridge_port_wins_over_port() {
        let config = config_from(&[("PORT", "8080"), ("BRIDGE_HTTP_PORT", "9090")]);
        assert_eq!(config.http_port, 9090);
    }

    #[test]
    fn bad_numbers_fall_back_to_defaults() {
        let config = config_from(&[
            ("PORT", "eighty"),
            ("STORE_TIMEOUT_MS", "0"),
            ("HEARTBEAT_TIMEOUT_SECS", "-5"),
        ]);
        assert_eq!(config.http_port, 5000);
        assert_eq!(config.store_timeout_ms, 2_000);
        assert_eq!(config.heartbeat_timeout_secs, 15);
    }

    #[test]
    fn blank_api_key_counts_as_unset() {
        let config = config_from(&[("API_KEY", "  ")]);
        assert_eq!(config.api_key, None);
    }
}
