use std::sync::Arc;

use anyhow::Context;
use ledbridge_common::BridgeConfig;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};

use crate::{
    broker::{CommandPublisher, MqttPublisher},
    clock::SystemClock,
    kv::{memory::MemoryKv, redis_kv::RedisKv, KeyValue},
    routes::{router, AppState},
    store::StateStore,
};

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledbridge=info,tower_http=info".into()),
        )
        .init();

    let config = BridgeConfig::from_env();

    let kv: Arc<dyn KeyValue> = if config.uses_memory_store() {
        warn!("using in-memory store; state is lost on restart");
        Arc::new(MemoryKv::new())
    } else {
        Arc::new(
            RedisKv::connect(&config.redis_url)
                .await
                .with_context(|| format!("failed to open store at {}", config.redis_url))?,
        )
    };

    let store = StateStore::new(kv, config.store_timeout());
    let created = store
        .initialize()
        .await
        .context("failed to initialize led state")?;
    if created > 0 {
        info!(created, "initial led state written to store");
    }

    if config.api_key.is_none() {
        warn!("API_KEY is not set; /command will reject every request");
    }

    let publisher: Option<Arc<dyn CommandPublisher>> = match (&config.mqtt, &config.api_key) {
        (Some(mqtt), Some(secret)) => Some(Arc::new(MqttPublisher::start(
            mqtt,
            secret,
            config.store_timeout(),
        ))),
        (Some(_), None) => {
            warn!("MQTT_HOST is set but API_KEY is missing; broker publishing disabled");
            None
        }
        (None, _) => None,
    };

    let state = AppState {
        store,
        publisher,
        clock: Arc::new(SystemClock),
        heartbeat_timeout_secs: config.heartbeat_timeout_secs,
        api_key: config.api_key.as_deref().map(Arc::from),
    };
    let app = router(state);

    let bind_host = config.http_host.as_str();
    let listener = TcpListener::bind((bind_host, config.http_port))
        .await
        .with_context(|| {
            format!("failed to bind led bridge at {bind_host}:{}", config.http_port)
        })?;
    let addr = listener.local_addr()?;

    info!(
        heartbeat_timeout_secs = config.heartbeat_timeout_secs,
        "led bridge listening on http://{addr}"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("led bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}
