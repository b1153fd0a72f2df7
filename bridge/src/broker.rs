use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use ledbridge_common::{LedCommand, MqttConfig, TOPIC_LED_COMMAND};
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("publish timed out")]
    Timeout,

    #[error("broker not connected")]
    Disconnected,
}

/// Publish-only side of the command channel. The device subscribes elsewhere.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish(&self, command: &LedCommand) -> Result<(), BrokerError>;
}

pub struct MqttPublisher {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    timeout: Duration,
}

impl MqttPublisher {
    /// Builds the client and spawns its event loop. The broker password is the
    /// service's shared secret.
    pub fn start(config: &MqttConfig, password: &str, timeout: Duration) -> Self {
        let mut mqtt_options =
            MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        mqtt_options.set_credentials(config.user.clone(), password);
        mqtt_options.set_keep_alive(Duration::from_secs(30));

        let (client, eventloop) = AsyncClient::new(mqtt_options, 32);
        let connected = Arc::new(AtomicBool::new(false));
        spawn_mqtt_loop(eventloop, connected.clone());
        info!(host = %config.host, port = config.port, "mqtt publisher started");

        Self {
            client,
            connected,
            timeout,
        }
    }
}

#[async_trait]
impl CommandPublisher for MqttPublisher {
    async fn publish(&self, command: &LedCommand) -> Result<(), BrokerError> {
        // The client only queues; a queued publish is not a delivered one.
        if !self.connected.load(Ordering::Acquire) {
            return Err(BrokerError::Disconnected);
        }
        let payload = serde_json::to_vec(command)?;
        let publish = self
            .client
            .publish(TOPIC_LED_COMMAND, QoS::AtLeastOnce, false, payload);

        match tokio::time::timeout(self.timeout, publish).await {
            Ok(Ok(())) => {
                debug!(led = command.led, state = command.state, "command published");
                Ok(())
            }
            Ok(Err(err)) => Err(BrokerError::Publish(err.to_string())),
            Err(_) => Err(BrokerError::Timeout),
        }
    }
}

fn spawn_mqtt_loop(mut eventloop: EventLoop, connected: Arc<AtomicBool>) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    connected.store(true, Ordering::Release);
                    info!("mqtt connected");
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => {
                    connected.store(false, Ordering::Release);
                    warn!("mqtt disconnected by broker");
                }
                Ok(_) => {}
                Err(err) => {
                    connected.store(false, Ordering::Release);
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}
