pub mod config;
pub mod keys;
pub mod liveness;
pub mod topics;
pub mod types;

pub use config::{BridgeConfig, MqttConfig, MEMORY_STORE_URL};
pub use keys::*;
pub use topics::*;
pub use types::{
    CommandRequest, DesiredState, ErrorBody, FlagArmedReply, HeartbeatReply, LedAction,
    LedChangeReply, LedCommand, LedId, ParseError, StatusPayload,
};
