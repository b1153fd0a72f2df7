use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::keys::{LED1_STATE_KEY, LED2_STATE_KEY};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown led: {0}")]
    UnknownLed(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedId {
    One,
    Two,
}

impl LedId {
    pub const ALL: [LedId; 2] = [LedId::One, LedId::Two];

    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    pub fn state_key(self) -> &'static str {
        match self {
            Self::One => LED1_STATE_KEY,
            Self::Two => LED2_STATE_KEY,
        }
    }
}

impl TryFrom<u8> for LedId {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(ParseError::UnknownLed(other.to_string())),
        }
    }
}

impl FromStr for LedId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Self::One),
            "2" => Ok(Self::Two),
            other => Err(ParseError::UnknownLed(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedAction {
    On,
    Off,
}

impl LedAction {
    pub fn state(self) -> bool {
        matches!(self, Self::On)
    }

    pub fn verb(self) -> &'static str {
        match self {
            Self::On => "encendido",
            Self::Off => "apagado",
        }
    }
}

impl FromStr for LedAction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("on") {
            Ok(Self::On)
        } else if s.eq_ignore_ascii_case("off") {
            Ok(Self::Off)
        } else {
            Err(ParseError::UnknownAction(s.to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    pub led1: bool,
    pub led2: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub led1: bool,
    pub led2: bool,
    pub online: bool,
    pub clear_wifi: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatReply {
    pub led1: bool,
    pub led2: bool,
    pub clear_wifi: bool,
    pub reset: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedChangeReply {
    pub message: String,
    pub led: u8,
    pub state: bool,
}

impl LedChangeReply {
    pub fn new(led: LedId, action: LedAction) -> Self {
        Self {
            message: format!("LED {} {}", led.number(), action.verb()),
            led: led.number(),
            state: action.state(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagArmedReply {
    pub message: String,
    pub flag: String,
}

/// Body accepted by `POST /command`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandRequest {
    #[serde(rename = "ledId")]
    pub led_id: u8,
    pub state: bool,
}

/// Compact payload published on the broker command topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedCommand {
    pub led: u8,
    pub state: bool,
}

impl LedCommand {
    pub fn new(led: LedId, state: bool) -> Self {
        Self {
            led: led.number(),
            state,
        }
    }
}

impl TryFrom<CommandRequest> for LedCommand {
    type Error = ParseError;

    fn try_from(request: CommandRequest) -> Result<Self, Self::Error> {
        let led = LedId::try_from(request.led_id)?;
        Ok(Self::new(led, request.state))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
