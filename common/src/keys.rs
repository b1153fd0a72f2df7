pub const LED1_STATE_KEY: &str = "led1_state";
pub const LED2_STATE_KEY: &str = "led2_state";
pub const LAST_HEARTBEAT_KEY: &str = "last_heartbeat";

pub const CLEAR_WIFI_KEY: &str = "clear_wifi";
pub const RESET_COMMAND_KEY: &str = "reset_command";

/// Every fixed key with the value it gets on first boot.
pub const DEFAULTS: [(&str, &str); 5] = [
    (LED1_STATE_KEY, "false"),
    (LED2_STATE_KEY, "false"),
    (LAST_HEARTBEAT_KEY, "0"),
    (CLEAR_WIFI_KEY, "false"),
    (RESET_COMMAND_KEY, "false"),
];

/// One-shot command flags armed by the app and consumed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    ClearWifi,
    Reset,
}

impl Flag {
    pub fn key(self) -> &'static str {
        match self {
            Self::ClearWifi => CLEAR_WIFI_KEY,
            Self::Reset => RESET_COMMAND_KEY,
        }
    }
}
