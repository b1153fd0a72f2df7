pub const TOPIC_LED_COMMAND: &str = "iot/command/led_control";
