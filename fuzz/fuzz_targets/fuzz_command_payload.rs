//! Fuzz target: inbound MQTT command payloads
//!
//! Drives arbitrary topic/payload pairs through the gateway router and
//! asserts that only the three exact command tokens on the command topic
//! ever produce a motor request.
//!
//! cargo fuzz run fuzz_command_payload

#![no_main]

use coopdoor::adapters::mqtt::Gateway;
use coopdoor::app::commands::{Command, DoorRequest};
use coopdoor::config::MqttSettings;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let parsed = Command::parse(data);
    if let Some(cmd) = parsed {
        assert_eq!(cmd.as_token().as_bytes(), data, "only exact tokens parse");
    }

    let settings = MqttSettings::default();
    let gateway = Gateway::new(&settings, true);
    assert_eq!(
        gateway.route(&settings.command_topic, data),
        parsed.map(DoorRequest::remote)
    );

    // Split the input into topic and payload at the first NUL.
    let (topic, payload) = match data.iter().position(|&b| b == 0) {
        Some(i) => (&data[..i], &data[i + 1..]),
        None => (data, &[][..]),
    };
    if let Ok(topic) = core::str::from_utf8(topic) {
        let routed = gateway.route(topic, payload);
        if topic != settings.command_topic && topic != settings.state_topic {
            assert_eq!(routed, None);
        }
    }
});
