//! Integration tests for the datc-common library.

use datc_common::{
    Channel, Format, KeyExprBuilder, Sample, decode, decode_auto, encode, parse_config,
    validate_segment, BaseConfig,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Snapshot {
    states: u16,
    motor_position: i16,
    status_label: String,
}

fn snapshot() -> Snapshot {
    Snapshot {
        states: 0b10_0000_0001,
        motor_position: -1200,
        status_label: "Motor Fault".to_string(),
    }
}

#[test]
fn test_sample_through_both_formats() {
    let sample = Sample::new("gripper01", snapshot());

    let json = encode(&sample, Format::Json).expect("JSON encode failed");
    let cbor = encode(&sample, Format::Cbor).expect("CBOR encode failed");
    assert!(cbor.len() < json.len(), "CBOR should be smaller than JSON");

    let from_json: Sample<Snapshot> = decode(&json, Format::Json).expect("JSON decode failed");
    let from_cbor: Sample<Snapshot> = decode_auto(&cbor).expect("auto decode failed");

    assert_eq!(from_json, sample);
    assert_eq!(from_cbor, sample);
    assert_eq!(from_cbor.value.motor_position, -1200);
}

#[test]
fn test_state_and_command_keys_parse_back() {
    let builder = KeyExprBuilder::new("plant/cell2");

    for device in ["left", "right-hand", "g_03"] {
        validate_segment(device).expect("device name should be a valid segment");

        let state = builder.state_key(device);
        let parsed = builder.parse(&state).expect("state key should parse");
        assert_eq!(parsed.device, device);
        assert_eq!(parsed.channel, Channel::State);

        let command = builder.command_key(device);
        let parsed = builder.parse(&command).expect("command key should parse");
        assert_eq!(parsed.channel, Channel::Command);
    }
}

#[test]
fn test_full_base_config() {
    let config: BaseConfig = parse_config(
        r#"{
            zenoh: { mode: "router", listen: ["tcp/0.0.0.0:7447"] },
            serialization: "json",
            logging: { level: "zenoh_bridge_datc=trace", format: "json" },
        }"#,
    )
    .expect("config should parse");

    config.zenoh.validate().expect("router mode is valid");
    assert_eq!(config.zenoh.listen, vec!["tcp/0.0.0.0:7447"]);
    assert_eq!(config.logging.level, "zenoh_bridge_datc=trace");
}
