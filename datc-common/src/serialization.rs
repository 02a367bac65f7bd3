use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Error, Result};

/// Wire format for published snapshots and service payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON (default, readable from any Zenoh tool).
    #[default]
    Json,

    /// CBOR, for consumers that want compact 100 Hz state samples.
    Cbor,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Cbor => "cbor",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode a value to bytes using the specified format.
pub fn encode<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Json => serde_json::to_vec(value).map_err(|e| Error::encode(format, e)),
        Format::Cbor => {
            let mut buf = Vec::new();
            ciborium::into_writer(value, &mut buf).map_err(|e| Error::encode(format, e))?;
            Ok(buf)
        }
    }
}

/// Decode bytes to a value using the specified format.
pub fn decode<T: DeserializeOwned>(data: &[u8], format: Format) -> Result<T> {
    match format {
        Format::Json => serde_json::from_slice(data).map_err(|e| Error::decode(format, e)),
        Format::Cbor => ciborium::from_reader(data).map_err(|e| Error::decode(format, e)),
    }
}

/// Guess the format of a payload: JSON objects and arrays start with `{` or `[`.
pub fn detect_format(data: &[u8]) -> Format {
    match data.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') | Some(b'[') => Format::Json,
        _ => Format::Cbor,
    }
}

/// Decode bytes, auto-detecting the format.
pub fn decode_auto<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    decode(data, detect_format(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Reading {
        finger_position: u16,
        motor_current: i16,
        label: String,
    }

    fn reading() -> Reading {
        Reading {
            finger_position: 420,
            motor_current: -35,
            label: "Gripper Close".to_string(),
        }
    }

    #[test]
    fn test_cbor_preserves_signed_values() {
        let encoded = encode(&reading(), Format::Cbor).unwrap();
        let decoded: Reading = decode(&encoded, Format::Cbor).unwrap();
        assert_eq!(decoded.motor_current, -35);
    }

    #[test]
    fn test_cbor_is_smaller() {
        let json = encode(&reading(), Format::Json).unwrap();
        let cbor = encode(&reading(), Format::Cbor).unwrap();

        assert!(cbor.len() < json.len(), "CBOR should be smaller than JSON");
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(detect_format(b"{\"type\": \"motor_enable\"}"), Format::Json);
        assert_eq!(detect_format(b"  {\"type\": \"motor_stop\"}"), Format::Json);
        assert_eq!(detect_format(b"[1, 2, 3]"), Format::Json);
        assert_eq!(detect_format(b"\xa1\x64type\x65value"), Format::Cbor);
    }

    #[test]
    fn test_auto_decode() {
        let json = encode(&reading(), Format::Json).unwrap();
        let decoded: Reading = decode_auto(&json).unwrap();
        assert_eq!(decoded, reading());

        let cbor = encode(&reading(), Format::Cbor).unwrap();
        let decoded: Reading = decode_auto(&cbor).unwrap();
        assert_eq!(decoded, reading());
    }

    #[test]
    fn test_decode_error_names_format() {
        let err = decode::<Reading>(b"{not json", Format::Json).unwrap_err();
        assert!(err.to_string().contains("json"));
    }
}
