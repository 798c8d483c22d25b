use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PinguinError, Result};

/// An EMAIL-only attachment. `bytes` serializes as base64 on the wire
/// (RPC/HTTP JSON bodies), matching the protobuf `bytes` field semantics
/// named in spec.md §6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let filename = filename.into();
        let content_type = content_type.into();
        if filename.trim().is_empty() {
            return Err(PinguinError::invalid_argument("attachment filename must not be blank"));
        }
        if content_type.trim().is_empty() {
            return Err(PinguinError::invalid_argument(
                "attachment content_type must not be blank",
            ));
        }
        Ok(Self {
            filename,
            content_type,
            bytes,
        })
    }
}

mod base64_bytes {
    use super::{Deserializer, Serializer, STANDARD};
    use base64::Engine as _;
    use serde::{Deserialize, Serialize};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_filename() {
        let err = Attachment::new("", "text/plain", vec![1, 2, 3]).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn json_round_trip_base64_encodes_bytes() {
        let attachment = Attachment::new("a.txt", "text/plain", vec![1, 2, 3]).unwrap();
        let json = serde_json::to_value(&attachment).unwrap();
        assert_eq!(json["bytes"], serde_json::json!("AQID"));
        let back: Attachment = serde_json::from_value(json).unwrap();
        assert_eq!(back, attachment);
    }
}
