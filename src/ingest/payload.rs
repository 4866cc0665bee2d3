//! Normalization of the inbound audio payload shapes
//!
//! Old and new clients send the recording in different shapes. All of them
//! collapse into one canonical byte vector here; anything we don't recognize
//! is rejected instead of being coerced.

use super::error::IngestError;
use base64::Engine;
use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use std::fmt;

/// Audio bytes as they arrive on the wire
///
/// Deserialized in a single pass straight into bytes; a large JSON array
/// never goes through an intermediate `Value`.
#[derive(Debug, Clone)]
pub enum AudioPayload {
    /// Contiguous buffer taken from a binary WebSocket frame
    Binary(Vec<u8>),

    /// JSON array of byte values: `[82, 73, 70, 70, ...]`
    Array(Vec<u8>),

    /// Tagged container: `{"type": "Buffer", "data": [...]}` or
    /// `{"type": "base64", "data": "UklGR..."}`
    Container(TaggedBytes),

    /// Anything else; only the JSON type is kept for the error message
    Unrecognized(&'static str),
}

#[derive(Debug, Clone)]
pub struct TaggedBytes {
    pub kind: String,
    pub data: TaggedData,
}

#[derive(Debug, Clone)]
pub enum TaggedData {
    Bytes(Vec<u8>),
    Text(String),
}

impl AudioPayload {
    fn shape(&self) -> &'static str {
        match self {
            Self::Binary(_) => "binary",
            Self::Array(_) => "array",
            Self::Container(_) => "container",
            Self::Unrecognized(_) => "unrecognized",
        }
    }
}

/// Collect a JSON array of byte values; anything outside 0..=255 is an error
fn collect_bytes<'de, A: SeqAccess<'de>>(mut seq: A) -> Result<Vec<u8>, A::Error> {
    // The hint comes from the client; cap it
    let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1 << 20));
    while let Some(byte) = seq.next_element::<u8>()? {
        bytes.push(byte);
    }
    Ok(bytes)
}

impl<'de> Deserialize<'de> for TaggedData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TaggedDataVisitor;

        impl<'de> Visitor<'de> for TaggedDataVisitor {
            type Value = TaggedData;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array of byte values or a base64 string")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<TaggedData, A::Error> {
                Ok(TaggedData::Bytes(collect_bytes(seq)?))
            }

            fn visit_str<E: de::Error>(self, text: &str) -> Result<TaggedData, E> {
                Ok(TaggedData::Text(text.to_string()))
            }

            fn visit_string<E: de::Error>(self, text: String) -> Result<TaggedData, E> {
                Ok(TaggedData::Text(text))
            }
        }

        deserializer.deserialize_any(TaggedDataVisitor)
    }
}

impl<'de> Deserialize<'de> for AudioPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PayloadVisitor;

        impl<'de> Visitor<'de> for PayloadVisitor {
            type Value = AudioPayload;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("audio data")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<AudioPayload, A::Error> {
                Ok(AudioPayload::Array(collect_bytes(seq)?))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<AudioPayload, A::Error> {
                let mut kind: Option<String> = None;
                let mut data: Option<TaggedData> = None;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "type" => kind = Some(map.next_value()?),
                        "data" => data = Some(map.next_value()?),
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }

                Ok(match (kind, data) {
                    (Some(kind), Some(data)) => AudioPayload::Container(TaggedBytes { kind, data }),
                    _ => AudioPayload::Unrecognized("object"),
                })
            }

            fn visit_str<E: de::Error>(self, _: &str) -> Result<AudioPayload, E> {
                Ok(AudioPayload::Unrecognized("string"))
            }

            fn visit_bool<E: de::Error>(self, _: bool) -> Result<AudioPayload, E> {
                Ok(AudioPayload::Unrecognized("boolean"))
            }

            fn visit_i64<E: de::Error>(self, _: i64) -> Result<AudioPayload, E> {
                Ok(AudioPayload::Unrecognized("number"))
            }

            fn visit_u64<E: de::Error>(self, _: u64) -> Result<AudioPayload, E> {
                Ok(AudioPayload::Unrecognized("number"))
            }

            fn visit_f64<E: de::Error>(self, _: f64) -> Result<AudioPayload, E> {
                Ok(AudioPayload::Unrecognized("number"))
            }

            fn visit_unit<E: de::Error>(self) -> Result<AudioPayload, E> {
                Ok(AudioPayload::Unrecognized("null"))
            }
        }

        deserializer.deserialize_any(PayloadVisitor)
    }
}

/// Collapse any supported payload shape into canonical bytes
pub fn normalize(payload: AudioPayload) -> Result<Vec<u8>, IngestError> {
    let shape = payload.shape();

    let bytes = match payload {
        AudioPayload::Binary(bytes) | AudioPayload::Array(bytes) => bytes,
        AudioPayload::Container(container) => from_container(container)?,
        AudioPayload::Unrecognized(json_type) => {
            return Err(IngestError::invalid_payload(format!(
                "unsupported audioData type ({})",
                json_type
            )));
        }
    };

    if bytes.is_empty() {
        return Err(IngestError::invalid_payload(format!(
            "no audio data ({} payload is empty)",
            shape
        )));
    }

    Ok(bytes)
}

fn from_container(container: TaggedBytes) -> Result<Vec<u8>, IngestError> {
    match (container.kind.as_str(), container.data) {
        ("Buffer", TaggedData::Bytes(bytes)) => Ok(bytes),
        ("base64", TaggedData::Text(text)) => base64::engine::general_purpose::STANDARD
            .decode(text.trim())
            .map_err(|e| IngestError::invalid_payload(format!("invalid base64 audioData: {}", e))),
        (kind, _) => Err(IngestError::invalid_payload(format!(
            "unsupported audioData container type \"{}\"",
            kind
        ))),
    }
}
