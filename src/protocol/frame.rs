//! Binary submission frames
//!
//! Layout: `u32` big-endian header length, JSON header, raw audio bytes.

use crate::ingest::{AudioPayload, IngestError, RawSubmission};
use serde::{Deserialize, Serialize};

/// Upper bound for the JSON header of a binary frame
const MAX_HEADER_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

pub fn encode_binary_frame(header: &BinaryHeader, audio: &[u8]) -> serde_json::Result<Vec<u8>> {
    let header = serde_json::to_vec(header)?;
    let mut frame = Vec::with_capacity(4 + header.len() + audio.len());
    frame.extend_from_slice(&(header.len() as u32).to_be_bytes());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(audio);
    Ok(frame)
}

/// Split a binary frame into a submission; the payload may still be empty
pub fn decode_binary_frame(frame: &[u8]) -> Result<RawSubmission, IngestError> {
    let Some((len, rest)) = frame.split_first_chunk::<4>() else {
        return Err(IngestError::invalid_payload(format!(
            "binary frame too short ({} bytes)",
            frame.len()
        )));
    };

    let header_len = u32::from_be_bytes(*len) as usize;
    if header_len > MAX_HEADER_BYTES || header_len > rest.len() {
        return Err(IngestError::invalid_payload(format!(
            "binary frame header length {} exceeds frame",
            header_len
        )));
    }

    let (header, audio) = rest.split_at(header_len);
    let header: BinaryHeader = serde_json::from_slice(header)
        .map_err(|e| IngestError::invalid_payload(format!("invalid binary frame header: {}", e)))?;

    Ok(RawSubmission {
        payload: Some(AudioPayload::Binary(audio.to_vec())),
        mime_type: header.mime_type,
        file_name: header.file_name,
    })
}
