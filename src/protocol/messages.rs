use crate::ingest::{Acknowledgement, AudioPayload, RawSubmission};
use crate::transcode::EngineReadiness;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

pub const CLIENT_AUDIO: &str = "client:audio";
pub const CLIENT_PING: &str = "client:ping";

/// Envelope of every text frame sent by a client
///
/// `data` stays unparsed until the event is known, so an audio body is read
/// exactly once, directly into its final shape.
#[derive(Debug, Deserialize)]
pub struct ClientEnvelope<'a> {
    pub event: String,
    #[serde(default, borrow)]
    pub data: Option<&'a RawValue>,
}

/// Body of a `client:audio` event
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSubmissionData {
    #[serde(default)]
    pub audio_data: Option<AudioPayload>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl From<AudioSubmissionData> for RawSubmission {
    fn from(data: AudioSubmissionData) -> Self {
        Self {
            payload: data.audio_data,
            mime_type: data.mime_type,
            file_name: data.file_name,
        }
    }
}

/// What a text frame turned out to be
#[derive(Debug)]
pub enum ClientMessage {
    Submission(RawSubmission),
    /// A `client:audio` event whose body could not be read; still owed an ack
    MalformedSubmission(String),
    Ping,
    /// Not a submission at all; answered with `server:error`
    Unrecognized(String),
}

impl ClientMessage {
    pub fn parse(text: &str) -> Self {
        let envelope: ClientEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => return Self::Unrecognized(format!("invalid message: {}", e)),
        };

        match envelope.event.as_str() {
            CLIENT_AUDIO => {
                let data = match envelope.data {
                    Some(raw) => serde_json::from_str::<AudioSubmissionData>(raw.get()),
                    None => Ok(AudioSubmissionData::default()),
                };
                match data {
                    Ok(data) => Self::Submission(data.into()),
                    Err(e) => {
                        Self::MalformedSubmission(format!("malformed {} event: {}", CLIENT_AUDIO, e))
                    }
                }
            }
            CLIENT_PING => Self::Ping,
            other => Self::Unrecognized(format!("unknown event \"{}\"", other)),
        }
    }
}

/// Events pushed to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "server:connected")]
    Connected {
        session_id: String,
        transcoder: EngineReadiness,
    },

    #[serde(rename = "server:save_ack")]
    SaveAck(Acknowledgement),

    #[serde(rename = "server:pong")]
    Pong,

    #[serde(rename = "server:error")]
    Error { error: String },
}
