//! WebSocket wire protocol.
//!
//! Every frame carries one JSON envelope `{ "type", "payload", "timestamp" }`.
//! The writer may coalesce several queued envelopes into one text frame,
//! separated by `\n`; [`decode_frame`] reads either shape back.

use aura_fleet_control::{DispatchError, ExecuteJob, JobEncoder};
use aura_fleet_store::CommandKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Liveness probe sent by the node.
    Ping,
    /// Reply to a ping.
    Pong,
    /// First message after the upgrade.
    Connected,
    /// Instruction to run a job.
    ExecuteJob,
    /// Result report from the node.
    JobResult,
    /// Command advertised by the node.
    RegisterCommand,
    /// Any type this server does not know.
    #[serde(other)]
    Unknown,
}

/// The JSON envelope used for all WebSocket communication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Type-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// When the message was produced.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Create an envelope stamped with the current time.
    #[must_use]
    pub fn new(kind: MessageType, payload: Option<Value>) -> Self {
        Self {
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Create an envelope around a serializable payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn with_payload<T: Serialize>(kind: MessageType, payload: &T) -> serde_json::Result<Self> {
        Ok(Self::new(kind, Some(serde_json::to_value(payload)?)))
    }

    /// Decode the payload into a concrete type.
    ///
    /// A missing payload decodes as JSON `null`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not match `T`.
    pub fn decode_payload<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.payload.clone().unwrap_or(Value::Null))
    }

    /// Serialize the envelope to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse an envelope from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid envelope.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Decode every envelope in one text frame.
///
/// A frame holds one JSON value, which may span several lines, or several
/// values separated by whitespace. A value that is valid JSON but not an
/// envelope yields an error and decoding moves on to the next one. A syntax
/// error ends the frame, since nothing after it can be located reliably.
pub fn decode_frame(text: &str) -> Vec<serde_json::Result<Envelope>> {
    let mut envelopes = Vec::new();
    for value in serde_json::Deserializer::from_str(text).into_iter::<Value>() {
        match value {
            Ok(value) => envelopes.push(serde_json::from_value(value)),
            Err(e) => {
                envelopes.push(Err(e));
                break;
            }
        }
    }
    envelopes
}

/// Payload of an `execute_job` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteJobPayload {
    /// Job to run.
    pub job_id: String,
    /// Command to run.
    pub command_name: String,
    /// Kind of the command.
    pub command_type: CommandKind,
}

/// Payload of the `connected` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedPayload {
    /// Node the connection was authenticated as.
    pub node_id: String,
    /// Identity of this connection.
    pub connection_id: String,
}

/// Payload of a `job_result` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResultPayload {
    /// Job being reported.
    pub job_id: String,
    /// `running`, `completed` or `failed`.
    pub status: String,
    /// Output so far.
    #[serde(default)]
    pub output: String,
    /// Error text.
    #[serde(default)]
    pub error: String,
}

/// Payload of a `register_command` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCommandPayload {
    /// Command name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// `default` or `custom`; empty means `default`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Script location on the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_path: Option<String>,
}

/// Encodes execute instructions as WebSocket envelopes.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsJobEncoder;

impl JobEncoder for WsJobEncoder {
    type Message = String;

    fn encode(&self, job: &ExecuteJob) -> Result<String, DispatchError> {
        let payload = ExecuteJobPayload {
            job_id: job.job_id.to_string(),
            command_name: job.command_name.clone(),
            command_type: job.command_type,
        };
        Envelope::with_payload(MessageType::ExecuteJob, &payload)
            .and_then(|envelope| envelope.to_json())
            .map_err(|e| DispatchError::Encode(e.to_string()))
    }
}
