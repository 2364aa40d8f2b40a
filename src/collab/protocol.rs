use crate::collab::awareness::AwarenessState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Tag byte of a document frame (opaque merge-engine bytes).
const TAG_DOC: u8 = 0x00;
/// Tag byte of an awareness frame (JSON payload).
const TAG_AWARENESS: u8 = 0x01;

/// One binary frame of the collab wire protocol: a tag byte followed by the
/// payload. Document payloads are produced and consumed by the merge engine;
/// awareness payloads are JSON messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Doc(Vec<u8>),
    Awareness(AwarenessMessage),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AwarenessMessage {
    /// Client to server: patch of the sending connection's own state.
    #[serde(rename = "update")]
    Update { state: AwarenessState },
    /// Server to a joining client: the full current presence map.
    #[serde(rename = "sync")]
    Sync { states: HashMap<u64, AwarenessState> },
    /// Server to peers: one connection's merged state, or `null` when the
    /// connection went away.
    #[serde(rename = "peer")]
    #[serde(rename_all = "camelCase")]
    Peer {
        conn_id: u64,
        state: Option<AwarenessState>,
    },
}

impl Frame {
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Frame::Doc(payload) => {
                let mut bytes = Vec::with_capacity(payload.len() + 1);
                bytes.push(TAG_DOC);
                bytes.extend_from_slice(payload);
                Ok(bytes)
            }
            Frame::Awareness(message) => {
                let payload = serde_json::to_vec(message)
                    .map_err(|e| ProtocolError(format!("Failed to encode awareness: {}", e)))?;
                let mut bytes = Vec::with_capacity(payload.len() + 1);
                bytes.push(TAG_AWARENESS);
                bytes.extend(payload);
                Ok(bytes)
            }
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (tag, payload) = bytes
            .split_first()
            .ok_or_else(|| ProtocolError("Empty frame".to_string()))?;
        match *tag {
            TAG_DOC => Ok(Frame::Doc(payload.to_vec())),
            TAG_AWARENESS => serde_json::from_slice(payload)
                .map(Frame::Awareness)
                .map_err(|e| ProtocolError(format!("Malformed awareness payload: {}", e))),
            other => Err(ProtocolError(format!("Unknown frame tag 0x{:02x}", other))),
        }
    }
}

#[derive(Debug)]
pub struct ProtocolError(pub String);

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ProtocolError {}
