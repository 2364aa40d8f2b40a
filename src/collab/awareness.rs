use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity shown to peers (picked client-side, not authenticated).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub color: String,
}

/// Editor cursor position, 1-based like the editing surface reports it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

/// Ephemeral presence payload of one connection.
///
/// `user` and `cursor` are updated by different client events, so patches
/// merge shallowly by field instead of replacing the whole state.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AwarenessState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorPosition>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Per-session presence map, keyed by connection id.
///
/// Entries live no longer than their connection: the relay removes and
/// broadcasts the removal on disconnect so no stale cursor survives.
#[derive(Default)]
pub struct AwarenessStore {
    states: HashMap<u64, AwarenessState>,
}

impl AwarenessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a patch to a connection's entry and return the merged state
    /// (what gets broadcast to peers).
    pub fn set_local(&mut self, conn_id: u64, patch: AwarenessState) -> AwarenessState {
        let entry = self.states.entry(conn_id).or_default();
        if patch.user.is_some() {
            entry.user = patch.user;
        }
        if patch.cursor.is_some() {
            entry.cursor = patch.cursor;
        }
        for (key, value) in patch.extra {
            entry.extra.insert(key, value);
        }
        entry.clone()
    }

    /// Delete a connection's entry. Returns whether one existed, so the
    /// caller knows if a removal broadcast is due.
    pub fn remove(&mut self, conn_id: u64) -> bool {
        self.states.remove(&conn_id).is_some()
    }

    /// Full current map, sent to a joining connection.
    pub fn snapshot(&self) -> HashMap<u64, AwarenessState> {
        self.states.clone()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
