use loro::{ExportMode, LoroDoc, LoroMap, ToJson, VersionVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use utoipa::ToSchema;

/// Name of the text container holding the document body.
const TEXT_CONTAINER: &str = "content";
/// Name of the list container holding the file manifest of a project room.
const FILES_CONTAINER: &str = "files";

/// One entry of a project's file-manifest room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ManifestEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub language: String,
}

/// Capability interface over the conflict-free merge engine.
///
/// The concrete replication algorithm is opaque to the rest of the server:
/// updates commute and re-applying the same update is a no-op, so the relay
/// can fan frames out without ordering guarantees across connections. The
/// production implementation is [`LoroEngine`]; tests swap in a fake.
pub trait MergeEngine: Send + Sync {
    /// Import a remote update frame. Idempotent and commutative.
    fn apply_remote_update(&self, update: &[u8]) -> Result<(), EngineError>;

    /// Encode the full current state, suitable for bootstrapping a joiner.
    fn encode_full_state(&self) -> Result<Vec<u8>, EngineError>;

    /// Encode the updates produced since the previous `encode_delta` call.
    /// Used to broadcast server-local manifest edits to connected peers.
    fn encode_delta(&self) -> Result<Vec<u8>, EngineError>;

    /// Flattened document text, as persisted by the debounced flusher.
    fn current_text(&self) -> String;

    /// One-shot initial text insert at session hydration.
    fn hydrate_text(&self, content: &str) -> Result<(), EngineError>;

    /// Current entries of the file-manifest list.
    fn manifest_entries(&self) -> Result<Vec<ManifestEntry>, EngineError>;

    /// Append an entry to the file-manifest list.
    fn push_manifest_entry(&self, entry: &ManifestEntry) -> Result<(), EngineError>;

    /// Remove the entry with the given file id. Returns whether one was found.
    fn remove_manifest_entry(&self, file_id: &str) -> Result<bool, EngineError>;

    /// Populate the file-manifest list at session hydration.
    fn hydrate_manifest(&self, entries: &[ManifestEntry]) -> Result<(), EngineError> {
        for entry in entries {
            self.push_manifest_entry(entry)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct EngineError(pub String);

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Merge engine error: {}", self.0)
    }
}

impl std::error::Error for EngineError {}

/// Loro-backed merge engine.
///
/// Holds one `LoroDoc` with a `content` text container (document rooms) and a
/// `files` list container of maps (manifest rooms). `LoroDoc` is internally
/// synchronized; the extra mutex only guards the delta watermark.
pub struct LoroEngine {
    doc: LoroDoc,
    /// Version frontier of the last `encode_delta` call. Updates already
    /// relayed verbatim may be included again in the next delta; receivers
    /// tolerate that through idempotence.
    delta_vv: Mutex<VersionVector>,
}

impl LoroEngine {
    pub fn new() -> Self {
        Self {
            doc: LoroDoc::new(),
            delta_vv: Mutex::new(VersionVector::default()),
        }
    }
}

impl Default for LoroEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeEngine for LoroEngine {
    fn apply_remote_update(&self, update: &[u8]) -> Result<(), EngineError> {
        self.doc
            .import(update)
            .map(|_| ())
            .map_err(|e| EngineError(e.to_string()))
    }

    fn encode_full_state(&self) -> Result<Vec<u8>, EngineError> {
        self.doc
            .export(ExportMode::Snapshot)
            .map_err(|e| EngineError(e.to_string()))
    }

    fn encode_delta(&self) -> Result<Vec<u8>, EngineError> {
        let mut watermark = match self.delta_vv.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let delta = self
            .doc
            .export(ExportMode::updates(&watermark))
            .map_err(|e| EngineError(e.to_string()))?;
        *watermark = self.doc.oplog_vv();
        Ok(delta)
    }

    fn current_text(&self) -> String {
        self.doc.get_text(TEXT_CONTAINER).to_string()
    }

    fn hydrate_text(&self, content: &str) -> Result<(), EngineError> {
        self.doc
            .get_text(TEXT_CONTAINER)
            .insert(0, content)
            .map_err(|e| EngineError(e.to_string()))?;
        self.doc.commit();
        Ok(())
    }

    fn manifest_entries(&self) -> Result<Vec<ManifestEntry>, EngineError> {
        let value = self.doc.get_deep_value().to_json_value();
        match value.get(FILES_CONTAINER) {
            Some(files) => serde_json::from_value(files.clone())
                .map_err(|e| EngineError(format!("Failed to decode manifest entries: {}", e))),
            None => Ok(Vec::new()),
        }
    }

    fn push_manifest_entry(&self, entry: &ManifestEntry) -> Result<(), EngineError> {
        let list = self.doc.get_list(FILES_CONTAINER);
        let map = list
            .insert_container(list.len(), LoroMap::new())
            .map_err(|e| EngineError(e.to_string()))?;
        map.insert("id", entry.id.as_str())
            .map_err(|e| EngineError(e.to_string()))?;
        map.insert("name", entry.name.as_str())
            .map_err(|e| EngineError(e.to_string()))?;
        map.insert("path", entry.path.as_str())
            .map_err(|e| EngineError(e.to_string()))?;
        map.insert("language", entry.language.as_str())
            .map_err(|e| EngineError(e.to_string()))?;
        self.doc.commit();
        Ok(())
    }

    fn remove_manifest_entry(&self, file_id: &str) -> Result<bool, EngineError> {
        let entries = self.manifest_entries()?;
        let Some(index) = entries.iter().position(|e| e.id == file_id) else {
            return Ok(false);
        };
        self.doc
            .get_list(FILES_CONTAINER)
            .delete(index, 1)
            .map_err(|e| EngineError(e.to_string()))?;
        self.doc.commit();
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use std::collections::BTreeSet;

    /// Merge engine fake: an update is an opaque byte string, state is the
    /// set of applied updates, text is their sorted concatenation. Applying
    /// twice or in any order converges, which is all the core relies on.
    #[derive(Default)]
    pub struct FakeEngine {
        updates: Mutex<BTreeSet<Vec<u8>>>,
    }

    impl FakeEngine {
        pub fn new() -> Self {
            Self::default()
        }
    }

    const SEP: u8 = 0x1e;

    impl MergeEngine for FakeEngine {
        fn apply_remote_update(&self, update: &[u8]) -> Result<(), EngineError> {
            if update.is_empty() {
                return Err(EngineError("empty update".to_string()));
            }
            let mut updates = self.updates.lock().expect("lock poisoned");
            for chunk in update.split(|b| *b == SEP).filter(|c| !c.is_empty()) {
                updates.insert(chunk.to_vec());
            }
            Ok(())
        }

        fn encode_full_state(&self) -> Result<Vec<u8>, EngineError> {
            let updates = self.updates.lock().expect("lock poisoned");
            Ok(updates
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(&SEP))
        }

        fn encode_delta(&self) -> Result<Vec<u8>, EngineError> {
            self.encode_full_state()
        }

        fn current_text(&self) -> String {
            let updates = self.updates.lock().expect("lock poisoned");
            updates
                .iter()
                .map(|u| String::from_utf8_lossy(u).into_owned())
                .collect()
        }

        fn hydrate_text(&self, content: &str) -> Result<(), EngineError> {
            self.apply_remote_update(content.as_bytes())
        }

        fn manifest_entries(&self) -> Result<Vec<ManifestEntry>, EngineError> {
            Ok(Vec::new())
        }

        fn push_manifest_entry(&self, _entry: &ManifestEntry) -> Result<(), EngineError> {
            Ok(())
        }

        fn remove_manifest_entry(&self, _file_id: &str) -> Result<bool, EngineError> {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, name: &str) -> ManifestEntry {
        ManifestEntry {
            id: id.to_string(),
            name: name.to_string(),
            path: name.to_string(),
            language: "rust".to_string(),
        }
    }

    #[test]
    fn concurrent_updates_converge_regardless_of_order() {
        let a = LoroEngine::new();
        let b = LoroEngine::new();
        a.hydrate_text("base").unwrap();
        let seed = a.encode_full_state().unwrap();
        b.apply_remote_update(&seed).unwrap();

        // Independent edits on each replica.
        a.doc.get_text(TEXT_CONTAINER).insert(0, "A").unwrap();
        a.doc.commit();
        b.doc.get_text(TEXT_CONTAINER).insert(4, "B").unwrap();
        b.doc.commit();

        let update_a = a.encode_full_state().unwrap();
        let update_b = b.encode_full_state().unwrap();

        // Cross-apply in opposite orders.
        a.apply_remote_update(&update_b).unwrap();
        b.apply_remote_update(&update_a).unwrap();
        assert_eq!(a.current_text(), b.current_text());

        // Re-applying is a no-op.
        a.apply_remote_update(&update_b).unwrap();
        assert_eq!(a.current_text(), b.current_text());
    }

    #[test]
    fn joiner_sees_state_from_single_snapshot() {
        let server = LoroEngine::new();
        server.hydrate_text("hello").unwrap();
        server.doc.get_text(TEXT_CONTAINER).insert(5, " world").unwrap();
        server.doc.commit();

        let joiner = LoroEngine::new();
        joiner
            .apply_remote_update(&server.encode_full_state().unwrap())
            .unwrap();
        assert_eq!(joiner.current_text(), "hello world");
    }

    #[test]
    fn rejects_garbage_update() {
        let engine = LoroEngine::new();
        assert!(engine.apply_remote_update(b"not a loro frame").is_err());
        // Engine stays usable afterwards.
        engine.hydrate_text("still fine").unwrap();
        assert_eq!(engine.current_text(), "still fine");
    }

    #[test]
    fn manifest_push_and_remove() {
        let engine = LoroEngine::new();
        engine.push_manifest_entry(&entry("f1", "main.rs")).unwrap();
        engine.push_manifest_entry(&entry("f2", "lib.rs")).unwrap();

        let entries = engine.manifest_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "f1");
        assert_eq!(entries[1].name, "lib.rs");

        assert!(engine.remove_manifest_entry("f1").unwrap());
        assert!(!engine.remove_manifest_entry("missing").unwrap());
        let entries = engine.manifest_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "f2");
    }

    #[test]
    fn manifest_delta_reaches_peer() {
        let server = LoroEngine::new();
        let peer = LoroEngine::new();
        peer.apply_remote_update(&server.encode_full_state().unwrap())
            .unwrap();

        // Drain the watermark, then make a local edit.
        server.encode_delta().unwrap();
        server.push_manifest_entry(&entry("f1", "main.rs")).unwrap();

        let delta = server.encode_delta().unwrap();
        peer.apply_remote_update(&delta).unwrap();
        let entries = peer.manifest_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "f1");
    }

    #[test]
    fn delta_watermark_advances() {
        let engine = LoroEngine::new();
        engine.hydrate_text("x").unwrap();
        let first = engine.encode_delta().unwrap();
        assert!(!first.is_empty());
        // Nothing new since the last call.
        let second = engine.encode_delta().unwrap();
        let probe = LoroEngine::new();
        probe.apply_remote_update(&second).unwrap();
        assert_eq!(probe.current_text(), "");
    }
}
