use crate::collab::address::RoomAddress;
use crate::collab::engine::{LoroEngine, MergeEngine};
use crate::collab::flush::{FlushTarget, Flusher};
use crate::collab::session::Session;
use crate::db::dbdocs::Db;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Owns every live [`Session`], keyed by room key.
///
/// Held by the server's composition root rather than ambient module state, so
/// tests can run several independent registries in one process. Sessions are
/// created lazily on first access and stay resident for the life of the
/// registry; a room is never dropped while a connection is attached.
pub struct SessionRegistry {
    /// Per-key `OnceCell` serializes concurrent first accesses: the loser of
    /// the map race awaits the winner's hydration instead of running its own.
    sessions: RwLock<HashMap<String, Arc<OnceCell<Arc<Session>>>>>,
    storage: Option<Arc<Db>>,
    debounce: Duration,
}

impl SessionRegistry {
    pub fn new(storage: Option<Arc<Db>>, debounce: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            storage,
            debounce,
        }
    }

    /// Return the room's session, creating and hydrating it on first access.
    ///
    /// Never fails: a hydration error degrades to an empty room, because
    /// losing the ability to collaborate is worse than losing prior content.
    pub async fn get_or_create(&self, address: &RoomAddress) -> Arc<Session> {
        let key = address.room_key();

        let cell = {
            let sessions = self.sessions.read().await;
            sessions.get(&key).cloned()
        };
        let cell = match cell {
            Some(cell) => cell,
            None => {
                let mut sessions = self.sessions.write().await;
                sessions.entry(key).or_default().clone()
            }
        };

        cell.get_or_init(|| async { Arc::new(self.create_session(address).await) })
            .await
            .clone()
    }

    /// Look a session up without creating one. Used by the REST boundary to
    /// repair a resident file-manifest room.
    pub async fn get_resident(&self, address: &RoomAddress) -> Option<Arc<Session>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&address.room_key())
            .and_then(|cell| cell.get().cloned())
    }

    /// Number of resident rooms.
    pub async fn room_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.values().filter(|cell| cell.get().is_some()).count()
    }

    /// Total attached connections across all rooms, plus how many rooms have
    /// unflushed mutations.
    pub async fn diagnostics(&self) -> (usize, usize) {
        let resident: Vec<Arc<Session>> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter_map(|cell| cell.get().cloned())
                .collect()
        };
        let mut connections = 0;
        let mut dirty = 0;
        for session in resident {
            connections += session.connection_count().await;
            if session.flusher().is_dirty() {
                dirty += 1;
            }
        }
        (connections, dirty)
    }

    async fn create_session(&self, address: &RoomAddress) -> Session {
        info!("Creating session for room '{}'", address);
        let engine: Arc<dyn MergeEngine> = Arc::new(LoroEngine::new());

        if let Some(db) = &self.storage {
            self.hydrate(db, address, engine.as_ref()).await;
        } else {
            debug!("No storage configured, room '{}' starts empty", address);
        }

        let target = self.flush_target(address);
        let flusher = Flusher::new(Arc::clone(&engine), target, self.debounce);
        Session::new(address.clone(), engine, flusher)
    }

    /// Load initial state from storage. Any failure leaves the room empty:
    /// degraded but functional beats refusing the connection.
    async fn hydrate(&self, db: &Arc<Db>, address: &RoomAddress, engine: &dyn MergeEngine) {
        match address {
            RoomAddress::LegacyDocument { document_id } => {
                match db.load_document(document_id).await {
                    Ok(Some(content)) => {
                        if let Err(e) = engine.hydrate_text(&content) {
                            warn!("Failed to hydrate document '{}': {}", document_id, e);
                        } else {
                            info!(
                                "Hydrated document '{}' ({} chars)",
                                document_id,
                                content.chars().count()
                            );
                        }
                    }
                    Ok(None) => debug!("No stored row for document '{}'", document_id),
                    Err(e) => warn!(
                        "Hydration failed for document '{}', starting empty: {}",
                        document_id, e
                    ),
                }
            }
            RoomAddress::ProjectFile { file_id, .. } => match parse_row_id(file_id) {
                Some(id) => match db.load_file_content(id).await {
                    Ok(Some(content)) => {
                        if let Err(e) = engine.hydrate_text(&content) {
                            warn!("Failed to hydrate file '{}': {}", file_id, e);
                        } else {
                            info!("Hydrated file '{}' ({} chars)", file_id, content.chars().count());
                        }
                    }
                    Ok(None) => debug!("No stored row for file '{}'", file_id),
                    Err(e) => warn!(
                        "Hydration failed for file '{}', starting empty: {}",
                        file_id, e
                    ),
                },
                None => warn!("File id '{}' is not a valid row id, starting empty", file_id),
            },
            RoomAddress::FileManifest { project_id } => match parse_row_id(project_id) {
                Some(id) => match db.list_files(id).await {
                    Ok(files) => {
                        let entries: Vec<_> = files.iter().map(|f| f.manifest_entry()).collect();
                        let count = entries.len();
                        if let Err(e) = engine.hydrate_manifest(&entries) {
                            warn!("Failed to hydrate manifest for '{}': {}", project_id, e);
                        } else {
                            info!("Hydrated manifest for '{}' ({} files)", project_id, count);
                        }
                    }
                    Err(e) => warn!(
                        "Hydration failed for manifest '{}', starting empty: {}",
                        project_id, e
                    ),
                },
                None => warn!(
                    "Project id '{}' is not a valid row id, starting empty",
                    project_id
                ),
            },
        }
    }

    fn flush_target(&self, address: &RoomAddress) -> FlushTarget {
        let Some(db) = &self.storage else {
            return FlushTarget::None;
        };
        match address {
            RoomAddress::LegacyDocument { document_id } => FlushTarget::Document {
                db: Arc::clone(db),
                document_id: document_id.clone(),
            },
            RoomAddress::ProjectFile { file_id, .. } => match parse_row_id(file_id) {
                Some(id) => FlushTarget::File {
                    db: Arc::clone(db),
                    file_id: id,
                },
                None => FlushTarget::None,
            },
            // The files table is the source of truth; the manifest room is a
            // derived cache and is never written back.
            RoomAddress::FileManifest { .. } => FlushTarget::None,
        }
    }
}

fn parse_row_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}
