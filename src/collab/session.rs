use crate::collab::address::RoomAddress;
use crate::collab::awareness::{AwarenessState, AwarenessStore};
use crate::collab::engine::MergeEngine;
use crate::collab::flush::Flusher;
use crate::collab::protocol::{AwarenessMessage, Frame};
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};

/// Sender id used for server-local edits (manifest pushes from REST).
/// Connection ids start at 1, so these frames are never echo-suppressed.
pub const SERVER_SENDER_ID: u64 = 0;

/// A frame fanned out to every attached connection. The relay skips frames
/// whose `sender_id` matches its own connection to avoid echoing.
#[derive(Clone, Debug)]
pub struct BroadcastFrame {
    pub sender_id: u64,
    pub bytes: Vec<u8>,
}

const BROADCAST_CAPACITY: usize = 256;

/// Live in-memory state of one collaboration room: the replicated document,
/// the presence map, the attached connections and the persistence flusher.
pub struct Session {
    address: RoomAddress,
    engine: Arc<dyn MergeEngine>,
    awareness: Mutex<AwarenessStore>,
    connections: Mutex<HashSet<u64>>,
    tx: broadcast::Sender<BroadcastFrame>,
    flusher: Flusher,
    next_conn_id: AtomicU64,
}

impl Session {
    pub fn new(address: RoomAddress, engine: Arc<dyn MergeEngine>, flusher: Flusher) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            address,
            engine,
            awareness: Mutex::new(AwarenessStore::new()),
            connections: Mutex::new(HashSet::new()),
            tx,
            flusher,
            next_conn_id: AtomicU64::new(1),
        }
    }

    pub fn address(&self) -> &RoomAddress {
        &self.address
    }

    pub fn engine(&self) -> &Arc<dyn MergeEngine> {
        &self.engine
    }

    pub fn flusher(&self) -> &Flusher {
        &self.flusher
    }

    pub fn next_conn_id(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastFrame> {
        self.tx.subscribe()
    }

    /// Fan a pre-encoded frame out to every attached connection except the
    /// originator. A send error only means no one is listening.
    pub fn broadcast(&self, sender_id: u64, bytes: Vec<u8>) {
        let _ = self.tx.send(BroadcastFrame { sender_id, bytes });
    }

    pub async fn attach(&self, conn_id: u64) {
        let mut connections = self.connections.lock().await;
        connections.insert(conn_id);
        info!(
            "Connection {} attached to room '{}' ({} connected)",
            conn_id,
            self.address,
            connections.len()
        );
    }

    /// Detach cleanup: unregister the connection, drop its awareness entry
    /// and tell the peers. Runs on clean and error closes alike.
    pub async fn detach(&self, conn_id: u64) {
        self.connections.lock().await.remove(&conn_id);
        let removed = self.awareness.lock().await.remove(conn_id);
        if removed {
            match (Frame::Awareness(AwarenessMessage::Peer {
                conn_id,
                state: None,
            }))
            .encode()
            {
                Ok(bytes) => self.broadcast(conn_id, bytes),
                Err(e) => error!("Failed to encode awareness removal: {}", e),
            }
        }
        info!("Connection {} detached from room '{}'", conn_id, self.address);
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Merge an awareness patch for a connection and return the merged state.
    pub async fn set_awareness(&self, conn_id: u64, patch: AwarenessState) -> AwarenessState {
        self.awareness.lock().await.set_local(conn_id, patch)
    }

    pub async fn awareness_snapshot(&self) -> HashMap<u64, AwarenessState> {
        self.awareness.lock().await.snapshot()
    }

    /// Broadcast the engine delta produced by a server-local edit (manifest
    /// add/remove driven by the REST boundary) and poke the flusher.
    pub async fn broadcast_local_delta(&self) {
        match self.engine.encode_delta() {
            Ok(delta) if delta.is_empty() => {}
            Ok(delta) => {
                match Frame::Doc(delta).encode() {
                    Ok(bytes) => self.broadcast(SERVER_SENDER_ID, bytes),
                    Err(e) => error!("Failed to encode local delta for '{}': {}", self.address, e),
                }
                self.flusher.notify_mutated().await;
            }
            Err(e) => error!("Failed to export local delta for '{}': {}", self.address, e),
        }
    }
}
