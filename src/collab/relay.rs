use crate::collab::address::RoomAddress;
use crate::collab::protocol::{AwarenessMessage, Frame};
use crate::collab::session::Session;
use crate::models::ErrorResponse;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

#[derive(Deserialize)]
pub struct RoomQuery {
    room: Option<String>,
}

/// WebSocket entry point for `/collab?room=<id>`.
pub async fn collab_query(
    ws: WebSocketUpgrade,
    Query(query): Query<RoomQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match query.room {
        Some(room) => route(ws, &room, state).await,
        None => reject("", "Missing 'room' query parameter"),
    }
}

/// WebSocket entry point for `/collab/<documentId>`,
/// `/collab/<documentId>:<fileId>` and `/collab/<projectId>-files`.
pub async fn collab_room(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    route(ws, &room, state).await
}

/// Resolve the room address and attach the upgrade to its session.
/// Routing failure closes the attempt with a 400 before any session work.
async fn route(ws: WebSocketUpgrade, room: &str, state: Arc<AppState>) -> Response {
    let address = match RoomAddress::parse(room) {
        Ok(address) => address,
        Err(e) => return reject(room, e),
    };
    let session = state.registry.get_or_create(&address).await;
    ws.on_upgrade(move |socket| handle_socket(socket, session))
}

fn reject(room: &str, error: impl Display) -> Response {
    warn!("Rejected collab connection for '{}': {}", room, error);
    let status = StatusCode::BAD_REQUEST;
    (
        status,
        Json(ErrorResponse {
            code: status.as_u16(),
            status: status.to_string(),
            error: error.to_string(),
        }),
    )
        .into_response()
}

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Per-connection relay loop.
async fn handle_socket(socket: WebSocket, session: Arc<Session>) {
    let conn_id = session.next_conn_id();
    info!("WebSocket connection {} established for room '{}'", conn_id, session.address());

    let (sender, mut receiver) = socket.split();
    let sender: WsSender = Arc::new(Mutex::new(sender));

    // Subscribe before sending the snapshot so no update can fall into the
    // gap; an update delivered both ways is absorbed by idempotence.
    let mut rx = session.subscribe();
    session.attach(conn_id).await;

    if !send_initial_state(&sender, &session).await {
        session.detach(conn_id).await;
        return;
    }

    // Ingest frames from this client and relay them to the room.
    let ingest_session = Arc::clone(&session);
    let mut ingest_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Binary(bytes) => handle_frame(&ingest_session, conn_id, bytes).await,
                Message::Close(_) => break,
                // Pings are answered by axum; text frames are not part of
                // the protocol.
                _ => {}
            }
        }
    });

    // Fan room broadcasts out to this client, excluding its own frames.
    let fanout_sender = Arc::clone(&sender);
    let mut fanout_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(frame) => {
                    if frame.sender_id == conn_id {
                        continue;
                    }
                    if fanout_sender
                        .lock()
                        .await
                        .send(Message::Binary(frame.bytes))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Connection {} lagged, skipped {} frames", conn_id, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut ingest_task) => fanout_task.abort(),
        _ = (&mut fanout_task) => ingest_task.abort(),
    };

    // Cleanup runs on clean and error closes alike.
    session.detach(conn_id).await;
    info!("WebSocket connection {} terminated", conn_id);
}

/// First frames after the upgrade: the full encoded document state, so the
/// joiner can render before streaming diffs, then the presence snapshot.
async fn send_initial_state(sender: &WsSender, session: &Arc<Session>) -> bool {
    let snapshot = match session.engine().encode_full_state() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Failed to encode state for '{}': {}", session.address(), e);
            return false;
        }
    };
    if !send_frame(sender, Frame::Doc(snapshot)).await {
        return false;
    }
    let states = session.awareness_snapshot().await;
    send_frame(sender, Frame::Awareness(AwarenessMessage::Sync { states })).await
}

async fn send_frame(sender: &WsSender, frame: Frame) -> bool {
    let bytes = match frame.encode() {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to encode frame: {}", e);
            return false;
        }
    };
    sender
        .lock()
        .await
        .send(Message::Binary(bytes))
        .await
        .is_ok()
}

/// Process one binary frame from a connection. A malformed frame is logged
/// and dropped; it never closes the connection or the process.
async fn handle_frame(session: &Arc<Session>, conn_id: u64, bytes: Vec<u8>) {
    match Frame::decode(&bytes) {
        Ok(Frame::Doc(update)) => {
            match session.engine().apply_remote_update(&update) {
                Ok(()) => {
                    // Relay the frame verbatim to the siblings; commutativity
                    // makes re-encoding unnecessary.
                    session.broadcast(conn_id, bytes);
                    session.flusher().notify_mutated().await;
                }
                Err(e) => {
                    warn!(
                        "Dropping malformed update from connection {} in '{}': {}",
                        conn_id,
                        session.address(),
                        e
                    );
                }
            }
        }
        Ok(Frame::Awareness(AwarenessMessage::Update { state })) => {
            let merged = session.set_awareness(conn_id, state).await;
            match (Frame::Awareness(AwarenessMessage::Peer {
                conn_id,
                state: Some(merged),
            }))
            .encode()
            {
                Ok(peer_bytes) => session.broadcast(conn_id, peer_bytes),
                Err(e) => warn!("Failed to encode awareness broadcast: {}", e),
            }
        }
        Ok(Frame::Awareness(other)) => {
            warn!(
                "Ignoring server-only awareness message from connection {}: {:?}",
                conn_id, other
            );
        }
        Err(e) => {
            warn!(
                "Dropping undecodable frame from connection {} in '{}': {}",
                conn_id,
                session.address(),
                e
            );
        }
    }
}
