use codecolab::collab::awareness::{AwarenessState, UserInfo};
use codecolab::collab::protocol::{AwarenessMessage, Frame};
use codecolab::config::Config;
use codecolab::routes::create_app_router;
use codecolab::state::AppState;
use futures_util::{SinkExt, StreamExt};
use loro::{ExportMode, LoroDoc};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spin up a demo-mode server (no database) on an ephemeral port.
async fn spawn_server() -> SocketAddr {
    let config = Config {
        debounce_ms: 50,
        ..Config::default()
    };
    let state = Arc::new(AppState::new(config, None));
    let router = create_app_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    addr
}

async fn connect(addr: SocketAddr, resource: &str) -> WsClient {
    let url = format!("ws://{}{}", addr, resource);
    let (stream, _) = connect_async(url.as_str()).await.expect("ws connect");
    stream
}

async fn recv_frame(client: &mut WsClient) -> Frame {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("transport error");
        if let Message::Binary(bytes) = message {
            return Frame::decode(&bytes).expect("decodable frame");
        }
    }
}

async fn expect_silence(client: &mut WsClient) {
    let result = tokio::time::timeout(Duration::from_millis(250), client.next()).await;
    assert!(result.is_err(), "expected no frame, got {:?}", result);
}

async fn send_frame(client: &mut WsClient, frame: Frame) {
    let bytes = frame.encode().expect("encodable frame");
    client
        .send(Message::binary(bytes))
        .await
        .expect("send frame");
}

/// Join a room and consume the two initial frames, returning a client-side
/// replica seeded from the snapshot.
async fn join(addr: SocketAddr, resource: &str) -> (WsClient, LoroDoc) {
    let mut client = connect(addr, resource).await;
    let doc = LoroDoc::new();
    match recv_frame(&mut client).await {
        Frame::Doc(snapshot) => {
            if !snapshot.is_empty() {
                doc.import(&snapshot).expect("import snapshot");
            }
        }
        other => panic!("expected doc snapshot first, got {:?}", other),
    }
    match recv_frame(&mut client).await {
        Frame::Awareness(AwarenessMessage::Sync { .. }) => {}
        other => panic!("expected awareness sync second, got {:?}", other),
    }
    (client, doc)
}

/// Produce the update bytes for a local text edit on a client replica.
fn edit_text(doc: &LoroDoc, pos: usize, text: &str) -> Vec<u8> {
    let from = doc.oplog_vv();
    doc.get_text("content").insert(pos, text).expect("insert");
    doc.commit();
    doc.export(ExportMode::updates(&from)).expect("export update")
}

#[tokio::test]
async fn update_is_relayed_to_peer_but_not_echoed() {
    let addr = spawn_server().await;
    let (mut a, doc_a) = join(addr, "/collab?room=demo-room").await;
    let (mut b, doc_b) = join(addr, "/collab/demo-room").await;

    let update = edit_text(&doc_a, 0, "hello");
    send_frame(&mut a, Frame::Doc(update)).await;

    match recv_frame(&mut b).await {
        Frame::Doc(bytes) => doc_b.import(&bytes).map(|_| ()).expect("import relayed update"),
        other => panic!("expected doc frame, got {:?}", other),
    }
    assert_eq!(doc_b.get_text("content").to_string(), "hello");

    // The originator must not get its own frame back.
    expect_silence(&mut a).await;
}

#[tokio::test]
async fn late_joiner_bootstraps_from_snapshot() {
    let addr = spawn_server().await;
    let (mut a, doc_a) = join(addr, "/collab/bootstrap-room").await;

    for (pos, chunk) in [(0, "hello"), (5, " world")] {
        let update = edit_text(&doc_a, pos, chunk);
        send_frame(&mut a, Frame::Doc(update)).await;
    }
    // Give the relay a beat to apply both frames.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (_c, doc_c) = join(addr, "/collab/bootstrap-room").await;
    assert_eq!(doc_c.get_text("content").to_string(), "hello world");
}

#[tokio::test]
async fn awareness_updates_and_disconnect_removal_reach_peers() {
    let addr = spawn_server().await;
    let (mut a, _) = join(addr, "/collab/presence-room").await;
    let (mut b, _) = join(addr, "/collab/presence-room").await;

    send_frame(
        &mut a,
        Frame::Awareness(AwarenessMessage::Update {
            state: AwarenessState {
                user: Some(UserInfo {
                    name: "alice".to_string(),
                    color: "#123456".to_string(),
                }),
                ..Default::default()
            },
        }),
    )
    .await;

    let peer_id = match recv_frame(&mut b).await {
        Frame::Awareness(AwarenessMessage::Peer {
            conn_id,
            state: Some(state),
        }) => {
            assert_eq!(state.user.expect("user set").name, "alice");
            conn_id
        }
        other => panic!("expected peer state, got {:?}", other),
    };

    a.close(None).await.expect("close a");
    match recv_frame(&mut b).await {
        Frame::Awareness(AwarenessMessage::Peer { conn_id, state }) => {
            assert_eq!(conn_id, peer_id);
            assert!(state.is_none(), "removal must carry a null state");
        }
        other => panic!("expected peer removal, got {:?}", other),
    }
}

#[tokio::test]
async fn rooms_with_related_keys_are_isolated() {
    let addr = spawn_server().await;
    let (mut legacy, doc) = join(addr, "/collab/proj1").await;

    let update = edit_text(&doc, 0, "legacy only");
    send_frame(&mut legacy, Frame::Doc(update)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (_f, file_doc) = join(addr, "/collab/proj1:file7").await;
    let (_m, manifest_doc) = join(addr, "/collab/proj1-files").await;
    let (_l, legacy_doc) = join(addr, "/collab/proj1").await;

    assert_eq!(legacy_doc.get_text("content").to_string(), "legacy only");
    assert_eq!(file_doc.get_text("content").to_string(), "");
    assert_eq!(manifest_doc.get_text("content").to_string(), "");
}

#[tokio::test]
async fn malformed_frames_are_dropped_without_closing() {
    let addr = spawn_server().await;
    let (mut a, doc_a) = join(addr, "/collab/robust-room").await;
    let (mut b, doc_b) = join(addr, "/collab/robust-room").await;

    // Corrupt document payload and an unknown tag: both must be swallowed.
    send_frame(&mut a, Frame::Doc(b"definitely not a crdt update".to_vec())).await;
    a.send(Message::binary(vec![0x7f, 0x01, 0x02]))
        .await
        .expect("send unknown tag");

    let update = edit_text(&doc_a, 0, "still alive");
    send_frame(&mut a, Frame::Doc(update)).await;

    match recv_frame(&mut b).await {
        Frame::Doc(bytes) => doc_b.import(&bytes).map(|_| ()).expect("import"),
        other => panic!("expected doc frame, got {:?}", other),
    }
    assert_eq!(doc_b.get_text("content").to_string(), "still alive");
}

#[tokio::test]
async fn unroutable_connections_are_rejected_before_upgrade() {
    let addr = spawn_server().await;

    for resource in ["/collab", "/collab/proj1:", "/collab/a:b:c"] {
        let url = format!("ws://{}{}", addr, resource);
        match connect_async(url.as_str()).await {
            Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
                assert_eq!(response.status(), 400, "resource {}", resource);
            }
            other => panic!("expected HTTP 400 for {}, got {:?}", resource, other),
        }
    }
}
