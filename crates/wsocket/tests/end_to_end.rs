//! Real server and real client over loopback.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use wsocket::client::{ClientConfig, MessageSocket, WsClient};
use wsocket::core::Frame;
use wsocket::server::config::ServerConfig;
use wsocket::server::{CloseReason, Connection, ConnectionHandler, WsServer};
use wsocket::{ConnectionState, Envelope, WsocketError};

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum Seen {
    Connected { user: Option<String>, remote: Option<SocketAddr> },
    Closed(CloseReason),
}

const PLAIN_TEXT: &str = "plain text, not json";

/// Echoes every envelope and reports lifecycle events to the test. An
/// envelope of type `plain` is answered with a bare text frame instead.
struct EchoProbe {
    seen: mpsc::UnboundedSender<Seen>,
}

#[async_trait]
impl ConnectionHandler for EchoProbe {
    async fn on_connect(&self, conn: &Arc<Connection>) {
        if let Some(user) = conn.request().query_param("user") {
            conn.attributes().set("user", user);
        }
        let _ = self.seen.send(Seen::Connected {
            user: conn.attributes().get_string("user"),
            remote: conn.request().remote_addr,
        });
    }

    async fn on_message(&self, conn: &Arc<Connection>, env: Envelope) {
        if env.msg_type == "plain" {
            let _ = conn.send_frame(Frame::Text(PLAIN_TEXT.into())).await;
            return;
        }
        let _ = conn.send_message(&env).await;
    }

    async fn on_close(&self, _conn: &Arc<Connection>, reason: &CloseReason) {
        let _ = self.seen.send(Seen::Closed(reason.clone()));
    }
}

struct Running {
    addr: SocketAddr,
    seen: mpsc::UnboundedReceiver<Seen>,
    _stop: oneshot::Sender<()>,
}

async fn boot_server() -> Running {
    let (tx, seen) = mpsc::unbounded_channel();
    let server = WsServer::new(ServerConfig::default(), EchoProbe { seen: tx }).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(server.serve_with_shutdown(listener, async move {
        let _ = stopped.await;
    }));
    Running { addr, seen, _stop: stop }
}

async fn connected_client(addr: SocketAddr, query: &str) -> WsClient {
    let cfg = ClientConfig::new(format!("ws://{addr}/ws/socket{query}"));
    let client = WsClient::new(cfg).unwrap();
    client.connect().await.unwrap();
    timeout(TIMEOUT, client.wait_connected()).await.unwrap().unwrap();
    client
}

#[tokio::test]
async fn echo_round_trip_and_close_hooks() {
    let mut srv = boot_server().await;
    let client = connected_client(srv.addr, "?user=alice").await;

    match timeout(TIMEOUT, srv.seen.recv()).await.unwrap().unwrap() {
        Seen::Connected { user, remote } => {
            assert_eq!(user.as_deref(), Some("alice"));
            assert!(remote.is_some());
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let env = Envelope::new("chat", "hello").to_user(7).in_room("lobby");
    client.send_message(&env).await.unwrap();
    let got = timeout(TIMEOUT, client.read_message()).await.unwrap().unwrap();
    assert_eq!(got, env);

    MessageSocket::close(&client).await.unwrap();
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(matches!(client.read_message().await, Err(WsocketError::Closed)));

    match timeout(TIMEOUT, srv.seen.recv()).await.unwrap().unwrap() {
        Seen::Closed(reason) => assert_eq!(reason, CloseReason::PeerClosed(Some(1000))),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_senders_produce_whole_frames() {
    let srv = boot_server().await;
    let client = Arc::new(connected_client(srv.addr, "").await);

    let mut tasks = Vec::new();
    for i in 0..50 {
        let c = Arc::clone(&client);
        tasks.push(tokio::spawn(async move {
            c.send_message(&Envelope::new("n", format!("{i}:{}", "x".repeat(2000))))
                .await
        }));
    }
    for t in tasks {
        t.await.unwrap().unwrap();
    }

    let mut ids = HashSet::new();
    for _ in 0..50 {
        let env = timeout(TIMEOUT, client.read_message()).await.unwrap().unwrap();
        assert_eq!(env.msg_type, "n", "echo was not a whole envelope: {env:?}");
        let (id, pad) = env.data.split_once(':').unwrap();
        assert_eq!(pad.len(), 2000);
        ids.insert(id.to_string());
    }
    assert_eq!(ids.len(), 50);
    client.close().await.unwrap();
}

#[tokio::test]
async fn non_json_text_frame_reaches_consumer_raw() {
    let srv = boot_server().await;
    let client = connected_client(srv.addr, "").await;

    client.send_message(&Envelope::new("plain", "")).await.unwrap();
    let got = timeout(TIMEOUT, client.read_message()).await.unwrap().unwrap();
    assert_eq!(got, Envelope::raw(PLAIN_TEXT));
    client.close().await.unwrap();
}

#[tokio::test]
async fn health_returns_ok_with_empty_body() {
    let srv = boot_server().await;
    let mut stream = TcpStream::connect(srv.addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut resp = String::new();
    timeout(TIMEOUT, stream.read_to_string(&mut resp)).await.unwrap().unwrap();

    assert!(resp.starts_with("HTTP/1.1 200"), "resp={resp}");
    assert!(resp.to_ascii_lowercase().contains("content-length: 0"), "resp={resp}");
}
