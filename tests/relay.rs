/// End-to-end relay scenarios over real TCP sockets.
///
/// Each test binds an in-process relay on an ephemeral port, connects raw
/// TCP clients, and drives the newline-delimited frame protocol directly:
///
/// - presence counts reach every client on join and leave
/// - empty frames (with or without a command byte) hang up the sender
/// - chat frames are persisted through the delegate and routed best-effort
/// - `home` broadcasts exclude the sender; unicast hits exactly one peer
/// - unbound receivers are dropped silently
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use harbor::relay::command::Command;
use harbor::relay::delegate::{Delegate, DelegateError};
use harbor::relay::server::Relay;

const MESSAGE: u8 = Command::Message as u8;
const ADD_REACT: u8 = Command::AddReact as u8;
const CONN_NB: u8 = Command::ConnNb as u8;
const HELLO_WORLD: u8 = Command::HelloWorld as u8;

/// Records every delegate call for later assertions.
#[derive(Default)]
struct RecordingDelegate {
    messages: Mutex<Vec<(String, String, String, Option<String>)>>,
    reactions: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Delegate for RecordingDelegate {
    async fn send_message(
        &self,
        sender: &str,
        receiver: &str,
        body: &str,
        correlation_id: Option<&str>,
    ) -> Result<(), DelegateError> {
        self.messages.lock().unwrap().push((
            sender.into(),
            receiver.into(),
            body.into(),
            correlation_id.map(Into::into),
        ));
        Ok(())
    }

    async fn update_reaction_count(
        &self,
        message_id: &str,
        reaction_count: &str,
    ) -> Result<(), DelegateError> {
        self.reactions
            .lock()
            .unwrap()
            .push((message_id.into(), reaction_count.into()));
        Ok(())
    }
}

/// Bind a relay on an ephemeral port and run its accept loop in the background.
async fn start_relay(delegate: Arc<RecordingDelegate>) -> SocketAddr {
    let relay = Relay::bind("127.0.0.1:0", delegate as Arc<dyn Delegate>)
        .await
        .expect("bind relay");
    let addr = relay.local_addr().expect("local addr");
    tokio::spawn(relay.run());
    addr
}

/// Minimal frame-protocol client for testing.
struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read, write) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer: write,
        }
    }

    async fn send(&mut self, code: u8, payload: &str) {
        let mut buf = vec![code];
        buf.extend_from_slice(payload.as_bytes());
        buf.push(b'\n');
        self.writer.write_all(&buf).await.expect("write frame");
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("write bytes");
    }

    /// Read one frame, failing the test after two seconds.
    async fn recv(&mut self) -> (u8, String) {
        let mut line = Vec::new();
        timeout(Duration::from_secs(2), self.reader.read_until(b'\n', &mut line))
            .await
            .expect("timed out waiting for a frame")
            .expect("read frame");
        assert!(line.ends_with(b"\n"), "connection closed mid-frame: {line:?}");
        line.pop();
        let payload = String::from_utf8(line[1..].to_vec()).expect("utf-8 payload");
        (line[0], payload)
    }

    /// Read one frame and assert it is a presence count.
    async fn expect_conn_nb(&mut self, count: usize) {
        let (code, payload) = self.recv().await;
        assert_eq!(code, CONN_NB);
        assert_eq!(payload, format!("server:{count}"));
    }

    /// Assert that no frame arrives within a grace window.
    async fn expect_silence(&mut self) {
        let mut line = Vec::new();
        let read = timeout(
            Duration::from_millis(300),
            self.reader.read_until(b'\n', &mut line),
        )
        .await;
        assert!(read.is_err(), "unexpected frame: {line:?}");
    }
}

/// Give the relay time to run spawned delegate tasks.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

// ── Presence ─────────────────────────────────────────────────────

#[tokio::test]
async fn both_clients_receive_the_connection_count() {
    let delegate = Arc::new(RecordingDelegate::default());
    let addr = start_relay(delegate).await;

    let mut first = TestClient::connect(addr).await;
    first.expect_conn_nb(1).await;

    let mut second = TestClient::connect(addr).await;
    second.expect_conn_nb(2).await;
    first.expect_conn_nb(2).await;
}

#[tokio::test]
async fn disconnect_announces_the_new_count_to_survivors() {
    let delegate = Arc::new(RecordingDelegate::default());
    let addr = start_relay(delegate).await;

    let mut stayer = TestClient::connect(addr).await;
    stayer.expect_conn_nb(1).await;

    let mut leaver = TestClient::connect(addr).await;
    leaver.expect_conn_nb(2).await;
    stayer.expect_conn_nb(2).await;

    drop(leaver);
    stayer.expect_conn_nb(1).await;
}

#[tokio::test]
async fn empty_payload_frame_disconnects_the_sender() {
    let delegate = Arc::new(RecordingDelegate::default());
    let addr = start_relay(delegate).await;

    let mut stayer = TestClient::connect(addr).await;
    stayer.expect_conn_nb(1).await;

    let mut leaver = TestClient::connect(addr).await;
    leaver.expect_conn_nb(2).await;
    stayer.expect_conn_nb(2).await;

    // A command byte with nothing behind it is a deliberate hang-up.
    leaver.send_raw(b"\x01\n").await;
    stayer.expect_conn_nb(1).await;
}

#[tokio::test]
async fn bare_newline_disconnects_the_sender() {
    let delegate = Arc::new(RecordingDelegate::default());
    let addr = start_relay(delegate).await;

    let mut stayer = TestClient::connect(addr).await;
    stayer.expect_conn_nb(1).await;

    let mut leaver = TestClient::connect(addr).await;
    leaver.expect_conn_nb(2).await;
    stayer.expect_conn_nb(2).await;

    // An empty line has no command byte at all; same hang-up semantics.
    leaver.send_raw(b"\n").await;
    stayer.expect_conn_nb(1).await;
}

// ── Chat routing ─────────────────────────────────────────────────

#[tokio::test]
async fn chat_to_unbound_receiver_persists_but_writes_nothing() {
    let delegate = Arc::new(RecordingDelegate::default());
    let addr = start_relay(Arc::clone(&delegate)).await;

    let mut alice = TestClient::connect(addr).await;
    alice.expect_conn_nb(1).await;

    alice.send(MESSAGE, "alice:bob:hi").await;
    settle().await;

    assert_eq!(
        *delegate.messages.lock().unwrap(),
        vec![("alice".into(), "bob".into(), "hi".into(), None)]
    );
    alice.expect_silence().await;
}

#[tokio::test]
async fn unicast_reaches_exactly_the_bound_receiver() {
    let delegate = Arc::new(RecordingDelegate::default());
    let addr = start_relay(Arc::clone(&delegate)).await;

    let mut alice = TestClient::connect(addr).await;
    alice.expect_conn_nb(1).await;
    let mut bob = TestClient::connect(addr).await;
    bob.expect_conn_nb(2).await;
    alice.expect_conn_nb(2).await;
    let mut carol = TestClient::connect(addr).await;
    carol.expect_conn_nb(3).await;
    alice.expect_conn_nb(3).await;
    bob.expect_conn_nb(3).await;

    // Bob announces himself; the relay learns his binding and broadcasts
    // the frame to the other clients.
    bob.send(HELLO_WORLD, "bob:home:hello").await;
    assert_eq!(alice.recv().await, (HELLO_WORLD, "bob:home:hello".into()));
    assert_eq!(carol.recv().await, (HELLO_WORLD, "bob:home:hello".into()));

    alice.send(MESSAGE, "alice:bob:hi").await;
    assert_eq!(bob.recv().await, (MESSAGE, "alice:bob:hi".into()));
    carol.expect_silence().await;
    alice.expect_silence().await;
}

#[tokio::test]
async fn home_broadcast_excludes_the_sender() {
    let delegate = Arc::new(RecordingDelegate::default());
    let addr = start_relay(delegate).await;

    let mut alice = TestClient::connect(addr).await;
    alice.expect_conn_nb(1).await;
    let mut bob = TestClient::connect(addr).await;
    bob.expect_conn_nb(2).await;
    alice.expect_conn_nb(2).await;
    let mut carol = TestClient::connect(addr).await;
    carol.expect_conn_nb(3).await;
    alice.expect_conn_nb(3).await;
    bob.expect_conn_nb(3).await;

    alice.send(MESSAGE, "alice:home:hey everyone").await;
    assert_eq!(bob.recv().await, (MESSAGE, "alice:home:hey everyone".into()));
    assert_eq!(carol.recv().await, (MESSAGE, "alice:home:hey everyone".into()));
    alice.expect_silence().await;
}

#[tokio::test]
async fn disconnected_receiver_binding_goes_stale_silently() {
    let delegate = Arc::new(RecordingDelegate::default());
    let addr = start_relay(delegate).await;

    let mut alice = TestClient::connect(addr).await;
    alice.expect_conn_nb(1).await;
    let mut bob = TestClient::connect(addr).await;
    bob.expect_conn_nb(2).await;
    alice.expect_conn_nb(2).await;

    bob.send(HELLO_WORLD, "bob:home:hello").await;
    assert_eq!(alice.recv().await, (HELLO_WORLD, "bob:home:hello".into()));

    drop(bob);
    alice.expect_conn_nb(1).await;

    // Bob's binding was pruned on disconnect; the frame vanishes.
    alice.send(MESSAGE, "alice:bob:still there?").await;
    alice.expect_silence().await;
}

// ── Reactions ────────────────────────────────────────────────────

#[tokio::test]
async fn reaction_frame_updates_the_counter_once() {
    let delegate = Arc::new(RecordingDelegate::default());
    let addr = start_relay(Arc::clone(&delegate)).await;

    let mut alice = TestClient::connect(addr).await;
    alice.expect_conn_nb(1).await;

    alice.send(ADD_REACT, "alice:bob:42;3").await;
    settle().await;

    assert_eq!(
        *delegate.reactions.lock().unwrap(),
        vec![("42".into(), "3".into())]
    );
    assert!(delegate.messages.lock().unwrap().is_empty());
}

// ── Fault containment ────────────────────────────────────────────

#[tokio::test]
async fn malformed_frame_does_not_kill_the_connection() {
    let delegate = Arc::new(RecordingDelegate::default());
    let addr = start_relay(Arc::clone(&delegate)).await;

    let mut alice = TestClient::connect(addr).await;
    alice.expect_conn_nb(1).await;
    let mut bob = TestClient::connect(addr).await;
    bob.expect_conn_nb(2).await;
    alice.expect_conn_nb(2).await;

    // MESSAGE missing its body field: dropped with a warning, nothing more.
    alice.send(MESSAGE, "alice:bob").await;
    settle().await;
    assert!(delegate.messages.lock().unwrap().is_empty());

    // The same connection still routes fine afterwards.
    bob.send(HELLO_WORLD, "bob:home:hello").await;
    assert_eq!(alice.recv().await, (HELLO_WORLD, "bob:home:hello".into()));
    alice.send(MESSAGE, "alice:bob:recovered").await;
    assert_eq!(bob.recv().await, (MESSAGE, "alice:bob:recovered".into()));
}
