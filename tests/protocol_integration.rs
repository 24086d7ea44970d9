//! Integration tests for the protocol engine over in-memory streams.
//!
//! These tests wire two real engines together (or one engine against a
//! scripted peer) and verify request/response correlation, dispatch
//! priority, framing interop and failure behaviour through the full
//! transport stack.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc;

use conduit_mcp::error::{RequestError, RpcError, TransportError};
use conduit_mcp::protocol::{NotificationHandler, ProtocolEngine, RequestHandler};
use conduit_mcp::transport::{Framing, StreamTransport};

const TEST_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Fixtures
// =============================================================================

/// Answers `echo` with its params.
struct EchoHandler;

#[async_trait]
impl RequestHandler for EchoHandler {
    fn can_handle(&self, method: &str) -> bool {
        method == "echo"
    }

    async fn handle_request(
        &self,
        _method: &str,
        params: Option<&Value>,
    ) -> Result<Value, RpcError> {
        Ok(params.cloned().unwrap_or(Value::Null))
    }
}

/// Answers every method with a fixed marker, for priority tests.
struct CatchAllHandler;

#[async_trait]
impl RequestHandler for CatchAllHandler {
    fn can_handle(&self, _method: &str) -> bool {
        true
    }

    async fn handle_request(
        &self,
        _method: &str,
        _params: Option<&Value>,
    ) -> Result<Value, RpcError> {
        Ok(json!("fallback"))
    }
}

/// Forwards every notification it sees into a channel.
struct NotificationProbe {
    tx: mpsc::UnboundedSender<(String, Option<Value>)>,
}

#[async_trait]
impl NotificationHandler for NotificationProbe {
    fn can_handle(&self, _method: &str) -> bool {
        true
    }

    async fn handle_notification(
        &self,
        method: &str,
        params: Option<&Value>,
    ) -> Result<(), RpcError> {
        let _ = self.tx.send((method.to_string(), params.cloned()));
        Ok(())
    }
}

/// Two connected engines over one in-memory pipe, read loops running.
async fn engine_pair(framing: Framing) -> (Arc<ProtocolEngine>, Arc<ProtocolEngine>) {
    let (near_end, far_end) = tokio::io::duplex(16 * 1024);
    let (near_read, near_write) = tokio::io::split(near_end);
    let (far_read, far_write) = tokio::io::split(far_end);

    let near =
        ProtocolEngine::new(Arc::new(StreamTransport::new(near_read, near_write, framing))).await;
    let far =
        ProtocolEngine::new(Arc::new(StreamTransport::new(far_read, far_write, framing))).await;

    near.connect().unwrap();
    far.connect().unwrap();
    for engine in [&near, &far] {
        let engine = Arc::clone(engine);
        tokio::spawn(async move { engine.run().await });
    }

    (near, far)
}

/// One engine against a raw scripted peer.
async fn scripted_engine() -> (Arc<ProtocolEngine>, DuplexStream) {
    let (engine_end, peer_end) = tokio::io::duplex(16 * 1024);
    let (read, write) = tokio::io::split(engine_end);
    let engine =
        ProtocolEngine::new(Arc::new(StreamTransport::new(read, write, Framing::Newline))).await;
    engine.connect().unwrap();
    (engine, peer_end)
}

// =============================================================================
// Request/Response Round Trips
// =============================================================================

#[tokio::test]
async fn test_request_round_trip_between_engines() {
    let (client, server) = engine_pair(Framing::Newline).await;
    server.register_request_handler(Arc::new(EchoHandler)).await;

    let result = client
        .send_request("echo", Some(json!({ "value": 7 })), TEST_TIMEOUT)
        .await
        .unwrap();

    assert_eq!(result, json!({ "value": 7 }));
}

#[tokio::test]
async fn test_both_peers_can_call_each_other() {
    let (near, far) = engine_pair(Framing::Newline).await;
    near.register_request_handler(Arc::new(EchoHandler)).await;
    far.register_request_handler(Arc::new(EchoHandler)).await;

    // Either side of the connection may issue requests; fire both ways
    // at once over the single pipe.
    let (from_near, from_far) = tokio::join!(
        near.send_request("echo", Some(json!("near calling")), TEST_TIMEOUT),
        far.send_request("echo", Some(json!("far calling")), TEST_TIMEOUT),
    );

    assert_eq!(from_near.unwrap(), json!("near calling"));
    assert_eq!(from_far.unwrap(), json!("far calling"));
}

#[tokio::test]
async fn test_content_length_framing_interop() {
    let (client, server) = engine_pair(Framing::ContentLength).await;
    server.register_request_handler(Arc::new(EchoHandler)).await;

    let result = client
        .send_request(
            "echo",
            Some(json!({ "framed": "with headers" })),
            TEST_TIMEOUT,
        )
        .await
        .unwrap();

    assert_eq!(result, json!({ "framed": "with headers" }));
}

#[tokio::test]
async fn test_unknown_method_is_answered_with_method_not_found() {
    let (client, _server) = engine_pair(Framing::Newline).await;

    let error = match client.send_request("no/such", None, TEST_TIMEOUT).await {
        Err(RequestError::Rpc(error)) => error,
        other => panic!("expected an RPC error, got {other:?}"),
    };

    assert_eq!(error.code, RpcError::METHOD_NOT_FOUND);
    assert_eq!(error.message, "Method not found: no/such");
}

#[tokio::test]
async fn test_handler_registration_order_decides_dispatch() {
    let (client, server) = engine_pair(Framing::Newline).await;
    server.register_request_handler(Arc::new(EchoHandler)).await;
    server.register_request_handler(Arc::new(CatchAllHandler)).await;

    // The specific handler was registered first, so it wins for its
    // method; everything else falls through to the catch-all.
    let echoed = client
        .send_request("echo", Some(json!("mine")), TEST_TIMEOUT)
        .await
        .unwrap();
    let other = client
        .send_request("anything/else", None, TEST_TIMEOUT)
        .await
        .unwrap();

    assert_eq!(echoed, json!("mine"));
    assert_eq!(other, json!("fallback"));
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_notification_reaches_the_peer_without_a_reply() {
    let (client, server) = engine_pair(Framing::Newline).await;
    server.register_request_handler(Arc::new(EchoHandler)).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    server
        .register_notification_handler(Arc::new(NotificationProbe { tx }))
        .await;

    client
        .send_notification("progress", Some(json!({ "done": 3 })))
        .await
        .unwrap();
    // A follow-up request proves the notification produced no response
    // of its own: the next frame the client sees answers this request.
    let result = client
        .send_request("echo", Some(json!("after")), TEST_TIMEOUT)
        .await
        .unwrap();

    assert_eq!(result, json!("after"));
    let (method, params) = rx.recv().await.unwrap();
    assert_eq!(method, "progress");
    assert_eq!(params, Some(json!({ "done": 3 })));
}

// =============================================================================
// Failure Behaviour
// =============================================================================

#[tokio::test]
async fn test_request_times_out_without_an_answer() {
    // The peer end stays open but never reads or answers.
    let (engine, _peer) = scripted_engine().await;

    let error = engine
        .send_request("void", None, Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(error, RequestError::Timeout { .. }));
}

#[tokio::test]
async fn test_peer_disconnect_fails_pending_requests() {
    let (engine, peer) = scripted_engine().await;
    let run = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.run().await }
    });

    let call = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.send_request("void", None, TEST_TIMEOUT).await }
    });
    // Let the request hit the wire, then vanish.
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(peer);

    let error = call.await.unwrap().unwrap_err();
    assert!(matches!(error, RequestError::Closed));

    // EOF is an orderly shutdown for the read loop.
    assert!(run.await.unwrap().is_ok());
    assert!(!engine.is_connected());
}

#[tokio::test]
async fn test_wrong_version_gets_an_invalid_request_response() {
    let (engine, peer) = scripted_engine().await;
    tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.run().await }
    });
    let (peer_read, mut peer_write) = tokio::io::split(peer);
    let mut peer_lines = BufReader::new(peer_read);

    peer_write
        .write_all(b"{\"jsonrpc\":\"1.0\",\"id\":9,\"method\":\"x\"}\n")
        .await
        .unwrap();

    let mut line = String::new();
    peer_lines.read_line(&mut line).await.unwrap();
    let response: Value = serde_json::from_str(line.trim_end()).unwrap();

    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 9);
    assert_eq!(response["error"]["code"], RpcError::INVALID_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_fatal_for_the_connection() {
    let (engine, peer) = scripted_engine().await;
    let run = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.run().await }
    });
    let (_peer_read, mut peer_write) = tokio::io::split(peer);

    peer_write.write_all(b"this is not json\n").await.unwrap();

    let result = run.await.unwrap();
    assert!(matches!(result, Err(TransportError::Frame(_))));
    assert!(!engine.is_connected());
}
