//! Error types for conduit-mcp.
//!
//! Errors are layered the same way the crate is: frame decoding errors are
//! wrapped by transport errors, which are wrapped by request errors. The
//! [`RpcError`] type is both an error and a wire object: handlers return it,
//! and it serialises directly into the JSON-RPC `error` member.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while decoding frames from the byte stream.
#[derive(Error, Debug)]
pub enum FrameDecodeError {
    /// A complete header block arrived without a usable `Content-Length`.
    #[error("invalid frame header: {header}")]
    Header {
        /// The offending header block.
        header: String,
    },

    /// A complete frame body was not valid JSON.
    #[error("invalid JSON in frame")]
    Json {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur on the stream transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// An operation required a live connection but the transport is not
    /// connected.
    #[error("transport is not connected")]
    NotConnected,

    /// The connection has been closed, either locally or by the peer.
    #[error("connection closed")]
    Closed,

    /// The inbound byte stream could not be decoded into messages.
    #[error("frame decoding failed")]
    Frame(#[from] FrameDecodeError),

    /// An I/O error on the underlying stream.
    #[error("transport I/O error")]
    Io(#[from] std::io::Error),

    /// An outbound message could not be serialised.
    #[error("failed to serialise outbound message")]
    Serialize(#[from] serde_json::Error),
}

/// Errors surfaced to callers of `ProtocolEngine::send_request`.
#[derive(Error, Debug)]
pub enum RequestError {
    /// The request could not be sent or the transport failed underneath it.
    #[error("transport failure")]
    Transport(#[from] TransportError),

    /// No response arrived within the allowed time. The pending entry is
    /// removed, so a late response is ignored.
    #[error("request {method:?} timed out after {timeout:?}")]
    Timeout {
        /// Method name of the timed-out request.
        method: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The connection closed while the request was still outstanding.
    #[error("connection closed before a response arrived")]
    Closed,

    /// The peer answered with a JSON-RPC error object.
    #[error("peer returned an error")]
    Rpc(#[from] RpcError),
}

/// A JSON-RPC 2.0 error object.
///
/// Doubles as the error type returned by request handlers: the engine
/// serialises it verbatim into the response, so application codes such as
/// [`RpcError::RESOURCE_NOT_FOUND`] reach the peer unchanged.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("JSON-RPC error {code}: {message}")]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail, echoed to the peer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i64 = -32700;
    /// The message is not a valid request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// The method does not exist or is not available.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Generic application failure (start of the implementation-defined
    /// range).
    pub const APPLICATION_ERROR: i64 = -32000;
    /// The referenced resource does not exist.
    pub const RESOURCE_NOT_FOUND: i64 = -32002;

    /// Creates an error with an arbitrary code.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches structured detail to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Invalid JSON (code -32700).
    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(Self::PARSE_ERROR, message)
    }

    /// Malformed request object (code -32600).
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_REQUEST, message)
    }

    /// Unknown method (code -32601).
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    /// Invalid parameters (code -32602).
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message)
    }

    /// Internal error (code -32603).
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL_ERROR, message)
    }

    /// Generic application failure (code -32000).
    #[must_use]
    pub fn application(message: impl Into<String>) -> Self {
        Self::new(Self::APPLICATION_ERROR, message)
    }

    /// Missing resource (code -32002), carrying the URI as structured data.
    #[must_use]
    pub fn resource_not_found(uri: &str) -> Self {
        Self::new(Self::RESOURCE_NOT_FOUND, format!("Resource not found: {uri}"))
            .with_data(serde_json::json!({ "uri": uri }))
    }
}

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_error_display() {
        let error = RpcError::method_not_found("tools/destroy");
        let msg = error.to_string();
        assert!(msg.contains("-32601"));
        assert!(msg.contains("tools/destroy"));
    }

    #[test]
    fn rpc_error_serialises_without_null_data() {
        let error = RpcError::invalid_params("missing 'uri'");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], -32602);
        assert_eq!(json["message"], "missing 'uri'");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn resource_not_found_carries_uri_data() {
        let error = RpcError::resource_not_found("memo://missing");
        assert_eq!(error.code, RpcError::RESOURCE_NOT_FOUND);
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["data"]["uri"], "memo://missing");
    }

    #[test]
    fn rpc_error_round_trips() {
        let wire = serde_json::json!({
            "code": -32000,
            "message": "tool exploded",
            "data": { "tool": "say-hello" }
        });
        let error: RpcError = serde_json::from_value(wire).unwrap();
        assert_eq!(error.code, RpcError::APPLICATION_ERROR);
        assert_eq!(error.data.unwrap()["tool"], "say-hello");
    }

    #[test]
    fn frame_error_wraps_into_transport_error() {
        let frame = FrameDecodeError::Header {
            header: "X-Nope: 3".to_string(),
        };
        let error = TransportError::from(frame);
        assert!(matches!(error, TransportError::Frame(_)));
    }

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }
}
