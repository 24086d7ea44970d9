//! JSON-RPC 2.0 message types.
//!
//! All traffic on the wire is one of four message shapes, told apart by
//! which members are present:
//!
//! - **Request**: has `method` and `id`; expects exactly one response
//! - **Notification**: has `method` but no `id`; never answered
//! - **Response**: has `id` and `result`
//! - **Error response**: has `id` and `error`
//!
//! Outbound messages are typed structs serialised with serde. Inbound
//! messages arrive as decoded [`Value`]s from the frame codec and are
//! classified into [`Message`] by field inspection, because a malformed
//! message must still yield the `id` (when present) so it can be answered
//! with an error.
//!
//! # Constraints
//!
//! - Request IDs are strings or integers, never `null`
//! - IDs are matched exactly: the number `1` and the string `"1"` are
//!   different IDs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

/// The JSON-RPC protocol version tag carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// The MCP protocol version this implementation targets.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// A JSON-RPC 2.0 request ID.
///
/// IDs must be strings or integers, never `null`. Used as the key of the
/// pending-request table, so it is hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// An outbound JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// Unique request identifier, echoed back in the response.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a new outbound request.
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }
}

/// An outbound JSON-RPC 2.0 notification.
///
/// Notifications carry no ID and are never answered.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Creates a new outbound notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this error corresponds to.
    pub id: RequestId,

    /// The error details, serialised verbatim.
    pub error: RpcError,
}

impl JsonRpcErrorResponse {
    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // RpcError contains String
    pub fn new(id: RequestId, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error,
        }
    }
}

/// An inbound message classified by its members.
///
/// Classification happens before any handler sees the message, in the
/// order mandated by JSON-RPC: protocol version first, then response
/// members, then `method`. A message carrying both `result` and `method`
/// is therefore treated as a response.
#[derive(Debug, Clone)]
pub enum Message {
    /// A call expecting exactly one response.
    Request {
        /// Identifier to echo back.
        id: RequestId,
        /// Method name.
        method: String,
        /// Optional parameters.
        params: Option<Value>,
    },
    /// A one-way call.
    Notification {
        /// Method name.
        method: String,
        /// Optional parameters.
        params: Option<Value>,
    },
    /// A successful reply to one of our requests.
    Response {
        /// Identifier of the request being answered, when decodable.
        id: Option<RequestId>,
        /// The result value (may be `null`).
        result: Value,
    },
    /// An error reply to one of our requests.
    Error {
        /// Identifier of the request being answered, when decodable.
        id: Option<RequestId>,
        /// The error object sent by the peer.
        error: RpcError,
    },
    /// Anything that is not a valid JSON-RPC 2.0 message. Carries the `id`
    /// when one could be decoded, so the peer can be told.
    Invalid {
        /// Identifier found on the malformed message, if any.
        id: Option<RequestId>,
    },
}

impl Message {
    /// Classifies a decoded JSON value into a message.
    ///
    /// Never fails: everything unrecognisable becomes [`Message::Invalid`].
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::Invalid { id: None };
        };

        let id = fields.remove("id").and_then(decode_id);

        let version_ok =
            fields.get("jsonrpc").and_then(Value::as_str) == Some(JSONRPC_VERSION);
        if !version_ok {
            return Self::Invalid { id };
        }

        // Response members take precedence over `method`.
        if let Some(result) = fields.remove("result") {
            return Self::Response { id, result };
        }
        if let Some(error) = fields.remove("error") {
            let error = serde_json::from_value(error)
                .unwrap_or_else(|_| RpcError::internal("malformed error object"));
            return Self::Error { id, error };
        }

        match fields.remove("method") {
            Some(Value::String(method)) => {
                let params = fields.remove("params");
                match id {
                    Some(id) => Self::Request { id, method, params },
                    None => Self::Notification { method, params },
                }
            }
            _ => Self::Invalid { id },
        }
    }

    /// Returns the method name for requests and notifications.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request { method, .. } | Self::Notification { method, .. } => Some(method),
            _ => None,
        }
    }

    /// Returns the request ID when one was decoded.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request { id, .. } => Some(id),
            Self::Response { id, .. } | Self::Error { id, .. } | Self::Invalid { id } => {
                id.as_ref()
            }
            Self::Notification { .. } => None,
        }
    }
}

/// Decodes an `id` member into a typed ID.
///
/// `null`, floating-point and other non-conforming IDs decode to `None`.
fn decode_id(value: Value) -> Option<RequestId> {
    match value {
        Value::Number(n) => n.as_i64().map(RequestId::Number),
        Value::String(s) => Some(RequestId::String(s)),
        _ => None,
    }
}
