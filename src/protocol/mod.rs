//! JSON-RPC 2.0 protocol engine.
//!
//! This module implements the request/response/notification layer that sits
//! between the byte-stream transport and the application: message types and
//! demultiplexing rules, the ordered handler registry, and the engine that
//! correlates responses with outstanding requests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ProtocolEngine                         │
//! │                                                              │
//! │   ┌──────────────┐    ┌───────────────┐    ┌─────────────┐  │
//! │   │  Transport   │───▶│ Demultiplexer │───▶│  Handlers   │  │
//! │   │  (callback)  │    │ (by message   │    │ (first      │  │
//! │   └──────────────┘    │  shape)       │    │  match)     │  │
//! │                       └───────┬───────┘    └─────────────┘  │
//! │                               │                              │
//! │                               ▼                              │
//! │                       ┌───────────────┐                      │
//! │                       │ Pending table │──▶ wakes callers of  │
//! │                       │ (id → waiter) │    `send_request`    │
//! │                       └───────────────┘                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! Messages follow JSON-RPC 2.0; the MCP handshake targets protocol
//! version 2024-11-05.

pub mod engine;
pub mod handler;
pub mod message;

pub use engine::{ProtocolEngine, DEFAULT_REQUEST_TIMEOUT};
pub use handler::{HandlerRegistry, NotificationHandler, RequestHandler};
pub use message::{Message, RequestId, JSONRPC_VERSION, MCP_PROTOCOL_VERSION};
