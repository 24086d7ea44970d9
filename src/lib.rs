//! conduit-mcp: JSON-RPC 2.0 protocol engine and MCP server core
//!
//! This library speaks JSON-RPC 2.0 over byte streams and builds an MCP
//! server on top: initialisation handshake, tools and subscribable
//! resources. Hosts embed it, register their own tools and resource
//! providers, and drive it over stdio or any other byte stream.
//!
//! # Architecture
//!
//! Messages flow through three layers:
//!
//! - **Transport**: frames bytes into JSON values and back. Two framings
//!   are supported: newline-delimited and `Content-Length` headers
//! - **Protocol engine**: demultiplexes inbound messages, matches
//!   responses to pending requests by id, and dispatches requests and
//!   notifications to registered handlers (first acceptor wins)
//! - **Server**: the MCP lifecycle plus the resource and tool features,
//!   each an ordinary set of handlers
//!
//! Both peers are symmetric at the engine level: either side may send
//! requests and notifications at any time over one connection.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`protocol`] — Message model, engine and handler registry
//! - [`resources`] — Resource provider trait and in-memory store
//! - [`server`] — MCP lifecycle and feature wiring
//! - [`tools`] — Tool trait, registry and request handlers
//! - [`transport`] — Stream transport and wire framing

pub mod config;
pub mod error;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;

pub use error::{ConfigError, FrameDecodeError, RequestError, RpcError, TransportError};
pub use protocol::{Message, ProtocolEngine, RequestId};
pub use server::{McpServer, ServerCapabilities, ServerInfo};
pub use transport::{Framing, StreamTransport};
