//! Byte-stream transport for framed JSON messages.
//!
//! [`StreamTransport`] owns exactly one duplex connection, taken as boxed
//! reader/writer halves at construction. The process talks to a single peer:
//!
//! - stdin/stdout for the usual MCP stdio setup ([`StreamTransport::stdio`])
//! - any other `AsyncRead`/`AsyncWrite` pair, such as `tokio::io::duplex`
//!   pipes in tests
//!
//! Inbound bytes are decoded by the frame codec; every decoded message is
//! fanned out to all registered callbacks in registration order. Messages
//! must not contain embedded newlines when newline framing is active; the
//! codec's compact JSON guarantees this.
//!
//! # Thread Safety
//!
//! Reading is serialised by an async mutex on the read half, writing by one
//! on the write half, so sends interleave safely with the read loop. Each
//! decoded message is dispatched through all callbacks to completion before
//! the next frame is decoded, which keeps delivery strictly in stream order.

pub mod codec;

use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{watch, Mutex, RwLock};

use crate::error::TransportError;

pub use codec::{FrameCodec, Framing};

/// Bytes requested from the stream per read.
const READ_CHUNK_SIZE: usize = 4096;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type MessageCallback = Box<dyn Fn(Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Read half of the connection: the raw stream plus its decode buffer.
struct ReadState {
    stream: BoxedReader,
    codec: FrameCodec,
}

/// A transport for framed JSON messages over one byte-stream connection.
///
/// The transport starts disconnected; [`connect`](Self::connect) makes it
/// live. [`disconnect`](Self::disconnect) is terminal: the stream halves are
/// dropped and the transport cannot be connected again.
pub struct StreamTransport {
    encoder: FrameCodec,
    reader: Mutex<Option<ReadState>>,
    writer: Mutex<Option<BoxedWriter>>,
    connected: AtomicBool,
    /// Flips to `true` exactly once, on disconnect or stream end.
    shutdown: watch::Sender<bool>,
    callbacks: RwLock<Vec<MessageCallback>>,
}

impl StreamTransport {
    /// Creates a transport over an arbitrary reader/writer pair.
    ///
    /// The transport starts disconnected.
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
        framing: Framing,
    ) -> Self {
        Self {
            encoder: FrameCodec::new(framing),
            reader: Mutex::new(Some(ReadState {
                stream: Box::new(reader),
                codec: FrameCodec::new(framing),
            })),
            writer: Mutex::new(Some(Box::new(writer))),
            connected: AtomicBool::new(false),
            shutdown: watch::Sender::new(false),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    /// Creates a transport over this process's stdin and stdout.
    ///
    /// stderr stays free for logging.
    #[must_use]
    pub fn stdio(framing: Framing) -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout(), framing)
    }

    /// The framing this transport uses.
    #[must_use]
    pub const fn framing(&self) -> Framing {
        self.encoder.framing()
    }

    /// Whether the transport is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Marks the transport as connected. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the transport has already been
    /// disconnected; a transport carries one logical connection and cannot
    /// be reconnected.
    pub fn connect(&self) -> Result<(), TransportError> {
        if *self.shutdown.borrow() {
            return Err(TransportError::Closed);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Disconnects and drops both stream halves. Idempotent.
    ///
    /// Buffered partial frames are discarded with the read half. A read
    /// loop parked on the stream is woken and returns cleanly. Dropping the
    /// write half signals end-of-stream to the peer.
    pub async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.shutdown.send_replace(true);
        *self.reader.lock().await = None;
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            // Best effort: flush what the peer can still consume.
            let _ = writer.shutdown().await;
        }
    }

    /// Registers a callback invoked once for every inbound message.
    ///
    /// Callbacks are invoked in registration order, each awaited to
    /// completion, for every message decoded from the stream.
    pub async fn on_message<F>(&self, callback: F)
    where
        F: Fn(Value) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.callbacks.write().await.push(Box::new(callback));
    }

    /// Serialises, frames, writes and flushes one message.
    ///
    /// The message is fully flushed before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] before [`connect`]
    /// (Self::connect), [`TransportError::Closed`] after disconnect, and
    /// I/O or serialisation errors from the write path.
    pub async fn send<M: Serialize>(&self, message: &M) -> Result<(), TransportError> {
        if *self.shutdown.borrow() {
            return Err(TransportError::Closed);
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let frame = self.encoder.encode(message)?;

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::Closed)?;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Reads once from the stream and dispatches every decoded message.
    ///
    /// Blocks until bytes arrive, the stream ends, or the transport is
    /// disconnected. Returns the number of messages dispatched; a read that
    /// completes only a partial frame dispatches zero.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] on end-of-stream or disconnect,
    /// and decode/I/O errors otherwise. Decode errors are terminal: the
    /// framing cannot be trusted afterwards.
    pub async fn poll_once(&self) -> Result<usize, TransportError> {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return Err(TransportError::Closed);
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }

        let mut guard = self.reader.lock().await;
        let state = guard.as_mut().ok_or(TransportError::Closed)?;

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let read = tokio::select! {
            result = state.stream.read(&mut chunk) => result?,
            _ = shutdown.changed() => return Err(TransportError::Closed),
        };
        if read == 0 {
            // End of stream: the peer is gone.
            self.connected.store(false, Ordering::SeqCst);
            self.shutdown.send_replace(true);
            return Err(TransportError::Closed);
        }
        state.codec.append(&chunk[..read]);

        let mut dispatched = 0;
        loop {
            let message = match state.codec.try_read_message() {
                Ok(Some(message)) => message,
                Ok(None) => break,
                Err(error) => {
                    self.connected.store(false, Ordering::SeqCst);
                    self.shutdown.send_replace(true);
                    return Err(error.into());
                }
            };
            self.fan_out(message).await;
            dispatched += 1;
        }
        Ok(dispatched)
    }

    /// Polls the stream until it ends or the transport is disconnected.
    ///
    /// A clean end (peer end-of-stream or local disconnect) returns
    /// `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns decode or I/O errors; both leave the transport disconnected.
    pub async fn read_loop(&self) -> Result<(), TransportError> {
        loop {
            match self.poll_once().await {
                Ok(_) => {}
                Err(TransportError::Closed) => return Ok(()),
                Err(error) => return Err(error),
            }
        }
    }

    /// Invokes every callback for one message, in registration order.
    async fn fan_out(&self, message: Value) {
        let futures: Vec<_> = self
            .callbacks
            .read()
            .await
            .iter()
            .map(|callback| callback(message.clone()))
            .collect();
        for future in futures {
            future.await;
        }
    }
}

impl std::fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("framing", &self.framing())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
