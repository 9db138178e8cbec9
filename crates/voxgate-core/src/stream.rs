use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::ids::TurnId;
use crate::wire::StreamFrame;

/// The emission side of a streaming response, handed to agent handlers.
///
/// Frames are enqueued onto an unbounded channel whose consumer is the HTTP
/// response body. `end` is idempotent: the first call emits the terminal
/// `response.end` frame followed by the empty sentinel chunk that stops the
/// consumer; later calls (and any emission after close) are silently dropped.
#[derive(Clone)]
pub struct StreamHandle {
    turn_id: TurnId,
    tx: mpsc::UnboundedSender<Bytes>,
    closed: Arc<AtomicBool>,
}

impl StreamHandle {
    pub fn new(turn_id: TurnId, tx: mpsc::UnboundedSender<Bytes>) -> Self {
        Self {
            turn_id,
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a handle together with the receiving end of its channel.
    pub fn channel(turn_id: TurnId) -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(turn_id, tx), rx)
    }

    pub fn turn_id(&self) -> &TurnId {
        &self.turn_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Emit a speech fragment.
    pub fn tts(&self, content: impl Into<String>) {
        self.emit(StreamFrame::tts(self.turn_id.clone(), content.into()));
    }

    /// Emit an out-of-band structured payload (tool results, progress,
    /// diagnostics).
    pub fn data(&self, content: Value) {
        self.emit(StreamFrame::data(self.turn_id.clone(), content));
    }

    /// Emit the terminal frame and close the stream. Idempotent.
    pub fn end(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let frame = StreamFrame::end(self.turn_id.clone());
        let _ = self.tx.send(frame.to_sse());
        // Empty chunk is the consumer's stop sentinel.
        let _ = self.tx.send(Bytes::new());
    }

    fn emit(&self, frame: StreamFrame) {
        if self.is_closed() {
            return;
        }
        // A send error means the consumer is gone; nothing useful to do.
        let _ = self.tx.send(frame.to_sse());
    }
}
