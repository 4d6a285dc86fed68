//! Per-delivery completion signalling.

use tokio::sync::oneshot;

/// Final disposition of one delivered message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Fully handled — remove the message from the queue.
    Ack,
    /// Not handled — redeliver later.
    Nack,
}

/// Completion handle bound to one specific delivery.
///
/// Exactly one of [`ack`](Self::ack) or [`nack`](Self::nack) should be
/// called. Dropping the handle unresolved counts as a nack: a handler that
/// dies mid-message must lead to redelivery, never to message loss.
pub struct Delivery {
    tx: Option<oneshot::Sender<Disposition>>,
}

impl Delivery {
    /// Create a delivery handle and the receiver its disposition arrives on.
    pub fn new() -> (Self, oneshot::Receiver<Disposition>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// The message was fully handled; remove it from the queue.
    pub fn ack(mut self) {
        self.resolve(Disposition::Ack);
    }

    /// The message was not handled; request redelivery.
    pub fn nack(mut self) {
        self.resolve(Disposition::Nack);
    }

    fn resolve(&mut self, disposition: Disposition) {
        if let Some(tx) = self.tx.take() {
            // The broker side may already be gone; nothing left to signal.
            let _ = tx.send(disposition);
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        self.resolve(Disposition::Nack);
    }
}
