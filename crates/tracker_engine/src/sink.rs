use tokio::sync::mpsc;

use crate::types::Delivery;

/// Where channels hand their normalized updates.
pub trait UpdateSink: Send + Sync {
    fn deliver(&self, delivery: Delivery);
}

pub struct ChannelUpdateSink {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl ChannelUpdateSink {
    pub fn new(tx: mpsc::UnboundedSender<Delivery>) -> Self {
        Self { tx }
    }
}

impl UpdateSink for ChannelUpdateSink {
    fn deliver(&self, delivery: Delivery) {
        // The session may already be gone; late deliveries are dropped.
        let _ = self.tx.send(delivery);
    }
}
