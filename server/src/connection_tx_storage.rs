use crate::connection::ConnectionEvent;
use protocol::{ConnectionId, Envelope};
use std::collections::HashMap;

pub type ConnectionTx = tokio::sync::mpsc::UnboundedSender<ConnectionEvent>;

struct ConnectionEntry {
    tx: ConnectionTx,
    closing: bool,
}

/// Egress channels of live connections. One channel per connection keeps
/// delivery to each recipient in send order.
pub struct ConnectionTxStorage {
    connection_txs: HashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_txs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.connection_txs
            .insert(connection_id, ConnectionEntry { tx, closing: false });
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<ConnectionTx> {
        self.connection_txs.remove(connection_id).map(|e| e.tx)
    }

    pub fn is_open(&self, connection_id: &ConnectionId) -> bool {
        self.connection_txs
            .get(connection_id)
            .map_or(false, |e| !e.closing)
    }

    pub fn len(&self) -> usize {
        self.connection_txs.len()
    }

    /// Recipients may have gone away mid-relay; that is not an error.
    pub fn send(&self, to: &ConnectionId, envelope: Envelope) {
        match self.connection_txs.get(to) {
            Some(entry) if !entry.closing => {
                if entry.tx.send(ConnectionEvent::Message(envelope)).is_err() {
                    log::debug!("Connection {} is gone, dropping message", to);
                }
            }
            _ => log::debug!("No open connection {}, dropping message", to),
        }
    }

    /// Asks the connection to close. Whatever it still has queued towards the
    /// server is ignored from here on.
    pub fn close(&mut self, connection_id: &ConnectionId, code: u16) {
        if let Some(entry) = self.connection_txs.get_mut(connection_id) {
            if entry.closing {
                return;
            }
            entry.closing = true;
            if entry.tx.send(ConnectionEvent::Close { code }).is_err() {
                log::debug!("Connection {} is gone, dropping close {}", connection_id, code);
            }
        }
    }
}
