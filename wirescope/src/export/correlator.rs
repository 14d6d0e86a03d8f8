//! Connection id → correlation uuid lookup

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::ConnId;

/// External source of connection identities
///
/// The exporters only consume identities; they never create or retire them.
pub trait Correlator: Send + Sync {
    /// Uuid currently assigned to a kernel connection id
    fn uuid_for(&self, conn_id: ConnId) -> Option<String>;

    /// Whether any live connection still carries `uuid`
    fn is_live(&self, uuid: &str) -> bool;
}

/// In-memory [`Correlator`] fed by explicit open/close notifications
#[derive(Debug, Default)]
pub struct ConnectionTable {
    connections: RwLock<HashMap<ConnId, String>>,
}

impl ConnectionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `uuid` to `conn_id`, replacing any previous assignment
    pub fn insert(&self, conn_id: ConnId, uuid: impl Into<String>) {
        self.connections.write().insert(conn_id, uuid.into());
    }

    /// Forget a connection; returns its uuid if it was known
    pub fn remove(&self, conn_id: ConnId) -> Option<String> {
        self.connections.write().remove(&conn_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}

impl Correlator for ConnectionTable {
    fn uuid_for(&self, conn_id: ConnId) -> Option<String> {
        self.connections.read().get(&conn_id).cloned()
    }

    fn is_live(&self, uuid: &str) -> bool {
        self.connections.read().values().any(|u| u == uuid)
    }
}
