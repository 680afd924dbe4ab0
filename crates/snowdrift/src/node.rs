use crate::{Error, MAX_NODE_ID, Result};

/// The operator-assigned identity of one running process.
///
/// Both components are validated at construction and fixed for the lifetime
/// of the engine; disjoint assignment across the fleet is what guarantees
/// global uniqueness of the generated IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIdentity {
    datacenter_id: u64,
    worker_id: u64,
}

impl NodeIdentity {
    /// Validates and builds a node identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if either component is outside
    /// `[1, MAX_NODE_ID]`.
    pub fn new(datacenter_id: u64, worker_id: u64) -> Result<Self> {
        if !(1..=MAX_NODE_ID).contains(&datacenter_id) {
            return Err(Error::Configuration {
                field: "datacenter_id",
                value: datacenter_id,
            });
        }
        if !(1..=MAX_NODE_ID).contains(&worker_id) {
            return Err(Error::Configuration {
                field: "worker_id",
                value: worker_id,
            });
        }
        Ok(Self {
            datacenter_id,
            worker_id,
        })
    }

    pub fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }
}
