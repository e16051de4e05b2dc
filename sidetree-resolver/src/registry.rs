//! Lookup of protocol parameters by anchoring time.

use crate::error::Error;
use sidetree_operations::Protocol;

/// An ordered set of protocol records. `get` returns the record with the
/// highest genesis time at or before the requested anchoring time, so
/// historical operations are validated under the rules of their epoch.
#[derive(Debug, Clone)]
pub struct ProtocolRegistry {
    versions: Vec<Protocol>,
}

impl ProtocolRegistry {
    pub fn new(mut versions: Vec<Protocol>) -> Self {
        versions.sort_by_key(|protocol| protocol.genesis_time);
        ProtocolRegistry { versions }
    }

    /// Parameters in force at `transaction_time`.
    pub fn get(&self, transaction_time: u64) -> Result<&Protocol, Error> {
        self.versions
            .iter()
            .rev()
            .find(|protocol| protocol.genesis_time <= transaction_time)
            .ok_or(Error::ProtocolParametersNotDefined(transaction_time))
    }

    /// The latest known parameters.
    pub fn current(&self) -> Result<&Protocol, Error> {
        self.versions
            .last()
            .ok_or(Error::ProtocolParametersNotDefined(u64::MAX))
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        ProtocolRegistry::new(vec![Protocol::default()])
    }
}
