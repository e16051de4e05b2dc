//! The operation store boundary.

use sidetree_operations::AnchoredOperation;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Source of anchored operations for a DID suffix.
///
/// Implementations return operations in any order; the processor sorts.
/// Store failures propagate to the resolution caller unchanged.
pub trait OperationStore {
    fn get(&self, unique_suffix: &str) -> anyhow::Result<Vec<AnchoredOperation>>;
}

impl<T: OperationStore + ?Sized> OperationStore for &T {
    fn get(&self, unique_suffix: &str) -> anyhow::Result<Vec<AnchoredOperation>> {
        (**self).get(unique_suffix)
    }
}

impl<T: OperationStore + ?Sized> OperationStore for Arc<T> {
    fn get(&self, unique_suffix: &str) -> anyhow::Result<Vec<AnchoredOperation>> {
        (**self).get(unique_suffix)
    }
}

/// Thread-safe in-memory operation store.
#[derive(Debug, Default)]
pub struct MemoryOperationStore {
    operations: RwLock<HashMap<String, Vec<AnchoredOperation>>>,
}

impl MemoryOperationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an anchored operation under its suffix.
    pub fn put(&self, operation: AnchoredOperation) {
        let mut operations = self
            .operations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        operations
            .entry(operation.unique_suffix.clone())
            .or_default()
            .push(operation);
    }
}

impl OperationStore for MemoryOperationStore {
    fn get(&self, unique_suffix: &str) -> anyhow::Result<Vec<AnchoredOperation>> {
        let operations = self
            .operations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(operations.get(unique_suffix).cloned().unwrap_or_default())
    }
}
