//! Operation ordering, the per-DID state machine and document resolution
//! for the Sidetree operation engine.
//!
//! [`processor::OperationProcessor`] is the entry point: given an
//! [`store::OperationStore`] and a [`registry::ProtocolRegistry`] it
//! resolves a DID suffix (or a short/long form DID) to a document plus
//! metadata. Resolution is synchronous and deterministic; resolving
//! different suffixes concurrently is safe as long as the store is
//! thread-safe.

pub mod applier;
pub mod error;
pub mod processor;
pub mod registry;
pub mod resolution;
pub mod store;

pub use applier::OperationApplier;
pub use error::Error;
pub use processor::OperationProcessor;
pub use registry::ProtocolRegistry;
pub use resolution::{
    DocumentMetadata, MethodMetadata, OperationReference, ResolutionModel, ResolutionOptions,
    ResolutionResult,
};
pub use store::{MemoryOperationStore, OperationStore};
