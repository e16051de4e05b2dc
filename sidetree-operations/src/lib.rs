//! Operation models, parser, patch language and commitment scheme for the
//! Sidetree operation engine.
//!
//! This crate covers everything between raw request bytes and a parsed,
//! structurally validated [`model::Operation`]: the wire models, the typed
//! patch language with its validators and document transformations, the
//! public key commitment scheme, and the protocol-parameterized operation
//! parser including long-form DID handling. Applying operations to a
//! resolution state is the resolver's concern.

pub mod commitment;
pub mod composer;
pub mod document;
pub mod error;
pub mod model;
pub mod parser;
pub mod patch;
pub mod protocol;
pub mod request;

pub use error::{Error, ErrorKind};
pub use model::{
    AnchoredOperation, CreateRequest, DeactivateRequest, DeactivateSignedDataModel, DeltaModel,
    Operation, OperationType, RecoverRequest, RecoverSignedDataModel, SuffixDataModel,
    UpdateRequest, UpdateSignedDataModel,
};
pub use parser::{long_form_did, OperationParser};
pub use patch::Patch;
pub use protocol::Protocol;
pub use request::Signer;
