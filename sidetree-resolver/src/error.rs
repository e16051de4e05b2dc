//! Error types for `sidetree-resolver` crate
use sidetree_operations::ErrorKind;
use thiserror::Error;

/// Error type for `sidetree-resolver`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No create operation exists for the suffix
    #[error("create operation not found")]
    CreateOperationNotFound,
    /// Create operations exist but none applied cleanly
    #[error("valid create operation not found")]
    ValidCreateOperationNotFound,
    /// Requested version id does not reference a known operation
    #[error("'{0}' is not a valid versionId")]
    InvalidVersionId(String),
    /// Requested version time is not a valid RFC 3339 instant
    #[error("failed to parse version time[{0}]")]
    InvalidVersionTime(String),
    /// No operations were anchored at or before the requested time
    #[error("no operations found for version time {0}")]
    NoOperationsForVersionTime(String),
    /// No protocol record covers the operation's anchoring time
    #[error("protocol parameters are not defined for anchoring time {0}")]
    ProtocolParametersNotDefined(u64),
    /// Create applied to an already-initialized resolution state
    #[error("create has to be the first operation")]
    CreateNotFirst,
    /// Update applied before any create
    #[error("update cannot be first operation")]
    UpdateWithoutDocument,
    /// Recover applied before any create
    #[error("recover can only be applied to an existing document")]
    RecoverWithoutDocument,
    /// Deactivate applied before any create
    #[error("deactivate can only be applied to an existing document")]
    DeactivateWithoutDocument,
    /// Operation applied after a successful deactivate
    #[error("document has been deactivated, no further operations are accepted")]
    DocumentDeactivated,
    /// Reveal value does not hash to the expected commitment
    #[error("commitment generated from reveal value doesn't match {0} commitment")]
    CommitmentMismatch(&'static str),
    /// Next commitment equals the current one
    #[error("re-using public keys for commitment is not allowed")]
    CommitmentReuse,
    /// Operation anchored outside its signed anchoring window
    #[error("operation anchored at {anchored} outside signed anchoring window [{from}, {until}]")]
    AnchorTimeOutOfRange { anchored: u64, from: i64, until: i64 },
    /// Operation does not belong to the expected DID suffix
    #[error("DID suffix mismatch. Expected: '{expected}', but found '{actual}'")]
    DidSuffixMismatch { expected: String, actual: String },
    /// Error from operation parsing or validation
    #[error(transparent)]
    Operation(#[from] sidetree_operations::Error),
    /// Error from hashing/encoding primitives
    #[error(transparent)]
    Hashing(#[from] sidetree_hashing::Error),
    /// Error reported by the operation store
    #[error("operation store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl Error {
    /// Map the error onto the coarse taxonomy shared with
    /// `sidetree-operations`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CreateOperationNotFound
            | Error::ValidCreateOperationNotFound
            | Error::InvalidVersionId(_)
            | Error::NoOperationsForVersionTime(_) => ErrorKind::NotFound,
            Error::ProtocolParametersNotDefined(_) => ErrorKind::ProtocolUnknown,
            Error::DocumentDeactivated => ErrorKind::Terminal,
            Error::CommitmentMismatch(_) | Error::DidSuffixMismatch { .. } => {
                ErrorKind::CommitmentMismatch
            }
            Error::CommitmentReuse => ErrorKind::KeyReuse,
            Error::AnchorTimeOutOfRange { .. } => ErrorKind::PolicyRejected,
            Error::Operation(inner) => inner.kind(),
            _ => ErrorKind::Malformed,
        }
    }
}
