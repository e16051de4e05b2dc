//! Error types for `sidetree-operations` crate
use thiserror::Error;

/// Coarse classification of operation errors.
///
/// Every [`Error`] variant maps onto exactly one kind via [`Error::kind`],
/// so callers can branch on the class of failure without matching the full
/// variant list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid JSON, missing required field, wrong type.
    Malformed,
    /// An allow-list or size/shape policy rejected the value.
    PolicyRejected,
    /// A hash did not match the expected commitment or digest.
    CommitmentMismatch,
    /// Public key material re-used across commitment invocations.
    KeyReuse,
    /// Nothing found for the requested entity.
    NotFound,
    /// Operation attempted against a deactivated document.
    Terminal,
    /// No protocol parameters cover the anchoring time.
    ProtocolUnknown,
}

/// Error type for `sidetree-operations`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error parsing JSON
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Error from hashing/encoding primitives
    #[error(transparent)]
    Hashing(#[from] sidetree_hashing::Error),
    /// Error from JWK/JWS parsing and validation
    #[error(transparent)]
    Jws(#[from] sidetree_jws::Error),
    /// A required field is missing or empty
    #[error("missing {0}")]
    MissingField(&'static str),
    /// Operation type is unknown or not valid in this position
    #[error("operation type '{0}' not supported")]
    OperationTypeNotSupported(String),
    /// Operation request exceeds the protocol size cap
    #[error("operation size {size} exceeds maximum operation size {max}")]
    OperationSizeExceeded { size: usize, max: usize },
    /// Canonicalized delta exceeds the protocol size cap
    #[error("delta size {size} exceeds maximum delta size {max}")]
    DeltaSizeExceeded { size: usize, max: usize },
    /// Encoded multihash exceeds the protocol length cap
    #[error("hash length {length} exceeds maximum hash length {max}")]
    HashLengthExceeded { length: usize, max: usize },
    /// Multihash algorithm is not in the protocol allow-list
    #[error("multihash algorithm code {0:#x} is not in the allowed list")]
    MultihashCodeNotAllowed(u64),
    /// Key algorithm (curve) is not in the protocol allow-list
    #[error("key algorithm '{0}' is not in the allowed list")]
    KeyAlgorithmNotAllowed(String),
    /// JWK nonce must decode to the protocol nonce size
    #[error("nonce size {found} doesn't match configured nonce size {expected}")]
    NonceSizeMismatch { found: usize, expected: usize },
    /// Reveal value does not match the canonicalized signing key
    #[error("canonicalized {0} public key hash doesn't match reveal value")]
    RevealValueMismatch(&'static str),
    /// Delta does not match the signed delta hash
    #[error("delta doesn't match delta hash")]
    DeltaHashMismatch,
    /// Key commits to itself again
    #[error("re-using public keys for commitment is not allowed")]
    CommitmentReuse,
    /// Recovery and update commitments within one payload must differ
    #[error("recovery and update commitments cannot be equal, re-using public keys is not allowed")]
    EqualCommitments,
    /// Signed-data payload disagrees with the operation envelope
    #[error("signed {0} mismatch for deactivate")]
    SignedDataMismatch(&'static str),
    /// Patch action is not in the protocol allow-list
    #[error("patch action '{0}' is not in the allowed list")]
    PatchActionNotAllowed(String),
    /// Delta must carry at least one patch
    #[error("missing patches")]
    MissingPatches,
    /// Entry id exceeds the maximum length
    #[error("id exceeds maximum length: {max}")]
    IdTooLong { max: usize },
    /// Entry id carries characters outside [A-Za-z0-9_-]
    #[error("id '{0}' contains invalid characters")]
    InvalidIdCharacters(String),
    /// Duplicate public key id within one patch
    #[error("duplicate public key id: {0}")]
    DuplicatePublicKeyId(String),
    /// Duplicate service id within one patch
    #[error("duplicate service id: {0}")]
    DuplicateServiceId(String),
    /// Purposes array present but empty
    #[error("if 'purposes' is specified, it must contain at least one purpose")]
    EmptyPurposes,
    /// More purposes than the allowed set
    #[error("public key purpose exceeds maximum length: {max}")]
    TooManyPurposes { max: usize },
    /// Key type not allowed for the declared purposes
    #[error("invalid key type: {0}")]
    InvalidKeyType(String),
    /// Exactly one of publicKeyJwk and publicKeyBase58 is required
    #[error("exactly one of 'publicKeyJwk' and 'publicKeyBase58' is required")]
    KeyMaterialRequired,
    /// Service type exceeds the maximum length
    #[error("service type exceeds maximum length: {max}")]
    ServiceTypeTooLong { max: usize },
    /// Service endpoint is not a valid URI
    #[error("service endpoint '{0}' is not a valid URI")]
    InvalidUri(String),
    /// Error applying an RFC 6902 patch
    #[error(transparent)]
    JsonPatch(#[from] json_patch::PatchError),
    /// RFC 6902 `move` operations are not permitted
    #[error("ietf-json-patch: 'move' operation is not permitted")]
    JsonPatchMoveNotAllowed,
    /// Applying patches produced an empty document
    #[error("applying patches resulted in an empty document")]
    EmptyDocumentAfterPatch,
    /// Long-form initial state does not round-trip
    #[error("initial state is not valid")]
    InitialStateInvalid,
    /// DID does not start with the configured namespace
    #[error("did must start with configured namespace '{0}'")]
    NamespaceMismatch(String),
    /// Error reported by an external signer
    #[error("signer error: {0}")]
    Signer(#[source] anyhow::Error),
}

impl Error {
    /// Map the error onto the coarse taxonomy.
    pub fn kind(&self) -> ErrorKind {
        use sidetree_hashing::Error as HashingError;
        use sidetree_jws::Error as JwsError;
        match self {
            Error::Hashing(HashingError::ModelMultihashMismatch) => ErrorKind::CommitmentMismatch,
            Error::Hashing(HashingError::UnsupportedHashAlgorithm(_)) => ErrorKind::PolicyRejected,
            Error::Jws(JwsError::AlgorithmNotAllowed(_)) => ErrorKind::PolicyRejected,
            Error::Jws(JwsError::HeaderParameterNotAllowed(_)) => ErrorKind::PolicyRejected,
            Error::OperationSizeExceeded { .. }
            | Error::DeltaSizeExceeded { .. }
            | Error::HashLengthExceeded { .. }
            | Error::MultihashCodeNotAllowed(_)
            | Error::KeyAlgorithmNotAllowed(_)
            | Error::NonceSizeMismatch { .. }
            | Error::PatchActionNotAllowed(_)
            | Error::IdTooLong { .. }
            | Error::InvalidIdCharacters(_)
            | Error::DuplicatePublicKeyId(_)
            | Error::DuplicateServiceId(_)
            | Error::EmptyPurposes
            | Error::TooManyPurposes { .. }
            | Error::InvalidKeyType(_)
            | Error::KeyMaterialRequired
            | Error::ServiceTypeTooLong { .. }
            | Error::InvalidUri(_)
            | Error::JsonPatchMoveNotAllowed => ErrorKind::PolicyRejected,
            Error::RevealValueMismatch(_)
            | Error::DeltaHashMismatch
            | Error::SignedDataMismatch(_) => ErrorKind::CommitmentMismatch,
            Error::CommitmentReuse | Error::EqualCommitments => ErrorKind::KeyReuse,
            _ => ErrorKind::Malformed,
        }
    }
}
