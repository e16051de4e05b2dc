//! Error types for `sidetree-hashing` crate
use base64::DecodeError as Base64Error;
use thiserror::Error;

/// Error type for `sidetree-hashing`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Unable to execute JSON Canonicalization Scheme (JCS)
    #[error("Unable to execute JSON Canonicalization Scheme (JCS)")]
    Jcs(#[source] serde_json::Error),
    /// Error decoding Base64
    #[error(transparent)]
    Base64(#[from] Base64Error),
    /// Hash algorithm code is not supported
    #[error("Multihash algorithm code {0:#x} is not supported")]
    UnsupportedHashAlgorithm(u64),
    /// Multihash ended before the declared digest length
    #[error("Multihash is truncated")]
    TruncatedMultihash,
    /// Varint did not terminate within 9 bytes
    #[error("Invalid varint in multihash")]
    InvalidVarint,
    /// Digest length does not match the declared length
    #[error("Multihash digest length mismatch: declared {declared}, found {found}")]
    DigestLengthMismatch { declared: usize, found: usize },
    /// Computed multihash differs from the provided value
    #[error("Multihash does not match the canonicalized model")]
    ModelMultihashMismatch,
}
