//! Error types for `sidetree-jws` crate
use base64::DecodeError as Base64Error;
use thiserror::Error;

/// Error type for `sidetree-jws`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Compact JWS must consist of three dot-separated segments
    #[error("Invalid compact JWS")]
    InvalidCompactJws,
    /// Error decoding Base64
    #[error(transparent)]
    Base64(#[from] Base64Error),
    /// Error parsing JSON
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Missing key type in JWK
    #[error("JWK kty is missing")]
    MissingKeyType,
    /// Missing curve in JWK
    #[error("JWK crv is missing")]
    MissingCurve,
    /// Missing x coordinate in JWK
    #[error("JWK x is missing")]
    MissingX,
    /// Missing y coordinate in JWK
    #[error("JWK y is missing")]
    MissingY,
    /// Key type is not supported
    #[error("Key type '{kty}' with curve '{crv}' is not supported")]
    UnsupportedKeyType { kty: String, crv: String },
    /// Unexpected coordinate length
    #[error("JWK {coordinate} must decode to {expected} bytes, found {found}")]
    InvalidCoordinateLength {
        coordinate: &'static str,
        expected: usize,
        found: usize,
    },
    /// An octet key pair must not carry a y coordinate
    #[error("JWK y is not allowed for OKP keys")]
    UnexpectedY,
    /// Algorithm missing or empty in the protected header
    #[error("Algorithm must be present in the protected header")]
    MissingAlgorithm,
    /// Algorithm is not in the allowed list
    #[error("Algorithm '{0}' is not in the allowed list")]
    AlgorithmNotAllowed(String),
    /// Protected header carries a member other than alg and kid
    #[error("Invalid protected header parameter: {0}")]
    HeaderParameterNotAllowed(String),
}
