//! Public key JWK representation and compact JWS parsing.
//!
//! The engine validates the *structure* of signed data: JWS framing, the
//! protected header rules and the binding between the embedded public key
//! and the operation's reveal value. It never verifies signatures and never
//! sees private key material; both are the host's responsibility.

pub mod error;
pub use error::Error;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// RFC 7515 - JSON Web Signature (JWS)
// RFC 7517 - JSON Web Key (JWK)

const COORDINATE_SIZE: usize = 32;

/// Public key in JWK form as it appears in signed-data payloads.
///
/// Coordinates are kept in their base64url string form so canonicalization
/// reproduces the signer's exact bytes. Deserialization rejects any member
/// beyond the public parameters below, which keeps private key fields
/// (`d`) out of the engine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct PublicKeyJwk {
    #[serde(default)]
    pub kty: String,
    #[serde(default)]
    pub crv: String,
    #[serde(default)]
    pub x: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// JWK nonce; size is validated against protocol parameters by the
    /// operation parser.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl PublicKeyJwk {
    /// Validate mandatory members and coordinate sizes for the declared
    /// key type.
    ///
    /// Supported key types: `EC/P-256`, `EC/secp256k1` and `OKP/Ed25519`.
    /// Whether the curve is allowed for a given protocol version is a
    /// separate check performed by the operation parser.
    pub fn validate(&self) -> Result<(), Error> {
        if self.kty.is_empty() {
            return Err(Error::MissingKeyType);
        }
        if self.crv.is_empty() {
            return Err(Error::MissingCurve);
        }
        if self.x.is_empty() {
            return Err(Error::MissingX);
        }
        match (self.kty.as_str(), self.crv.as_str()) {
            ("EC", "P-256") | ("EC", "secp256k1") => {
                check_coordinate("x", &self.x)?;
                match &self.y {
                    Some(y) => check_coordinate("y", y)?,
                    None => return Err(Error::MissingY),
                }
            }
            ("OKP", "Ed25519") => {
                check_coordinate("x", &self.x)?;
                if self.y.is_some() {
                    return Err(Error::UnexpectedY);
                }
            }
            (kty, crv) => {
                return Err(Error::UnsupportedKeyType {
                    kty: kty.to_string(),
                    crv: crv.to_string(),
                })
            }
        }
        Ok(())
    }
}

fn check_coordinate(name: &'static str, value: &str) -> Result<(), Error> {
    let bytes = base64::decode_config(value, base64::URL_SAFE_NO_PAD)?;
    if bytes.len() != COORDINATE_SIZE {
        return Err(Error::InvalidCoordinateLength {
            coordinate: name,
            expected: COORDINATE_SIZE,
            found: bytes.len(),
        });
    }
    Ok(())
}

/// Protected header of a compact JWS.
///
/// Unknown members are collected into `additional_parameters` so callers
/// can enforce that nothing beyond `alg` and `kid` is present.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Header {
    #[serde(rename = "alg", default)]
    pub algorithm: String,

    #[serde(rename = "kid", skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,

    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_parameters: BTreeMap<String, serde_json::Value>,
}

/// A parsed (not verified) compact JWS.
#[derive(Debug, Clone)]
pub struct CompactJws {
    pub header: Header,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Split a compact JWS into its three base64url segments.
pub fn split_jws(jws: &str) -> Result<(&str, &str, &str), Error> {
    let mut segments = jws.split('.');
    match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(header), Some(payload), Some(signature), None) => Ok((header, payload, signature)),
        _ => Err(Error::InvalidCompactJws),
    }
}

/// Decode a compact JWS and parse its protected header.
pub fn parse_compact_jws(jws: &str) -> Result<CompactJws, Error> {
    let (header_b64, payload_b64, signature_b64) = split_jws(jws)?;
    let header_bytes = base64::decode_config(header_b64, base64::URL_SAFE_NO_PAD)?;
    let header: Header = serde_json::from_slice(&header_bytes)?;
    let payload = base64::decode_config(payload_b64, base64::URL_SAFE_NO_PAD)?;
    let signature = base64::decode_config(signature_b64, base64::URL_SAFE_NO_PAD)?;
    Ok(CompactJws {
        header,
        payload,
        signature,
    })
}

/// Enforce the protected header rules for signed operation data:
/// `alg` present and allowed, `kid` optional, nothing else.
pub fn validate_protected_header(header: &Header, allowed_algorithms: &[String]) -> Result<(), Error> {
    if header.algorithm.is_empty() {
        return Err(Error::MissingAlgorithm);
    }
    if let Some(name) = header.additional_parameters.keys().next() {
        return Err(Error::HeaderParameterNotAllowed(name.clone()));
    }
    if !allowed_algorithms.iter().any(|a| a == &header.algorithm) {
        return Err(Error::AlgorithmNotAllowed(header.algorithm.clone()));
    }
    Ok(())
}
