//! Protocol parameters in force for a given anchoring epoch.

use serde::{Deserialize, Serialize};
use sidetree_hashing::{SHA2_256_CODE, SHA2_512_CODE};

/// Parameters governing operation validation for one protocol epoch.
///
/// A record applies to every operation whose anchoring time is at or after
/// `genesis_time`, until a record with a later genesis time takes over.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    /// Anchoring time at which these parameters take effect.
    pub genesis_time: u64,
    /// Allowed multihash algorithm codes; the first entry is the one used
    /// for newly derived identifiers.
    pub multihash_algorithms: Vec<u64>,
    /// Allowed JWS `alg` values.
    pub signature_algorithms: Vec<String>,
    /// Allowed signing key curves.
    pub key_algorithms: Vec<String>,
    /// Maximum operation request size in bytes.
    pub max_operation_size: usize,
    /// Maximum canonicalized delta size in bytes.
    pub max_delta_size: usize,
    /// Maximum length of an encoded operation hash.
    pub max_operation_hash_length: usize,
    /// Required decoded size of a JWK nonce.
    pub nonce_size: usize,
    /// Allowed patch actions.
    pub patches: Vec<String>,
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol {
            genesis_time: 0,
            multihash_algorithms: vec![SHA2_256_CODE, SHA2_512_CODE],
            signature_algorithms: vec![
                "EdDSA".to_string(),
                "ES256".to_string(),
                "ES256K".to_string(),
            ],
            key_algorithms: vec![
                "secp256k1".to_string(),
                "P-256".to_string(),
                "Ed25519".to_string(),
            ],
            max_operation_size: 2500,
            max_delta_size: 1700,
            max_operation_hash_length: 100,
            nonce_size: 16,
            patches: vec![
                "add-public-keys".to_string(),
                "remove-public-keys".to_string(),
                "add-services".to_string(),
                "remove-services".to_string(),
                "replace".to_string(),
                "ietf-json-patch".to_string(),
            ],
        }
    }
}
