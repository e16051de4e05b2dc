//! The public key commitment scheme.
//!
//! A reveal value is the multihash of a canonicalized public key; a
//! commitment is that digest hashed once more. An operation proves control
//! by revealing the key whose double hash equals the commitment stored by
//! the previous operation, and commits to the key for the next one.

use crate::error::Error;
use sidetree_hashing as hashing;
use sidetree_hashing::encoder;
use sidetree_jws::PublicKeyJwk;

/// Commitment for `jwk`: two hash rounds over the canonicalized key.
pub fn get_commitment(jwk: &PublicKeyJwk, code: u64) -> Result<String, Error> {
    let canonical = hashing::canonicalize(jwk)?;
    let reveal_digest = hashing::hash(code, &canonical)?;
    let multihash = hashing::compute_multihash(code, &reveal_digest)?;
    Ok(encoder::encode_to_string(&multihash))
}

/// Reveal value for `jwk`: one hash round over the canonicalized key.
pub fn get_reveal_value(jwk: &PublicKeyJwk, code: u64) -> Result<String, Error> {
    Ok(hashing::calculate_model_multihash(jwk, code)?)
}

/// Commitment corresponding to an already-computed reveal value, using the
/// algorithm the reveal value itself declares.
pub fn get_commitment_from_reveal_value(reveal_value: &str) -> Result<String, Error> {
    let multihash = hashing::decode_encoded_multihash(reveal_value)?;
    let commitment = hashing::compute_multihash(multihash.code, &multihash.digest)?;
    Ok(encoder::encode_to_string(&commitment))
}
