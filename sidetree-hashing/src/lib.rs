//! Hashing and encoding primitives shared by the Sidetree operation engine.
//!
//! Three concerns live here, corresponding to the encoding schemes every
//! Sidetree implementation must agree on bit-for-bit:
//!
//! - [`canonicalize`]: the JSON Canonicalization Scheme (JCS, RFC 8785);
//! - [`encoder`]: unpadded base64url used for all data encoding;
//! - multihash: self-describing digests (`<varint code><varint len><digest>`)
//!   produced by [`compute_multihash`] and friends.

pub mod error;
pub use error::Error;

use serde::Serialize;
use sha2::{Digest, Sha256, Sha512};

/// Multihash code for SHA2-256.
pub const SHA2_256_CODE: u64 = 0x12;
/// Multihash code for SHA2-512.
pub const SHA2_512_CODE: u64 = 0x13;

/// Serialize a value using the JSON Canonicalization Scheme (JCS).
///
/// Map keys are sorted lexicographically, numbers use the shortest
/// round-trip form and no insignificant whitespace is emitted, so two
/// equivalent values always produce identical bytes.
pub fn canonicalize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    serde_jcs::to_string(value)
        .map(String::into_bytes)
        .map_err(Error::Jcs)
}

/// Unpadded base64url, the data encoding scheme for all hashes and
/// embedded initial state.
pub mod encoder {
    /// Encode bytes as unpadded base64url.
    pub fn encode_to_string(data: &[u8]) -> String {
        base64::encode_config(data, base64::URL_SAFE_NO_PAD)
    }

    /// Decode an unpadded base64url string.
    pub fn decode_string(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
        base64::decode_config(encoded, base64::URL_SAFE_NO_PAD)
    }
}

/// A decoded multihash: algorithm code plus raw digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multihash {
    pub code: u64,
    pub digest: Vec<u8>,
}

/// Raw digest of `data` under the algorithm identified by `code`, without
/// multihash framing.
pub fn hash(code: u64, data: &[u8]) -> Result<Vec<u8>, Error> {
    match code {
        SHA2_256_CODE => Ok(Sha256::digest(data).to_vec()),
        SHA2_512_CODE => Ok(Sha512::digest(data).to_vec()),
        other => Err(Error::UnsupportedHashAlgorithm(other)),
    }
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn read_varint(bytes: &[u8]) -> Result<(u64, usize), Error> {
    let mut value: u64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        if i >= 9 {
            return Err(Error::InvalidVarint);
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(Error::TruncatedMultihash)
}

/// Hash `data` with the algorithm identified by `code` and frame the digest
/// as a multihash.
pub fn compute_multihash(code: u64, data: &[u8]) -> Result<Vec<u8>, Error> {
    let digest = hash(code, data)?;
    let mut out = Vec::with_capacity(digest.len() + 4);
    write_varint(&mut out, code);
    write_varint(&mut out, digest.len() as u64);
    out.extend_from_slice(&digest);
    Ok(out)
}

/// Decode a multihash into its algorithm code and digest.
pub fn decode_multihash(bytes: &[u8]) -> Result<Multihash, Error> {
    let (code, read) = read_varint(bytes)?;
    let rest = &bytes[read..];
    let (declared, read) = read_varint(rest)?;
    let digest = &rest[read..];
    if digest.len() != declared as usize {
        return Err(Error::DigestLengthMismatch {
            declared: declared as usize,
            found: digest.len(),
        });
    }
    Ok(Multihash {
        code,
        digest: digest.to_vec(),
    })
}

/// Compute the encoded multihash of the canonicalized model.
pub fn calculate_model_multihash<T: Serialize + ?Sized>(
    value: &T,
    code: u64,
) -> Result<String, Error> {
    let canonical = canonicalize(value)?;
    let multihash = compute_multihash(code, &canonical)?;
    Ok(encoder::encode_to_string(&multihash))
}

/// Return the algorithm code carried inside an encoded multihash.
pub fn multihash_code(encoded: &str) -> Result<u64, Error> {
    let bytes = encoder::decode_string(encoded)?;
    Ok(decode_multihash(&bytes)?.code)
}

/// Decode an encoded multihash string.
pub fn decode_encoded_multihash(encoded: &str) -> Result<Multihash, Error> {
    let bytes = encoder::decode_string(encoded)?;
    decode_multihash(&bytes)
}

/// Check that `encoded` is the multihash of the canonicalized model,
/// computed with the algorithm that `encoded` itself declares.
pub fn is_valid_model_multihash<T: Serialize + ?Sized>(
    value: &T,
    encoded: &str,
) -> Result<(), Error> {
    let code = multihash_code(encoded)?;
    let computed = calculate_model_multihash(value, code)?;
    if computed != encoded {
        return Err(Error::ModelMultihashMismatch);
    }
    Ok(())
}
