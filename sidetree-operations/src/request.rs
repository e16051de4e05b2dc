//! Utility builders that assemble canonical operation request payloads.
//!
//! The engine never generates or holds private keys: callers supply
//! commitments, public keys and a [`Signer`] that produces the JWS
//! signature out of band.

use crate::commitment;
use crate::error::Error;
use crate::model::{
    CreateRequest, DeactivateRequest, DeactivateSignedDataModel, DeltaModel, OperationType,
    RecoverRequest, RecoverSignedDataModel, SuffixDataModel, UpdateRequest,
    UpdateSignedDataModel,
};
use crate::patch::Patch;
use serde::Serialize;
use serde_json::Value;
use sidetree_hashing as hashing;
use sidetree_hashing::encoder;
use sidetree_jws::{Header, PublicKeyJwk};

/// External signing capability for operation requests.
pub trait Signer {
    /// Sign the JWS signing input (`<b64(header)>.<b64(payload)>`).
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, anyhow::Error>;
    /// Protected header to sign under; must carry the algorithm.
    fn headers(&self) -> Header;
}

/// Information required to create a create request.
#[derive(Debug, Clone)]
pub struct CreateRequestInfo {
    pub recovery_commitment: String,
    pub update_commitment: String,
    pub patches: Vec<Patch>,
    pub multihash_code: u64,
    pub anchor_origin: Option<Value>,
}

/// Assemble the canonical payload for a create request.
pub fn new_create_request(info: &CreateRequestInfo) -> Result<Vec<u8>, Error> {
    if info.patches.is_empty() {
        return Err(Error::MissingPatches);
    }
    if info.recovery_commitment == info.update_commitment {
        return Err(Error::EqualCommitments);
    }
    let delta = DeltaModel {
        update_commitment: info.update_commitment.clone(),
        patches: info.patches.clone(),
    };
    let delta_hash = hashing::calculate_model_multihash(&delta, info.multihash_code)?;
    let suffix_data = SuffixDataModel {
        delta_hash,
        recovery_commitment: info.recovery_commitment.clone(),
        anchor_origin: info.anchor_origin.clone(),
        r#type: None,
    };
    let request = CreateRequest {
        operation: Some(OperationType::Create),
        suffix_data: Some(suffix_data),
        delta: Some(delta),
    };
    Ok(hashing::canonicalize(&request)?)
}

/// Information required to create an update request.
#[derive(Debug, Clone)]
pub struct UpdateRequestInfo {
    pub did_suffix: String,
    /// Update key matching the previous update commitment.
    pub update_key: PublicKeyJwk,
    /// Commitment to be used for the next update.
    pub update_commitment: String,
    pub patches: Vec<Patch>,
    pub multihash_code: u64,
    pub reveal_value: String,
    pub anchor_from: i64,
    pub anchor_until: i64,
}

/// Assemble the canonical payload for an update request.
pub fn new_update_request(info: &UpdateRequestInfo, signer: &dyn Signer) -> Result<Vec<u8>, Error> {
    if info.did_suffix.is_empty() {
        return Err(Error::MissingField("did suffix"));
    }
    if info.reveal_value.is_empty() {
        return Err(Error::MissingField("reveal value"));
    }
    if info.patches.is_empty() {
        return Err(Error::MissingPatches);
    }
    info.update_key.validate()?;
    validate_commitment(&info.update_key, info.multihash_code, &info.update_commitment)?;

    let delta = DeltaModel {
        update_commitment: info.update_commitment.clone(),
        patches: info.patches.clone(),
    };
    let delta_hash = hashing::calculate_model_multihash(&delta, info.multihash_code)?;
    let signed_data_model = UpdateSignedDataModel {
        update_key: Some(info.update_key.clone()),
        delta_hash,
        anchor_from: info.anchor_from,
        anchor_until: info.anchor_until,
    };
    let request = UpdateRequest {
        operation: OperationType::Update,
        did_suffix: info.did_suffix.clone(),
        reveal_value: info.reveal_value.clone(),
        signed_data: sign_model(&signed_data_model, signer)?,
        delta: Some(delta),
    };
    Ok(hashing::canonicalize(&request)?)
}

/// Information required to create a recover request.
#[derive(Debug, Clone)]
pub struct RecoverRequestInfo {
    pub did_suffix: String,
    /// Recovery key matching the previous recovery commitment.
    pub recovery_key: PublicKeyJwk,
    /// Commitment to be used for the next recovery or deactivate.
    pub recovery_commitment: String,
    /// Commitment to be used for the next update.
    pub update_commitment: String,
    pub patches: Vec<Patch>,
    pub multihash_code: u64,
    pub reveal_value: String,
    pub anchor_origin: Option<Value>,
    pub anchor_from: i64,
    pub anchor_until: i64,
}

/// Assemble the canonical payload for a recover request.
pub fn new_recover_request(
    info: &RecoverRequestInfo,
    signer: &dyn Signer,
) -> Result<Vec<u8>, Error> {
    if info.did_suffix.is_empty() {
        return Err(Error::MissingField("did suffix"));
    }
    if info.reveal_value.is_empty() {
        return Err(Error::MissingField("reveal value"));
    }
    if info.patches.is_empty() {
        return Err(Error::MissingPatches);
    }
    if info.recovery_commitment == info.update_commitment {
        return Err(Error::EqualCommitments);
    }
    info.recovery_key.validate()?;
    validate_commitment(
        &info.recovery_key,
        info.multihash_code,
        &info.recovery_commitment,
    )?;

    let delta = DeltaModel {
        update_commitment: info.update_commitment.clone(),
        patches: info.patches.clone(),
    };
    let delta_hash = hashing::calculate_model_multihash(&delta, info.multihash_code)?;
    let signed_data_model = RecoverSignedDataModel {
        delta_hash,
        recovery_key: Some(info.recovery_key.clone()),
        recovery_commitment: info.recovery_commitment.clone(),
        anchor_origin: info.anchor_origin.clone(),
        anchor_from: info.anchor_from,
        anchor_until: info.anchor_until,
    };
    let request = RecoverRequest {
        operation: OperationType::Recover,
        did_suffix: info.did_suffix.clone(),
        reveal_value: info.reveal_value.clone(),
        signed_data: sign_model(&signed_data_model, signer)?,
        delta: Some(delta),
    };
    Ok(hashing::canonicalize(&request)?)
}

/// Information required to create a deactivate request.
#[derive(Debug, Clone)]
pub struct DeactivateRequestInfo {
    pub did_suffix: String,
    /// Recovery key matching the previous recovery commitment.
    pub recovery_key: PublicKeyJwk,
    pub reveal_value: String,
    pub anchor_from: i64,
    pub anchor_until: i64,
}

/// Assemble the canonical payload for a deactivate request.
pub fn new_deactivate_request(
    info: &DeactivateRequestInfo,
    signer: &dyn Signer,
) -> Result<Vec<u8>, Error> {
    if info.did_suffix.is_empty() {
        return Err(Error::MissingField("did suffix"));
    }
    if info.reveal_value.is_empty() {
        return Err(Error::MissingField("reveal value"));
    }
    info.recovery_key.validate()?;

    let signed_data_model = DeactivateSignedDataModel {
        did_suffix: info.did_suffix.clone(),
        reveal_value: info.reveal_value.clone(),
        recovery_key: Some(info.recovery_key.clone()),
        anchor_from: info.anchor_from,
        anchor_until: info.anchor_until,
    };
    let request = DeactivateRequest {
        operation: OperationType::Deactivate,
        did_suffix: info.did_suffix.clone(),
        reveal_value: info.reveal_value.clone(),
        signed_data: sign_model(&signed_data_model, signer)?,
    };
    Ok(hashing::canonicalize(&request)?)
}

/// The signing key must not commit to itself.
fn validate_commitment(
    jwk: &PublicKeyJwk,
    multihash_code: u64,
    next_commitment: &str,
) -> Result<(), Error> {
    let current_commitment = commitment::get_commitment(jwk, multihash_code)?;
    if current_commitment == next_commitment {
        return Err(Error::CommitmentReuse);
    }
    Ok(())
}

fn sign_model<T: Serialize>(model: &T, signer: &dyn Signer) -> Result<String, Error> {
    let header_bytes = serde_json::to_vec(&signer.headers())?;
    let protected = encoder::encode_to_string(&header_bytes);
    let payload = encoder::encode_to_string(&hashing::canonicalize(model)?);
    let signing_input = format!("{}.{}", protected, payload);
    let signature = signer.sign(signing_input.as_bytes()).map_err(Error::Signer)?;
    Ok(format!(
        "{}.{}",
        signing_input,
        encoder::encode_to_string(&signature)
    ))
}
