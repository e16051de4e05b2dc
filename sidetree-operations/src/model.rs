//! Wire models for operation requests and their signed-data payloads.
//!
//! Field names follow the canonical JSON wire format; every model is
//! round-trippable through JCS so hashes computed over re-serialized
//! models agree with hashes computed by the sender.

use crate::patch::Patch;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sidetree_jws::PublicKeyJwk;
use std::fmt;

/// Operation type discriminant, serialized lowercase (`"create"`, ...).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Recover,
    Deactivate,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Recover => "recover",
            OperationType::Deactivate => "deactivate",
        };
        f.write_str(name)
    }
}

/// Delta object carried by create, update and recover operations:
/// an ordered list of patches plus the commitment for the next update.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeltaModel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub update_commitment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<Patch>,
}

/// Suffix data object of a create operation. The DID suffix is the
/// multihash of this model's canonical form.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SuffixDataModel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub delta_hash: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub recovery_commitment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_origin: Option<Value>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

/// Create request payload.
///
/// The `type` member is absent when the request is embedded as long-form
/// initial state.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct CreateRequest {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix_data: Option<SuffixDataModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<DeltaModel>,
}

/// Update request payload.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct UpdateRequest {
    #[serde(rename = "type")]
    pub operation: OperationType,
    #[serde(default)]
    pub did_suffix: String,
    #[serde(default)]
    pub reveal_value: String,
    #[serde(default)]
    pub signed_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<DeltaModel>,
}

/// Recover request payload. Same envelope as update; the signed data
/// additionally carries the next recovery commitment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct RecoverRequest {
    #[serde(rename = "type")]
    pub operation: OperationType,
    #[serde(default)]
    pub did_suffix: String,
    #[serde(default)]
    pub reveal_value: String,
    #[serde(default)]
    pub signed_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<DeltaModel>,
}

/// Deactivate request payload; carries no delta.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct DeactivateRequest {
    #[serde(rename = "type")]
    pub operation: OperationType,
    #[serde(default)]
    pub did_suffix: String,
    #[serde(default)]
    pub reveal_value: String,
    #[serde(default)]
    pub signed_data: String,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// Signed-data payload of an update operation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSignedDataModel {
    pub update_key: Option<PublicKeyJwk>,
    #[serde(default)]
    pub delta_hash: String,
    /// Earliest anchoring time for this operation; zero when unbounded.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub anchor_from: i64,
    /// Anchoring expiry time for this operation; zero when unbounded.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub anchor_until: i64,
}

/// Signed-data payload of a recover operation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecoverSignedDataModel {
    #[serde(default)]
    pub delta_hash: String,
    pub recovery_key: Option<PublicKeyJwk>,
    #[serde(default)]
    pub recovery_commitment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_origin: Option<Value>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub anchor_from: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub anchor_until: i64,
}

/// Signed-data payload of a deactivate operation. The suffix and reveal
/// value are repeated under the signature and must match the envelope.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct DeactivateSignedDataModel {
    #[serde(default)]
    pub did_suffix: String,
    #[serde(default)]
    pub reveal_value: String,
    pub recovery_key: Option<PublicKeyJwk>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub anchor_from: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub anchor_until: i64,
}

/// A parsed operation, ready for the applier.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operation_type: OperationType,
    /// Unique suffix of the DID the operation belongs to.
    pub unique_suffix: String,
    /// Original request bytes, kept for re-hashing.
    pub operation_request: Vec<u8>,
    pub delta: Option<DeltaModel>,
    pub suffix_data: Option<SuffixDataModel>,
    /// Compact JWS; absent on create.
    pub signed_data: Option<String>,
    /// Multihash of the canonicalized signing key; absent on create.
    pub reveal_value: Option<String>,
    /// Opaque anchor origin copied from signed data or suffix data.
    pub anchor_origin: Option<Value>,
}

/// An operation adorned with ordering coordinates by the anchoring layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchoredOperation {
    pub operation_type: OperationType,
    pub unique_suffix: String,
    pub operation_request: Vec<u8>,
    pub transaction_time: u64,
    pub transaction_number: u64,
    pub protocol_version: u64,
    /// Reference assigned when the operation was anchored; empty marks an
    /// unpublished operation.
    pub canonical_reference: String,
}

impl AnchoredOperation {
    pub fn is_published(&self) -> bool {
        !self.canonical_reference.is_empty()
    }
}
