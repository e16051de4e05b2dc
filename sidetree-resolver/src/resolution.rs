//! Resolution inputs, accumulated state and the rendered result.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use sidetree_operations::document::Document;
use sidetree_operations::{AnchoredOperation, OperationType};
use std::collections::HashSet;

/// Caller-supplied resolution options.
#[derive(Debug, Clone, Default)]
pub struct ResolutionOptions {
    /// In-memory anchored operations merged with stored ones for this call.
    pub additional_operations: Vec<AnchoredOperation>,
    /// Canonical reference restricting output to the state after the
    /// operation carrying it.
    pub version_id: Option<String>,
    /// RFC 3339 UTC instant restricting output to the state as of that
    /// time.
    pub version_time: Option<String>,
}

/// State accumulated while applying a DID's operations in order.
///
/// `doc` is `None` until a create operation initializes the state; empty
/// commitment strings mean no further operation of that class can apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionModel {
    pub doc: Option<Document>,
    pub created_time: u64,
    pub updated_time: u64,
    /// Canonical reference of the last applied operation.
    pub version_id: String,
    pub update_commitment: String,
    pub recovery_commitment: String,
    pub deactivated: bool,
    pub anchor_origin: Option<Value>,
    /// Published operations considered during resolution.
    pub published_operations: Vec<AnchoredOperation>,
    /// Unpublished operations considered during resolution.
    pub unpublished_operations: Vec<AnchoredOperation>,
}

/// Final resolution output: the document plus its metadata.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub document: Value,
    pub document_metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub equivalent_id: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    pub method: MethodMetadata,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MethodMetadata {
    /// Whether any published operation contributed to the result.
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_commitment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_commitment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub published_operations: Vec<OperationReference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unpublished_operations: Vec<OperationReference>,
}

/// Compact description of an operation for metadata listings.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationReference {
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    pub transaction_time: u64,
    pub transaction_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_reference: Option<String>,
}

/// Identifier context the processor supplies when rendering a result.
#[derive(Debug, Clone, Default)]
pub(crate) struct TransformationInfo {
    pub canonical_id: Option<String>,
    pub equivalent_id: Vec<String>,
    pub published: bool,
}

pub(crate) fn create_resolution_result(
    model: &ResolutionModel,
    info: &TransformationInfo,
) -> ResolutionResult {
    let method = MethodMetadata {
        published: info.published,
        recovery_commitment: non_empty(&model.recovery_commitment),
        update_commitment: non_empty(&model.update_commitment),
        published_operations: operation_references(&model.published_operations, true),
        unpublished_operations: operation_references(&model.unpublished_operations, false),
    };

    let created = timestamp(model.created_time);
    let updated = if model.version_id.is_empty() {
        None
    } else {
        timestamp(model.updated_time)
    };

    ResolutionResult {
        document: Value::Object(model.doc.clone().unwrap_or_default()),
        document_metadata: DocumentMetadata {
            deactivated: if model.deactivated { Some(true) } else { None },
            canonical_id: info.canonical_id.clone(),
            equivalent_id: info.equivalent_id.clone(),
            created,
            updated,
            version_id: non_empty(&model.version_id),
            method,
        },
    }
}

fn timestamp(seconds: u64) -> Option<DateTime<Utc>> {
    if seconds == 0 {
        return None;
    }
    Utc.timestamp_opt(seconds as i64, 0).single()
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Render metadata references sorted by anchoring order; published lists
/// are deduplicated by canonical reference.
fn operation_references(
    operations: &[AnchoredOperation],
    dedup_by_reference: bool,
) -> Vec<OperationReference> {
    let mut operations: Vec<&AnchoredOperation> = operations.iter().collect();
    operations.sort_by_key(|op| (op.transaction_time, op.transaction_number));

    let mut seen = HashSet::new();
    let mut references = Vec::with_capacity(operations.len());
    for op in operations {
        if dedup_by_reference && !seen.insert(op.canonical_reference.as_str()) {
            continue;
        }
        references.push(OperationReference {
            operation_type: op.operation_type,
            transaction_time: op.transaction_time,
            transaction_number: op.transaction_number,
            canonical_reference: non_empty(&op.canonical_reference),
        });
    }
    references
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchored(reference: &str, time: u64) -> AnchoredOperation {
        AnchoredOperation {
            operation_type: OperationType::Update,
            unique_suffix: "suffix".to_string(),
            operation_request: Vec::new(),
            transaction_time: time,
            transaction_number: 0,
            protocol_version: 0,
            canonical_reference: reference.to_string(),
        }
    }

    #[test]
    fn published_references_are_deduplicated_and_sorted() {
        let model = ResolutionModel {
            published_operations: vec![anchored("ref3", 3), anchored("ref2", 2), anchored("ref2", 2)],
            ..Default::default()
        };
        let result = create_resolution_result(&model, &TransformationInfo::default());
        let refs = &result.document_metadata.method.published_operations;
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].canonical_reference.as_deref(), Some("ref2"));
        assert_eq!(refs[1].canonical_reference.as_deref(), Some("ref3"));
    }

    #[test]
    fn updated_omitted_without_version_id() {
        let model = ResolutionModel {
            created_time: 1_600_000_000,
            updated_time: 1_600_000_100,
            ..Default::default()
        };
        let result = create_resolution_result(&model, &TransformationInfo::default());
        assert!(result.document_metadata.created.is_some());
        assert!(result.document_metadata.updated.is_none());

        let with_version = ResolutionModel {
            version_id: "ref".to_string(),
            ..model
        };
        let result = create_resolution_result(&with_version, &TransformationInfo::default());
        assert!(result.document_metadata.updated.is_some());
        assert_eq!(
            result.document_metadata.version_id.as_deref(),
            Some("ref")
        );
    }

    #[test]
    fn empty_commitments_are_omitted() {
        let model = ResolutionModel {
            deactivated: true,
            ..Default::default()
        };
        let result = create_resolution_result(&model, &TransformationInfo::default());
        assert_eq!(result.document_metadata.deactivated, Some(true));
        assert!(result.document_metadata.method.recovery_commitment.is_none());
        assert!(result.document_metadata.method.update_commitment.is_none());
    }
}
