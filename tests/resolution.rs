//! End-to-end resolution scenarios exercised through the public API.

use lazy_static::lazy_static;
use serde_json::{json, Value};
use sidetree::hashing::{encoder, SHA2_256_CODE};
use sidetree::jws::{Header, PublicKeyJwk};
use sidetree::operations::commitment::{get_commitment, get_reveal_value};
use sidetree::operations::patch::{DocumentState, KeyPurpose, Patch, PublicKeyEntry};
use sidetree::operations::request::{
    self, CreateRequestInfo, DeactivateRequestInfo, RecoverRequestInfo, Signer, UpdateRequestInfo,
};
use sidetree::operations::{
    long_form_did, AnchoredOperation, CreateRequest, OperationParser, OperationType, Protocol,
};
use sidetree::resolver::{
    Error, MemoryOperationStore, OperationProcessor, ProtocolRegistry, ResolutionOptions,
};
use std::sync::Arc;

const NAMESPACE: &str = "did:sidetree";

/// Long-form DID from the published Sidetree test vectors.
static SPEC_VECTOR_LONGFORM_DID: &str = "did:sidetree:EiDyOQbbZAa3aiRzeCkV7LOx3SERjjH93EXoIM3UoN4oWg:eyJkZWx0YSI6eyJwYXRjaGVzIjpbeyJhY3Rpb24iOiJyZXBsYWNlIiwiZG9jdW1lbnQiOnsicHVibGljS2V5cyI6W3siaWQiOiJwdWJsaWNLZXlNb2RlbDFJZCIsInB1YmxpY0tleUp3ayI6eyJjcnYiOiJzZWNwMjU2azEiLCJrdHkiOiJFQyIsIngiOiJ0WFNLQl9ydWJYUzdzQ2pYcXVwVkpFelRjVzNNc2ptRXZxMVlwWG45NlpnIiwieSI6ImRPaWNYcWJqRnhvR0otSzAtR0oxa0hZSnFpY19EX09NdVV3a1E3T2w2bmsifSwicHVycG9zZXMiOlsiYXV0aGVudGljYXRpb24iLCJrZXlBZ3JlZW1lbnQiXSwidHlwZSI6IkVjZHNhU2VjcDI1NmsxVmVyaWZpY2F0aW9uS2V5MjAxOSJ9XSwic2VydmljZXMiOlt7ImlkIjoic2VydmljZTFJZCIsInNlcnZpY2VFbmRwb2ludCI6Imh0dHA6Ly93d3cuc2VydmljZTEuY29tIiwidHlwZSI6InNlcnZpY2UxVHlwZSJ9XX19XSwidXBkYXRlQ29tbWl0bWVudCI6IkVpREtJa3dxTzY5SVBHM3BPbEhrZGI4Nm5ZdDBhTnhTSFp1MnItYmhFem5qZEEifSwic3VmZml4RGF0YSI6eyJkZWx0YUhhc2giOiJFaUNmRFdSbllsY0Q5RUdBM2RfNVoxQUh1LWlZcU1iSjluZmlxZHo1UzhWRGJnIiwicmVjb3ZlcnlDb21taXRtZW50IjoiRWlCZk9aZE10VTZPQnc4UGs4NzlRdFotMkotOUZiYmpTWnlvYUFfYnFENHpoQSJ9fQ";
static SPEC_VECTOR_SHORTFORM_DID: &str =
    "did:sidetree:EiDyOQbbZAa3aiRzeCkV7LOx3SERjjH93EXoIM3UoN4oWg";

struct TestSigner;

impl Signer for TestSigner {
    fn sign(&self, _data: &[u8]) -> Result<Vec<u8>, anyhow::Error> {
        Ok(b"signature".to_vec())
    }

    fn headers(&self) -> Header {
        Header {
            algorithm: "ES256".to_string(),
            ..Default::default()
        }
    }
}

fn jwk(seed: u8) -> PublicKeyJwk {
    PublicKeyJwk {
        kty: "EC".to_string(),
        crv: "P-256".to_string(),
        x: encoder::encode_to_string(&[seed; 32]),
        y: Some(encoder::encode_to_string(&[seed.wrapping_add(1); 32])),
        ..Default::default()
    }
}

fn key_entry(id: &str) -> PublicKeyEntry {
    PublicKeyEntry {
        id: id.to_string(),
        r#type: "JsonWebKey2020".to_string(),
        purposes: Some(vec![KeyPurpose::Authentication]),
        public_key_jwk: Some(jwk(250)),
        public_key_base58: None,
    }
}

fn json_patch(ops: Value) -> Patch {
    Patch::IetfJsonPatch {
        patches: serde_json::from_value(ops).unwrap(),
    }
}

fn anchored(
    request: Vec<u8>,
    operation_type: OperationType,
    suffix: &str,
    time: u64,
    number: u64,
    reference: &str,
) -> AnchoredOperation {
    AnchoredOperation {
        operation_type,
        unique_suffix: suffix.to_string(),
        operation_request: request,
        transaction_time: time,
        transaction_number: number,
        protocol_version: 0,
        canonical_reference: reference.to_string(),
    }
}

fn create_request_bytes(recovery_seed: u8, update_seed: u8) -> Vec<u8> {
    request::new_create_request(&CreateRequestInfo {
        recovery_commitment: get_commitment(&jwk(recovery_seed), SHA2_256_CODE).unwrap(),
        update_commitment: get_commitment(&jwk(update_seed), SHA2_256_CODE).unwrap(),
        patches: vec![
            Patch::AddPublicKeys {
                public_keys: vec![key_entry("key1")],
            },
            json_patch(json!([{"op": "add", "path": "/test", "value": "special0"}])),
        ],
        multihash_code: SHA2_256_CODE,
        anchor_origin: None,
    })
    .unwrap()
}

fn update_request_bytes(current_seed: u8, next_seed: u8, suffix: &str, value: &str) -> Vec<u8> {
    let update_key = jwk(current_seed);
    request::new_update_request(
        &UpdateRequestInfo {
            did_suffix: suffix.to_string(),
            reveal_value: get_reveal_value(&update_key, SHA2_256_CODE).unwrap(),
            update_key,
            update_commitment: get_commitment(&jwk(next_seed), SHA2_256_CODE).unwrap(),
            patches: vec![json_patch(
                json!([{"op": "replace", "path": "/test", "value": value}]),
            )],
            multihash_code: SHA2_256_CODE,
            anchor_from: 0,
            anchor_until: 0,
        },
        &TestSigner,
    )
    .unwrap()
}

fn suffix_of(request: &[u8]) -> String {
    let protocol = Protocol::default();
    OperationParser::new(&protocol)
        .parse_create_operation(request, true)
        .unwrap()
        .unique_suffix
}

lazy_static! {
    static ref DEFAULT_REGISTRY: ProtocolRegistry = ProtocolRegistry::default();
}

fn processor(
    store: Arc<MemoryOperationStore>,
) -> OperationProcessor<Arc<MemoryOperationStore>> {
    OperationProcessor::new(NAMESPACE, store, DEFAULT_REGISTRY.clone())
}

#[test]
fn create_and_resolve() {
    let store = Arc::new(MemoryOperationStore::new());
    let create = create_request_bytes(1, 2);
    let suffix = suffix_of(&create);
    store.put(anchored(
        create,
        OperationType::Create,
        &suffix,
        1_600_000_000,
        0,
        "ref-create",
    ));

    let result = processor(store)
        .resolve(&suffix, &ResolutionOptions::default())
        .unwrap();

    let keys = result.document["publicKeys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["id"], json!("key1"));

    let metadata = &result.document_metadata;
    assert_eq!(metadata.deactivated, None);
    assert!(metadata.created.is_some());
    assert_eq!(
        metadata.method.recovery_commitment.as_deref(),
        Some(get_commitment(&jwk(1), SHA2_256_CODE).unwrap().as_str())
    );
    assert_eq!(
        metadata.method.update_commitment.as_deref(),
        Some(get_commitment(&jwk(2), SHA2_256_CODE).unwrap().as_str())
    );
    assert!(metadata.method.published);
}

#[test]
fn full_lifecycle_update_recover_deactivate() {
    let store = Arc::new(MemoryOperationStore::new());
    let create = create_request_bytes(1, 2);
    let suffix = suffix_of(&create);
    store.put(anchored(
        create,
        OperationType::Create,
        &suffix,
        1,
        0,
        "ref-create",
    ));

    // Update rotates the update commitment and edits the document.
    store.put(anchored(
        update_request_bytes(2, 3, &suffix, "special1"),
        OperationType::Update,
        &suffix,
        2,
        0,
        "ref-u1",
    ));

    let p = processor(Arc::clone(&store));
    let result = p.resolve(&suffix, &ResolutionOptions::default()).unwrap();
    assert_eq!(result.document["test"], json!("special1"));

    // Recover rewrites the document and both commitments.
    let recovery_key = jwk(1);
    let recover = request::new_recover_request(
        &RecoverRequestInfo {
            did_suffix: suffix.clone(),
            reveal_value: get_reveal_value(&recovery_key, SHA2_256_CODE).unwrap(),
            recovery_key,
            recovery_commitment: get_commitment(&jwk(5), SHA2_256_CODE).unwrap(),
            update_commitment: get_commitment(&jwk(6), SHA2_256_CODE).unwrap(),
            patches: vec![Patch::Replace {
                document: DocumentState {
                    public_keys: Some(vec![key_entry("recovered1")]),
                    services: None,
                },
            }],
            multihash_code: SHA2_256_CODE,
            anchor_origin: None,
            anchor_from: 0,
            anchor_until: 0,
        },
        &TestSigner,
    )
    .unwrap();
    store.put(anchored(
        recover,
        OperationType::Recover,
        &suffix,
        3,
        0,
        "ref-r1",
    ));

    let result = p.resolve(&suffix, &ResolutionOptions::default()).unwrap();
    let keys = result.document["publicKeys"].as_array().unwrap();
    assert_eq!(keys[0]["id"], json!("recovered1"));
    assert!(result.document.get("test").is_none());

    // Deactivate with the rotated recovery key is terminal.
    let rotated_recovery_key = jwk(5);
    let deactivate = request::new_deactivate_request(
        &DeactivateRequestInfo {
            did_suffix: suffix.clone(),
            reveal_value: get_reveal_value(&rotated_recovery_key, SHA2_256_CODE).unwrap(),
            recovery_key: rotated_recovery_key,
            anchor_from: 0,
            anchor_until: 0,
        },
        &TestSigner,
    )
    .unwrap();
    store.put(anchored(
        deactivate,
        OperationType::Deactivate,
        &suffix,
        4,
        0,
        "ref-d1",
    ));

    let result = p.resolve(&suffix, &ResolutionOptions::default()).unwrap();
    assert_eq!(result.document_metadata.deactivated, Some(true));
    assert!(result.document_metadata.method.recovery_commitment.is_none());
    assert!(result.document_metadata.method.update_commitment.is_none());
    assert_eq!(result.document, json!({}));

    // Nothing applies after deactivation.
    store.put(anchored(
        update_request_bytes(6, 7, &suffix, "late"),
        OperationType::Update,
        &suffix,
        5,
        0,
        "ref-late",
    ));
    let unchanged = p.resolve(&suffix, &ResolutionOptions::default()).unwrap();
    assert_eq!(unchanged.document, json!({}));
    assert_eq!(unchanged.document_metadata.deactivated, Some(true));
}

#[test]
fn update_reusing_current_commitment_is_discarded() {
    let store = Arc::new(MemoryOperationStore::new());
    let create = create_request_bytes(1, 2);
    let suffix = suffix_of(&create);
    store.put(anchored(
        create,
        OperationType::Create,
        &suffix,
        1,
        0,
        "ref-create",
    ));

    // The builder refuses to produce immediate commitment reuse, which is
    // exactly the misbehavior the resolver must also reject.
    let update_key = jwk(2);
    let err = request::new_update_request(
        &UpdateRequestInfo {
            did_suffix: suffix.clone(),
            reveal_value: get_reveal_value(&update_key, SHA2_256_CODE).unwrap(),
            update_commitment: get_commitment(&update_key, SHA2_256_CODE).unwrap(),
            update_key,
            patches: vec![json_patch(
                json!([{"op": "replace", "path": "/test", "value": "x"}]),
            )],
            multihash_code: SHA2_256_CODE,
            anchor_from: 0,
            anchor_until: 0,
        },
        &TestSigner,
    )
    .unwrap_err();
    assert_eq!(
        err.kind(),
        sidetree::operations::ErrorKind::KeyReuse
    );

    let result = processor(store)
        .resolve(&suffix, &ResolutionOptions::default())
        .unwrap();
    assert_eq!(result.document["test"], json!("special0"));
}

#[test]
fn version_time_selects_historical_state() {
    let store = Arc::new(MemoryOperationStore::new());
    let create = create_request_bytes(1, 2);
    let suffix = suffix_of(&create);
    store.put(anchored(
        create,
        OperationType::Create,
        &suffix,
        1_600_000_000,
        0,
        "ref-create",
    ));
    store.put(anchored(
        update_request_bytes(2, 3, &suffix, "special10"),
        OperationType::Update,
        &suffix,
        1_600_000_010,
        0,
        "ref-u10",
    ));
    store.put(anchored(
        update_request_bytes(3, 4, &suffix, "special20"),
        OperationType::Update,
        &suffix,
        1_600_000_020,
        0,
        "ref-u20",
    ));

    let p = processor(store);
    let historical = p
        .resolve(
            &suffix,
            &ResolutionOptions {
                version_time: Some("2020-09-13T12:26:55Z".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(historical.document["test"], json!("special10"));

    let latest = p.resolve(&suffix, &ResolutionOptions::default()).unwrap();
    assert_eq!(latest.document["test"], json!("special20"));
}

#[test]
fn long_form_resolution_without_anchored_operations() {
    let store = Arc::new(MemoryOperationStore::new());
    let p = processor(store);

    let create = create_request_bytes(1, 2);
    let create_request: CreateRequest = serde_json::from_slice(&create).unwrap();
    let did = long_form_did(NAMESPACE, &create_request, SHA2_256_CODE).unwrap();

    let result = p.resolve_did(&did, &ResolutionOptions::default()).unwrap();
    let keys = result.document["publicKeys"].as_array().unwrap();
    assert_eq!(keys[0]["id"], json!("key1"));
    assert!(!result.document_metadata.method.published);
    assert_eq!(result.document_metadata.equivalent_id, vec![did]);

    // The suffix alone still resolves to nothing.
    let suffix = suffix_of(&create);
    assert!(matches!(
        p.resolve(&suffix, &ResolutionOptions::default()).unwrap_err(),
        Error::CreateOperationNotFound
    ));
}

#[test]
fn spec_vector_long_form_did_resolves() {
    let store = Arc::new(MemoryOperationStore::new());
    let p = processor(store);

    let result = p
        .resolve_did(SPEC_VECTOR_LONGFORM_DID, &ResolutionOptions::default())
        .unwrap();
    let keys = result.document["publicKeys"].as_array().unwrap();
    assert_eq!(keys[0]["id"], json!("publicKeyModel1Id"));
    let services = result.document["services"].as_array().unwrap();
    assert_eq!(services[0]["id"], json!("service1Id"));
    assert!(!result.document_metadata.method.published);
}

#[test]
fn spec_vector_long_form_round_trip() {
    let protocol = Protocol::default();
    let parser = OperationParser::new(&protocol);

    let (did, initial_state) = parser
        .parse_did(NAMESPACE, SPEC_VECTOR_LONGFORM_DID)
        .unwrap();
    assert_eq!(did, SPEC_VECTOR_SHORTFORM_DID);

    // The derived suffix must match the one embedded in the DID.
    let op = parser
        .parse_create_operation(&initial_state.unwrap(), false)
        .unwrap();
    assert_eq!(format!("{NAMESPACE}:{}", op.unique_suffix), did);
    assert!(SPEC_VECTOR_LONGFORM_DID.starts_with(SPEC_VECTOR_SHORTFORM_DID));
}
