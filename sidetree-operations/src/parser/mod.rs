//! Operation request parsing and validation.
//!
//! The parser is constructed over the protocol parameters in force at the
//! operation's anchoring time, so historical operations are validated under
//! the rules of their epoch.
//!
//! Every entry point takes a `batch` flag: batch-time parsing (operations
//! already anchored) skips the checks the applier performs itself — delta
//! validation and commitment-reuse — while request-time parsing runs the
//! full set.

mod create;
mod deactivate;
mod did;
mod recover;
mod update;

pub use did::long_form_did;

use crate::commitment;
use crate::error::Error;
use crate::model::{DeltaModel, Operation, OperationType};
use crate::patch::Patch;
use crate::protocol::Protocol;
use serde::Deserialize;
use sidetree_hashing as hashing;
use sidetree_hashing::encoder;
use sidetree_jws::{CompactJws, PublicKeyJwk};

/// Parser for operation requests under one set of protocol parameters.
pub struct OperationParser<'a> {
    protocol: &'a Protocol,
}

#[derive(Deserialize)]
struct OperationHeader {
    #[serde(rename = "type")]
    operation: Option<String>,
}

impl<'a> OperationParser<'a> {
    pub fn new(protocol: &'a Protocol) -> Self {
        OperationParser { protocol }
    }

    pub fn protocol(&self) -> &Protocol {
        self.protocol
    }

    /// Parse an operation request of any type.
    pub fn parse_operation(&self, request: &[u8], batch: bool) -> Result<Operation, Error> {
        if request.len() > self.protocol.max_operation_size {
            return Err(Error::OperationSizeExceeded {
                size: request.len(),
                max: self.protocol.max_operation_size,
            });
        }
        let header: OperationHeader = serde_json::from_slice(request)?;
        match header.operation.as_deref() {
            Some("create") => self.parse_create_operation(request, batch),
            Some("update") => self.parse_update_operation(request, batch),
            Some("recover") => self.parse_recover_operation(request, batch),
            Some("deactivate") => self.parse_deactivate_operation(request, batch),
            other => Err(Error::OperationTypeNotSupported(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    /// Commitment the operation proposes for the operation that follows it.
    ///
    /// Deactivate proposes none and yields an empty string; create derives
    /// its commitments rather than proposing them, so it is not supported.
    pub fn next_operation_commitment(&self, request: &[u8]) -> Result<String, Error> {
        let op = self.parse_operation(request, true)?;
        match op.operation_type {
            OperationType::Update => Ok(op
                .delta
                .map(|delta| delta.update_commitment)
                .unwrap_or_default()),
            OperationType::Recover => {
                let signed_data = op.signed_data.unwrap_or_default();
                let model = self.parse_signed_data_for_recover(&signed_data)?;
                Ok(model.recovery_commitment)
            }
            OperationType::Deactivate => Ok(String::new()),
            OperationType::Create => {
                Err(Error::OperationTypeNotSupported("create".to_string()))
            }
        }
    }

    /// Reveal value carried by the operation envelope.
    pub fn reveal_value(&self, request: &[u8]) -> Result<String, Error> {
        let op = self.parse_operation(request, true)?;
        match op.operation_type {
            OperationType::Create => {
                Err(Error::OperationTypeNotSupported("create".to_string()))
            }
            _ => op.reveal_value.ok_or(Error::MissingField("reveal value")),
        }
    }

    /// Validate a delta against protocol limits and patch rules.
    pub fn validate_delta(&self, delta: &DeltaModel) -> Result<(), Error> {
        let canonical = hashing::canonicalize(delta)?;
        if canonical.len() > self.protocol.max_delta_size {
            return Err(Error::DeltaSizeExceeded {
                size: canonical.len(),
                max: self.protocol.max_delta_size,
            });
        }
        self.validate_multihash(&delta.update_commitment)?;
        self.validate_patches(&delta.patches)
    }

    fn validate_patches(&self, patches: &[Patch]) -> Result<(), Error> {
        if patches.is_empty() {
            return Err(Error::MissingPatches);
        }
        for patch in patches {
            if !self.protocol.patches.iter().any(|a| a == patch.action()) {
                return Err(Error::PatchActionNotAllowed(patch.action().to_string()));
            }
            patch.validate()?;
        }
        Ok(())
    }

    /// Check that the value is a well-formed multihash whose algorithm and
    /// length are permitted by the protocol.
    fn validate_multihash(&self, multihash: &str) -> Result<(), Error> {
        if multihash.len() > self.protocol.max_operation_hash_length {
            return Err(Error::HashLengthExceeded {
                length: multihash.len(),
                max: self.protocol.max_operation_hash_length,
            });
        }
        let code = hashing::multihash_code(multihash)?;
        if !self.protocol.multihash_algorithms.contains(&code) {
            return Err(Error::MultihashCodeNotAllowed(code));
        }
        Ok(())
    }

    fn validate_signing_key<'k>(
        &self,
        key: Option<&'k PublicKeyJwk>,
    ) -> Result<&'k PublicKeyJwk, Error> {
        let key = key.ok_or(Error::MissingField("signing key"))?;
        key.validate()?;
        if !self.protocol.key_algorithms.iter().any(|crv| crv == &key.crv) {
            return Err(Error::KeyAlgorithmNotAllowed(key.crv.clone()));
        }
        self.validate_nonce(key.nonce.as_deref())?;
        Ok(key)
    }

    fn validate_nonce(&self, nonce: Option<&str>) -> Result<(), Error> {
        let nonce = match nonce {
            Some(nonce) => nonce,
            None => return Ok(()),
        };
        let bytes = encoder::decode_string(nonce).map_err(|e| Error::Hashing(e.into()))?;
        if bytes.len() != self.protocol.nonce_size {
            return Err(Error::NonceSizeMismatch {
                found: bytes.len(),
                expected: self.protocol.nonce_size,
            });
        }
        Ok(())
    }

    fn parse_signed_data(&self, compact_jws: &str) -> Result<CompactJws, Error> {
        if compact_jws.is_empty() {
            return Err(Error::MissingField("signed data"));
        }
        let jws = sidetree_jws::parse_compact_jws(compact_jws)?;
        sidetree_jws::validate_protected_header(&jws.header, &self.protocol.signature_algorithms)?;
        Ok(jws)
    }

    /// Reject a key that commits to itself: the commitment derived from the
    /// signing key must differ from the next commitment it proposes.
    fn validate_commitment(&self, jwk: &PublicKeyJwk, next_commitment: &str) -> Result<(), Error> {
        let code = hashing::multihash_code(next_commitment)?;
        let current_commitment = commitment::get_commitment(jwk, code)?;
        if current_commitment == next_commitment {
            return Err(Error::CommitmentReuse);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::{get_commitment, get_reveal_value};
    use crate::model::CreateRequest;
    use crate::patch::{KeyPurpose, PublicKeyEntry};
    use crate::request::{
        self, CreateRequestInfo, DeactivateRequestInfo, RecoverRequestInfo, Signer,
        UpdateRequestInfo,
    };
    use serde_json::json;
    use sidetree_hashing::{SHA2_256_CODE, SHA2_512_CODE};
    use sidetree_jws::Header;

    struct TestSigner {
        algorithm: &'static str,
    }

    impl Signer for TestSigner {
        fn sign(&self, _data: &[u8]) -> Result<Vec<u8>, anyhow::Error> {
            Ok(b"signature".to_vec())
        }

        fn headers(&self) -> Header {
            Header {
                algorithm: self.algorithm.to_string(),
                ..Default::default()
            }
        }
    }

    fn signer() -> TestSigner {
        TestSigner { algorithm: "ES256" }
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

    fn add_key_patch(id: &str) -> Patch {
        Patch::AddPublicKeys {
            public_keys: vec![PublicKeyEntry {
                id: id.to_string(),
                r#type: "JsonWebKey2020".to_string(),
                purposes: Some(vec![KeyPurpose::Authentication]),
                public_key_jwk: Some(jwk(100)),
                public_key_base58: None,
            }],
        }
    }

    fn create_request(code: u64) -> Vec<u8> {
        request::new_create_request(&CreateRequestInfo {
            recovery_commitment: get_commitment(&jwk(1), code).unwrap(),
            update_commitment: get_commitment(&jwk(2), code).unwrap(),
            patches: vec![add_key_patch("key-1")],
            multihash_code: code,
            anchor_origin: None,
        })
        .unwrap()
    }

    fn update_request(update_key: PublicKeyJwk, suffix: &str) -> Vec<u8> {
        request::new_update_request(
            &UpdateRequestInfo {
                did_suffix: suffix.to_string(),
                reveal_value: get_reveal_value(&update_key, SHA2_256_CODE).unwrap(),
                update_key,
                update_commitment: get_commitment(&jwk(3), SHA2_256_CODE).unwrap(),
                patches: vec![add_key_patch("key-2")],
                multihash_code: SHA2_256_CODE,
                anchor_from: 0,
                anchor_until: 0,
            },
            &signer(),
        )
        .unwrap()
    }

    #[test]
    fn parse_create_round_trip() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);
        let request = create_request(SHA2_256_CODE);

        let op = parser.parse_create_operation(&request, false).unwrap();
        assert_eq!(op.operation_type, OperationType::Create);
        assert!(!op.unique_suffix.is_empty());
        assert!(op.signed_data.is_none());

        let again = parser.parse_operation(&request, false).unwrap();
        assert_eq!(again.unique_suffix, op.unique_suffix);
    }

    #[test]
    fn create_rejects_equal_commitments() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);
        let commitment = get_commitment(&jwk(1), SHA2_256_CODE).unwrap();

        let delta = DeltaModel {
            update_commitment: commitment.clone(),
            patches: vec![add_key_patch("key-1")],
        };
        let request = json!({
            "type": "create",
            "suffixData": {
                "deltaHash": hashing::calculate_model_multihash(&delta, SHA2_256_CODE).unwrap(),
                "recoveryCommitment": commitment,
            },
            "delta": serde_json::to_value(&delta).unwrap(),
        });
        let err = parser
            .parse_create_operation(request.to_string().as_bytes(), false)
            .unwrap_err();
        assert!(matches!(err, Error::EqualCommitments));
    }

    #[test]
    fn parse_update_round_trip() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);
        let request = update_request(jwk(5), "suffix");

        let op = parser.parse_update_operation(&request, false).unwrap();
        assert_eq!(op.operation_type, OperationType::Update);
        assert_eq!(op.unique_suffix, "suffix");
        assert!(op.reveal_value.is_some());
    }

    #[test]
    fn update_rejects_wrong_reveal_value() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);
        let request = update_request(jwk(5), "suffix");

        let mut parsed: serde_json::Value = serde_json::from_slice(&request).unwrap();
        parsed["revealValue"] =
            json!(get_reveal_value(&jwk(6), SHA2_256_CODE).unwrap());
        let err = parser
            .parse_update_operation(parsed.to_string().as_bytes(), false)
            .unwrap_err();
        assert!(matches!(err, Error::RevealValueMismatch("update")));
    }

    #[test]
    fn update_rejects_immediate_commitment_reuse() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);
        let update_key = jwk(5);
        let err = request::new_update_request(
            &UpdateRequestInfo {
                did_suffix: "suffix".to_string(),
                reveal_value: get_reveal_value(&update_key, SHA2_256_CODE).unwrap(),
                update_commitment: get_commitment(&update_key, SHA2_256_CODE).unwrap(),
                update_key,
                patches: vec![add_key_patch("key-2")],
                multihash_code: SHA2_256_CODE,
                anchor_from: 0,
                anchor_until: 0,
            },
            &signer(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::CommitmentReuse));

        // The same reuse assembled by hand must fail at parse time.
        let update_key = jwk(5);
        let commitment = get_commitment(&update_key, SHA2_256_CODE).unwrap();
        let delta = DeltaModel {
            update_commitment: commitment,
            patches: vec![add_key_patch("key-2")],
        };
        let signed_model = crate::model::UpdateSignedDataModel {
            delta_hash: hashing::calculate_model_multihash(&delta, SHA2_256_CODE).unwrap(),
            update_key: Some(update_key.clone()),
            anchor_from: 0,
            anchor_until: 0,
        };
        let header = encoder::encode_to_string(br#"{"alg":"ES256"}"#);
        let payload =
            encoder::encode_to_string(&hashing::canonicalize(&signed_model).unwrap());
        let request = json!({
            "type": "update",
            "didSuffix": "suffix",
            "revealValue": get_reveal_value(&update_key, SHA2_256_CODE).unwrap(),
            "signedData": format!("{header}.{payload}.c2ln"),
            "delta": serde_json::to_value(&delta).unwrap(),
        });
        let err = parser
            .parse_update_operation(request.to_string().as_bytes(), false)
            .unwrap_err();
        assert!(matches!(err, Error::CommitmentReuse));
    }

    #[test]
    fn parse_recover_and_deactivate_round_trip() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);
        let recovery_key = jwk(7);

        let recover = request::new_recover_request(
            &RecoverRequestInfo {
                did_suffix: "suffix".to_string(),
                reveal_value: get_reveal_value(&recovery_key, SHA2_256_CODE).unwrap(),
                recovery_key: recovery_key.clone(),
                recovery_commitment: get_commitment(&jwk(8), SHA2_256_CODE).unwrap(),
                update_commitment: get_commitment(&jwk(9), SHA2_256_CODE).unwrap(),
                patches: vec![add_key_patch("key-3")],
                multihash_code: SHA2_256_CODE,
                anchor_origin: Some(json!("origin.example")),
                anchor_from: 0,
                anchor_until: 0,
            },
            &signer(),
        )
        .unwrap();
        let op = parser.parse_recover_operation(&recover, false).unwrap();
        assert_eq!(op.operation_type, OperationType::Recover);
        assert_eq!(op.anchor_origin, Some(json!("origin.example")));

        let deactivate = request::new_deactivate_request(
            &DeactivateRequestInfo {
                did_suffix: "suffix".to_string(),
                reveal_value: get_reveal_value(&recovery_key, SHA2_256_CODE).unwrap(),
                recovery_key,
                anchor_from: 0,
                anchor_until: 0,
            },
            &signer(),
        )
        .unwrap();
        let op = parser.parse_deactivate_operation(&deactivate, false).unwrap();
        assert_eq!(op.operation_type, OperationType::Deactivate);
        assert!(op.delta.is_none());
    }

    #[test]
    fn deactivate_rejects_envelope_mismatch() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);
        let recovery_key = jwk(7);
        let deactivate = request::new_deactivate_request(
            &DeactivateRequestInfo {
                did_suffix: "suffix".to_string(),
                reveal_value: get_reveal_value(&recovery_key, SHA2_256_CODE).unwrap(),
                recovery_key,
                anchor_from: 0,
                anchor_until: 0,
            },
            &signer(),
        )
        .unwrap();

        let mut parsed: serde_json::Value = serde_json::from_slice(&deactivate).unwrap();
        parsed["didSuffix"] = json!("other-suffix");
        let err = parser
            .parse_deactivate_operation(parsed.to_string().as_bytes(), false)
            .unwrap_err();
        assert!(matches!(err, Error::SignedDataMismatch("did suffix")));
    }

    #[test]
    fn signature_algorithm_allow_list_enforced() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);
        let update_key = jwk(5);
        let request = request::new_update_request(
            &UpdateRequestInfo {
                did_suffix: "suffix".to_string(),
                reveal_value: get_reveal_value(&update_key, SHA2_256_CODE).unwrap(),
                update_key,
                update_commitment: get_commitment(&jwk(3), SHA2_256_CODE).unwrap(),
                patches: vec![add_key_patch("key-2")],
                multihash_code: SHA2_256_CODE,
                anchor_from: 0,
                anchor_until: 0,
            },
            &TestSigner { algorithm: "HS256" },
        )
        .unwrap();
        let err = parser.parse_update_operation(&request, false).unwrap_err();
        assert!(matches!(
            err,
            Error::Jws(sidetree_jws::Error::AlgorithmNotAllowed(_))
        ));
    }

    #[test]
    fn multihash_algorithm_allow_list_enforced() {
        let protocol = Protocol {
            multihash_algorithms: vec![SHA2_256_CODE],
            ..Protocol::default()
        };
        let parser = OperationParser::new(&protocol);
        let request = create_request(SHA2_512_CODE);
        let err = parser.parse_create_operation(&request, false).unwrap_err();
        assert!(matches!(err, Error::MultihashCodeNotAllowed(c) if c == SHA2_512_CODE));
    }

    #[test]
    fn key_algorithm_allow_list_enforced() {
        let protocol = Protocol {
            key_algorithms: vec!["Ed25519".to_string()],
            ..Protocol::default()
        };
        let parser = OperationParser::new(&protocol);
        let request = update_request(jwk(5), "suffix");
        let err = parser.parse_update_operation(&request, false).unwrap_err();
        assert!(matches!(err, Error::KeyAlgorithmNotAllowed(crv) if crv == "P-256"));
    }

    #[test]
    fn delta_size_cap_enforced() {
        let protocol = Protocol {
            max_delta_size: 50,
            ..Protocol::default()
        };
        let parser = OperationParser::new(&protocol);
        let request = update_request(jwk(5), "suffix");
        let err = parser.parse_update_operation(&request, false).unwrap_err();
        assert!(matches!(err, Error::DeltaSizeExceeded { max: 50, .. }));
    }

    #[test]
    fn nonce_size_enforced() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);
        let mut update_key = jwk(5);
        update_key.nonce = Some(encoder::encode_to_string(&[1u8; 8]));
        let request = update_request(update_key, "suffix");
        let err = parser.parse_update_operation(&request, false).unwrap_err();
        assert!(matches!(
            err,
            Error::NonceSizeMismatch {
                found: 8,
                expected: 16
            }
        ));
    }

    #[test]
    fn long_form_did_round_trip() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);
        let request_bytes = create_request(SHA2_256_CODE);
        let create_request: CreateRequest = serde_json::from_slice(&request_bytes).unwrap();

        let did = long_form_did("did:sidetree", &create_request, SHA2_256_CODE).unwrap();
        let (short_did, initial_state) = parser.parse_did("did:sidetree", &did).unwrap();
        assert!(did.starts_with(&short_did));

        let initial_state = initial_state.unwrap();
        let op = parser.parse_create_operation(&initial_state, false).unwrap();
        assert_eq!(format!("did:sidetree:{}", op.unique_suffix), short_did);
    }

    #[test]
    fn long_form_did_rejects_tampered_state() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);
        let request_bytes = create_request(SHA2_256_CODE);
        let create_request: CreateRequest = serde_json::from_slice(&request_bytes).unwrap();
        let did = long_form_did("did:sidetree", &create_request, SHA2_256_CODE).unwrap();

        // Whitespace survives base64url decoding but not re-canonicalization.
        let tail = did.rsplit(':').next().unwrap();
        let mut decoded = encoder::decode_string(tail).unwrap();
        decoded.extend_from_slice(b" ");
        let tampered = did.replace(tail, &encoder::encode_to_string(&decoded));

        let err = parser.parse_did("did:sidetree", &tampered).unwrap_err();
        assert!(matches!(err, Error::InitialStateInvalid));
    }

    #[test]
    fn short_form_did_passes_through() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);
        let (did, initial_state) = parser
            .parse_did("did:sidetree", "did:sidetree:EiAsuffix")
            .unwrap();
        assert_eq!(did, "did:sidetree:EiAsuffix");
        assert!(initial_state.is_none());

        assert!(matches!(
            parser.parse_did("did:sidetree", "did:other:EiAsuffix"),
            Err(Error::NamespaceMismatch(_))
        ));
    }

    #[test]
    fn next_commitment_and_reveal_value_extraction() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);

        let update_key = jwk(5);
        let reveal = get_reveal_value(&update_key, SHA2_256_CODE).unwrap();
        let next_commitment = get_commitment(&jwk(3), SHA2_256_CODE).unwrap();
        let update = request::new_update_request(
            &UpdateRequestInfo {
                did_suffix: "suffix".to_string(),
                reveal_value: reveal.clone(),
                update_key,
                update_commitment: next_commitment.clone(),
                patches: vec![add_key_patch("key-2")],
                multihash_code: SHA2_256_CODE,
                anchor_from: 0,
                anchor_until: 0,
            },
            &signer(),
        )
        .unwrap();

        assert_eq!(
            parser.next_operation_commitment(&update).unwrap(),
            next_commitment
        );
        assert_eq!(parser.reveal_value(&update).unwrap(), reveal);

        let recovery_key = jwk(7);
        let deactivate = request::new_deactivate_request(
            &DeactivateRequestInfo {
                did_suffix: "suffix".to_string(),
                reveal_value: get_reveal_value(&recovery_key, SHA2_256_CODE).unwrap(),
                recovery_key,
                anchor_from: 0,
                anchor_until: 0,
            },
            &signer(),
        )
        .unwrap();
        assert_eq!(parser.next_operation_commitment(&deactivate).unwrap(), "");

        let create = create_request(SHA2_256_CODE);
        assert!(matches!(
            parser.next_operation_commitment(&create).unwrap_err(),
            Error::OperationTypeNotSupported(_)
        ));
        assert!(matches!(
            parser.reveal_value(&create).unwrap_err(),
            Error::OperationTypeNotSupported(_)
        ));
    }

    #[test]
    fn unknown_operation_type_rejected() {
        let protocol = Protocol::default();
        let parser = OperationParser::new(&protocol);
        let err = parser
            .parse_operation(br#"{"type":"other"}"#, false)
            .unwrap_err();
        assert!(matches!(err, Error::OperationTypeNotSupported(t) if t == "other"));
    }

    #[test]
    fn operation_size_cap_enforced() {
        let protocol = Protocol {
            max_operation_size: 10,
            ..Protocol::default()
        };
        let parser = OperationParser::new(&protocol);
        let err = parser
            .parse_operation(br#"{"type":"create","delta":{}}"#, false)
            .unwrap_err();
        assert!(matches!(err, Error::OperationSizeExceeded { max: 10, .. }));
    }
}
