//! Application of a single anchored operation to the resolution state.
//!
//! The applier enforces the per-DID state machine: create initializes the
//! state, update and recover advance it under commitment checks, and a
//! deactivate is terminal. A failed check leaves the caller's model
//! untouched; the processor discards the operation and moves on.

use crate::error::Error;
use crate::resolution::ResolutionModel;
use log::debug;
use sidetree_hashing as hashing;
use sidetree_jws::PublicKeyJwk;
use sidetree_operations::document::Document;
use sidetree_operations::{
    commitment, composer, AnchoredOperation, Error as OperationError, OperationParser,
    OperationType, Protocol,
};

pub struct OperationApplier<'a> {
    protocol: &'a Protocol,
}

impl<'a> OperationApplier<'a> {
    pub fn new(protocol: &'a Protocol) -> Self {
        OperationApplier { protocol }
    }

    /// Apply `op` to `rm`, returning the advanced model.
    pub fn apply(
        &self,
        op: &AnchoredOperation,
        rm: &ResolutionModel,
    ) -> Result<ResolutionModel, Error> {
        if rm.deactivated {
            return Err(Error::DocumentDeactivated);
        }
        match op.operation_type {
            OperationType::Create => self.apply_create_operation(op, rm),
            OperationType::Update => self.apply_update_operation(op, rm),
            OperationType::Recover => self.apply_recover_operation(op, rm),
            OperationType::Deactivate => self.apply_deactivate_operation(op, rm),
        }
    }

    fn parser(&self) -> OperationParser<'a> {
        OperationParser::new(self.protocol)
    }

    fn apply_create_operation(
        &self,
        op: &AnchoredOperation,
        rm: &ResolutionModel,
    ) -> Result<ResolutionModel, Error> {
        if rm.doc.is_some() {
            return Err(Error::CreateNotFirst);
        }

        let parsed = self.parser().parse_create_operation(&op.operation_request, false)?;
        if parsed.unique_suffix != op.unique_suffix {
            return Err(Error::DidSuffixMismatch {
                expected: op.unique_suffix.clone(),
                actual: parsed.unique_suffix,
            });
        }
        let suffix_data = parsed
            .suffix_data
            .ok_or(OperationError::MissingField("suffix data"))?;
        let delta = parsed.delta.ok_or(OperationError::MissingField("delta"))?;

        let doc = composer::apply_patches(Document::new(), &delta.patches)?;
        Ok(ResolutionModel {
            doc: Some(doc),
            created_time: op.transaction_time,
            updated_time: op.transaction_time,
            version_id: op.canonical_reference.clone(),
            update_commitment: delta.update_commitment,
            recovery_commitment: suffix_data.recovery_commitment,
            deactivated: false,
            anchor_origin: suffix_data.anchor_origin,
            published_operations: rm.published_operations.clone(),
            unpublished_operations: rm.unpublished_operations.clone(),
        })
    }

    fn apply_update_operation(
        &self,
        op: &AnchoredOperation,
        rm: &ResolutionModel,
    ) -> Result<ResolutionModel, Error> {
        let doc = match &rm.doc {
            Some(doc) => doc.clone(),
            None => return Err(Error::UpdateWithoutDocument),
        };

        let parsed = self.parser().parse_update_operation(&op.operation_request, true)?;
        let signed_data = parsed
            .signed_data
            .ok_or(OperationError::MissingField("signed data"))?;
        let signed_model = self.parser().parse_signed_data_for_update(&signed_data)?;
        let reveal_value = parsed
            .reveal_value
            .ok_or(OperationError::MissingField("reveal value"))?;

        self.verify_reveal(&reveal_value, &rm.update_commitment, "update")?;
        let update_key = signed_model
            .update_key
            .as_ref()
            .ok_or(OperationError::MissingField("signing key"))?;
        self.verify_key_commitment(update_key, &rm.update_commitment, "update")?;
        self.verify_anchor_window(op, signed_model.anchor_from, signed_model.anchor_until)?;

        let delta = parsed.delta.ok_or(OperationError::MissingField("delta"))?;
        hashing::is_valid_model_multihash(&delta, &signed_model.delta_hash)
            .map_err(|_| OperationError::DeltaHashMismatch)?;
        self.parser().validate_delta(&delta)?;
        if delta.update_commitment == rm.update_commitment {
            return Err(Error::CommitmentReuse);
        }

        let doc = composer::apply_patches(doc, &delta.patches)?;
        Ok(ResolutionModel {
            doc: Some(doc),
            created_time: rm.created_time,
            updated_time: op.transaction_time,
            version_id: op.canonical_reference.clone(),
            update_commitment: delta.update_commitment,
            recovery_commitment: rm.recovery_commitment.clone(),
            deactivated: false,
            anchor_origin: rm.anchor_origin.clone(),
            published_operations: rm.published_operations.clone(),
            unpublished_operations: rm.unpublished_operations.clone(),
        })
    }

    fn apply_recover_operation(
        &self,
        op: &AnchoredOperation,
        rm: &ResolutionModel,
    ) -> Result<ResolutionModel, Error> {
        if rm.doc.is_none() {
            return Err(Error::RecoverWithoutDocument);
        }

        let parsed = self.parser().parse_recover_operation(&op.operation_request, true)?;
        let signed_data = parsed
            .signed_data
            .ok_or(OperationError::MissingField("signed data"))?;
        let signed_model = self.parser().parse_signed_data_for_recover(&signed_data)?;
        let reveal_value = parsed
            .reveal_value
            .ok_or(OperationError::MissingField("reveal value"))?;

        self.verify_reveal(&reveal_value, &rm.recovery_commitment, "recovery")?;
        let recovery_key = signed_model
            .recovery_key
            .as_ref()
            .ok_or(OperationError::MissingField("signing key"))?;
        self.verify_key_commitment(recovery_key, &rm.recovery_commitment, "recovery")?;
        self.verify_anchor_window(op, signed_model.anchor_from, signed_model.anchor_until)?;

        // The commitment checks have passed: the recovery takes effect even
        // when its delta turns out to be unusable. In that case the document
        // is reset and the update chain is severed until the next recovery.
        let mut result = ResolutionModel {
            doc: Some(Document::new()),
            created_time: rm.created_time,
            updated_time: op.transaction_time,
            version_id: op.canonical_reference.clone(),
            update_commitment: String::new(),
            recovery_commitment: signed_model.recovery_commitment.clone(),
            deactivated: false,
            anchor_origin: signed_model.anchor_origin.clone(),
            published_operations: rm.published_operations.clone(),
            unpublished_operations: rm.unpublished_operations.clone(),
        };

        let delta = match parsed.delta {
            Some(delta) => delta,
            None => {
                debug!("recover operation for {} carries no delta", op.unique_suffix);
                return Ok(result);
            }
        };
        if hashing::is_valid_model_multihash(&delta, &signed_model.delta_hash).is_err() {
            debug!(
                "recover delta for {} does not match signed delta hash",
                op.unique_suffix
            );
            return Ok(result);
        }
        if let Err(e) = self.parser().validate_delta(&delta) {
            debug!("invalid recover delta for {}: {}", op.unique_suffix, e);
            return Ok(result);
        }

        result.update_commitment = delta.update_commitment.clone();
        match composer::apply_patches(Document::new(), &delta.patches) {
            Ok(doc) => result.doc = Some(doc),
            Err(e) => {
                debug!(
                    "applying recover patches for {} failed: {}",
                    op.unique_suffix, e
                );
            }
        }
        Ok(result)
    }

    fn apply_deactivate_operation(
        &self,
        op: &AnchoredOperation,
        rm: &ResolutionModel,
    ) -> Result<ResolutionModel, Error> {
        if rm.doc.is_none() {
            return Err(Error::DeactivateWithoutDocument);
        }

        let parsed = self
            .parser()
            .parse_deactivate_operation(&op.operation_request, true)?;
        if parsed.unique_suffix != op.unique_suffix {
            return Err(Error::DidSuffixMismatch {
                expected: op.unique_suffix.clone(),
                actual: parsed.unique_suffix,
            });
        }
        let signed_data = parsed
            .signed_data
            .ok_or(OperationError::MissingField("signed data"))?;
        let signed_model = self
            .parser()
            .parse_signed_data_for_deactivate(&signed_data)?;
        let reveal_value = parsed
            .reveal_value
            .ok_or(OperationError::MissingField("reveal value"))?;

        self.verify_reveal(&reveal_value, &rm.recovery_commitment, "recovery")?;
        let recovery_key = signed_model
            .recovery_key
            .as_ref()
            .ok_or(OperationError::MissingField("signing key"))?;
        self.verify_key_commitment(recovery_key, &rm.recovery_commitment, "recovery")?;
        self.verify_anchor_window(op, signed_model.anchor_from, signed_model.anchor_until)?;

        Ok(ResolutionModel {
            doc: Some(Document::new()),
            created_time: rm.created_time,
            updated_time: op.transaction_time,
            version_id: op.canonical_reference.clone(),
            update_commitment: String::new(),
            recovery_commitment: String::new(),
            deactivated: true,
            anchor_origin: rm.anchor_origin.clone(),
            published_operations: rm.published_operations.clone(),
            unpublished_operations: rm.unpublished_operations.clone(),
        })
    }

    /// The commitment derived from the operation's reveal value must equal
    /// the commitment stored by the previous operation.
    fn verify_reveal(
        &self,
        reveal_value: &str,
        expected_commitment: &str,
        which: &'static str,
    ) -> Result<(), Error> {
        let from_reveal = commitment::get_commitment_from_reveal_value(reveal_value)?;
        if from_reveal != expected_commitment {
            return Err(Error::CommitmentMismatch(which));
        }
        Ok(())
    }

    /// The signed key's own commitment must also equal the stored
    /// commitment, binding the signature to the revealed key.
    fn verify_key_commitment(
        &self,
        key: &PublicKeyJwk,
        expected_commitment: &str,
        which: &'static str,
    ) -> Result<(), Error> {
        let code = hashing::multihash_code(expected_commitment)?;
        let computed = commitment::get_commitment(key, code)?;
        if computed != expected_commitment {
            return Err(Error::CommitmentMismatch(which));
        }
        Ok(())
    }

    /// Anchor time bounds are semantic clock bounds compared against the
    /// operation's transaction time, never wall-clock.
    fn verify_anchor_window(
        &self,
        op: &AnchoredOperation,
        anchor_from: i64,
        anchor_until: i64,
    ) -> Result<(), Error> {
        let anchored = op.transaction_time as i64;
        if (anchor_from != 0 && anchored < anchor_from)
            || (anchor_until != 0 && anchored > anchor_until)
        {
            return Err(Error::AnchorTimeOutOfRange {
                anchored: op.transaction_time,
                from: anchor_from,
                until: anchor_until,
            });
        }
        Ok(())
    }
}
