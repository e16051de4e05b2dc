use super::OperationParser;
use crate::error::Error;
use crate::model::{Operation, OperationType, RecoverRequest, RecoverSignedDataModel};
use sidetree_hashing as hashing;

impl<'a> OperationParser<'a> {
    /// Parse a recover operation request.
    pub fn parse_recover_operation(&self, request: &[u8], batch: bool) -> Result<Operation, Error> {
        let schema: RecoverRequest = serde_json::from_slice(request)?;
        self.validate_recover_request(&schema)?;

        let signed_data = self.parse_signed_data_for_recover(&schema.signed_data)?;
        let recovery_key = signed_data
            .recovery_key
            .as_ref()
            .ok_or(Error::MissingField("signing key"))?;

        if !batch {
            let delta = schema.delta.as_ref().ok_or(Error::MissingField("delta"))?;
            self.validate_delta(delta)?;
            hashing::is_valid_model_multihash(delta, &signed_data.delta_hash)
                .map_err(|_| Error::DeltaHashMismatch)?;
            if delta.update_commitment == signed_data.recovery_commitment {
                return Err(Error::EqualCommitments);
            }
        }

        hashing::is_valid_model_multihash(recovery_key, &schema.reveal_value)
            .map_err(|_| Error::RevealValueMismatch("recovery"))?;

        let anchor_origin = signed_data.anchor_origin.clone();
        Ok(Operation {
            operation_type: OperationType::Recover,
            unique_suffix: schema.did_suffix,
            operation_request: request.to_vec(),
            delta: schema.delta,
            suffix_data: None,
            signed_data: Some(schema.signed_data),
            reveal_value: Some(schema.reveal_value),
            anchor_origin,
        })
    }

    /// Parse and validate the signed-data payload of a recover operation.
    pub fn parse_signed_data_for_recover(
        &self,
        compact_jws: &str,
    ) -> Result<RecoverSignedDataModel, Error> {
        let jws = self.parse_signed_data(compact_jws)?;
        let model: RecoverSignedDataModel = serde_json::from_slice(&jws.payload)?;
        let recovery_key = self.validate_signing_key(model.recovery_key.as_ref())?;
        self.validate_multihash(&model.recovery_commitment)?;
        self.validate_multihash(&model.delta_hash)?;
        self.validate_commitment(recovery_key, &model.recovery_commitment)?;
        Ok(model)
    }

    fn validate_recover_request(&self, request: &RecoverRequest) -> Result<(), Error> {
        if request.did_suffix.is_empty() {
            return Err(Error::MissingField("did suffix"));
        }
        if request.signed_data.is_empty() {
            return Err(Error::MissingField("signed data"));
        }
        self.validate_multihash(&request.reveal_value)
    }
}
