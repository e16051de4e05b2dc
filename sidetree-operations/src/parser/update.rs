use super::OperationParser;
use crate::error::Error;
use crate::model::{Operation, OperationType, UpdateRequest, UpdateSignedDataModel};
use sidetree_hashing as hashing;

impl<'a> OperationParser<'a> {
    /// Parse an update operation request.
    pub fn parse_update_operation(&self, request: &[u8], batch: bool) -> Result<Operation, Error> {
        let schema: UpdateRequest = serde_json::from_slice(request)?;
        self.validate_update_request(&schema)?;

        let signed_data = self.parse_signed_data_for_update(&schema.signed_data)?;
        let update_key = signed_data
            .update_key
            .as_ref()
            .ok_or(Error::MissingField("signing key"))?;

        if !batch {
            let delta = schema.delta.as_ref().ok_or(Error::MissingField("delta"))?;
            self.validate_delta(delta)?;
            hashing::is_valid_model_multihash(delta, &signed_data.delta_hash)
                .map_err(|_| Error::DeltaHashMismatch)?;
            self.validate_commitment(update_key, &delta.update_commitment)?;
        }

        hashing::is_valid_model_multihash(update_key, &schema.reveal_value)
            .map_err(|_| Error::RevealValueMismatch("update"))?;

        Ok(Operation {
            operation_type: OperationType::Update,
            unique_suffix: schema.did_suffix,
            operation_request: request.to_vec(),
            delta: schema.delta,
            suffix_data: None,
            signed_data: Some(schema.signed_data),
            reveal_value: Some(schema.reveal_value),
            anchor_origin: None,
        })
    }

    /// Parse and validate the signed-data payload of an update operation.
    pub fn parse_signed_data_for_update(
        &self,
        compact_jws: &str,
    ) -> Result<UpdateSignedDataModel, Error> {
        let jws = self.parse_signed_data(compact_jws)?;
        let model: UpdateSignedDataModel = serde_json::from_slice(&jws.payload)?;
        self.validate_signing_key(model.update_key.as_ref())?;
        self.validate_multihash(&model.delta_hash)?;
        Ok(model)
    }

    fn validate_update_request(&self, request: &UpdateRequest) -> Result<(), Error> {
        if request.did_suffix.is_empty() {
            return Err(Error::MissingField("did suffix"));
        }
        if request.signed_data.is_empty() {
            return Err(Error::MissingField("signed data"));
        }
        self.validate_multihash(&request.reveal_value)
    }
}
