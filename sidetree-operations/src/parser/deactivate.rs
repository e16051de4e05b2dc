use super::OperationParser;
use crate::error::Error;
use crate::model::{DeactivateRequest, DeactivateSignedDataModel, Operation, OperationType};
use sidetree_hashing as hashing;

impl<'a> OperationParser<'a> {
    /// Parse a deactivate operation request.
    pub fn parse_deactivate_operation(
        &self,
        request: &[u8],
        _batch: bool,
    ) -> Result<Operation, Error> {
        let schema: DeactivateRequest = serde_json::from_slice(request)?;
        self.validate_deactivate_request(&schema)?;

        let signed_data = self.parse_signed_data_for_deactivate(&schema.signed_data)?;
        if signed_data.did_suffix != schema.did_suffix {
            return Err(Error::SignedDataMismatch("did suffix"));
        }
        if signed_data.reveal_value != schema.reveal_value {
            return Err(Error::SignedDataMismatch("reveal value"));
        }
        let recovery_key = signed_data
            .recovery_key
            .as_ref()
            .ok_or(Error::MissingField("signing key"))?;

        hashing::is_valid_model_multihash(recovery_key, &schema.reveal_value)
            .map_err(|_| Error::RevealValueMismatch("recovery"))?;

        Ok(Operation {
            operation_type: OperationType::Deactivate,
            unique_suffix: schema.did_suffix,
            operation_request: request.to_vec(),
            delta: None,
            suffix_data: None,
            signed_data: Some(schema.signed_data),
            reveal_value: Some(schema.reveal_value),
            anchor_origin: None,
        })
    }

    /// Parse and validate the signed-data payload of a deactivate operation.
    pub fn parse_signed_data_for_deactivate(
        &self,
        compact_jws: &str,
    ) -> Result<DeactivateSignedDataModel, Error> {
        let jws = self.parse_signed_data(compact_jws)?;
        let model: DeactivateSignedDataModel = serde_json::from_slice(&jws.payload)?;
        self.validate_signing_key(model.recovery_key.as_ref())?;
        Ok(model)
    }

    fn validate_deactivate_request(&self, request: &DeactivateRequest) -> Result<(), Error> {
        if request.did_suffix.is_empty() {
            return Err(Error::MissingField("did suffix"));
        }
        if request.signed_data.is_empty() {
            return Err(Error::MissingField("signed data"));
        }
        self.validate_multihash(&request.reveal_value)
    }
}
