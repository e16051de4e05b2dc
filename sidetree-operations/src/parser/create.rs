use super::OperationParser;
use crate::error::Error;
use crate::model::{CreateRequest, Operation, OperationType, SuffixDataModel};
use sidetree_hashing as hashing;

impl<'a> OperationParser<'a> {
    /// Parse a create operation request.
    pub fn parse_create_operation(&self, request: &[u8], batch: bool) -> Result<Operation, Error> {
        let mut schema: CreateRequest = serde_json::from_slice(request)?;
        let suffix_data = schema
            .suffix_data
            .take()
            .ok_or(Error::MissingField("suffix data"))?;
        let delta = schema.delta.take().ok_or(Error::MissingField("delta"))?;

        if !batch {
            self.validate_suffix_data(&suffix_data)?;
            self.validate_delta(&delta)?;
            hashing::is_valid_model_multihash(&delta, &suffix_data.delta_hash)
                .map_err(|_| Error::DeltaHashMismatch)?;
            if suffix_data.recovery_commitment == delta.update_commitment {
                return Err(Error::EqualCommitments);
            }
        }

        let unique_suffix = self.unique_suffix(&suffix_data)?;
        let anchor_origin = suffix_data.anchor_origin.clone();
        Ok(Operation {
            operation_type: OperationType::Create,
            unique_suffix,
            operation_request: request.to_vec(),
            delta: Some(delta),
            suffix_data: Some(suffix_data),
            signed_data: None,
            reveal_value: None,
            anchor_origin,
        })
    }

    fn validate_suffix_data(&self, suffix_data: &SuffixDataModel) -> Result<(), Error> {
        self.validate_multihash(&suffix_data.recovery_commitment)?;
        self.validate_multihash(&suffix_data.delta_hash)
    }

    /// Derive the DID suffix: the multihash of the canonicalized suffix
    /// data, computed with the protocol's primary algorithm.
    pub fn unique_suffix(&self, suffix_data: &SuffixDataModel) -> Result<String, Error> {
        let code = self
            .protocol
            .multihash_algorithms
            .first()
            .copied()
            .ok_or(Error::MissingField("multihash algorithm"))?;
        Ok(hashing::calculate_model_multihash(suffix_data, code)?)
    }
}
