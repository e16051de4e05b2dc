use super::OperationParser;
use crate::error::Error;
use crate::model::{CreateRequest, OperationType};
use sidetree_hashing as hashing;
use sidetree_hashing::encoder;

impl<'a> OperationParser<'a> {
    /// Inspect a resolution request and return the DID plus, for long-form
    /// DIDs, the embedded create request in canonical bytes.
    ///
    /// Short form: `<namespace>:<suffix>`. Long form:
    /// `<namespace>:<suffix>:<base64url(JCS({suffixData, delta}))>`.
    pub fn parse_did(
        &self,
        namespace: &str,
        short_or_long_form_did: &str,
    ) -> Result<(String, Option<Vec<u8>>), Error> {
        let without_namespace = short_or_long_form_did
            .strip_prefix(namespace)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| Error::NamespaceMismatch(namespace.to_string()))?;

        match without_namespace.split_once(':') {
            None => Ok((short_or_long_form_did.to_string(), None)),
            Some((suffix, initial_state)) => {
                let create_request_bytes = self.parse_initial_state(initial_state)?;
                let did = format!("{}:{}", namespace, suffix);
                Ok((did, Some(create_request_bytes)))
            }
        }
    }

    /// Decode the embedded initial state and enforce round-trip integrity:
    /// re-canonicalizing and re-encoding must reproduce the DID tail
    /// byte for byte.
    fn parse_initial_state(&self, initial_state: &str) -> Result<Vec<u8>, Error> {
        let decoded =
            encoder::decode_string(initial_state).map_err(|e| Error::Hashing(e.into()))?;
        let mut create_request: CreateRequest = serde_json::from_slice(&decoded)?;

        let canonical = hashing::canonicalize(&create_request)?;
        if encoder::encode_to_string(&canonical) != initial_state {
            return Err(Error::InitialStateInvalid);
        }

        create_request.operation = Some(OperationType::Create);
        Ok(hashing::canonicalize(&create_request)?)
    }
}

/// Compose a long-form DID from a create request. The embedded state
/// carries no `type` member; the DID suffix is derived from the canonical
/// suffix data with the given multihash algorithm.
pub fn long_form_did(
    namespace: &str,
    create_request: &CreateRequest,
    code: u64,
) -> Result<String, Error> {
    let mut request = create_request.clone();
    request.operation = None;
    let suffix_data = request
        .suffix_data
        .as_ref()
        .ok_or(Error::MissingField("suffix data"))?;
    let suffix = hashing::calculate_model_multihash(suffix_data, code)?;
    let canonical = hashing::canonicalize(&request)?;
    Ok(format!(
        "{}:{}:{}",
        namespace,
        suffix,
        encoder::encode_to_string(&canonical)
    ))
}
