//! The typed patch language and its validators.
//!
//! Six patch actions mutate the DID document state. Each action has a
//! static validator here (shape, ids, purposes, endpoint syntax); the pure
//! document transformations live in [`crate::composer`].

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sidetree_jws::PublicKeyJwk;
use std::collections::HashSet;

/// Maximum length for public key and service ids.
pub const MAX_ID_LENGTH: usize = 50;
/// Maximum length for a service type.
pub const MAX_SERVICE_TYPE_LENGTH: usize = 30;

const BLS12381G2_KEY_2020: &str = "Bls12381G2Key2020";
const JSON_WEB_KEY_2020: &str = "JsonWebKey2020";
const ECDSA_SECP256K1_VERIFICATION_KEY_2019: &str = "EcdsaSecp256k1VerificationKey2019";
const X25519_KEY_AGREEMENT_KEY_2019: &str = "X25519KeyAgreementKey2019";
const ED25519_VERIFICATION_KEY_2018: &str = "Ed25519VerificationKey2018";
const ED25519_VERIFICATION_KEY_2020: &str = "Ed25519VerificationKey2020";

const GENERAL_KEY_TYPES: &[&str] = &[
    BLS12381G2_KEY_2020,
    JSON_WEB_KEY_2020,
    ECDSA_SECP256K1_VERIFICATION_KEY_2019,
    ED25519_VERIFICATION_KEY_2018,
    ED25519_VERIFICATION_KEY_2020,
    X25519_KEY_AGREEMENT_KEY_2019,
];

const VERIFICATION_KEY_TYPES: &[&str] = &[
    BLS12381G2_KEY_2020,
    JSON_WEB_KEY_2020,
    ECDSA_SECP256K1_VERIFICATION_KEY_2019,
    ED25519_VERIFICATION_KEY_2018,
    ED25519_VERIFICATION_KEY_2020,
];

const AGREEMENT_KEY_TYPES: &[&str] = &[
    BLS12381G2_KEY_2020,
    JSON_WEB_KEY_2020,
    ECDSA_SECP256K1_VERIFICATION_KEY_2019,
    X25519_KEY_AGREEMENT_KEY_2019,
];

/// Verification relationship a public key may be registered for.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum KeyPurpose {
    Authentication,
    AssertionMethod,
    KeyAgreement,
    CapabilityDelegation,
    CapabilityInvocation,
}

/// Number of distinct purposes; also the maximum purposes per key.
pub const ALLOWED_PURPOSES: usize = 5;

impl KeyPurpose {
    fn allowed_key_types(&self) -> &'static [&'static str] {
        match self {
            KeyPurpose::KeyAgreement => AGREEMENT_KEY_TYPES,
            _ => VERIFICATION_KEY_TYPES,
        }
    }
}

/// Public key entry used by `add-public-keys` and `replace`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct PublicKeyEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purposes: Option<Vec<KeyPurpose>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<PublicKeyJwk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_base58: Option<String>,
}

/// Service endpoint value: a URI, a list of URIs, or a list of objects.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ServiceEndpoint {
    Uri(String),
    Set(Vec<ServiceEndpointItem>),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ServiceEndpointItem {
    Uri(String),
    Object(serde_json::Map<String, Value>),
}

/// Service entry used by `add-services` and `replace`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct ServiceEndpointEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub service_endpoint: ServiceEndpoint,
}

/// Document state used by the `replace` action. Only public keys and
/// services survive a replace; any other member is rejected.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct DocumentState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_keys: Option<Vec<PublicKeyEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<ServiceEndpointEntry>>,
}

/// A DID state patch, tagged by `action`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "action")]
#[serde(rename_all = "kebab-case")]
pub enum Patch {
    AddPublicKeys {
        #[serde(rename = "publicKeys")]
        public_keys: Vec<PublicKeyEntry>,
    },
    RemovePublicKeys {
        ids: Vec<String>,
    },
    AddServices {
        services: Vec<ServiceEndpointEntry>,
    },
    RemoveServices {
        ids: Vec<String>,
    },
    Replace {
        document: DocumentState,
    },
    IetfJsonPatch {
        patches: json_patch::Patch,
    },
}

impl Patch {
    /// Wire name of the patch action.
    pub fn action(&self) -> &'static str {
        match self {
            Patch::AddPublicKeys { .. } => "add-public-keys",
            Patch::RemovePublicKeys { .. } => "remove-public-keys",
            Patch::AddServices { .. } => "add-services",
            Patch::RemoveServices { .. } => "remove-services",
            Patch::Replace { .. } => "replace",
            Patch::IetfJsonPatch { .. } => "ietf-json-patch",
        }
    }

    /// Static validation of the patch payload.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Patch::AddPublicKeys { public_keys } => {
                if public_keys.is_empty() {
                    return Err(Error::MissingField("public keys"));
                }
                validate_public_keys(public_keys)
            }
            Patch::RemovePublicKeys { ids } | Patch::RemoveServices { ids } => {
                if ids.is_empty() {
                    return Err(Error::MissingField("ids"));
                }
                validate_ids(ids)
            }
            Patch::AddServices { services } => {
                if services.is_empty() {
                    return Err(Error::MissingField("services"));
                }
                validate_services(services)
            }
            Patch::Replace { document } => {
                if let Some(keys) = &document.public_keys {
                    validate_public_keys(keys)?;
                }
                if let Some(services) = &document.services {
                    validate_services(services)?;
                }
                Ok(())
            }
            Patch::IetfJsonPatch { patches } => validate_json_patch(patches),
        }
    }
}

/// Validate public key entries: id syntax, uniqueness, purposes and key
/// material rules.
pub fn validate_public_keys(public_keys: &[PublicKeyEntry]) -> Result<(), Error> {
    let mut ids = HashSet::new();
    for entry in public_keys {
        validate_id(&entry.id)?;
        if !ids.insert(entry.id.as_str()) {
            return Err(Error::DuplicatePublicKeyId(entry.id.clone()));
        }
        validate_key_purposes(entry)?;
        if !validate_key_type_purpose(entry) {
            return Err(Error::InvalidKeyType(entry.r#type.clone()));
        }
        match (&entry.public_key_jwk, &entry.public_key_base58) {
            (Some(jwk), None) => jwk.validate()?,
            (None, Some(_)) => {}
            _ => return Err(Error::KeyMaterialRequired),
        }
    }
    Ok(())
}

fn validate_key_purposes(entry: &PublicKeyEntry) -> Result<(), Error> {
    if let Some(purposes) = &entry.purposes {
        if purposes.is_empty() {
            return Err(Error::EmptyPurposes);
        }
        if purposes.len() > ALLOWED_PURPOSES {
            return Err(Error::TooManyPurposes {
                max: ALLOWED_PURPOSES,
            });
        }
    }
    Ok(())
}

fn validate_key_type_purpose(entry: &PublicKeyEntry) -> bool {
    let purposes = entry.purposes.as_deref().unwrap_or_default();
    if purposes.is_empty() {
        return GENERAL_KEY_TYPES.contains(&entry.r#type.as_str());
    }
    purposes
        .iter()
        .all(|purpose| purpose.allowed_key_types().contains(&entry.r#type.as_str()))
}

/// Validate service entries: id, type length and endpoint syntax.
pub fn validate_services(services: &[ServiceEndpointEntry]) -> Result<(), Error> {
    let mut ids = HashSet::new();
    for entry in services {
        if entry.id.is_empty() {
            return Err(Error::MissingField("service id"));
        }
        validate_id(&entry.id)?;
        if !ids.insert(entry.id.as_str()) {
            return Err(Error::DuplicateServiceId(entry.id.clone()));
        }
        if entry.r#type.is_empty() {
            return Err(Error::MissingField("service type"));
        }
        if entry.r#type.len() > MAX_SERVICE_TYPE_LENGTH {
            return Err(Error::ServiceTypeTooLong {
                max: MAX_SERVICE_TYPE_LENGTH,
            });
        }
        validate_service_endpoint(&entry.service_endpoint)?;
    }
    Ok(())
}

fn validate_service_endpoint(endpoint: &ServiceEndpoint) -> Result<(), Error> {
    match endpoint {
        ServiceEndpoint::Uri(uri) => validate_uri(uri),
        ServiceEndpoint::Set(items) => {
            for item in items {
                match item {
                    ServiceEndpointItem::Uri(uri) => validate_uri(uri)?,
                    ServiceEndpointItem::Object(object) => match object.get("serviceEndpoint") {
                        Some(Value::String(uri)) => validate_uri(uri)?,
                        _ => return Err(Error::MissingField("service endpoint")),
                    },
                }
            }
            Ok(())
        }
    }
}

fn validate_uri(uri: &str) -> Result<(), Error> {
    // A URI must at least carry a scheme separator.
    if uri.is_empty() || !uri.contains(':') {
        return Err(Error::InvalidUri(uri.to_string()));
    }
    Ok(())
}

fn validate_ids(ids: &[String]) -> Result<(), Error> {
    for id in ids {
        validate_id(id)?;
    }
    Ok(())
}

fn validate_id(id: &str) -> Result<(), Error> {
    if id.len() > MAX_ID_LENGTH {
        return Err(Error::IdTooLong { max: MAX_ID_LENGTH });
    }
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(Error::InvalidIdCharacters(id.to_string()));
    }
    Ok(())
}

fn validate_json_patch(patches: &json_patch::Patch) -> Result<(), Error> {
    if patches.0.is_empty() {
        return Err(Error::MissingPatches);
    }
    for operation in &patches.0 {
        if let json_patch::PatchOperation::Move(_) = operation {
            return Err(Error::JsonPatchMoveNotAllowed);
        }
    }
    Ok(())
}
