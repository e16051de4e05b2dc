//! Pure document transformations for each patch action.
//!
//! Application assumes patches already passed [`crate::patch::Patch::validate`];
//! runtime failures (e.g. an RFC 6902 test that does not hold) surface as
//! errors and leave the caller's document untouched.

use crate::document::{self, Document, PUBLIC_KEYS_PROPERTY, SERVICES_PROPERTY};
use crate::error::Error;
use crate::patch::{Patch, PublicKeyEntry, ServiceEndpointEntry};
use serde_json::Value;

/// Apply patches in order, producing the resulting document.
pub fn apply_patches(doc: Document, patches: &[Patch]) -> Result<Document, Error> {
    let mut doc = doc;
    for patch in patches {
        doc = apply_patch(doc, patch)?;
    }
    Ok(doc)
}

fn apply_patch(doc: Document, patch: &Patch) -> Result<Document, Error> {
    match patch {
        Patch::Replace { document } => replace(document.public_keys.as_deref(), document.services.as_deref()),
        Patch::AddPublicKeys { public_keys } => {
            add_entries(doc, PUBLIC_KEYS_PROPERTY, to_values(public_keys)?)
        }
        Patch::RemovePublicKeys { ids } => Ok(remove_entries(doc, PUBLIC_KEYS_PROPERTY, ids)),
        Patch::AddServices { services } => {
            add_entries(doc, SERVICES_PROPERTY, to_values(services)?)
        }
        Patch::RemoveServices { ids } => Ok(remove_entries(doc, SERVICES_PROPERTY, ids)),
        Patch::IetfJsonPatch { patches } => apply_json_patch(doc, patches),
    }
}

fn replace(
    public_keys: Option<&[PublicKeyEntry]>,
    services: Option<&[ServiceEndpointEntry]>,
) -> Result<Document, Error> {
    let mut doc = Document::new();
    if let Some(keys) = public_keys {
        doc.insert(PUBLIC_KEYS_PROPERTY.to_string(), Value::Array(to_values(keys)?));
    }
    if let Some(services) = services {
        doc.insert(SERVICES_PROPERTY.to_string(), Value::Array(to_values(services)?));
    }
    Ok(doc)
}

fn to_values<T: serde::Serialize>(entries: &[T]) -> Result<Vec<Value>, Error> {
    entries
        .iter()
        .map(|entry| serde_json::to_value(entry).map_err(Error::from))
        .collect()
}

/// Merge new entries into the named array; an entry whose id is already
/// present replaces the existing one.
fn add_entries(mut doc: Document, property: &str, new_entries: Vec<Value>) -> Result<Document, Error> {
    let new_ids: Vec<&str> = new_entries.iter().filter_map(document::entry_id).collect();

    let mut merged: Vec<Value> = existing_entries(&mut doc, property)
        .into_iter()
        .filter(|entry| match document::entry_id(entry) {
            Some(id) => !new_ids.contains(&id),
            None => true,
        })
        .collect();
    merged.extend(new_entries);

    doc.insert(property.to_string(), Value::Array(merged));
    Ok(doc)
}

fn remove_entries(mut doc: Document, property: &str, ids: &[String]) -> Document {
    let remaining: Vec<Value> = existing_entries(&mut doc, property)
        .into_iter()
        .filter(|entry| match document::entry_id(entry) {
            Some(id) => !ids.iter().any(|removed| removed == id),
            None => true,
        })
        .collect();
    doc.insert(property.to_string(), Value::Array(remaining));
    doc
}

fn existing_entries(doc: &mut Document, property: &str) -> Vec<Value> {
    match doc.remove(property) {
        Some(Value::Array(entries)) => entries,
        _ => Vec::new(),
    }
}

fn apply_json_patch(doc: Document, patches: &json_patch::Patch) -> Result<Document, Error> {
    let mut value = Value::Object(doc);
    json_patch::patch(&mut value, patches)?;
    match value {
        Value::Object(map) if !map.is_empty() => Ok(map),
        _ => Err(Error::EmptyDocumentAfterPatch),
    }
}
