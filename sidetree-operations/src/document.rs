//! The DID document as a dynamic, string-keyed JSON map.

use serde_json::Value;

/// Document state accumulated by applying patches.
pub type Document = serde_json::Map<String, Value>;

/// Property holding the document's public key entries.
pub const PUBLIC_KEYS_PROPERTY: &str = "publicKeys";
/// Property holding the document's service entries.
pub const SERVICES_PROPERTY: &str = "services";

/// Public key entries of the document, empty when absent.
pub fn public_keys(doc: &Document) -> &[Value] {
    entries(doc, PUBLIC_KEYS_PROPERTY)
}

/// Service entries of the document, empty when absent.
pub fn services(doc: &Document) -> &[Value] {
    entries(doc, SERVICES_PROPERTY)
}

fn entries<'a>(doc: &'a Document, property: &str) -> &'a [Value] {
    doc.get(property)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// The `id` member of a public key or service entry.
pub fn entry_id(entry: &Value) -> Option<&str> {
    entry.get("id").and_then(Value::as_str)
}
