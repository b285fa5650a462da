//! Request fingerprinting for cache keys.

use enhancer_core::{Complexity, EnhanceRequest};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const FINGERPRINT_LEN: usize = 16;

/// Stable hash of the semantically relevant parts of a request.
///
/// Identical text, technique preferences and context always map to the same
/// fingerprint regardless of the order in which sets or object keys arrived.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

#[derive(Serialize)]
struct Canonical<'a> {
    text: &'a str,
    preferred: &'a BTreeSet<String>,
    excluded: &'a BTreeSet<String>,
    context: BTreeMap<&'a str, Value>,
}

impl Fingerprint {
    pub fn of(request: &EnhanceRequest) -> Self {
        let canonical = Canonical {
            text: &request.text,
            preferred: &request.preferred_techniques,
            excluded: &request.excluded_techniques,
            context: request
                .context
                .iter()
                .map(|(k, v)| (k.as_str(), canonical_value(v)))
                .collect(),
        };
        // Serializing maps, sets and plain values cannot fail.
        let encoded = serde_json::to_vec(&canonical).unwrap_or_default();
        let digest = format!("{:x}", Sha256::digest(&encoded));
        Self(digest[..FINGERPRINT_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cache key of the classification for this request.
    pub fn classification_key(&self) -> String {
        format!("classification:{}", self.0)
    }

    /// Cache key of a full response generated at `complexity` with
    /// `techniques`.
    pub fn response_key(&self, complexity: Complexity, techniques: &[String]) -> String {
        format!("response:{}:{}:{}", self.0, complexity, techniques.join(","))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rebuild nested objects with sorted keys.
fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonical_value(v))).collect();
            let mut out = Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        other => other.clone(),
    }
}
