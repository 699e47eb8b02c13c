// Input normalization: list-typed fields are never sent as scalars

use std::cmp::Ordering;

use serde_json::{Map, Value};
use tracing::debug;

/// Fields the remote API only accepts as lists
pub const DEFAULT_LIST_FIELDS: &[&str] = &[
    "reference_image_urls",
    "reference_mask_urls",
    "image_urls",
    "mask_urls",
    "style_reference_urls",
    "character_images",
    "pose_images",
    "uploaded_masks",
];

/// Wraps allow-listed scalar fields into single-element lists.
///
/// - scalar (string, number, bool, null) -> `[scalar]`
/// - list -> unchanged
/// - object -> list of its values by ascending key (integer keys compare
///   numerically and sort before any other key, which compare lexically)
///
/// Fields outside the allow-list pass through untouched and insertion order
/// is preserved.
#[derive(Debug, Clone)]
pub struct InputNormalizer {
    fields: Vec<String>,
}

impl Default for InputNormalizer {
    fn default() -> Self {
        Self {
            fields: DEFAULT_LIST_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl InputNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field to the allow-list
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
        self
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn normalize(&self, input: &Map<String, Value>) -> Map<String, Value> {
        input
            .iter()
            .map(|(key, value)| {
                if self.fields.iter().any(|f| f == key) {
                    (key.clone(), as_list(key, value))
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect()
    }
}

/// Normalize with the default allow-list
pub fn normalize(input: &Map<String, Value>) -> Map<String, Value> {
    InputNormalizer::default().normalize(input)
}

fn as_list(field: &str, value: &Value) -> Value {
    match value {
        Value::Array(_) => value.clone(),
        Value::Object(object) => {
            debug!(field = %field, len = object.len(), "Re-emitting object as list by key");
            Value::Array(values_by_key(object))
        }
        scalar => {
            debug!(field = %field, "Wrapping scalar into single-element list");
            Value::Array(vec![scalar.clone()])
        }
    }
}

/// Object values ordered by key
fn values_by_key(object: &Map<String, Value>) -> Vec<Value> {
    let mut entries: Vec<(&String, &Value)> = object.iter().collect();
    entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));
    entries.into_iter().map(|(_, value)| value.clone()).collect()
}

fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
