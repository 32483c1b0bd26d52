//! Deep-merge of environment data documents.
//!
//! Merge semantics:
//! - Objects: deep-merge by key (recursive)
//! - Arrays: REPLACE (overlay wins entirely)
//! - Scalars: override (overlay wins)
//!
//! The merge is right-biased and not commutative: on any key conflict that
//! is not object-vs-object, the overlay value replaces the base value
//! wholesale.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::fieldpath;

/// Errors raised while extracting and merging source document payloads.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A selected environment config has no usable `data` object.
    #[error("cannot get data from environment config {name:?}: expected object, found {found}")]
    InvalidData {
        /// `metadata.name` of the offending document.
        name: String,
        found: &'static str,
    },
}

/// Deep-merge `overlay` into `base`.
///
/// Keys present only in `base` are retained unchanged. When both sides hold
/// a nested object under the same key the objects merge recursively; any
/// other conflict is resolved by replacing the base value with the overlay
/// value.
pub fn merge_maps(base: Map<String, Value>, overlay: Map<String, Value>) -> Map<String, Value> {
    let mut out = base;
    for (key, overlay_value) in overlay {
        let merged = match (out.remove(&key), overlay_value) {
            (Some(Value::Object(base_map)), Value::Object(overlay_map)) => {
                Value::Object(merge_maps(base_map, overlay_map))
            }
            (_, overlay_value) => overlay_value,
        };
        out.insert(key, merged);
    }
    out
}

/// Merge layers in order: the first layer is the base, each later layer
/// overlays the accumulated result with [`merge_maps`] precedence.
pub fn merge_layers(layers: Vec<Map<String, Value>>) -> Map<String, Value> {
    layers.into_iter().fold(Map::new(), merge_maps)
}

/// Extract and merge the `data` payload of each resolved source document,
/// in the order given (a later document overrides an earlier one on key
/// conflict).
pub fn merge_config_data(configs: &[Value]) -> Result<Map<String, Value>, MergeError> {
    let mut merged = Map::new();
    for config in configs {
        let data = match config.get("data") {
            Some(Value::Object(map)) => map.clone(),
            other => {
                let name = config
                    .pointer("/metadata/name")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                return Err(MergeError::InvalidData {
                    name,
                    found: other.map(fieldpath::type_name).unwrap_or("nothing"),
                });
            }
        };
        merged = merge_maps(merged, data);
    }
    Ok(merged)
}
