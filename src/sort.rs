//! Deterministic ordering of candidate documents by a field path value.
//!
//! All candidates carrying a value at the sort path must share one
//! comparable type; the first present value establishes it. Candidates
//! without a value (missing field, or an explicit null) take part in the
//! comparison as the established type's zero value. When no candidate has
//! a value at all the input order is left untouched.

use std::cmp::Ordering;

use serde_json::Value;
use thiserror::Error;

use crate::fieldpath::{self, PathError};

/// Errors raised while sorting candidates.
#[derive(Debug, Error)]
pub enum SortError {
    /// The sort path was empty; always fatal regardless of candidate count.
    #[error("cannot sort by empty field path")]
    EmptyPath,

    /// A structurally invalid read of the sort path.
    #[error("cannot read sort field: {0}")]
    Path(#[from] PathError),

    /// Two candidates carry values of different types at the sort path.
    #[error("cannot sort values of different types {first:?} and {second:?}")]
    TypeMismatch {
        first: &'static str,
        second: &'static str,
    },

    /// A value type the comparator cannot order.
    #[error("unsupported type {type_name:?} for sorting")]
    Unsupported { type_name: &'static str },
}

/// Comparable value at the sort path, narrowed from the JSON value at read
/// time. The comparator dispatches on the variant.
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Int(i64),
    Float(f64),
    Str(String),
}

impl SortKey {
    fn tag(&self) -> &'static str {
        match self {
            SortKey::Int(_) => "integer",
            SortKey::Float(_) => "float",
            SortKey::Str(_) => "string",
        }
    }

    /// Zero value of the same variant, used for absent candidates.
    fn zero_like(&self) -> SortKey {
        match self {
            SortKey::Int(_) => SortKey::Int(0),
            SortKey::Float(_) => SortKey::Float(0.0),
            SortKey::Str(_) => SortKey::Str(String::new()),
        }
    }

    fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Int(a), SortKey::Int(b)) => a.cmp(b),
            (SortKey::Float(a), SortKey::Float(b)) => a.total_cmp(b),
            (SortKey::Str(a), SortKey::Str(b)) => a.cmp(b),
            // Mixed tags are rejected during key collection.
            _ => Ordering::Equal,
        }
    }
}

fn narrow(value: &Value) -> Result<Option<SortKey>, SortError> {
    match value {
        // An explicit null reads the same as an absent field.
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(SortKey::Int(i)))
            } else if let Some(f) = n.as_f64() {
                if n.as_u64().is_some() {
                    // u64 beyond i64::MAX; refuse rather than lose magnitude.
                    Err(SortError::Unsupported {
                        type_name: "unsigned integer",
                    })
                } else {
                    Ok(Some(SortKey::Float(f)))
                }
            } else {
                Err(SortError::Unsupported { type_name: "number" })
            }
        }
        Value::String(s) => Ok(Some(SortKey::Str(s.clone()))),
        other => Err(SortError::Unsupported {
            type_name: fieldpath::type_name(other),
        }),
    }
}

/// Reorder `candidates` in place by the value at `path`, ascending.
///
/// Ties (equal values, including two absent values) carry no ordering
/// guarantee relative to each other.
pub fn sort_by_field_path(candidates: &mut [Value], path: &str) -> Result<(), SortError> {
    if path.is_empty() {
        return Err(SortError::EmptyPath);
    }

    let mut keys: Vec<Option<SortKey>> = Vec::with_capacity(candidates.len());
    let mut established: Option<SortKey> = None;
    for candidate in candidates.iter() {
        let key = match fieldpath::get(candidate, path) {
            Ok(value) => narrow(value)?,
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(SortError::Path(err)),
        };
        if let Some(key) = &key {
            match &established {
                None => established = Some(key.zero_like()),
                Some(first) if first.tag() != key.tag() => {
                    return Err(SortError::TypeMismatch {
                        first: first.tag(),
                        second: key.tag(),
                    });
                }
                Some(_) => {}
            }
        }
        keys.push(key);
    }

    // No candidate has a value at the path: keep the input order.
    let Some(zero) = established else {
        return Ok(());
    };

    let mut paired: Vec<(Option<SortKey>, Value)> = keys
        .into_iter()
        .zip(candidates.iter_mut().map(Value::take))
        .collect();
    paired.sort_by(|(a, _), (b, _)| {
        let a = a.as_ref().unwrap_or(&zero);
        let b = b.as_ref().unwrap_or(&zero);
        a.compare(b)
    });
    for (slot, (_, value)) in candidates.iter_mut().zip(paired) {
        *slot = value;
    }
    Ok(())
}
