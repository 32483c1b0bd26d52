//! Field path access into loosely-typed JSON documents.
//!
//! A field path is a dotted/indexed address like `spec.containers[0].name`
//! or `metadata.labels["app.kubernetes.io/name"]`. Reads are side-effect
//! free; a missing field is reported as [`PathError::NotFound`], which is
//! distinct from a structurally invalid access (indexing a scalar, keying
//! an array, an index past the end of a sequence).

use serde_json::Value;
use thiserror::Error;

/// Errors raised while parsing or evaluating a field path.
#[derive(Debug, Error)]
pub enum PathError {
    /// The path string itself could not be parsed.
    #[error("malformed field path {path:?} at offset {offset}")]
    Malformed {
        /// The full path string as given.
        path: String,
        /// Byte offset of the first unparseable character.
        offset: usize,
    },

    /// The addressed field does not exist. Not a structural error.
    #[error("{path}: no such field")]
    NotFound {
        /// The full path that missed.
        path: String,
    },

    /// A field segment was applied to a value that is not an object.
    #[error("{path}: {segment:?} requires an object, found {found}")]
    NotAnObject {
        path: String,
        segment: String,
        found: &'static str,
    },

    /// An index segment was applied to a value that is not an array.
    #[error("{path}: [{index}] requires an array, found {found}")]
    NotAnArray {
        path: String,
        index: usize,
        found: &'static str,
    },

    /// An index segment pointed past the end of an array.
    #[error("{path}: index {index} out of range (length {len})")]
    OutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    /// The addressed value exists but has the wrong type for the caller.
    #[error("{path}: expected {expected}, found {found}")]
    UnexpectedType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl PathError {
    /// True for the benign "field does not exist" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PathError::NotFound { .. })
    }
}

/// One parsed path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
}

/// Human-readable type name of a JSON value, used in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse(path: &str) -> Result<Vec<Segment>, PathError> {
    let malformed = |offset: usize| PathError::Malformed {
        path: path.to_string(),
        offset,
    };

    let bytes = path.as_bytes();
    let mut segments = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'.' => {
                // A dot must separate two segments, the second a bare field.
                if segments.is_empty()
                    || i + 1 == bytes.len()
                    || bytes[i + 1] == b'.'
                    || bytes[i + 1] == b'['
                {
                    return Err(malformed(i));
                }
                i += 1;
            }
            b'[' => {
                let close = path[i..]
                    .find(']')
                    .map(|off| i + off)
                    .ok_or_else(|| malformed(i))?;
                let inner = &path[i + 1..close];
                if inner.len() >= 2
                    && ((inner.starts_with('"') && inner.ends_with('"'))
                        || (inner.starts_with('\'') && inner.ends_with('\'')))
                {
                    segments.push(Segment::Field(inner[1..inner.len() - 1].to_string()));
                } else {
                    let index: usize = inner.parse().map_err(|_| malformed(i + 1))?;
                    segments.push(Segment::Index(index));
                }
                i = close + 1;
            }
            _ => {
                let rest = &path[i..];
                let end = rest
                    .find(|c| c == '.' || c == '[')
                    .map(|off| i + off)
                    .unwrap_or(bytes.len());
                if end == i {
                    return Err(malformed(i));
                }
                segments.push(Segment::Field(path[i..end].to_string()));
                i = end;
            }
        }
    }

    if segments.is_empty() {
        return Err(malformed(0));
    }
    Ok(segments)
}

/// Read the value at `path` inside `document`.
///
/// Returns [`PathError::NotFound`] when any object key along the path does
/// not exist; structural mismatches (indexing a scalar, keying an array)
/// are reported with their own variants.
pub fn get<'a>(document: &'a Value, path: &str) -> Result<&'a Value, PathError> {
    let segments = parse(path)?;
    let mut current = document;
    for segment in &segments {
        match segment {
            Segment::Field(name) => match current {
                Value::Object(map) => {
                    current = map.get(name).ok_or_else(|| PathError::NotFound {
                        path: path.to_string(),
                    })?;
                }
                other => {
                    return Err(PathError::NotAnObject {
                        path: path.to_string(),
                        segment: name.clone(),
                        found: type_name(other),
                    });
                }
            },
            Segment::Index(index) => match current {
                Value::Array(items) => {
                    if *index >= items.len() {
                        return Err(PathError::OutOfRange {
                            path: path.to_string(),
                            index: *index,
                            len: items.len(),
                        });
                    }
                    current = &items[*index];
                }
                other => {
                    return Err(PathError::NotAnArray {
                        path: path.to_string(),
                        index: *index,
                        found: type_name(other),
                    });
                }
            },
        }
    }
    Ok(current)
}

/// Read the string at `path`, failing with [`PathError::UnexpectedType`]
/// when the value exists but is not a string.
pub fn get_string<'a>(document: &'a Value, path: &str) -> Result<&'a str, PathError> {
    match get(document, path)? {
        Value::String(s) => Ok(s),
        other => Err(PathError::UnexpectedType {
            path: path.to_string(),
            expected: "string",
            found: type_name(other),
        }),
    }
}
