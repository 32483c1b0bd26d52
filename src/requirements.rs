//! Building the requirements manifest from the declared sources.
//!
//! The manifest is recomputed on every invocation, even when candidates
//! were already supplied: selector label values may be drawn from observed
//! state that changed since the previous cycle.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::fieldpath::{self, PathError};
use crate::input::{FromFieldPathPolicy, ResolvedMatcher, ResolvedSource, ResolvedSourceKind};
use crate::protocol::requirements::ResourceSelector;

/// Errors raised while building the manifest. Always fatal.
#[derive(Debug, Error)]
pub enum RequirementError {
    /// A required matcher value could not be read from the observed
    /// document.
    #[error("cannot get value from field path {path:?}: {source}")]
    FieldPath {
        path: String,
        #[source]
        source: PathError,
    },
}

/// Synthetic identifier of the source at `index`, used to key both the
/// manifest and the candidate sets.
pub fn source_id(index: usize) -> String {
    format!("environment-config-{index}")
}

/// Build the manifest entry for every declared source, in order.
///
/// Reference sources always emit a by-name requirement. Selector sources
/// resolve their matchers against `observed`; a selector whose resolved
/// label set ends up empty emits no requirement (there is nothing to
/// select on).
pub fn build(
    sources: &[ResolvedSource],
    observed: &Value,
) -> Result<BTreeMap<String, ResourceSelector>, RequirementError> {
    let mut requirements = BTreeMap::new();
    for source in sources {
        match &source.kind {
            ResolvedSourceKind::Reference { name } => {
                requirements.insert(source_id(source.index), ResourceSelector::by_name(name));
            }
            ResolvedSourceKind::Selector(selector) => {
                let mut labels = BTreeMap::new();
                for matcher in &selector.match_labels {
                    match matcher {
                        ResolvedMatcher::Value { key, value } => {
                            labels.insert(key.clone(), value.clone());
                        }
                        ResolvedMatcher::FromFieldPath { key, path, policy } => {
                            match fieldpath::get_string(observed, path) {
                                Ok(value) => {
                                    labels.insert(key.clone(), value.to_string());
                                }
                                Err(err) => {
                                    // An optional matcher tolerates an
                                    // absent or wrongly-typed value; a
                                    // malformed path is never tolerated.
                                    let tolerated = *policy == FromFieldPathPolicy::Optional
                                        && matches!(
                                            err,
                                            PathError::NotFound { .. }
                                                | PathError::UnexpectedType { .. }
                                        );
                                    if tolerated {
                                        continue;
                                    }
                                    return Err(RequirementError::FieldPath {
                                        path: path.clone(),
                                        source: err,
                                    });
                                }
                            }
                        }
                    }
                }
                if labels.is_empty() {
                    continue;
                }
                requirements.insert(source_id(source.index), ResourceSelector::by_labels(labels));
            }
        }
    }
    Ok(requirements)
}
