//! Per-source resolution of candidate documents.
//!
//! For each declared source, decide which of the supplied candidates
//! qualify: a Reference contributes its single named document, a Selector
//! contributes one (Single mode) or a sorted, optionally truncated set
//! (Multiple mode). All counts are checked here; any violation aborts the
//! whole invocation.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::input::{ResolutionPolicy, ResolvedSelector, ResolvedSource, ResolvedSourceKind, SelectorMode};
use crate::requirements::source_id;
use crate::sort::{self, SortError};

/// Errors raised while resolving sources against their candidate sets.
/// Always fatal.
#[derive(Debug, Error)]
pub enum SelectError {
    /// The fetch collaborator did not honor the manifest: a declared
    /// source has no entry (not even an empty one) in the candidate map.
    #[error("cannot find expected candidates {id:?}")]
    MissingCandidates { id: String },

    /// A required reference resolved to nothing.
    #[error("required environment config {name:?} not found")]
    RequiredNotFound { name: String },

    /// More than one candidate for a by-name requirement; a fetch-layer
    /// contract violation.
    #[error("expected exactly one candidate for environment config {name:?}, got {count}")]
    AmbiguousReference { name: String, count: usize },

    /// A Single-mode selector needs exactly one candidate.
    #[error("{id}: expected exactly one candidate, got {count}")]
    SingleModeCount { id: String, count: usize },

    /// A Multiple-mode selector with `minMatch` found too few candidates.
    #[error("{id}: expected at least {min} candidates, got {count}")]
    MinMatchViolated { id: String, min: u64, count: usize },

    /// Candidate ordering failed for a Multiple-mode selector.
    #[error("{id}: {source}")]
    Sort {
        id: String,
        #[source]
        source: SortError,
    },
}

/// Resolve every declared source against the supplied candidate sets,
/// returning the contributing documents in ascending declaration order.
pub fn select_environment_configs(
    sources: &[ResolvedSource],
    candidates: &BTreeMap<String, Vec<Value>>,
    policy: ResolutionPolicy,
) -> Result<Vec<Value>, SelectError> {
    let mut selected = Vec::new();
    for source in sources {
        let id = source_id(source.index);
        let supplied = candidates
            .get(&id)
            .ok_or_else(|| SelectError::MissingCandidates { id: id.clone() })?;

        match &source.kind {
            ResolvedSourceKind::Reference { name } => {
                if let Some(document) = resolve_reference(name, supplied, policy)? {
                    selected.push(document);
                }
            }
            ResolvedSourceKind::Selector(selector) => {
                selected.extend(resolve_selector(&id, selector, supplied)?);
            }
        }
    }
    Ok(selected)
}

fn resolve_reference(
    name: &str,
    supplied: &[Value],
    policy: ResolutionPolicy,
) -> Result<Option<Value>, SelectError> {
    match supplied.len() {
        0 => match policy {
            ResolutionPolicy::Optional => Ok(None),
            ResolutionPolicy::Required => Err(SelectError::RequiredNotFound {
                name: name.to_string(),
            }),
        },
        1 => Ok(Some(supplied[0].clone())),
        count => Err(SelectError::AmbiguousReference {
            name: name.to_string(),
            count,
        }),
    }
}

fn resolve_selector(
    id: &str,
    selector: &ResolvedSelector,
    supplied: &[Value],
) -> Result<Vec<Value>, SelectError> {
    match selector.mode {
        SelectorMode::Single => {
            if supplied.len() != 1 {
                return Err(SelectError::SingleModeCount {
                    id: id.to_string(),
                    count: supplied.len(),
                });
            }
            Ok(vec![supplied[0].clone()])
        }
        SelectorMode::Multiple => {
            if let Some(min) = selector.min_match {
                if (supplied.len() as u64) < min {
                    return Err(SelectError::MinMatchViolated {
                        id: id.to_string(),
                        min,
                        count: supplied.len(),
                    });
                }
            }
            let mut ordered = supplied.to_vec();
            sort::sort_by_field_path(&mut ordered, &selector.sort_by_field_path).map_err(
                |source| SelectError::Sort {
                    id: id.to_string(),
                    source,
                },
            )?;
            if let Some(max) = selector.max_match {
                ordered.truncate(max as usize);
            }
            Ok(ordered)
        }
    }
}
