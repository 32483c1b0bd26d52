//! Declarative input schema.
//!
//! The wire types mirror the caller-supplied configuration document, with
//! every defaultable field optional. [`InputSpec::resolved_sources`] applies
//! the defaults exactly once at the boundary and validates structural
//! coherence, so the rest of the engine only ever sees fully-resolved
//! declarations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Default sort path for label selectors.
pub const DEFAULT_SORT_FIELD_PATH: &str = "metadata.name";

/// Structural problems in a source declaration. Always fatal, before any
/// manifest or merge work.
#[derive(Debug, Error)]
pub enum InputError {
    /// A Reference source without a `ref` block.
    #[error("environment config {index} is of type Reference but has no ref")]
    MissingReference { index: usize },

    /// A Selector source without a `selector` block.
    #[error("environment config {index} is of type Selector but has no selector")]
    MissingSelector { index: usize },

    /// A literal label matcher without a value.
    #[error("environment config {index}: label matcher {key:?} is of type Value but has no value")]
    MissingMatcherValue { index: usize, key: String },

    /// A field-path label matcher without a path.
    #[error(
        "environment config {index}: label matcher {key:?} is of type FromCompositeFieldPath but has no valueFromFieldPath"
    )]
    MissingMatcherPath { index: usize, key: String },
}

/// Top-level input document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Input {
    #[serde(default)]
    pub spec: InputSpec,
}

/// The declarative environment composition spec.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSpec {
    /// Static initial state of the environment; overlaid by the selected
    /// environment configs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_data: Option<Map<String, Value>>,

    /// Ordered source declarations. Data of all selected documents merges
    /// in declaration order; a larger index takes priority on conflicts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_configs: Vec<EnvironmentSource>,

    /// Resolution policy applying to all Reference sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,

    /// Declared in the schema but carries no behavior; deserialized and
    /// ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_overrides: Option<BTreeMap<String, String>>,
}

/// Reference resolution policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionPolicy>,
}

/// Whether a Reference source must resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResolutionPolicy {
    /// Fail the invocation when the referenced document is missing.
    #[default]
    Required,
    /// A missing referenced document contributes nothing.
    Optional,
}

/// One declared source, as it arrives on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentSource {
    /// Selection strategy; defaults to `Reference`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SourceKind>,

    /// Named reference, required when the kind is `Reference`.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<SourceReference>,

    /// Label selector, required when the kind is `Selector`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<SourceSelector>,
}

/// How a source picks its document(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SourceKind {
    #[default]
    Reference,
    Selector,
}

/// A by-name reference to a single environment config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReference {
    pub name: String,
}

/// Label-based selection of environment config(s).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSelector {
    /// Retrieval strategy; defaults to `Single`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SelectorMode>,

    /// Cap on selected documents in Multiple mode; unlimited when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_match: Option<u64>,

    /// Required minimum of selected documents in Multiple mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_match: Option<u64>,

    /// Field path the candidate set is sorted by; defaults to
    /// `metadata.name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by_field_path: Option<String>,

    /// Ordered label matchers; all must hold for a document to qualify.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_labels: Vec<LabelMatcher>,
}

/// How many documents a selector yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectorMode {
    #[default]
    Single,
    Multiple,
}

/// One label to match, with the value either literal or drawn from the
/// observed composite document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelMatcher {
    /// Where the label value comes from; defaults to
    /// `FromCompositeFieldPath`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MatcherKind>,

    /// Key of the label to match.
    pub key: String,

    /// Literal label value, for `Value` matchers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Field path into the observed document, for `FromCompositeFieldPath`
    /// matchers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from_field_path: Option<String>,

    /// What to do when the field path is absent; defaults to `Required`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_field_path_policy: Option<FromFieldPathPolicy>,
}

/// Source of a label matcher value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatcherKind {
    #[default]
    FromCompositeFieldPath,
    Value,
}

/// Policy for an absent matcher field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FromFieldPathPolicy {
    /// Fail the invocation when the path is absent.
    #[default]
    Required,
    /// Skip the matcher when the path is absent; other matchers still
    /// apply.
    Optional,
}

/// A source declaration with every default applied.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    /// Position in the declaration list; defines merge precedence.
    pub index: usize,
    pub kind: ResolvedSourceKind,
}

/// Fully-resolved selection strategy.
#[derive(Debug, Clone)]
pub enum ResolvedSourceKind {
    Reference { name: String },
    Selector(ResolvedSelector),
}

/// A selector with mode and sort path defaults applied.
#[derive(Debug, Clone)]
pub struct ResolvedSelector {
    pub mode: SelectorMode,
    pub max_match: Option<u64>,
    pub min_match: Option<u64>,
    pub sort_by_field_path: String,
    pub match_labels: Vec<ResolvedMatcher>,
}

/// A label matcher with kind and policy defaults applied.
#[derive(Debug, Clone)]
pub enum ResolvedMatcher {
    Value {
        key: String,
        value: String,
    },
    FromFieldPath {
        key: String,
        path: String,
        policy: FromFieldPathPolicy,
    },
}

impl InputSpec {
    /// Effective resolution policy for Reference sources.
    pub fn resolution_policy(&self) -> ResolutionPolicy {
        self.policy
            .as_ref()
            .and_then(|p| p.resolution)
            .unwrap_or_default()
    }

    /// Resolve defaults and validate structural coherence for every
    /// declared source, in order.
    pub fn resolved_sources(&self) -> Result<Vec<ResolvedSource>, InputError> {
        self.environment_configs
            .iter()
            .enumerate()
            .map(|(index, source)| source.resolve(index))
            .collect()
    }
}

impl EnvironmentSource {
    fn resolve(&self, index: usize) -> Result<ResolvedSource, InputError> {
        let kind = match self.kind.unwrap_or_default() {
            SourceKind::Reference => {
                let reference = self
                    .reference
                    .as_ref()
                    .ok_or(InputError::MissingReference { index })?;
                ResolvedSourceKind::Reference {
                    name: reference.name.clone(),
                }
            }
            SourceKind::Selector => {
                let selector = self
                    .selector
                    .as_ref()
                    .ok_or(InputError::MissingSelector { index })?;
                ResolvedSourceKind::Selector(selector.resolve(index)?)
            }
        };
        Ok(ResolvedSource { index, kind })
    }
}

impl SourceSelector {
    fn resolve(&self, index: usize) -> Result<ResolvedSelector, InputError> {
        let match_labels = self
            .match_labels
            .iter()
            .map(|matcher| matcher.resolve(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResolvedSelector {
            mode: self.mode.unwrap_or_default(),
            max_match: self.max_match,
            min_match: self.min_match,
            sort_by_field_path: self
                .sort_by_field_path
                .clone()
                .unwrap_or_else(|| DEFAULT_SORT_FIELD_PATH.to_string()),
            match_labels,
        })
    }
}

impl LabelMatcher {
    fn resolve(&self, index: usize) -> Result<ResolvedMatcher, InputError> {
        match self.kind.unwrap_or_default() {
            MatcherKind::Value => {
                let value = self
                    .value
                    .as_ref()
                    .ok_or_else(|| InputError::MissingMatcherValue {
                        index,
                        key: self.key.clone(),
                    })?;
                Ok(ResolvedMatcher::Value {
                    key: self.key.clone(),
                    value: value.clone(),
                })
            }
            MatcherKind::FromCompositeFieldPath => {
                let path = self.value_from_field_path.as_ref().ok_or_else(|| {
                    InputError::MissingMatcherPath {
                        index,
                        key: self.key.clone(),
                    }
                })?;
                Ok(ResolvedMatcher::FromFieldPath {
                    key: self.key.clone(),
                    path: path.clone(),
                    policy: self.from_field_path_policy.unwrap_or_default(),
                })
            }
        }
    }
}
