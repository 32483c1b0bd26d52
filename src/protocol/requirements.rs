//! Requirements manifest types.
//!
//! A requirement describes one document the engine wants fetched before the
//! next invocation: either a single document by name, or every document
//! matching a resolved label set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// API version of the environment config documents this engine selects.
pub const ENVIRONMENT_CONFIG_API_VERSION: &str = "envcompose.dev/v1beta1";

/// Kind of the environment config documents this engine selects.
pub const ENVIRONMENT_CONFIG_KIND: &str = "EnvironmentConfig";

/// One entry in the requirements manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSelector {
    pub api_version: String,
    pub kind: String,
    #[serde(flatten)]
    pub criteria: MatchCriteria,
}

/// How the fetch collaborator should match documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchCriteria {
    /// Fetch the single document with this name.
    MatchName(String),
    /// Fetch every document carrying all of these labels.
    MatchLabels(BTreeMap<String, String>),
}

impl ResourceSelector {
    /// Selector for one environment config by name.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            api_version: ENVIRONMENT_CONFIG_API_VERSION.to_string(),
            kind: ENVIRONMENT_CONFIG_KIND.to_string(),
            criteria: MatchCriteria::MatchName(name.into()),
        }
    }

    /// Selector for environment configs by resolved label set.
    pub fn by_labels(labels: BTreeMap<String, String>) -> Self {
        Self {
            api_version: ENVIRONMENT_CONFIG_API_VERSION.to_string(),
            kind: ENVIRONMENT_CONFIG_KIND.to_string(),
            criteria: MatchCriteria::MatchLabels(labels),
        }
    }
}
