//! Function invocation envelope.
//!
//! A host drives the engine through repeated request/response cycles: the
//! first cycle usually carries no candidate documents and yields only the
//! requirements manifest; once the host has fetched the requested documents
//! it invokes the engine again with `extraResources` populated.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::input::Input;
use crate::protocol::requirements::ResourceSelector;

/// Default response time-to-live, in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 60;

/// Request metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMeta {
    /// Caller-chosen correlation tag, echoed in the response.
    #[serde(default)]
    pub tag: String,
}

/// One engine invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRequest {
    #[serde(default)]
    pub meta: RequestMeta,

    /// The declarative configuration; absent means there is nothing to do.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Input>,

    /// The observed composite document, used for field-path lookups during
    /// label resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<Value>,

    /// Shared key-value bag carried across pipeline stages.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,

    /// Candidate documents keyed by synthetic source identifier. `None`
    /// means no fetch cycle has run yet; an empty entry means the fetch
    /// found nothing for that source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_resources: Option<BTreeMap<String, Vec<Value>>>,
}

/// Response metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    /// The request tag, echoed back.
    pub tag: String,

    /// How long the caller may consider this response valid.
    pub ttl_seconds: u64,

    /// When the response was computed.
    pub created_at: DateTime<Utc>,
}

/// Severity of a result entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The invocation failed; the environment was not updated.
    Fatal,
    /// Something noteworthy that did not stop the invocation.
    Warning,
    /// Informational.
    Normal,
}

/// One entry in the response result list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEntry {
    pub severity: Severity,
    pub message: String,
}

/// The engine's answer to one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub meta: ResponseMeta,

    /// The requirements manifest: what the engine still needs fetched.
    /// Present even on fatal failure, reflecting whatever was computed
    /// before the failure.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requirements: BTreeMap<String, ResourceSelector>,

    /// The shared bag, passed through from the request with the merged
    /// environment written under the well-known key.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ResultEntry>,
}

impl FunctionResponse {
    /// Seed a response from a request: echo the tag, inherit the context
    /// bag, stamp the default TTL.
    pub fn to(request: &FunctionRequest) -> Self {
        Self {
            meta: ResponseMeta {
                tag: request.meta.tag.clone(),
                ttl_seconds: DEFAULT_TTL_SECONDS,
                created_at: Utc::now(),
            },
            requirements: BTreeMap::new(),
            context: request.context.clone(),
            results: Vec::new(),
        }
    }

    /// Record a fatal failure on the response.
    pub fn fatal(&mut self, message: impl Into<String>) {
        self.results.push(ResultEntry {
            severity: Severity::Fatal,
            message: message.into(),
        });
    }

    /// True when any result entry is fatal.
    pub fn is_fatal(&self) -> bool {
        self.results.iter().any(|r| r.severity == Severity::Fatal)
    }
}
