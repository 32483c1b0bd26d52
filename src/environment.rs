//! Assembly of the merged environment document.

use serde_json::{Map, Value};

/// API version stamped onto an environment that carries no type identity.
pub const ENVIRONMENT_API_VERSION: &str = "internal.envcompose.dev/v1alpha1";

/// Kind stamped onto an environment that carries no type identity.
pub const ENVIRONMENT_KIND: &str = "Environment";

/// Well-known context key the merged environment is read from and written
/// to, so that later pipeline stages can consume it.
pub const ENVIRONMENT_CONTEXT_KEY: &str = "envcompose.dev/environment";

fn has_identity(data: &Map<String, Value>) -> bool {
    let present = |key: &str| {
        data.get(key)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty())
    };
    present("apiVersion") || present("kind")
}

/// Wrap merged data as a self-describing environment document, stamping
/// the default identity when the data carries neither an `apiVersion` nor
/// a `kind`.
pub fn assemble(mut data: Map<String, Value>) -> Map<String, Value> {
    if !has_identity(&data) {
        data.insert(
            "apiVersion".to_string(),
            Value::String(ENVIRONMENT_API_VERSION.to_string()),
        );
        data.insert("kind".to_string(), Value::String(ENVIRONMENT_KIND.to_string()));
    }
    data
}
