//! Request/response envelope and requirements manifest types.
//!
//! One invocation is a single request envelope in and a single response
//! envelope out; how the envelopes are transported is a host concern.

pub mod envelope;
pub mod requirements;

pub use envelope::{
    FunctionRequest, FunctionResponse, RequestMeta, ResponseMeta, ResultEntry, Severity,
    DEFAULT_TTL_SECONDS,
};
pub use requirements::{
    MatchCriteria, ResourceSelector, ENVIRONMENT_CONFIG_API_VERSION, ENVIRONMENT_CONFIG_KIND,
};
