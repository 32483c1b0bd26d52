//! Engine orchestration: one invocation from request to response.
//!
//! Control flow per cycle:
//! 1. Resolve declaration defaults and build the requirements manifest;
//!    the manifest is always attached to the response, even on later
//!    failure.
//! 2. If no candidate sets were supplied, return the manifest-only
//!    response so the host can go fetch.
//! 3. Otherwise select the contributing documents per source, deep-merge
//!    their data over the base environment and the static defaults, and
//!    write the assembled environment back into the context bag.
//!
//! Every invocation is a pure, synchronous computation over its inputs;
//! nothing is shared between invocations.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::environment::{self, ENVIRONMENT_CONTEXT_KEY};
use crate::input::InputError;
use crate::merge::{self, MergeError};
use crate::protocol::envelope::{FunctionRequest, FunctionResponse};
use crate::requirements::{self, RequirementError};
use crate::select::{self, SelectError};

/// Fatal invocation failures, surfaced as a fatal result entry on the
/// response.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid environment config declaration: {0}")]
    Input(#[from] InputError),

    #[error("cannot get observed composite resource")]
    MissingObserved,

    #[error("cannot build requirements: {0}")]
    Requirement(#[from] RequirementError),

    #[error("cannot load environment from context key {key:?}: expected object, found {found}")]
    InvalidContextEnvironment { key: &'static str, found: &'static str },

    #[error("cannot get selected environment configs: {0}")]
    Select(#[from] SelectError),

    #[error("cannot merge environment data: {0}")]
    Merge(#[from] MergeError),
}

/// Run one invocation. Fatal failures are reported on the response rather
/// than returned: the caller always receives a response, carrying whatever
/// requirements were computed before the failure.
pub fn run(request: &FunctionRequest) -> FunctionResponse {
    let mut response = FunctionResponse::to(request);
    debug!(tag = %request.meta.tag, "running function");

    if let Err(err) = run_inner(request, &mut response) {
        response.fatal(err.to_string());
    }
    response
}

fn run_inner(
    request: &FunctionRequest,
    response: &mut FunctionResponse,
) -> Result<(), EngineError> {
    let Some(input) = &request.input else {
        debug!("no input specified, exiting");
        return Ok(());
    };
    if input.spec.environment_configs.is_empty() {
        debug!("no environment configs specified, exiting");
        return Ok(());
    }

    let sources = input.spec.resolved_sources()?;
    let observed = request.observed.as_ref().ok_or(EngineError::MissingObserved)?;

    response.requirements = requirements::build(&sources, observed)?;

    let Some(candidates) = &request.extra_resources else {
        debug!(
            requirements = response.requirements.len(),
            "no extra resources supplied, returning manifest only"
        );
        return Ok(());
    };

    let base_environment = load_context_environment(&request.context)?;

    let configs =
        select::select_environment_configs(&sources, candidates, input.spec.resolution_policy())?;
    let source_data = merge::merge_config_data(&configs)?;

    let mut layers: Vec<Map<String, Value>> = Vec::with_capacity(3);
    if let Some(base) = base_environment {
        layers.push(base);
    }
    if let Some(defaults) = &input.spec.default_data {
        layers.push(defaults.clone());
    }
    layers.push(source_data);

    let assembled = environment::assemble(merge::merge_layers(layers));
    debug!(keys = assembled.len(), "computed environment");
    response
        .context
        .insert(ENVIRONMENT_CONTEXT_KEY.to_string(), Value::Object(assembled));
    Ok(())
}

fn load_context_environment(
    context: &Map<String, Value>,
) -> Result<Option<Map<String, Value>>, EngineError> {
    match context.get(ENVIRONMENT_CONTEXT_KEY) {
        None => Ok(None),
        Some(Value::Object(map)) => {
            debug!(key = ENVIRONMENT_CONTEXT_KEY, "loaded environment from context");
            Ok(Some(map.clone()))
        }
        Some(other) => Err(EngineError::InvalidContextEnvironment {
            key: ENVIRONMENT_CONTEXT_KEY,
            found: crate::fieldpath::type_name(other),
        }),
    }
}
