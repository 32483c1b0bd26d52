//! envcompose - environment selection-and-merge engine
//!
//! This crate resolves a declarative list of environment data sources into
//! a single merged configuration document. Each invocation first emits a
//! requirements manifest naming the documents it still needs fetched; once
//! a fetch cycle has supplied candidate documents, the engine selects the
//! qualifying ones per source, deterministically orders them, and
//! deep-merges their data under a strict left-to-right precedence rule.

pub mod environment;
pub mod fieldpath;
pub mod function;
pub mod input;
pub mod merge;
pub mod protocol;
pub mod requirements;
pub mod select;
pub mod sort;

pub use environment::ENVIRONMENT_CONTEXT_KEY;
pub use function::{run, EngineError};
pub use input::Input;
pub use protocol::{FunctionRequest, FunctionResponse, ResourceSelector, Severity};
