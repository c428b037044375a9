//! Error taxonomy for resolving, decoding and running steps

use crate::llm::LlmError;
use thiserror::Error;

/// Template could not be turned into a prompt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("missing binding for '{{{{ {reference} }}}}'")]
    MissingBinding { reference: String },

    #[error("malformed template: {reason}")]
    Malformed { reason: String },
}

/// Raw model output could not be shaped into the destination
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed output: {0}")]
    Malformed(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("pattern '{pattern}' did not match the output")]
    NoMatch { pattern: String },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors surfaced by a pipeline run, tagged with the failing step
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("step '{step}': {source}")]
    Resolve {
        step: String,
        #[source]
        source: ResolveError,
    },

    #[error("step '{step}': backend failed: {source}")]
    Backend {
        step: String,
        #[source]
        source: LlmError,
    },

    #[error("step '{step}': {source}")]
    Decode {
        step: String,
        #[source]
        source: DecodeError,
    },
}

impl PipelineError {
    /// Name of the step that failed, if the error came from a step
    pub fn step_name(&self) -> Option<&str> {
        match self {
            PipelineError::Configuration(_) => None,
            PipelineError::Resolve { step, .. }
            | PipelineError::Backend { step, .. }
            | PipelineError::Decode { step, .. } => Some(step),
        }
    }
}
