//! prompt-pipeline - chain language-model calls through a shared memory store

pub mod cli;
pub mod core;
pub mod execution;
pub mod llm;
pub mod persistence;

// Re-export commonly used types
pub use core::config::{BackendConfig, DecoderConfig, PipelineConfig};
pub use core::{
    DecodeError, DecodeTarget, Decoded, Decoder, ExecutionStatus, Memory, MemoryEntry,
    PassthroughDecoder, Pipeline, PipelineError, PromptTemplate, RamMemory, RegexDecoder,
    ResolveError, Step, StepState, StructuredDecoder, INPUT_KEY,
};
pub use execution::{ExecutionEngine, ExecutionEvent};
pub use llm::{LlmBackend, LlmError, LlmMode};
