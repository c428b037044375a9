//! Core domain models for Pipeline
//!
//! This module defines the memory store, decoders, prompt templates, steps
//! and pipelines, plus the YAML configuration they can be built from.

pub mod config;
pub mod decoder;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod state;
pub mod step;
pub mod template;

pub use decoder::*;
pub use error::*;
pub use memory::*;
pub use pipeline::*;
pub use state::*;
pub use step::*;
pub use template::*;
