//! Scenario-based tests for prompt-pipeline

mod helpers;

mod determinism;
mod failure_handling;
mod history;
mod memory_trace;
mod success_chain;
mod variable_substitution;
