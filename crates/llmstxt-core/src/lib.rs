//! Core types, config, errors, and prompt store for llms-txt-generator.

pub mod config;
pub mod error;
pub mod prompts;
pub mod types;
