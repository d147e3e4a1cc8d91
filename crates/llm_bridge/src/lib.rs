//! LLM Bridge for hosted vision models
//!
//! Provides the client for the Anthropic Messages API, the
//! [`VisionBackend`] seam it implements, and the invoker that times each
//! model call and turns its reply into normalized records.
//!
//! Copyright (c) 2025 Michael A Wright

pub mod anthropic;
pub mod backend;
pub mod invoker;
pub mod prompt;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use backend::VisionBackend;
pub use invoker::{invoke, run_comparison};
pub use prompt::EXTRACTION_PROMPT;
