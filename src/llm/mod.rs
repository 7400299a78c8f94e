//! LLM integration for fixloop.
//!
//! Provides the Anthropic Messages API client and the fix-request driver
//! that walks a prioritized model list, persisting every successful
//! exchange for later inspection.

pub mod anthropic;
pub mod fix;

pub use anthropic::{AnthropicClient, CompletionProvider, DEFAULT_MODELS};
pub use fix::request_fix;
