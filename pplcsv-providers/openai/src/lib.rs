//! Scoring backend for OpenAI-compatible completion servers.
//!
//! Perplexity is derived from the log-probabilities the server reports for
//! the echoed prompt tokens, so any server implementing `echo` + `logprobs`
//! on `/completions` (vLLM, llama.cpp, OpenAI legacy models) can score text.

mod config;
mod errors;
mod scorer;
mod wire;

pub use config::{DEFAULT_API_BASE, OpenAiConfig};
pub use errors::OpenAiProviderError;
pub use scorer::OpenAiScorer;
pub use wire::perplexity_from_logprobs;
