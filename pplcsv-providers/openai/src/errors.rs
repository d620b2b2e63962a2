use thiserror::Error;

/// Errors raised while constructing an [`crate::OpenAiScorer`].
#[derive(Debug, Error)]
pub enum OpenAiProviderError {
    /// The API base is not an absolute `http` or `https` URL.
    #[error("api base `{api_base}` must start with http:// or https://")]
    InvalidApiBase {
        /// Rejected value.
        api_base: String,
    },
}
