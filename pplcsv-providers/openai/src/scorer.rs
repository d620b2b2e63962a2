//! [`Scorer`] implementation backed by a blocking HTTP agent.

use std::fmt;

use pplcsv_core::{Scorer, ScorerError};
use tracing::{Span, debug, field, instrument, warn};
use ureq::{Agent, http::StatusCode};

use crate::{
    config::OpenAiConfig,
    errors::OpenAiProviderError,
    wire::{CompletionRequest, CompletionResponse, ErrorResponse},
};

/// Scores texts through an OpenAI-compatible `/completions` endpoint.
///
/// Each call to [`Scorer::score`] sends one request carrying the whole batch
/// as a list of prompts.
#[derive(Clone)]
pub struct OpenAiScorer {
    agent: Agent,
    config: OpenAiConfig,
    url: String,
}

impl OpenAiScorer {
    /// Builds a scorer for the server described by `config`.
    ///
    /// # Errors
    /// Returns [`OpenAiProviderError::InvalidApiBase`] when the base URL does
    /// not use `http` or `https`.
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiProviderError> {
        let base = config.api_base();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(OpenAiProviderError::InvalidApiBase {
                api_base: base.to_owned(),
            });
        }
        // Error statuses carry a JSON body worth reporting, so they are
        // returned as responses rather than transport errors.
        let agent: Agent = Agent::config_builder()
            .timeout_global(config.timeout())
            .http_status_as_error(false)
            .build()
            .into();
        let url = config.completions_url();
        Ok(Self { agent, config, url })
    }

    /// Returns the settings this scorer was built with.
    #[must_use]
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn exchange(&self, model: &str, batch: &[String]) -> Result<(StatusCode, String), ScorerError> {
        let payload = serde_json::to_vec(&CompletionRequest::scoring(model, batch)).map_err(
            |err| ScorerError::Rejected {
                message: format!("failed to encode request: {err}"),
            },
        )?;
        let mut request = self
            .agent
            .post(self.url.as_str())
            .header("content-type", "application/json");
        if let Some(key) = self.config.api_key() {
            request = request.header("authorization", format!("Bearer {key}"));
        }
        let mut response = request
            .send(payload.as_slice())
            .map_err(|err| ScorerError::Transport {
                message: err.to_string(),
            })?;
        let status = response.status();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| ScorerError::Transport {
                message: err.to_string(),
            })?;
        Ok((status, body))
    }
}

impl fmt::Debug for OpenAiScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiScorer")
            .field("config", &self.config)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl Scorer for OpenAiScorer {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(
        name = "openai.score",
        err,
        skip(self, batch),
        fields(texts = batch.len(), status = field::Empty),
    )]
    fn score(&self, model: &str, batch: &[String]) -> Result<Vec<f64>, ScorerError> {
        let (status, body) = self.exchange(model, batch)?;
        Span::current().record("status", status.as_u16());
        if !status.is_success() {
            return Err(status_error(status, model, &body));
        }
        let parsed: CompletionResponse =
            serde_json::from_str(&body).map_err(|err| ScorerError::MalformedResponse {
                message: err.to_string(),
            })?;
        let scores = parsed.into_perplexities(batch)?;
        debug!(texts = scores.len(), "batch scored");
        Ok(scores)
    }
}

fn status_error(status: StatusCode, model: &str, body: &str) -> ScorerError {
    let detail = serde_json::from_str::<ErrorResponse>(body).ok();
    let model_missing = detail
        .as_ref()
        .is_some_and(|detail| detail.error.is_model_not_found());
    if status == StatusCode::NOT_FOUND || model_missing {
        return ScorerError::UnknownModel {
            model: model.to_owned(),
        };
    }
    let message = detail.map_or_else(
        || format!("{status}: {}", body.trim()),
        |detail| format!("{status}: {}", detail.error.message),
    );
    if status.is_server_error() {
        warn!(status = status.as_u16(), "server error from completion endpoint");
        ScorerError::Transport { message }
    } else {
        ScorerError::Rejected { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("localhost:8000/v1")]
    #[case("ftp://example.com")]
    #[case("")]
    fn rejects_non_http_api_base(#[case] base: &str) {
        let err = OpenAiScorer::new(OpenAiConfig::new(base)).expect_err("base must be rejected");
        assert!(matches!(err, OpenAiProviderError::InvalidApiBase { .. }));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let scorer = OpenAiScorer::new(
            OpenAiConfig::default().with_api_key(Some("sk-secret".to_owned())),
        )
        .expect("default base is valid");
        let rendered = format!("{scorer:?}");
        assert!(rendered.contains("http://localhost:8000/v1/completions"));
        assert!(!rendered.contains("sk-secret"));
    }

    #[rstest]
    #[case(StatusCode::NOT_FOUND, "", "UnknownModel")]
    #[case(
        StatusCode::BAD_REQUEST,
        r#"{"error":{"message":"The model `x` does not exist","code":"model_not_found"}}"#,
        "UnknownModel"
    )]
    #[case(StatusCode::BAD_REQUEST, r#"{"error":{"message":"prompt too long"}}"#, "Rejected")]
    #[case(StatusCode::UNAUTHORIZED, "denied", "Rejected")]
    #[case(StatusCode::SERVICE_UNAVAILABLE, "overloaded", "Transport")]
    fn status_codes_map_to_scorer_errors(
        #[case] status: StatusCode,
        #[case] body: &str,
        #[case] expected: &str,
    ) {
        let err = status_error(status, "x", body);
        let variant = match err {
            ScorerError::UnknownModel { .. } => "UnknownModel",
            ScorerError::Rejected { .. } => "Rejected",
            ScorerError::Transport { .. } => "Transport",
            _ => "other",
        };
        assert_eq!(variant, expected);
    }

    #[test]
    fn rejection_message_carries_server_detail() {
        let err = status_error(
            StatusCode::BAD_REQUEST,
            "gpt2",
            r#"{"error":{"message":"prompt too long"}}"#,
        );
        assert_eq!(
            err,
            ScorerError::Rejected {
                message: "400 Bad Request: prompt too long".to_owned()
            }
        );
    }
}
