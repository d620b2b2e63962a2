//! Request and response bodies of the `/completions` endpoint.

use pplcsv_core::ScorerError;
use serde::{Deserialize, Serialize};

/// Completion request that echoes the prompts back with per-token
/// log-probabilities and generates nothing new.
#[derive(Debug, Serialize)]
pub(crate) struct CompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a [String],
    pub max_tokens: u32,
    pub echo: bool,
    pub logprobs: u32,
    pub temperature: f32,
}

impl<'a> CompletionRequest<'a> {
    pub(crate) fn scoring(model: &'a str, prompt: &'a [String]) -> Self {
        Self {
            model,
            prompt,
            max_tokens: 0,
            echo: true,
            logprobs: 0,
            temperature: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub index: usize,
    pub logprobs: Option<Logprobs>,
}

/// Legacy completions log-probability block.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Logprobs {
    #[serde(default)]
    pub token_logprobs: Vec<Option<f64>>,
    #[serde(default)]
    pub text_offset: Vec<usize>,
}

/// Error body shared by OpenAI and the compatible servers.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub message: String,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

impl ErrorDetail {
    pub(crate) fn is_model_not_found(&self) -> bool {
        matches!(&self.code, Some(serde_json::Value::String(code)) if code == "model_not_found")
    }
}

/// Computes perplexity from per-token natural-log probabilities.
///
/// Returns `exp(-mean(logprobs))` over the tokens that carry a value. The
/// first token of an echoed prompt has no conditioning context and is
/// reported as `None`; such entries are skipped. Returns `None` when no token
/// carries a value.
///
/// # Examples
/// ```
/// use pplcsv_providers_openai::perplexity_from_logprobs;
///
/// let ln_half = 0.5_f64.ln();
/// let ppl = perplexity_from_logprobs(&[None, Some(ln_half), Some(ln_half)]);
/// assert!((ppl.expect("scored tokens") - 2.0).abs() < 1e-12);
/// assert_eq!(perplexity_from_logprobs(&[None]), None);
/// ```
#[must_use]
pub fn perplexity_from_logprobs(logprobs: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = logprobs
        .iter()
        .flatten()
        .fold((0.0_f64, 0_u32), |(sum, count), lp| (sum + lp, count + 1));
    (count > 0).then(|| (-sum / f64::from(count)).exp())
}

impl CompletionResponse {
    /// Turns the returned choices into one perplexity per prompt, in prompt
    /// order. Prompts without any scored token map to `NaN`.
    pub(crate) fn into_perplexities(self, prompts: &[String]) -> Result<Vec<f64>, ScorerError> {
        if self.choices.len() != prompts.len() {
            return Err(ScorerError::MalformedResponse {
                message: format!(
                    "expected {} choices, received {}",
                    prompts.len(),
                    self.choices.len()
                ),
            });
        }
        let mut slots: Vec<Option<f64>> = vec![None; prompts.len()];
        for choice in self.choices {
            let index = choice.index;
            let Some(prompt) = prompts.get(index) else {
                return Err(ScorerError::MalformedResponse {
                    message: format!("choice index {index} is out of range"),
                });
            };
            let logprobs = choice.logprobs.ok_or_else(|| ScorerError::MalformedResponse {
                message: format!("choice {index} carries no logprobs"),
            })?;
            // A prompt of one token (or none) has nothing conditioned to score.
            let value = perplexity_from_logprobs(&prompt_logprobs(&logprobs, prompt))
                .unwrap_or(f64::NAN);
            let slot = slots.get_mut(index).ok_or_else(|| ScorerError::MalformedResponse {
                message: format!("choice index {index} is out of range"),
            })?;
            if slot.replace(value).is_some() {
                return Err(ScorerError::MalformedResponse {
                    message: format!("choice index {index} appears twice"),
                });
            }
        }
        // Lengths match and duplicates were rejected, so every slot is filled.
        Ok(slots.into_iter().flatten().collect())
    }
}

/// Keeps the log-probabilities of tokens that start inside the prompt text.
///
/// Servers that ignore `max_tokens = 0` append generated tokens after the
/// echoed prompt; their offsets lie at or beyond the prompt length. When the
/// server omits offsets every token is kept.
fn prompt_logprobs(logprobs: &Logprobs, prompt: &str) -> Vec<Option<f64>> {
    if logprobs.text_offset.len() != logprobs.token_logprobs.len() {
        return logprobs.token_logprobs.clone();
    }
    let prompt_len = prompt.chars().count();
    logprobs
        .token_logprobs
        .iter()
        .zip(&logprobs.text_offset)
        .filter(|(_, offset)| **offset < prompt_len)
        .map(|(lp, _)| *lp)
        .collect()
}
