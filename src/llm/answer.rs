//! Core `AnswerGenerator` trait and `OllamaClient` implementation.
//!
//! `OllamaClient` calls a local Ollama server over its native API:
//! `/api/chat` for answers, `/api/tags` for liveness and model checks.
//! All connection details come from [`LlmConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::llm::prompt::PromptBuilder;

/// Short timeout for the liveness probe — either the server answers
/// immediately or it is not running.
const LIVENESS_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);
/// Timeout for the model listing, which can lag while Ollama starts up.
const TAGS_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

// ---------------------------------------------------------------------------
// AnswerError
// ---------------------------------------------------------------------------

/// Single failure condition for answer generation.
///
/// Transport failures, timeouts, bad status codes, unparseable bodies, and
/// empty completions all land here; `cause` is human-readable and ends up
/// in the pipeline's failure event.  Generation is never retried — by the
/// time a retry finished, the conversation would have moved on.
#[derive(Debug, Clone, Error)]
#[error("answer generation failed: {cause}")]
pub struct AnswerError {
    pub cause: String,
}

impl AnswerError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }
}

impl From<reqwest::Error> for AnswerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AnswerError::new("request timed out")
        } else {
            AnswerError::new(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// AnswerGenerator trait
// ---------------------------------------------------------------------------

/// Async trait for producing an answer to one detected question.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. wrapped in `Arc<dyn AnswerGenerator>`).
///
/// # Arguments
/// * `question` – The question transcript, as cleaned by the dispatcher.
/// * `context`  – Optional rendered block of recent conversation from
///                [`ConversationContext::prompt_block`](crate::llm::ConversationContext::prompt_block).
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(&self, question: &str, context: Option<&str>) -> Result<String, AnswerError>;
}

// ---------------------------------------------------------------------------
// OllamaClient
// ---------------------------------------------------------------------------

/// Talks to a local Ollama server over its native chat API.
///
/// # No hardcoded URLs
/// All connection details (`base_url`, `model`, timeouts) come exclusively
/// from the [`LlmConfig`] passed to [`OllamaClient::from_config`].
pub struct OllamaClient {
    client: reqwest::Client,
    config: LlmConfig,
    prompt_builder: PromptBuilder,
}

impl OllamaClient {
    /// Build an `OllamaClient` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.  A default (no-timeout) client is used as a
    /// last-resort fallback if the builder fails (should never happen in
    /// practice).
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            prompt_builder: PromptBuilder::new(),
        }
    }

    /// Returns `true` when the Ollama server answers `/api/tags` within a
    /// 2-second window.  Purely diagnostic; generation attempts do their
    /// own error handling.
    pub async fn is_alive(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        match self
            .client
            .get(&url)
            .timeout(LIVENESS_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Returns `true` when the configured model appears in the server's
    /// model listing.  Matches by substring so `"llama3.2:3b"` also matches
    /// a listing like `"llama3.2:3b-instruct-q4_K_M"`.
    pub async fn model_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        let response = match self.client.get(&url).timeout(TAGS_TIMEOUT).send().await {
            Ok(r) => r,
            Err(_) => return false,
        };
        let json: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(_) => return false,
        };
        model_listed(&json, &self.config.model)
    }
}

#[async_trait]
impl AnswerGenerator for OllamaClient {
    /// Send `question` to the configured `/api/chat` endpoint.
    ///
    /// One attempt, no retry; `options.num_predict` caps the answer length
    /// so a rambling model cannot stall the pipeline.
    async fn answer(&self, question: &str, context: Option<&str>) -> Result<String, AnswerError> {
        let (system_msg, user_msg) = self.prompt_builder.build_chat(question, context);

        let url = format!("{}/api/chat", self.config.base_url);

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_msg },
                { "role": "user",   "content": user_msg   }
            ],
            "stream": false,
            "options": {
                "num_predict": self.config.max_answer_tokens,
                "temperature": self.config.temperature
            }
        });

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnswerError::new(format!(
                "Ollama returned HTTP {status}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnswerError::new(format!("unparseable response: {e}")))?;

        extract_answer(&json)
    }
}

/// Pull `message.content` out of an `/api/chat` response body.
fn extract_answer(json: &serde_json::Value) -> Result<String, AnswerError> {
    let answer = json["message"]["content"]
        .as_str()
        .ok_or_else(|| AnswerError::new("response carried no message content"))?
        .trim()
        .to_string();

    if answer.is_empty() {
        return Err(AnswerError::new("model returned an empty answer"));
    }
    Ok(answer)
}

/// Check an `/api/tags` body for `model`, matching by substring in either
/// direction (tag names carry suffixes like `:latest`).
fn model_listed(json: &serde_json::Value, model: &str) -> bool {
    json["models"]
        .as_array()
        .map(|models| {
            models.iter().any(|m| {
                m["name"]
                    .as_str()
                    .map(|name| name.contains(model) || model.contains(name))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_config() -> LlmConfig {
        LlmConfig {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2:3b".into(),
            max_answer_tokens: 150,
            temperature: 0.7,
            timeout_secs: 10,
        }
    }

    #[test]
    fn from_config_builds_without_panic() {
        let config = make_config();
        let _client = OllamaClient::from_config(&config);
    }

    /// Verify that `OllamaClient` is object-safe (usable as `dyn AnswerGenerator`).
    #[test]
    fn generator_is_object_safe() {
        let config = make_config();
        let generator: Box<dyn AnswerGenerator> = Box::new(OllamaClient::from_config(&config));
        // Just holding the trait object is sufficient to verify object-safety.
        drop(generator);
    }

    // ---- extract_answer --------------------------------------------------------

    #[test]
    fn extract_answer_reads_message_content() {
        let body = json!({
            "model": "llama3.2:3b",
            "message": { "role": "assistant", "content": "  It is noon.  " }
        });
        assert_eq!(extract_answer(&body).unwrap(), "It is noon.");
    }

    #[test]
    fn extract_answer_rejects_missing_content() {
        let body = json!({ "model": "llama3.2:3b", "done": true });
        let err = extract_answer(&body).unwrap_err();
        assert!(err.cause.contains("no message content"));
    }

    #[test]
    fn extract_answer_rejects_blank_content() {
        let body = json!({ "message": { "content": "   " } });
        let err = extract_answer(&body).unwrap_err();
        assert!(err.cause.contains("empty answer"));
    }

    // ---- model_listed -----------------------------------------------------------

    #[test]
    fn model_listed_exact_and_substring() {
        let tags = json!({
            "models": [
                { "name": "llama3.2:3b" },
                { "name": "qwen2.5:7b-instruct" }
            ]
        });
        assert!(model_listed(&tags, "llama3.2:3b"));
        assert!(model_listed(&tags, "qwen2.5:7b"));
        assert!(!model_listed(&tags, "mistral"));
    }

    #[test]
    fn model_listed_handles_malformed_body() {
        assert!(!model_listed(&json!({}), "llama3.2:3b"));
        assert!(!model_listed(&json!({ "models": "oops" }), "llama3.2:3b"));
    }

    // ---- AnswerError ---------------------------------------------------------

    #[test]
    fn answer_error_display_carries_cause() {
        let err = AnswerError::new("connection refused");
        assert_eq!(
            err.to_string(),
            "answer generation failed: connection refused"
        );
    }
}
