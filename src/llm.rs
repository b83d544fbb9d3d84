//! Text-generation gateway.
//!
//! One client, two provider adapters (Gemini's `generateContent` REST API and
//! an OpenAI-compatible chat-completions endpoint). The provider is chosen
//! once at startup and injected through [`ProviderConfig`]; sampling is
//! pinned to temperature 0.0 so repeated prompts stay as reproducible as the
//! providers allow. Call failures propagate as-is: no retries, no fallback.

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use tracing::debug;

/// Seam for the pipeline stages. Production code uses [`LlmClient`]; tests
/// substitute scripted fakes.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for std::sync::Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<String> {
        (**self).generate(prompt).await
    }
}

#[derive(Clone)]
pub struct LlmClient {
    provider: ProviderConfig,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            client: reqwest::Client::new(),
        }
    }

    pub fn provider_kind(&self) -> ProviderKind {
        self.provider.kind
    }

    async fn call_gemini(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.provider.base_url, self.provider.model, self.provider.api_key
        );
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {"temperature": 0.0},
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Llm(format!("Gemini API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AssistantError::Llm(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        if let Some(error) = response_json.get("error") {
            return Err(AssistantError::Llm(format!("Gemini API error: {}", error)));
        }

        let text = response_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                AssistantError::Llm(format!(
                    "No text in Gemini response. Response structure: {}",
                    response_json
                ))
            })?;

        Ok(text.to_string())
    }

    async fn call_openai(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.provider.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.0,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.provider.base_url))
            .header("Authorization", format!("Bearer {}", self.provider.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AssistantError::Llm(format!(
                "LLM API error ({}): {}",
                status, error_text
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        if let Some(error) = response_json.get("error") {
            return Err(AssistantError::Llm(format!("LLM API error: {}", error)));
        }

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                AssistantError::Llm(format!(
                    "No content in LLM response. Response structure: {}",
                    response_json
                ))
            })?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = ?self.provider.kind, prompt_len = prompt.len(), "calling LLM");
        match self.provider.kind {
            ProviderKind::Gemini => self.call_gemini(prompt).await,
            ProviderKind::OpenAi => self.call_openai(prompt).await,
        }
    }
}

/// Strip a markdown code fence wrapping the text, if present.
///
/// Drops the opening fence line; drops the closing fence line too when the
/// last line is one, otherwise only the opening line goes (malformed fencing
/// is tolerated, never an error). Idempotent for unfenced input, a lone
/// opening fence, or a matched pair.
pub fn strip_fences(text: &str) -> String {
    let text = text.trim();
    if !text.starts_with("```") {
        return text.to_string();
    }

    let lines: Vec<&str> = text.lines().collect();
    let body: &[&str] = if lines.len() >= 2
        && lines
            .last()
            .map(|l| l.trim().starts_with("```"))
            .unwrap_or(false)
    {
        &lines[1..lines.len() - 1]
    } else {
        &lines[1..]
    };

    body.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_fences_unfenced_text_unchanged() {
        assert_eq!(strip_fences("SELECT 1"), "SELECT 1");
        assert_eq!(strip_fences("  SELECT 1\n"), "SELECT 1");
    }

    #[test]
    fn strip_fences_matched_pair() {
        let fenced = "```sql\nSELECT c.Name FROM Customer c\n```";
        assert_eq!(strip_fences(fenced), "SELECT c.Name FROM Customer c");
    }

    #[test]
    fn strip_fences_plain_fence_without_language() {
        let fenced = "```\n[\"Customer\"]\n```";
        assert_eq!(strip_fences(fenced), "[\"Customer\"]");
    }

    #[test]
    fn strip_fences_opening_fence_only() {
        let fenced = "```sql\nSELECT 1";
        assert_eq!(strip_fences(fenced), "SELECT 1");
    }

    #[test]
    fn strip_fences_is_idempotent() {
        for input in [
            "SELECT 1",
            "```sql\nSELECT 1\n```",
            "```\nSELECT 1",
            "```sql\nSELECT c.Name\nFROM Customer c\n```",
        ] {
            let once = strip_fences(input);
            let twice = strip_fences(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", input);
        }
    }
}
