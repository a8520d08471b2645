//! External text-curation collaborator.
//!
//! Combines both providers' accumulated transcripts under a meeting-context
//! string via an OpenAI-compatible chat-completions call. Invoked on a timer
//! by the capture client; any failure here maps to a display string and never
//! affects relay correctness.

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::config::CurationConfig;

const SYSTEM_PROMPT: &str = "You are a meeting transcription curator. Your task is to combine and \
refine transcriptions from two different ASR systems, using the meeting \
agenda context as the primary guide for curation. Use the context to \
disambiguate unclear words, correct errors, and ensure accuracy. Combine the \
best parts of both transcriptions, maintain the natural flow of conversation, \
and preserve important details from both sources that align with the context. \
Output ONLY a JSON object in this exact format: \
{\"transcription\": \"your curated transcription text here\"} with no \
additional text.";

#[derive(Clone)]
pub struct CurationClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl CurationClient {
    pub fn new(config: &CurationConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Merge both transcripts under the context string into one curated
    /// transcription.
    pub async fn curate(
        &self,
        provider_a_text: &str,
        provider_b_text: &str,
        context_text: &str,
    ) -> Result<String> {
        if self.api_key.is_empty() {
            bail!("curation API key not configured");
        }

        let user_prompt = format!(
            "Meeting Agenda Context:\n{}\n\nASR 1 Transcription:\n{}\n\nASR 2 Transcription:\n{}\n\n\
             Provide ONLY the curated transcription in JSON format: \
             {{\"transcription\": \"...\"}}.",
            if context_text.trim().is_empty() {
                "No agenda provided - proceed with standard curation"
            } else {
                context_text
            },
            if provider_a_text.is_empty() {
                "No transcription yet"
            } else {
                provider_a_text
            },
            if provider_b_text.is_empty() {
                "No transcription yet"
            } else {
                provider_b_text
            },
        );

        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt },
            ],
            "temperature": 0.3,
            "max_tokens": 2000,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .context("Curation request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Curation endpoint returned {}", status);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse curation response")?;

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();

        debug!("curation response: {} chars", content.len());

        Ok(extract_transcription(content))
    }
}

/// Pull the curated transcription out of the model's reply.
///
/// Accepts a plain JSON object, a fenced ```json block, or (as a last
/// resort) returns the raw reply unchanged.
pub fn extract_transcription(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    let text = text.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        if let Some(transcription) = value.get("transcription").and_then(|v| v.as_str()) {
            return transcription.to_string();
        }
        if let Some(transcription) = value.get("text").and_then(|v| v.as_str()) {
            return transcription.to_string();
        }
    }

    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_json_object() {
        let raw = r#"{"transcription": "the curated text"}"#;
        assert_eq!(extract_transcription(raw), "the curated text");
    }

    #[test]
    fn extracts_fenced_json_block() {
        let raw = "```json\n{\"transcription\": \"fenced text\"}\n```";
        assert_eq!(extract_transcription(raw), "fenced text");
    }

    #[test]
    fn extracts_bare_fenced_block() {
        let raw = "```\n{\"transcription\": \"bare fence\"}\n```";
        assert_eq!(extract_transcription(raw), "bare fence");
    }

    #[test]
    fn falls_back_to_text_field() {
        let raw = r#"{"text": "alternate field"}"#;
        assert_eq!(extract_transcription(raw), "alternate field");
    }

    #[test]
    fn falls_back_to_raw_content() {
        let raw = "Just the transcription, no JSON at all.";
        assert_eq!(extract_transcription(raw), raw);
    }

    #[test]
    fn unrelated_json_falls_back_to_raw() {
        let raw = r#"{"something": "else"}"#;
        assert_eq!(extract_transcription(raw), raw);
    }
}
