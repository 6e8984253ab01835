//! Gemini provider implementation.
//!
//! Talks to the Gemini `generateContent` REST endpoint with `?key=`
//! authentication. Every operation is fail-soft: a missing API key or a
//! failed/timed-out call degrades to the documented fallback value, with
//! diagnostics going to the operator log only. One attempt per call, no
//! retries.

use async_trait::async_trait;
use aura_core::error::ProviderError;
use aura_core::provider::{ChatOutcome, ConverseRequest, Provider};
use base64::Engine as _;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// The provider-side model used for all calls, independent of the
/// conversation's display model.
const CHAT_MODEL: &str = "gemini-flash-latest";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Banner returned by the analysis operations when no API key is configured.
const KEY_MISSING_BANNER: &str = "⚠️ Gemini API key not set. Analysis disabled.";
/// Banner returned when text analysis fails.
const TEXT_ANALYSIS_FAILED: &str = "AI analysis failed.";
/// Banner returned when image analysis fails.
const IMAGE_ANALYSIS_FAILED: &str = "Error analyzing image report.";

const TEXT_REPORT_PROMPT: &str = r#"You are a medical lab report analysis AI.

Return output ONLY in this markdown format:

## 📄 Report Summary
- <2 line brief summary>

## 🧪 Key Findings
- Hemoglobin: xx (Low/Normal/High)
- PCV: xx (Low/Normal/High)
- Platelets: xx (Low/Normal/High)
- Other key values if present

## 🚨 Possible Health Risks
- ...

## 🩺 Suggested Actions
- ...
- ...
- ...

## ⚠️ Severity
Low / Medium / High

### ❗ Disclaimer
AI generated. Consult a doctor.

Analyze this report:
"#;

const IMAGE_REPORT_PROMPT: &str = r#"You are a medical lab report analysis AI.

Return only markdown in this format:

### Report Summary
- 1–2 line high-level summary

### Key Findings
- Test: value (Low/Normal/High)

### Possible Health Risks
- ...

### Suggested Actions
- ...
- ...
- ...

### Severity
Low / Medium / High

### Disclaimer
AI generated. Consult a doctor.
"#;

/// Gemini REST provider.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new provider. `None` for the key means every operation
    /// degrades to its fallback without a network call.
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key,
            client,
        }
    }

    /// Create with a custom base URL (for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send a `generateContent` request with the given parts.
    async fn generate_content(
        &self,
        api_key: &str,
        parts: Vec<serde_json::Value>,
        temperature: Option<f64>,
    ) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, CHAT_MODEL
        );

        let mut body = serde_json::json!({
            "contents": [{ "parts": parts }],
        });
        if let Some(t) = temperature {
            body["generationConfig"] = serde_json::json!({ "temperature": t });
        }

        debug!(provider = "gemini", model = CHAT_MODEL, "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let value: serde_json::Value = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse Gemini response: {e}"))
        })?;

        Self::extract_text(&value)
    }

    /// Pull the candidate text out of a `generateContent` response body.
    fn extract_text(value: &serde_json::Value) -> Result<String, ProviderError> {
        let parts = value
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())
            .ok_or_else(|| {
                ProviderError::MalformedResponse("No candidates in Gemini response".into())
            })?;

        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "Empty candidate text in Gemini response".into(),
            ));
        }

        Ok(text)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn converse(&self, request: ConverseRequest) -> ChatOutcome {
        let Some(ref api_key) = self.api_key else {
            debug!("No Gemini API key configured; signaling fallback");
            return ChatOutcome::Unavailable;
        };

        let full_prompt = if request.context.is_empty() {
            request.message.clone()
        } else {
            format!(
                "Context from documents:\n{}\n\nUser Question: {}",
                request.context, request.message
            )
        };

        let parts = vec![serde_json::json!({ "text": full_prompt })];
        match self
            .generate_content(api_key, parts, Some(request.temperature))
            .await
        {
            Ok(text) => ChatOutcome::Answered(text),
            Err(e) => {
                warn!(error = %e, "Gemini converse failed; signaling fallback");
                ChatOutcome::Unavailable
            }
        }
    }

    async fn analyze_report_text(&self, text: &str) -> String {
        let Some(ref api_key) = self.api_key else {
            return KEY_MISSING_BANNER.to_string();
        };

        let prompt = format!("{TEXT_REPORT_PROMPT}{text}");
        let parts = vec![serde_json::json!({ "text": prompt })];
        match self.generate_content(api_key, parts, None).await {
            Ok(markdown) => markdown,
            Err(e) => {
                warn!(error = %e, "Gemini text analysis failed");
                TEXT_ANALYSIS_FAILED.to_string()
            }
        }
    }

    async fn analyze_report_image(&self, image: &[u8], mime_type: &str) -> String {
        let Some(ref api_key) = self.api_key else {
            return KEY_MISSING_BANNER.to_string();
        };

        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let parts = vec![
            serde_json::json!({ "text": IMAGE_REPORT_PROMPT }),
            serde_json::json!({
                "inline_data": { "mime_type": mime_type, "data": encoded }
            }),
        ];
        match self.generate_content(api_key, parts, None).await {
            Ok(markdown) => markdown,
            Err(e) => {
                warn!(error = %e, "Gemini image analysis failed");
                IMAGE_ANALYSIS_FAILED.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_key_provider() -> GeminiProvider {
        GeminiProvider::new(None)
    }

    fn test_request() -> ConverseRequest {
        ConverseRequest {
            message: "hello".into(),
            history: vec![],
            context: String::new(),
            model: "aura-standard".into(),
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn converse_without_key_is_unavailable() {
        let outcome = no_key_provider().converse(test_request()).await;
        assert_eq!(outcome, ChatOutcome::Unavailable);
    }

    #[tokio::test]
    async fn text_analysis_without_key_returns_banner() {
        let banner = no_key_provider().analyze_report_text("blood test").await;
        assert_eq!(banner, "⚠️ Gemini API key not set. Analysis disabled.");
    }

    #[tokio::test]
    async fn image_analysis_without_key_returns_banner() {
        let banner = no_key_provider()
            .analyze_report_image(&[0xFF, 0xD8], "image/jpeg")
            .await;
        assert_eq!(banner, "⚠️ Gemini API key not set. Analysis disabled.");
    }

    #[tokio::test]
    async fn converse_with_unreachable_endpoint_is_unavailable() {
        // Connection refused must fold into Unavailable, never an error.
        let provider = GeminiProvider::new(Some("test-key".into()))
            .with_base_url("http://127.0.0.1:1");
        let outcome = provider.converse(test_request()).await;
        assert_eq!(outcome, ChatOutcome::Unavailable);
    }

    #[tokio::test]
    async fn analysis_with_unreachable_endpoint_returns_failure_banner() {
        let provider = GeminiProvider::new(Some("test-key".into()))
            .with_base_url("http://127.0.0.1:1");
        assert_eq!(provider.analyze_report_text("report").await, "AI analysis failed.");
        assert_eq!(
            provider.analyze_report_image(&[0x89], "image/png").await,
            "Error analyzing image report."
        );
    }

    #[test]
    fn extract_text_joins_parts() {
        let value = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] }
            }]
        });
        assert_eq!(GeminiProvider::extract_text(&value).unwrap(), "Hello world");
    }

    #[test]
    fn extract_text_rejects_missing_candidates() {
        let value = serde_json::json!({ "promptFeedback": {} });
        let err = GeminiProvider::extract_text(&value).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn extract_text_rejects_empty_text() {
        let value = serde_json::json!({
            "candidates": [{ "content": { "parts": [] } }]
        });
        assert!(GeminiProvider::extract_text(&value).is_err());
    }

    #[test]
    fn provider_name() {
        assert_eq!(no_key_provider().name(), "gemini");
    }
}
