use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::media::EncodedImage;
use crate::utils::timing::log_model_timing;

const GENERATE_CONTENT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Failure modes at the generation boundary. All of them collapse into one
/// generic user-facing message at the call site.
#[derive(Debug, thiserror::Error)]
pub enum HeadshotError {
    #[error("model response contained no image part")]
    NoImageReturned,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("API error (status {status}): {detail}")]
    Api { status: StatusCode, detail: String },
    #[error("invalid image payload in response: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// The two round-trips the studio makes. Abstracted so the session driver can
/// be exercised without the network.
#[async_trait]
pub trait HeadshotGenerator {
    /// Applies a style preset to the source selfie.
    async fn generate(
        &self,
        source: &EncodedImage,
        style_prompt: &str,
    ) -> Result<EncodedImage, HeadshotError>;

    /// Applies a free-text edit to an already generated headshot.
    async fn edit(
        &self,
        image: &EncodedImage,
        instruction: &str,
    ) -> Result<EncodedImage, HeadshotError>;
}

/// Explicit Gemini client, built once at startup and handed to the operations
/// that need it.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

fn compose_style_instruction(style_prompt: &str) -> String {
    format!(
        "Transform this person into a professional headshot. Maintain their facial features \
         and identity accurately. Apply this style: {style_prompt}. The result should be a \
         single, high-quality professional headshot."
    )
}

fn compose_edit_instruction(instruction: &str) -> String {
    format!(
        "Edit this professional headshot based on this instruction: {instruction}. \
         Keep the person's identity consistent."
    )
}

// Image part first, then the instruction, matching the order the model is
// prompted with.
fn build_parts(image: &EncodedImage, instruction: &str) -> Vec<Value> {
    vec![
        json!({
            "inlineData": {
                "mimeType": image.mime_type,
                "data": general_purpose::STANDARD.encode(&image.bytes)
            }
        }),
        json!({ "text": instruction }),
    ]
}

fn build_payload(parts: Vec<Value>) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseModalities": ["TEXT", "IMAGE"]
        }
    })
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

// Debug-level view of the request without dumping image base64.
fn summarize_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(contents) = payload.get("contents").and_then(|value| value.as_array()) {
        let mut summarized_contents = Vec::new();
        for content in contents {
            let role = content
                .get("role")
                .and_then(|value| value.as_str())
                .unwrap_or("user");
            let parts: Vec<Value> = content
                .get("parts")
                .and_then(|value| value.as_array())
                .map(|parts| {
                    parts
                        .iter()
                        .map(|part| {
                            if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                                json!({ "text": truncate_for_log(text, 200) })
                            } else if let Some(inline_data) = part.get("inlineData") {
                                let mime_type = inline_data
                                    .get("mimeType")
                                    .and_then(|value| value.as_str())
                                    .unwrap_or("unknown");
                                let data_len = inline_data
                                    .get("data")
                                    .and_then(|value| value.as_str())
                                    .map(|value| value.len())
                                    .unwrap_or(0);
                                json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
                            } else {
                                json!({ "unknownPart": true })
                            }
                        })
                        .collect()
                })
                .unwrap_or_default();
            summarized_contents.push(json!({ "role": role, "parts": parts }));
        }
        summary.insert("contents".to_string(), Value::Array(summarized_contents));
    }

    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }

    Value::Object(summary)
}

fn summarize_response(response: &GeminiResponse) -> Value {
    let mut text_parts = 0usize;
    let mut image_parts = 0usize;

    let candidates = response.candidates.as_deref().unwrap_or(&[]);
    for candidate in candidates {
        if let Some(content) = &candidate.content {
            if let Some(parts) = &content.parts {
                for part in parts {
                    match part {
                        GeminiPart::Text { .. } => text_parts += 1,
                        GeminiPart::InlineData { inline_data } => {
                            if inline_data.mime_type.starts_with("image/") {
                                image_parts += 1;
                            }
                        }
                    }
                }
            }
        }
    }

    json!({
        "candidates": candidates.len(),
        "textParts": text_parts,
        "imageParts": image_parts
    })
}

fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(message) = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .or_else(|| value.get("message").and_then(|v| v.as_str()))
        {
            return truncate_for_log(message, 2000);
        }
        return truncate_for_log(&value.to_string(), 2000);
    }

    truncate_for_log(trimmed, 2000)
}

fn extract_image(response: GeminiResponse) -> Result<EncodedImage, HeadshotError> {
    for candidate in response.candidates.unwrap_or_default() {
        if let Some(content) = candidate.content {
            if let Some(parts) = content.parts {
                for part in parts {
                    if let GeminiPart::InlineData { inline_data } = part {
                        if inline_data.mime_type.starts_with("image/") {
                            let bytes = general_purpose::STANDARD.decode(inline_data.data)?;
                            return Ok(EncodedImage {
                                bytes,
                                mime_type: inline_data.mime_type,
                            });
                        }
                    }
                }
            }
        }
    }

    Err(HeadshotError::NoImageReturned)
}

impl GeminiClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(GeminiClient {
            http,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_image_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn redact_api_key(&self, text: &str) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }

    async fn call_generate_content(&self, payload: Value) -> Result<GeminiResponse, HeadshotError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GENERATE_CONTENT_BASE, self.model, self.api_key
        );

        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(target: "studio.gemini", model = %self.model, payload = %summarize_payload(&payload));
        }

        let response = match self.http.post(&url).json(&payload).send().await {
            Ok(response) => response,
            Err(err) => {
                let err_text = self.redact_api_key(&err.to_string());
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={}, status={:?})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect(),
                    err.status()
                );
                return Err(HeadshotError::Transport(err_text));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, detail);
            return Err(HeadshotError::Api { status, detail });
        }

        let value = response
            .json::<GeminiResponse>()
            .await
            .map_err(|err| HeadshotError::Transport(self.redact_api_key(&err.to_string())))?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(target: "studio.gemini", model = %self.model, response = %summarize_response(&value));
        }
        Ok(value)
    }

    async fn request_image(
        &self,
        operation: &'static str,
        image: &EncodedImage,
        instruction: String,
    ) -> Result<EncodedImage, HeadshotError> {
        let payload = build_payload(build_parts(image, &instruction));

        log_model_timing("gemini", &self.model, operation, || async move {
            let response = self.call_generate_content(payload).await?;
            extract_image(response)
        })
        .await
    }
}

#[async_trait]
impl HeadshotGenerator for GeminiClient {
    async fn generate(
        &self,
        source: &EncodedImage,
        style_prompt: &str,
    ) -> Result<EncodedImage, HeadshotError> {
        self.request_image(
            "generate_headshot",
            source,
            compose_style_instruction(style_prompt),
        )
        .await
    }

    async fn edit(
        &self,
        image: &EncodedImage,
        instruction: &str,
    ) -> Result<EncodedImage, HeadshotError> {
        self.request_image("edit_headshot", image, compose_edit_instruction(instruction))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> EncodedImage {
        EncodedImage {
            bytes: vec![1, 2, 3, 4],
            mime_type: "image/png".to_string(),
        }
    }

    #[test]
    fn style_instruction_embeds_the_preset_prompt_and_identity_clause() {
        let instruction = compose_style_instruction("neutral grey studio background");
        assert!(instruction.contains("Apply this style: neutral grey studio background."));
        assert!(instruction.contains("identity"));
    }

    #[test]
    fn edit_instruction_embeds_the_free_text() {
        let instruction = compose_edit_instruction("add a blue tie");
        assert!(instruction.contains("add a blue tie"));
        assert!(instruction.contains("identity consistent"));
    }

    #[test]
    fn parts_carry_inline_image_before_instruction_text() {
        let parts = build_parts(&sample_image(), "do the thing");
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[0].pointer("/inlineData/mimeType").and_then(|v| v.as_str()),
            Some("image/png")
        );
        assert_eq!(
            parts[0].pointer("/inlineData/data").and_then(|v| v.as_str()),
            Some(general_purpose::STANDARD.encode([1u8, 2, 3, 4]).as_str())
        );
        assert_eq!(
            parts[1].get("text").and_then(|v| v.as_str()),
            Some("do the thing")
        );
    }

    #[test]
    fn payload_requests_image_response_modality() {
        let payload = build_payload(build_parts(&sample_image(), "x"));
        assert_eq!(
            payload.pointer("/generationConfig/responseModalities/1"),
            Some(&json!("IMAGE"))
        );
        assert_eq!(
            payload.pointer("/contents/0/role").and_then(|v| v.as_str()),
            Some("user")
        );
    }

    #[test]
    fn extracts_the_first_image_part() {
        let encoded = general_purpose::STANDARD.encode([9u8, 8, 7]);
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "here is your headshot" },
                        { "inlineData": { "mimeType": "image/png", "data": encoded } }
                    ]
                }
            }]
        }))
        .unwrap();

        let image = extract_image(response).unwrap();
        assert_eq!(image.bytes, vec![9, 8, 7]);
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn text_only_response_is_a_generation_failure() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I cannot do that" }] }
            }]
        }))
        .unwrap();

        assert!(matches!(
            extract_image(response),
            Err(HeadshotError::NoImageReturned)
        ));
    }

    #[test]
    fn empty_response_is_a_generation_failure() {
        let response: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            extract_image(response),
            Err(HeadshotError::NoImageReturned)
        ));
    }

    #[test]
    fn error_body_summary_prefers_the_api_message() {
        let detail = summarize_error_body(
            r#"{"error": {"code": 429, "message": "Resource has been exhausted"}}"#,
        );
        assert_eq!(detail, "Resource has been exhausted");
        assert_eq!(summarize_error_body("   "), "empty response body");
        assert_eq!(summarize_error_body("plain text"), "plain text");
    }

    #[test]
    fn payload_summary_never_contains_image_base64() {
        let payload = build_payload(build_parts(&sample_image(), "instruction"));
        let summary = summarize_payload(&payload).to_string();
        assert!(!summary.contains(&general_purpose::STANDARD.encode([1u8, 2, 3, 4])));
        assert!(summary.contains("dataLen"));
    }
}
