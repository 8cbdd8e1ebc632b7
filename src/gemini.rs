use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::config::Settings;
use crate::conversation::{Role, Turn};
use crate::error::GatewayError;
use crate::gateway::{ChatModel, ChatRequest};

const API_KEY_HEADER: &str = "x-goog-api-key";

// Finish reasons that mean the candidate was withheld rather than empty.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

// Structures matching Gemini's generateContent endpoint
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize, Debug)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Gemini REST client. Stateless: the transcript travels with each request.
pub struct GeminiClient {
    client: Client,
    settings: Settings,
}

impl GeminiClient {
    pub fn new(settings: Settings) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.api_base.as_str().trim_end_matches('/'),
            self.settings.model
        )
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn build_request<'a>(request: &ChatRequest<'a>) -> GenerateContentRequest<'a> {
    let mut contents: Vec<Content<'a>> = request
        .history
        .iter()
        .map(|turn| Content {
            role: Some(wire_role(turn.role())),
            parts: vec![Part { text: turn.text() }],
        })
        .collect();
    contents.push(Content {
        role: Some("user"),
        parts: vec![Part { text: request.text }],
    });

    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: request.instruction,
            }],
        },
        contents,
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, GatewayError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GatewayError::Blocked(reason));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GatewayError::EmptyResponse)?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }
    match candidate.finish_reason {
        Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason.as_str()) => {
            Err(GatewayError::Blocked(reason))
        }
        _ => Err(GatewayError::EmptyResponse),
    }
}

fn remote_error(status: u16, body: String) -> GatewayError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .ok()
        .map(|wrapper| {
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            match wrapper.error.status {
                Some(status_text) if !status_text.is_empty() => format!("{status_text}: {msg}"),
                _ => msg,
            }
        })
        .unwrap_or(body);
    GatewayError::Remote { status, message }
}

#[async_trait]
impl ChatModel for GeminiClient {
    #[instrument(skip_all, fields(model = %self.settings.model, history = request.history.len()))]
    async fn generate(&self, request: &ChatRequest<'_>) -> Result<String, GatewayError> {
        let payload = build_request(request);
        let url = self.endpoint();
        debug!(%url, "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.settings.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Gemini request did not complete");
                GatewayError::Network(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %error_body, "Gemini API request failed");
            return Err(remote_error(status.as_u16(), error_body));
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Malformed(format!("Failed to parse Gemini response: {e}")))?;

        extract_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_request_maps_assistant_to_model_role() {
        let history = vec![Turn::user("Hei"), Turn::assistant("Hei igjen")];
        let request = ChatRequest {
            instruction: "instruks",
            history: &history,
            text: "Hva er reguleringsplanen for gnr 12/34?",
        };
        let body = serde_json::to_value(build_request(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "systemInstruction": { "parts": [{ "text": "instruks" }] },
                "contents": [
                    { "role": "user", "parts": [{ "text": "Hei" }] },
                    { "role": "model", "parts": [{ "text": "Hei igjen" }] },
                    { "role": "user", "parts": [{ "text": "Hva er reguleringsplanen for gnr 12/34?" }] }
                ]
            })
        );
    }

    #[test]
    fn test_extract_joins_text_parts() {
        let response = parse(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Grunnlagsdata:\n" }, { "text": "- Ingen plan funnet" }] },
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(extract_text(response).unwrap(), "Grunnlagsdata:\n- Ingen plan funnet");
    }

    #[test]
    fn test_extract_prompt_blocked() {
        let response = parse(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
        assert!(matches!(extract_text(response), Err(GatewayError::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn test_extract_candidate_withheld() {
        let response = parse(json!({ "candidates": [{ "finishReason": "RECITATION" }] }));
        assert!(matches!(extract_text(response), Err(GatewayError::Blocked(r)) if r == "RECITATION"));
    }

    #[test]
    fn test_extract_no_candidates_is_empty() {
        assert!(matches!(
            extract_text(parse(json!({}))),
            Err(GatewayError::EmptyResponse)
        ));
        let response = parse(json!({ "candidates": [{ "content": { "parts": [] }, "finishReason": "STOP" }] }));
        assert!(matches!(extract_text(response), Err(GatewayError::EmptyResponse)));
    }

    #[test]
    fn test_remote_error_uses_envelope_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        match remote_error(400, body.to_string()) {
            GatewayError::Remote { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "INVALID_ARGUMENT: API key not valid.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_remote_error_falls_back_to_raw_body() {
        match remote_error(502, "Bad Gateway".to_string()) {
            GatewayError::Remote { message, .. } => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
