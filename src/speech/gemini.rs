// Gemini text-to-speech client
// One generateContent call per request; audio comes back as base64 PCM
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::RemoteApiError;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Everything the remote model needs for one clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub model_id: String,
    pub prompt: String,
    pub voice_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechResponse {
    /// Base64 of 24 kHz mono 16-bit PCM
    pub audio_base64: String,
}

/// The remote speech service, mockable in tests
#[async_trait]
pub trait SpeechApi: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechResponse, RemoteApiError>;
}

// ===== Wire types =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 1],
    speech_config: SpeechConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(request: &'a SpeechRequest) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(request.prompt.clone()),
                    inline_data: None,
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["AUDIO"],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: &request.voice_name,
                        },
                    },
                },
            },
        }
    }
}

/// Pull the first inline audio payload out of the first candidate
fn extract_audio(response: GenerateContentResponse) -> Result<SpeechResponse, RemoteApiError> {
    let inline = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.inline_data))
        .filter(|inline| !inline.data.is_empty())
        .ok_or(RemoteApiError::NoAudioPayload)?;

    tracing::debug!(
        "Received {} base64 chars of {}",
        inline.data.len(),
        inline.mime_type.as_deref().unwrap_or("audio")
    );

    Ok(SpeechResponse {
        audio_base64: inline.data,
    })
}

/// Prefer the API's own error message over the raw body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => body.trim().to_string(),
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl GeminiClient {
    /// `api_key_env` only names the variable in the error shown when the key is missing
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        api_key_env: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteApiError::Client(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_key_env: api_key_env.into(),
        })
    }

    fn url(&self, model_id: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            model_id
        )
    }
}

#[async_trait]
impl SpeechApi for GeminiClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechResponse, RemoteApiError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RemoteApiError::MissingApiKey(self.api_key_env.clone()))?;

        tracing::debug!(
            "Requesting speech from {} with voice {}",
            request.model_id,
            request.voice_name
        );

        let response = self
            .http
            .post(self.url(&request.model_id))
            .header("x-goog-api-key", api_key)
            .json(&GenerateContentRequest::new(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| RemoteApiError::InvalidResponse(e.to_string()))?;

        extract_audio(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> SpeechRequest {
        SpeechRequest {
            model_id: DEFAULT_MODEL.to_string(),
            prompt: "Say hi".to_string(),
            voice_name: "Kore".to_string(),
        }
    }

    fn parse(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_request_body() {
        let req = request();
        let body = serde_json::to_value(GenerateContentRequest::new(&req)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{ "parts": [{ "text": "Say hi" }] }],
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {
                        "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": "Kore" } }
                    }
                }
            })
        );
    }

    #[test]
    fn test_extract_audio() {
        let response = parse(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "inlineData": { "mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AAA=" } }]
                },
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(extract_audio(response).unwrap().audio_base64, "AAA=");
    }

    #[test]
    fn test_extract_audio_skips_text_parts() {
        let response = parse(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "thinking" },
                { "inlineData": { "data": "AQI=" } }
            ] } }]
        }));
        assert_eq!(extract_audio(response).unwrap().audio_base64, "AQI=");
    }

    #[test]
    fn test_missing_audio() {
        for value in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{ "finishReason": "SAFETY" }] }),
            json!({ "candidates": [{ "content": { "parts": [{ "text": "no audio" }] } }] }),
            json!({ "candidates": [{ "content": { "parts": [{ "inlineData": { "data": "" } }] } }] }),
        ] {
            assert!(matches!(
                extract_audio(parse(value)),
                Err(RemoteApiError::NoAudioPayload)
            ));
        }
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid.");
        assert_eq!(error_message(" upstream timeout \n"), "upstream timeout");
    }

    #[test]
    fn test_url() {
        let client = GeminiClient::new(
            "https://example.test/v1beta/",
            Some("key".to_string()),
            "GEMINI_API_KEY",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.url(DEFAULT_MODEL),
            "https://example.test/v1beta/models/gemini-2.5-flash-preview-tts:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let client = GeminiClient::new(
            DEFAULT_ENDPOINT,
            Some("   ".to_string()),
            "GEMINI_API_KEY",
            Duration::from_secs(5),
        )
        .unwrap();

        match client.synthesize(&request()).await {
            Err(RemoteApiError::MissingApiKey(var)) => assert_eq!(var, "GEMINI_API_KEY"),
            other => panic!("expected MissingApiKey, got {:?}", other),
        }
    }
}
