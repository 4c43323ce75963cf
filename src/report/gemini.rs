//! Gemini multimodal report generation.
//!
//! The video is sent through the Files API (resumable upload), polled until the
//! service has finished processing it, then referenced from a single
//! `generateContent` call alongside the report instruction.

use super::{ReportGenerator, VideoAsset};
use crate::config::ReportSettings;
use crate::error::{CaseLinkError, Result};
use async_trait::async_trait;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Gemini-backed report generator.
pub struct GeminiReportGenerator {
    http: reqwest::Client,
    api_key: String,
    api_base: Url,
    model: String,
    instruction: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl GeminiReportGenerator {
    /// Create a generator using the key from `GEMINI_API_KEY`.
    pub fn from_env(settings: &ReportSettings, instruction: &str) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            CaseLinkError::Config(format!(
                "{} not set. Set it with: export {}='...'",
                API_KEY_ENV, API_KEY_ENV
            ))
        })?;
        Self::new(api_key, settings, instruction)
    }

    pub fn new(api_key: String, settings: &ReportSettings, instruction: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(CaseLinkError::Config(format!("{} is empty", API_KEY_ENV)));
        }

        let api_base = Url::parse(&settings.api_base)
            .map_err(|e| CaseLinkError::Config(format!("Invalid report.api_base: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| CaseLinkError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            api_base,
            model: settings.model.clone(),
            instruction: instruction.to_string(),
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            max_poll_attempts: settings.max_poll_attempts,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base
            .join(path)
            .map_err(|e| CaseLinkError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// Upload the video with the resumable protocol.
    #[instrument(skip(self, video), fields(file = %video.display_name))]
    async fn upload(&self, video: &VideoAsset) -> Result<GeminiFile> {
        let bytes = tokio::fs::read(&video.path).await?;
        info!("Uploading {} ({} bytes)", video.display_name, bytes.len());

        let start = self
            .http
            .post(self.endpoint("upload/v1beta/files")?)
            .header("x-goog-api-key", &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", &video.mime_type)
            .json(&serde_json::json!({ "file": { "display_name": video.display_name } }))
            .send()
            .await?;
        let start = check_status(start, "Upload start").await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| CaseLinkError::Generation("Upload session returned no upload URL".to_string()))?
            .to_string();

        let finished = self
            .http
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let uploaded: UploadResponse = check_status(finished, "Upload").await?.json().await?;

        debug!("Uploaded as {} ({:?})", uploaded.file.name, uploaded.file.state);
        Ok(uploaded.file)
    }

    /// Poll the file until the service reports it ready for use.
    async fn wait_until_active(&self, mut file: GeminiFile) -> Result<GeminiFile> {
        for attempt in 0..=self.max_poll_attempts {
            match file.state {
                FileState::Active => return Ok(file),
                FileState::Failed => {
                    return Err(CaseLinkError::Generation(format!(
                        "Video processing failed for {}",
                        file.name
                    )))
                }
                FileState::Processing | FileState::Unspecified => {}
            }

            if attempt == self.max_poll_attempts {
                break;
            }

            debug!("Waiting for {} to finish processing (attempt {})", file.name, attempt + 1);
            tokio::time::sleep(self.poll_interval).await;

            let response = self
                .http
                .get(self.endpoint(&format!("v1beta/{}", file.name))?)
                .header("x-goog-api-key", &self.api_key)
                .send()
                .await?;
            file = check_status(response, "File status").await?.json().await?;
        }

        Err(CaseLinkError::Generation(format!(
            "Video {} was still processing after {} checks",
            file.name, self.max_poll_attempts
        )))
    }

    async fn generate_content(&self, file: &GeminiFile, mime_type: &str) -> Result<GenerateContentResponse> {
        let request = GenerateContentRequest::for_video(file, mime_type, &self.instruction);

        let response = self
            .http
            .post(self.endpoint(&format!("v1beta/models/{}:generateContent", self.model))?)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        Ok(check_status(response, "Generation").await?.json().await?)
    }
}

#[async_trait]
impl ReportGenerator for GeminiReportGenerator {
    #[instrument(skip(self, video), fields(model = %self.model, file = %video.display_name))]
    async fn generate(&self, video: &VideoAsset) -> Result<String> {
        let file = self.upload(video).await?;
        let file = self.wait_until_active(file).await?;
        let mime_type = file.mime_type.clone().unwrap_or_else(|| video.mime_type.clone());

        info!("Generating report with {}", self.model);
        let response = self.generate_content(&file, &mime_type).await?;
        let text = extract_text(response)?;

        info!("Generated report ({} chars)", text.len());
        Ok(text)
    }
}

/// Turn a non-success response into a generation error carrying the body.
async fn check_status(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("{} failed with {}", action, status);
    Err(CaseLinkError::Generation(format!("{} failed ({}): {}", action, status, body.trim())))
}

/// Concatenate the text parts of the first candidate.
pub(crate) fn extract_text(response: GenerateContentResponse) -> Result<String> {
    let block_reason = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.clone());

    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        CaseLinkError::Generation(match &block_reason {
            Some(reason) => format!("Response blocked ({})", reason),
            None => "Response contained no candidates".to_string(),
        })
    })?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .or(block_reason)
            .unwrap_or_else(|| "unknown".to_string());
        return Err(CaseLinkError::Generation(format!(
            "Response carried no text (finish reason: {})",
            reason
        )));
    }

    Ok(text)
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: GeminiFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiFile {
    name: String,
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: FileState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum FileState {
    Processing,
    Active,
    Failed,
    #[default]
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

impl GenerateContentRequest {
    fn for_video(file: &GeminiFile, mime_type: &str, instruction: &str) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::File {
                        file_data: FileData {
                            mime_type: mime_type.to_string(),
                            file_uri: file.uri.clone(),
                        },
                    },
                    Part::Text {
                        text: instruction.to_string(),
                    },
                ],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    File {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let r = response(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "1. Incident Overview: " },
                    { "text": "ATM tampering at night." }
                ]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(extract_text(r).unwrap(), "1. Incident Overview: ATM tampering at night.");
    }

    #[test]
    fn test_missing_text_is_generation_error() {
        let r = response(serde_json::json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "SAFETY" }]
        }));
        match extract_text(r) {
            Err(CaseLinkError::Generation(msg)) => assert!(msg.contains("SAFETY")),
            other => panic!("expected generation error, got {:?}", other),
        }

        let r = response(serde_json::json!({
            "candidates": [],
            "promptFeedback": { "blockReason": "OTHER" }
        }));
        match extract_text(r) {
            Err(CaseLinkError::Generation(msg)) => assert!(msg.contains("OTHER")),
            other => panic!("expected generation error, got {:?}", other),
        }

        assert!(matches!(
            extract_text(GenerateContentResponse::default()),
            Err(CaseLinkError::Generation(_))
        ));
    }

    #[test]
    fn test_request_shape() {
        let file: GeminiFile = serde_json::from_value(serde_json::json!({
            "name": "files/abc123",
            "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc123",
            "mimeType": "video/mp4",
            "state": "ACTIVE"
        }))
        .unwrap();
        assert_eq!(file.state, FileState::Active);

        let request = GenerateContentRequest::for_video(&file, "video/mp4", "Describe it.");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "fileData": {
                            "mimeType": "video/mp4",
                            "fileUri": "https://generativelanguage.googleapis.com/v1beta/files/abc123"
                        }},
                        { "text": "Describe it." }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_unknown_file_state() {
        let file: GeminiFile = serde_json::from_value(serde_json::json!({
            "name": "files/x",
            "uri": "u",
            "state": "SOMETHING_NEW"
        }))
        .unwrap();
        assert_eq!(file.state, FileState::Unspecified);
    }

    #[test]
    fn test_endpoints() {
        let generator = GeminiReportGenerator::new(
            "key".to_string(),
            &ReportSettings::default(),
            "instruction",
        )
        .unwrap();
        assert_eq!(
            generator.endpoint("v1beta/models/gemini-2.0-flash:generateContent").unwrap().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(
            generator.endpoint("upload/v1beta/files").unwrap().as_str(),
            "https://generativelanguage.googleapis.com/upload/v1beta/files"
        );
    }

    #[test]
    fn test_empty_key_is_config_error() {
        let result = GeminiReportGenerator::new(" ".to_string(), &ReportSettings::default(), "x");
        assert!(matches!(result, Err(CaseLinkError::Config(_))));
    }
}
