//! Gemini REST client.
//!
//! Inference goes through `generateContent` with text, inline-data or
//! file-data parts. Videos above the inline threshold are pushed through
//! the resumable file API and polled until the provider finishes
//! server-side processing.

use std::path::Path;
use std::time::Duration;

use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::AnalysisProvider;

/// Files at or below this size are inlined into the request body.
const INLINE_LIMIT_BYTES: u64 = 18 * 1024 * 1024;

/// Hard file-API ceiling. Larger files are never attempted.
const FILE_API_LIMIT_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key
    pub api_key: String,
    /// API base URL (overridable for tests)
    pub base_url: String,
    /// Inference models, tried in order
    pub models: Vec<String>,
    /// Embedding model
    pub embed_model: String,
    /// Inline threshold for video files
    pub inline_limit: u64,
    /// Hard ceiling for the file API
    pub file_limit: u64,
    /// Delay between file-processing polls
    pub poll_interval: Duration,
    /// Maximum file-processing polls before giving up
    pub poll_attempts: u32,
}

impl GeminiConfig {
    /// Build config from environment variables. `GEMINI_API_KEY` is
    /// required; everything else has defaults.
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ProviderError::config("GEMINI_API_KEY not set"))?;
        let mut config = Self::with_api_key(api_key);
        if let Ok(base) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = base;
        }
        Ok(config)
    }

    /// Default config with the given API key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            models: vec![
                "gemini-2.5-flash".to_string(),
                "gemini-2.5-pro".to_string(),
            ],
            embed_model: "text-embedding-004".to_string(),
            inline_limit: INLINE_LIMIT_BYTES,
            file_limit: FILE_API_LIMIT_BYTES,
            poll_interval: Duration::from_secs(10),
            poll_attempts: 30,
        }
    }

}

/// Gemini API client.
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(rename = "fileData", skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
            file_data: None,
        }
    }

    fn inline(mime: impl Into<String>, data: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime.into(),
                data: base64::engine::general_purpose::STANDARD.encode(data),
            }),
            file_data: None,
        }
    }

    fn file(mime: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: None,
            file_data: Some(FileData {
                mime_type: mime.into(),
                file_uri: uri.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
struct FileData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "fileUri")]
    file_uri: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileMetadata,
}

#[derive(Debug, Deserialize)]
struct FileMetadata {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    state: String,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(config: GeminiConfig) -> ProviderResult<Self> {
        if config.api_key.is_empty() {
            return Err(ProviderError::config("Gemini API key is empty"));
        }
        Ok(Self {
            config,
            client: Client::new(),
        })
    }

    /// Call `generateContent`, falling back through the configured models.
    async fn generate(&self, parts: Vec<Part>) -> ProviderResult<String> {
        let mut last_error = None;

        for model in &self.config.models {
            debug!("Attempting Gemini API with model: {}", model);
            let request = GenerateRequest {
                contents: vec![Content {
                    parts: parts.clone(),
                }],
            };

            match self.call_generate(model, &request).await {
                Ok(text) => {
                    info!("Got analysis from {}", model);
                    return Ok(text);
                }
                Err(e) if e.is_permanent() => return Err(e),
                Err(e) => {
                    warn!("Model {} failed: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ProviderError::invalid_response("no models configured")))
    }

    async fn call_generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> ProviderResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url, model, self.config.api_key
        );

        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed { status, message });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(format!("bad generate body: {}", e)))?;

        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::EmptyAnalysis);
        }
        Ok(text.to_string())
    }

    /// Upload a file through the resumable file API and wait for the
    /// provider to finish processing it. Returns the file URI for use in a
    /// `file_data` part.
    async fn upload_and_process(&self, path: &Path, mime: &str) -> ProviderResult<String> {
        let bytes = tokio::fs::read(path).await?;
        let length = bytes.len();

        // Start the resumable session.
        let start_url = format!(
            "{}/upload/v1beta/files?key={}",
            self.config.base_url, self.config.api_key
        );
        let start = self
            .client
            .post(&start_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", length.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime)
            .json(&serde_json::json!({
                "file": { "display_name": path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "upload".into()) }
            }))
            .send()
            .await?;

        if !start.status().is_success() {
            let status = start.status().as_u16();
            let message = start.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed { status, message });
        }

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| ProviderError::invalid_response("missing x-goog-upload-url header"))?;

        // Upload the bytes and finalize in one shot.
        let upload = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .body(bytes)
            .send()
            .await?;

        if !upload.status().is_success() {
            let status = upload.status().as_u16();
            let message = upload.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed { status, message });
        }

        let uploaded: UploadResponse = upload
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(format!("bad upload body: {}", e)))?;

        self.poll_until_active(uploaded.file).await
    }

    /// Poll the file resource until `ACTIVE`. `FAILED` and poll exhaustion
    /// are both terminal for the attempt.
    async fn poll_until_active(&self, mut file: FileMetadata) -> ProviderResult<String> {
        let mut attempts = 0u32;

        while file.state == "PROCESSING" || file.state.is_empty() {
            if attempts >= self.config.poll_attempts {
                return Err(ProviderError::ProcessingTimeout { attempts });
            }
            attempts += 1;
            tokio::time::sleep(self.config.poll_interval).await;

            let url = format!(
                "{}/v1beta/{}?key={}",
                self.config.base_url, file.name, self.config.api_key
            );
            let response = self.client.get(&url).send().await?;
            if !response.status().is_success() {
                let status = response.status().as_u16();
                let message = response.text().await.unwrap_or_default();
                return Err(ProviderError::RequestFailed { status, message });
            }
            file = response
                .json()
                .await
                .map_err(|e| ProviderError::invalid_response(format!("bad file body: {}", e)))?;
            debug!(file = %file.name, state = %file.state, attempt = attempts, "File processing poll");
        }

        match file.state.as_str() {
            "ACTIVE" => Ok(file.uri),
            "FAILED" => Err(ProviderError::ProcessingFailed(format!(
                "file {} failed server-side processing",
                file.name
            ))),
            other => Err(ProviderError::invalid_response(format!(
                "unexpected file state {}",
                other
            ))),
        }
    }
}

#[async_trait::async_trait]
impl AnalysisProvider for GeminiClient {
    async fn analyze_image(
        &self,
        bytes: Vec<u8>,
        mime: String,
        prompt: String,
    ) -> ProviderResult<String> {
        self.generate(vec![Part::inline(mime, &bytes), Part::text(prompt)])
            .await
    }

    async fn analyze_video(&self, path: &Path, prompt: String) -> ProviderResult<String> {
        let size = tokio::fs::metadata(path).await?.len();

        if size > self.config.file_limit {
            return Err(ProviderError::FileTooLarge {
                size,
                limit: self.config.file_limit,
            });
        }

        if size <= self.config.inline_limit {
            let bytes = tokio::fs::read(path).await?;
            return self
                .generate(vec![Part::inline("video/mp4", &bytes), Part::text(prompt)])
                .await;
        }

        info!(size_mb = size as f64 / 1_048_576.0, "Routing video through file API");
        let uri = self.upload_and_process(path, "video/mp4").await?;
        self.generate(vec![Part::file("video/mp4", uri), Part::text(prompt)])
            .await
    }

    async fn analyze_text(&self, prompt: String) -> ProviderResult<String> {
        self.generate(vec![Part::text(prompt)]).await
    }

    async fn embed(&self, text: String) -> ProviderResult<Vec<f32>> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent?key={}",
            self.config.base_url, self.config.embed_model, self.config.api_key
        );
        let request = EmbedRequest {
            model: format!("models/{}", self.config.embed_model),
            content: Content {
                parts: vec![Part::text(text)],
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed { status, message });
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(format!("bad embed body: {}", e)))?;

        if body.embedding.values.is_empty() {
            return Err(ProviderError::invalid_response("empty embedding"));
        }
        Ok(body.embedding.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> GeminiConfig {
        GeminiConfig {
            base_url,
            models: vec!["gemini-2.5-flash".to_string()],
            poll_interval: Duration::from_millis(1),
            poll_attempts: 5,
            ..GeminiConfig::with_api_key("test-key")
        }
    }

    fn generate_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })
    }

    #[tokio::test]
    async fn test_analyze_text_happy_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(generate_body("A fine portfolio")))
            .mount(&server)
            .await;

        let client = GeminiClient::new(test_config(server.uri())).unwrap();
        let text = client.analyze_text("describe".into()).await.unwrap();
        assert_eq!(text, "A fine portfolio");
    }

    #[tokio::test]
    async fn test_blank_response_is_empty_analysis() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/v1beta/models/.*:generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(generate_body("   ")))
            .mount(&server)
            .await;

        let client = GeminiClient::new(test_config(server.uri())).unwrap();
        let err = client.analyze_text("describe".into()).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyAnalysis));
    }

    #[tokio::test]
    async fn test_http_429_is_retryable_request_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/v1beta/models/.*:generateContent$"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exhausted"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(test_config(server.uri())).unwrap();
        let err = client.analyze_text("describe".into()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, ProviderError::RequestFailed { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_model_fallback_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(generate_body("from fallback")))
            .mount(&server)
            .await;

        let mut config = test_config(server.uri());
        config.models = vec!["gemini-2.5-flash".into(), "gemini-2.5-pro".into()];
        let client = GeminiClient::new(config).unwrap();
        let text = client.analyze_text("describe".into()).await.unwrap();
        assert_eq!(text, "from fallback");
    }

    #[tokio::test]
    async fn test_embed_returns_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/text-embedding-004:embedContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": { "values": [0.1, 0.2, 0.3] }
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(test_config(server.uri())).unwrap();
        let vector = client.embed("some text".into()).await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_video_over_ceiling_is_file_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.mp4");
        tokio::fs::write(&file, vec![0u8; 64]).await.unwrap();

        let mut config = test_config("http://unused.invalid".into());
        config.file_limit = 32; // anything bigger is rejected outright
        let client = GeminiClient::new(config).unwrap();

        let err = client
            .analyze_video(&file, "describe".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::FileTooLarge { size: 64, .. }));
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_small_video_is_inlined() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/v1beta/models/.*:generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(generate_body("video analysis")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("small.mp4");
        tokio::fs::write(&file, vec![0u8; 16]).await.unwrap();

        let client = GeminiClient::new(test_config(server.uri())).unwrap();
        let text = client
            .analyze_video(&file, "describe".into())
            .await
            .unwrap();
        assert_eq!(text, "video analysis");
    }

    #[tokio::test]
    async fn test_large_video_goes_through_file_api() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload/v1beta/files"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-goog-upload-url", format!("{}/upload-session", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload-session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "file": { "name": "files/abc123", "uri": "", "state": "PROCESSING" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1beta/files/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "files/abc123",
                "uri": "https://files.example/abc123",
                "state": "ACTIVE"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/v1beta/models/.*:generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(generate_body("long video analysis")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("long.mp4");
        tokio::fs::write(&file, vec![0u8; 128]).await.unwrap();

        let mut config = test_config(server.uri());
        config.inline_limit = 64; // force the file-API path
        let client = GeminiClient::new(config).unwrap();

        let text = client
            .analyze_video(&file, "describe".into())
            .await
            .unwrap();
        assert_eq!(text, "long video analysis");
    }

    #[tokio::test]
    async fn test_file_processing_failure_is_terminal() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload/v1beta/files"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-goog-upload-url", format!("{}/upload-session", server.uri()).as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload-session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "file": { "name": "files/bad", "uri": "", "state": "FAILED" }
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.mp4");
        tokio::fs::write(&file, vec![0u8; 128]).await.unwrap();

        let mut config = test_config(server.uri());
        config.inline_limit = 64;
        let client = GeminiClient::new(config).unwrap();

        let err = client
            .analyze_video(&file, "describe".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ProcessingFailed(_)));
        assert!(!err.is_retryable());
    }
}
