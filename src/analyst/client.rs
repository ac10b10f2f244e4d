//! Client for the external analysis service.
//!
//! The service receives a prompt identifier plus the rendered report text and
//! answers with free text. The answer is never parsed here.

use crate::error::{EngineError, Result};
use crate::source::http::request_error_message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Request body sent to the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    /// Which stored prompt the service should apply.
    pub prompt_id: String,
    /// The report payload.
    #[serde(rename = "text_to_analyze")]
    pub text: String,
}

/// Successful answer of the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisResponse {
    #[serde(alias = "resultado")]
    pub result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: String,
}

/// Anything that can run an analysis over a report payload.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse>;
}

/// Configuration for the HTTP analysis client.
#[derive(Debug, Clone)]
pub struct AnalystConfig {
    pub endpoint_url: String,
    pub api_token: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://localhost:3000/api/analyze_multiple_indicators".to_string(),
            api_token: None,
            timeout_seconds: 300,
        }
    }
}

/// Analysis service reached over HTTP.
pub struct HttpAnalyst {
    config: AnalystConfig,
    http_client: reqwest::Client,
}

impl HttpAnalyst {
    pub fn new(config: AnalystConfig) -> Result<Self> {
        info!("Analysis service at {}", config.endpoint_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalyst {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse> {
        debug!(
            "Sending {} bytes with prompt {}",
            request.text.len(),
            request.prompt_id
        );

        let mut http_request = self.http_client.post(&self.config.endpoint_url).json(request);
        if let Some(ref token) = self.config.api_token {
            http_request = http_request.bearer_auth(token);
        }

        let response = http_request.send().await.map_err(|e| {
            EngineError::Analysis(request_error_message(
                &e,
                &self.config.endpoint_url,
                self.config.timeout_seconds,
            ))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::Analysis(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorPayload>(&body) {
                Ok(payload) => payload.error,
                Err(_) => format!("analysis service error {}: {}", status, body),
            };
            return Err(EngineError::Analysis(message));
        }

        serde_json::from_str(&body).map_err(|source| EngineError::Decode {
            what: "analysis response",
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            prompt_id: "7".to_string(),
            text: "COMPARATIVE INDICATOR ANALYSIS:\n\n".to_string(),
        }
    }

    fn analyst(url: String) -> HttpAnalyst {
        HttpAnalyst::new(AnalystConfig {
            endpoint_url: url,
            api_token: Some("token".to_string()),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_analyze_posts_prompt_and_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/analyze_multiple_indicators")
            .match_header("authorization", "Bearer token")
            .match_body(Matcher::Json(json!({
                "prompt_id": "7",
                "text_to_analyze": "COMPARATIVE INDICATOR ANALYSIS:\n\n"
            })))
            .with_status(200)
            .with_body(r#"{"resultado": "Alpha outperforms Beta."}"#)
            .create_async()
            .await;

        let url = format!("{}/api/analyze_multiple_indicators", server.url());
        let response = analyst(url).analyze(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.result, "Alpha outperforms Beta.");
    }

    #[tokio::test]
    async fn test_error_payload_message_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/analyze")
            .with_status(500)
            .with_body(r#"{"error": "prompt not found"}"#)
            .create_async()
            .await;

        let url = format!("{}/analyze", server.url());
        let err = analyst(url).analyze(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "analysis failed: prompt not found");
    }

    #[tokio::test]
    async fn test_non_json_error_keeps_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/analyze")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let url = format!("{}/analyze", server.url());
        let err = analyst(url).analyze(&request()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("502"));
        assert!(message.contains("bad gateway"));
    }

    #[test]
    fn test_analyst_config_default() {
        let config = AnalystConfig::default();
        assert!(config.endpoint_url.ends_with("/api/analyze_multiple_indicators"));
        assert_eq!(config.timeout_seconds, 300);
    }
}
