use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::{TranscriptError, TranscriptService};

pub const DEFAULT_BASE_URL: &str = "https://api.supadata.ai/v1/youtube/transcript";

/// Transcript API client for supadata.ai
pub struct SupadataClient {
    client: Client,
    base_url: String,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptBody {
    content: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl SupadataClient {
    /// Create a client whose every request is bounded by `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            language: None,
        })
    }

    /// Preferred transcript language, "auto" leaves the choice to the API
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language.filter(|lang| !lang.is_empty() && lang != "auto");
        self
    }

    fn parse_error(status: StatusCode, body: &str) -> TranscriptError {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .filter(|m| !m.trim().is_empty())
            .or_else(|| status.canonical_reason().map(|r| r.to_string()));

        TranscriptError::upstream(status.as_u16(), message)
    }

    fn parse_success(body: &str) -> Result<String, TranscriptError> {
        let parsed: TranscriptBody = serde_json::from_str(body)
            .map_err(|e| TranscriptError::MalformedResponse(format!("invalid JSON: {}", e)))?;

        match parsed.content {
            Some(serde_json::Value::String(text)) => Ok(text),
            Some(other) => Err(TranscriptError::MalformedResponse(format!(
                "expected text content, got {}",
                json_kind(&other)
            ))),
            None => Err(TranscriptError::MalformedResponse(
                "missing content field".to_string(),
            )),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[async_trait]
impl TranscriptService for SupadataClient {
    async fn fetch_transcript(
        &self,
        locator: &str,
        secret: &str,
    ) -> Result<String, TranscriptError> {
        tracing::debug!("Requesting transcript for {}", locator);

        let mut query = vec![("url", locator), ("text", "true")];
        if let Some(lang) = &self.language {
            query.push(("lang", lang.as_str()));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .header("x-api-key", secret)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| TranscriptError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranscriptError::Transport(e.to_string()))?;

        if !status.is_success() {
            let err = Self::parse_error(status, &body);
            tracing::warn!("Supadata API error response: {}", err);
            return Err(err);
        }

        let text = Self::parse_success(&body)?;
        if text.trim().is_empty() {
            tracing::warn!("Supadata returned an empty transcript for {}", locator);
        } else {
            tracing::debug!("Transcript content length: {}", text.len());
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{FailureClass, UpstreamReason};
    use mockito::{Matcher, Server};

    const VIDEO: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn client_for(server: &Server) -> SupadataClient {
        SupadataClient::new(format!("{}/v1/youtube/transcript", server.url()), Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_key_and_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/youtube/transcript")
            .match_header("x-api-key", "key-123")
            .match_header("accept", "application/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("url".into(), VIDEO.into()),
                Matcher::UrlEncoded("text".into(), "true".into()),
                Matcher::UrlEncoded("lang".into(), "de".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content":"hello world","lang":"de"}"#)
            .create_async()
            .await;

        let client = client_for(&server).with_language(Some("de".into()));
        let text = client.fetch_transcript(VIDEO, "key-123").await.unwrap();

        assert_eq!(text, "hello world");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_content_is_passed_through() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/youtube/transcript")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"content":""}"#)
            .create_async()
            .await;

        let text = client_for(&server).fetch_transcript(VIDEO, "k").await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_rate_limit_is_retryable() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/youtube/transcript")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error":"limit-exceeded","message":"Too many requests"}"#)
            .create_async()
            .await;

        let err = client_for(&server).fetch_transcript(VIDEO, "k").await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Retryable);
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.detail(), "Too many requests");
    }

    #[tokio::test]
    async fn test_unparseable_error_body_falls_back_to_status_line() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/youtube/transcript")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("<html>bad gateway</html>")
            .create_async()
            .await;

        let err = client_for(&server).fetch_transcript(VIDEO, "k").await.unwrap_err();
        assert!(matches!(
            err,
            TranscriptError::Upstream {
                status: 502,
                reason: UpstreamReason::Other,
                ..
            }
        ));
        assert_eq!(err.detail(), "Bad Gateway");
        assert_eq!(err.class(), FailureClass::Terminal);
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_terminal() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/youtube/transcript")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"content":[{"text":"segment"}]}"#)
            .create_async()
            .await;

        let err = client_for(&server).fetch_transcript(VIDEO, "k").await.unwrap_err();
        assert!(matches!(err, TranscriptError::MalformedResponse(_)));
        assert_eq!(err.class(), FailureClass::Terminal);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_failure() {
        // Nothing listens on port 9 in the test environment
        let client =
            SupadataClient::new("http://127.0.0.1:9/transcript", Duration::from_secs(2)).unwrap();
        let err = client.fetch_transcript(VIDEO, "k").await.unwrap_err();
        assert_eq!(err.class(), FailureClass::Transport);
    }

    #[test]
    fn test_auto_language_is_dropped() {
        let client = SupadataClient::new(DEFAULT_BASE_URL, Duration::from_secs(1))
            .unwrap()
            .with_language(Some("auto".into()));
        assert!(client.language.is_none());
    }
}
