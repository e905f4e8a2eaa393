use std::time::Duration;

use counsel_core::{ChatRequest, ClientId, SessionId, SessionSummary, TranscriptSnapshot};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::stream::ChatStream;

/// Typed HTTP client for the advisory API.
///
/// Provides one method per endpoint. Nothing here retries: every call is a
/// single request, and failures are returned as [`ApiError`].
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client with the given base URL.
    ///
    /// `timeout` bounds a whole request including a streamed body, so it is
    /// usually left as `None` for chat use.
    pub fn new(
        base_url: &str,
        timeout: Option<Duration>,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let scheme_ok = base_url.starts_with("http://") || base_url.starts_with("https://");
        if !scheme_ok {
            return Err(ApiError::Other(format!(
                "server url must start with http:// or https://: {base_url}"
            )));
        }
        let mut builder = reqwest::Client::builder().connect_timeout(connect_timeout);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, base_url))
    }

    /// Create from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    // ── Roster / transcript ───────────────────────────────────────────────

    /// `GET /api/history/{client_id}`: every session known for this client.
    pub async fn history(&self, client_id: &ClientId) -> Result<Vec<SessionSummary>> {
        let path = format!("/history/{}", urlencoding::encode(client_id.as_str()));
        let resp = self.client.get(self.url(&path)).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/chat-history/{client_id}/{session_id}`: full session snapshot.
    pub async fn chat_history(
        &self,
        client_id: &ClientId,
        session_id: &SessionId,
    ) -> Result<TranscriptSnapshot> {
        let path = format!(
            "/chat-history/{}/{}",
            urlencoding::encode(client_id.as_str()),
            urlencoding::encode(session_id.as_str())
        );
        let resp = self.client.get(self.url(&path)).send().await?;
        parse_response(resp).await
    }

    // ── Chat ──────────────────────────────────────────────────────────────

    /// `POST /api/chat`. On 200 the body is handed back unread as a
    /// [`ChatStream`]; 403 maps to [`ApiError::QuotaExceeded`] without
    /// touching the body.
    pub async fn open_chat(&self, req: &ChatRequest) -> Result<ChatStream> {
        let resp = self
            .client
            .post(self.url("/chat"))
            .header(ACCEPT, "text/event-stream")
            .json(req)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::FORBIDDEN {
            return Err(ApiError::QuotaExceeded);
        }
        if !status.is_success() {
            return Err(status_error(resp).await);
        }
        debug!("chat stream opened (HTTP {status})");
        Ok(ChatStream::new(resp))
    }

    /// `POST /api/reset`: delete a session server-side.
    pub async fn reset_session(&self, client_id: &ClientId, session_id: &SessionId) -> Result<()> {
        let body = ChatRequest {
            message: String::new(),
            client_id: client_id.clone(),
            session_id: Some(session_id.clone()),
        };
        let resp = self
            .client
            .post(self.url("/reset"))
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        Ok(())
    }
}

async fn status_error(resp: reqwest::Response) -> ApiError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    ApiError::Status { status, body }
}

/// Parse an HTTP response: return the deserialized body on 2xx,
/// or an error containing the status and body text.
async fn parse_response<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    if !resp.status().is_success() {
        return Err(status_error(resp).await);
    }
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
