//! The seam between the engine and the remote advisory service.
//!
//! Production code uses [`ApiClient`]; tests plug in scripted services.

use std::future::Future;

use counsel_api_client::{ApiClient, ApiError, ChatStream};
use counsel_core::{ChatRequest, ClientId, SessionId, SessionSummary, TranscriptSnapshot};

/// Raw body bytes of an open chat turn.
pub trait ChunkSource {
    /// Next chunk, or `None` when the stream has ended.
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>, ApiError>>;
}

pub trait AdvisoryService {
    type Stream: ChunkSource;

    fn roster(
        &self,
        client_id: &ClientId,
    ) -> impl Future<Output = Result<Vec<SessionSummary>, ApiError>>;

    fn transcript(
        &self,
        client_id: &ClientId,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<TranscriptSnapshot, ApiError>>;

    /// Start a turn. A 403 answer must surface as [`ApiError::QuotaExceeded`].
    fn open_chat(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<Self::Stream, ApiError>>;

    fn reset(
        &self,
        client_id: &ClientId,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<(), ApiError>>;
}

impl ChunkSource for ChatStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ApiError> {
        ChatStream::next_chunk(self).await
    }
}

impl AdvisoryService for ApiClient {
    type Stream = ChatStream;

    async fn roster(&self, client_id: &ClientId) -> Result<Vec<SessionSummary>, ApiError> {
        self.history(client_id).await
    }

    async fn transcript(
        &self,
        client_id: &ClientId,
        session_id: &SessionId,
    ) -> Result<TranscriptSnapshot, ApiError> {
        self.chat_history(client_id, session_id).await
    }

    async fn open_chat(&self, request: &ChatRequest) -> Result<ChatStream, ApiError> {
        ApiClient::open_chat(self, request).await
    }

    async fn reset(&self, client_id: &ClientId, session_id: &SessionId) -> Result<(), ApiError> {
        self.reset_session(client_id, session_id).await
    }
}
