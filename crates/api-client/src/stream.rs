use crate::error::Result;

/// Body of a streaming `POST /api/chat` response, read chunk by chunk.
///
/// Chunks are raw bytes exactly as they came off the wire; framing them into
/// events is the job of [`counsel_core::EventStreamDecoder`].
pub struct ChatStream {
    response: reqwest::Response,
}

impl ChatStream {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self { response }
    }

    /// Next chunk of the body, or `None` once the server closed the stream.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.response.chunk().await?.map(|bytes| bytes.to_vec()))
    }
}
