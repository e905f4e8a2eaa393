#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// `POST /api/chat` answered 403: the client has used up its sessions.
    #[error("session quota exceeded")]
    QuotaExceeded,

    #[error("{status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The client was misconfigured before any request was made.
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;
