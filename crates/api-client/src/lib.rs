pub mod client;
pub mod error;
pub mod stream;

pub use client::ApiClient;
pub use counsel_core;
pub use error::{ApiError, Result};
pub use stream::ChatStream;
