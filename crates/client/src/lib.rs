//! Client-side synchronization engine for the advisory chat.
//!
//! [`SessionStore`] owns the active session, the roster and the
//! [`ChatState`](counsel_core::ChatState); [`ChatTurnController`] runs one
//! request/response turn against it; a [`Presenter`] is told about every
//! applied change.

pub mod identity;
pub mod presenter;
pub mod service;
pub mod session;
pub mod turn;

pub use identity::{ClientIdentity, IdentityError};
pub use presenter::{NullPresenter, Presenter, StoreView};
pub use service::{AdvisoryService, ChunkSource};
pub use session::SessionStore;
pub use turn::{ChatTurnController, Incoming, Turn, TurnFailure, TurnUpdate};
