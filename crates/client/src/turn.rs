//! One chat turn: send the user's message, then consume the decoded event
//! stream and apply it to the session store in arrival order.
//!
//! ```text
//! send_turn ──► user message + pending placeholder
//!     │ 403          ──► quota notice, turn over
//!     │ transport    ──► failure notice, turn over
//!     ▼
//! advance ──► checklist_update │ message │ done │ error ──► ... ──► Completed
//!     └─ session switched meanwhile ──► Abandoned (nothing applied)
//! ```

use std::collections::VecDeque;
use std::mem;

use counsel_api_client::ApiError;
use counsel_core::{ChatRequest, ErrorOrigin, EventStreamDecoder, Message, SessionId, StreamEvent};
use tracing::{debug, info, warn};

use crate::service::{AdvisoryService, ChunkSource};
use crate::session::SessionStore;

/// Why part of a turn failed. Every failure is shown in the chat; none is
/// returned as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnFailure {
    /// HTTP 403: the client is out of sessions. Not retried.
    QuotaExceeded,
    /// Network failure before or during the stream.
    Transport(String),
    /// A stream line could not be decoded.
    DecodeFault(String),
    /// The server sent an explicit `error` event.
    ServerReported(String),
}

/// Notification for one state change applied by a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnUpdate {
    ChecklistApplied,
    MessageAppended { adopted: Option<SessionId> },
    Done { is_terminal: bool },
    /// An `error` event (or decode fault) was shown; the stream goes on.
    ErrorShown(TurnFailure),
    /// The turn ended early: quota exhausted or the transport failed.
    Failed(TurnFailure),
    /// The stream ended normally.
    Completed,
    /// The session was switched away; the rest of the stream was dropped.
    Abandoned,
}

impl TurnUpdate {
    /// No further updates follow this one.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Completed | Self::Abandoned)
    }
}

/// Something read from the wire, not yet applied.
#[derive(Debug)]
pub enum Incoming {
    Event(StreamEvent),
    End,
    TransportError(ApiError),
    /// The turn was refused before any stream existed; the failure notice
    /// has already been applied.
    Rejected(TurnFailure),
}

enum Phase<C> {
    Streaming {
        stream: C,
        decoder: EventStreamDecoder,
        queued: VecDeque<StreamEvent>,
    },
    Rejected(TurnFailure),
    Closed,
}

/// An in-flight turn. Drive it with [`Turn::advance`], or with
/// [`Turn::next_incoming`] + [`Turn::apply`] when other input has to be
/// handled while waiting on the network.
pub struct Turn<C> {
    id: u64,
    generation: u64,
    opened_without_session: bool,
    phase: Phase<C>,
}

#[derive(Debug, Default)]
pub struct ChatTurnController {
    turns_started: u64,
}

impl ChatTurnController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a turn for `text` in the store's active session (or a new one).
    ///
    /// Returns `None` without any request or state change when `text` is
    /// blank. Otherwise the user message and a pending placeholder are shown
    /// immediately and the request is sent. A turn still streaming on the same
    /// store is abandoned.
    pub async fn send_turn<S: AdvisoryService>(
        &mut self,
        store: &mut SessionStore<S>,
        text: &str,
    ) -> Option<Turn<S::Stream>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.turns_started += 1;
        let id = self.turns_started;
        let generation = store.begin_turn();
        let session_id = store.active().cloned();
        let opened_without_session = session_id.is_none();

        let pending = store.notices().pending.clone();
        let state = store.state_mut();
        state.push(Message::user(text));
        state.push(Message::pending(pending));
        store.publish();

        let request = ChatRequest {
            message: text.to_string(),
            client_id: store.client_id().clone(),
            session_id,
        };
        debug!(
            "turn {id}: sending {} chars (session {:?})",
            text.len(),
            request.session_id
        );

        let phase = match store.service().open_chat(&request).await {
            Ok(stream) => Phase::Streaming {
                stream,
                decoder: EventStreamDecoder::new(),
                queued: VecDeque::new(),
            },
            Err(ApiError::QuotaExceeded) => {
                info!("turn {id}: session quota exceeded");
                let notice = store.notices().quota_exceeded.clone();
                store.state_mut().resolve_pending_as_notice(notice);
                store.publish();
                Phase::Rejected(TurnFailure::QuotaExceeded)
            }
            Err(e) => {
                warn!("turn {id}: request failed: {e}");
                let notice = store.notices().transport_failure.clone();
                store.state_mut().resolve_pending_as_notice(notice);
                store.publish();
                Phase::Rejected(TurnFailure::Transport(e.to_string()))
            }
        };

        Some(Turn {
            id,
            generation,
            opened_without_session,
            phase,
        })
    }

    /// Run a whole turn and collect its updates. An empty result means the
    /// input was blank and nothing happened.
    pub async fn run_turn<S: AdvisoryService>(
        &mut self,
        store: &mut SessionStore<S>,
        text: &str,
    ) -> Vec<TurnUpdate> {
        let Some(mut turn) = self.send_turn(store, text).await else {
            return Vec::new();
        };
        let mut updates = Vec::new();
        while let Some(update) = turn.advance(store).await {
            updates.push(update);
        }
        updates
    }
}

impl<C: ChunkSource> Turn<C> {
    pub fn is_closed(&self) -> bool {
        matches!(self.phase, Phase::Closed)
    }

    /// Read and apply the next event. `None` once the turn is over.
    pub async fn advance<S>(&mut self, store: &mut SessionStore<S>) -> Option<TurnUpdate>
    where
        S: AdvisoryService<Stream = C>,
    {
        if self.is_closed() {
            return None;
        }
        if store.generation() != self.generation {
            return Some(self.abandon());
        }
        let incoming = self.next_incoming().await?;
        Some(self.apply(incoming, store).await)
    }

    /// Wait for the next decoded event. Touches no state, so it can be raced
    /// against user input; `None` once the turn is over.
    pub async fn next_incoming(&mut self) -> Option<Incoming> {
        let (stream, decoder, queued) = match &mut self.phase {
            Phase::Closed => return None,
            Phase::Rejected(failure) => return Some(Incoming::Rejected(failure.clone())),
            Phase::Streaming {
                stream,
                decoder,
                queued,
            } => (stream, decoder, queued),
        };

        loop {
            if let Some(event) = queued.pop_front() {
                return Some(Incoming::Event(event));
            }
            match stream.next_chunk().await {
                Ok(Some(chunk)) => queued.extend(decoder.feed(&chunk)),
                Ok(None) => {
                    let dropped = mem::take(decoder).finish();
                    if dropped > 0 {
                        debug!("turn {}: dropped {dropped} bytes of unterminated line", self.id);
                    }
                    return Some(Incoming::End);
                }
                Err(e) => return Some(Incoming::TransportError(e)),
            }
        }
    }

    /// Apply one incoming item to the store, unless the store has moved on
    /// to another session since this turn started.
    pub async fn apply<S>(
        &mut self,
        incoming: Incoming,
        store: &mut SessionStore<S>,
    ) -> TurnUpdate
    where
        S: AdvisoryService<Stream = C>,
    {
        if self.is_closed() {
            return TurnUpdate::Abandoned;
        }
        if store.generation() != self.generation {
            return self.abandon();
        }

        match incoming {
            Incoming::Event(event) => self.apply_event(event, store).await,
            Incoming::End => {
                self.phase = Phase::Closed;
                if store.state().has_pending() {
                    warn!("turn {}: stream ended without a reply", self.id);
                    let notice = store.notices().transport_failure.clone();
                    store.state_mut().resolve_pending_as_notice(notice);
                    store.publish();
                }
                debug!("turn {}: completed", self.id);
                TurnUpdate::Completed
            }
            Incoming::TransportError(e) => {
                self.phase = Phase::Closed;
                warn!("turn {}: stream failed: {e}", self.id);
                let notice = store.notices().transport_failure.clone();
                store.state_mut().resolve_pending_as_notice(notice);
                store.publish();
                TurnUpdate::Failed(TurnFailure::Transport(e.to_string()))
            }
            Incoming::Rejected(failure) => {
                self.phase = Phase::Closed;
                TurnUpdate::Failed(failure)
            }
        }
    }

    async fn apply_event<S>(
        &mut self,
        event: StreamEvent,
        store: &mut SessionStore<S>,
    ) -> TurnUpdate
    where
        S: AdvisoryService<Stream = C>,
    {
        match event {
            StreamEvent::ChecklistUpdate(payload) => {
                store.state_mut().apply_checklist(payload);
                store.publish();
                TurnUpdate::ChecklistApplied
            }
            StreamEvent::Message(payload) => {
                let adopted = match payload.session_id {
                    Some(session_id) if self.opened_without_session && store.active().is_none() => {
                        store.adopt(session_id.clone());
                        Some(session_id)
                    }
                    None if self.opened_without_session && store.active().is_none() => {
                        warn!("turn {}: new session reply carried no session id", self.id);
                        None
                    }
                    _ => None,
                };

                let state = store.state_mut();
                state.remove_pending();
                state.push(Message::ai(payload.text));
                store.publish();

                if adopted.is_some() {
                    store.refresh_roster().await;
                }
                TurnUpdate::MessageAppended { adopted }
            }
            StreamEvent::Done(payload) => {
                if payload.is_terminal && store.state_mut().mark_last_reply_conclusion() {
                    store.publish();
                }
                store.refresh_roster().await;
                TurnUpdate::Done {
                    is_terminal: payload.is_terminal,
                }
            }
            StreamEvent::Error(payload) => {
                let failure = match payload.origin {
                    ErrorOrigin::Decoder => {
                        warn!("turn {}: undecodable stream line: {}", self.id, payload.message);
                        TurnFailure::DecodeFault(payload.message.clone())
                    }
                    ErrorOrigin::Server => {
                        warn!("turn {}: server reported: {}", self.id, payload.message);
                        TurnFailure::ServerReported(payload.message.clone())
                    }
                };
                let notice = store.notices().server_error(&payload.message);
                store.state_mut().resolve_pending_as_notice(notice);
                store.publish();
                TurnUpdate::ErrorShown(failure)
            }
        }
    }

    fn abandon(&mut self) -> TurnUpdate {
        debug!("turn {}: session changed, dropping the rest of the stream", self.id);
        self.phase = Phase::Closed;
        TurnUpdate::Abandoned
    }
}
