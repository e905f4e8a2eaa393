//! Active-session bookkeeping: which conversation is shown, the roster of
//! known conversations, and the [`ChatState`] of the active one.
//!
//! Every change that replaces the chat state (switching, starting fresh) and
//! every new turn bumps a generation counter. A turn remembers the generation
//! it started under and stops applying events once it no longer matches, so
//! at most one stream feeds the chat state at any time.

use counsel_api_client::ApiError;
use counsel_core::{ChatState, ClientId, SessionId, SessionSummary};
use counsel_runtime_config::NoticeSettings;
use tracing::{debug, info, warn};

use crate::presenter::{Presenter, StoreView};
use crate::service::AdvisoryService;

pub struct SessionStore<S> {
    service: S,
    client_id: ClientId,
    notices: NoticeSettings,
    presenter: Box<dyn Presenter>,
    active: Option<SessionId>,
    roster: Vec<SessionSummary>,
    state: ChatState,
    loading: bool,
    generation: u64,
}

impl<S: AdvisoryService> SessionStore<S> {
    /// A store with no active session and a fresh greeting state. Nothing
    /// is fetched until [`refresh_roster`](Self::refresh_roster) is called.
    pub fn new(
        service: S,
        client_id: ClientId,
        notices: NoticeSettings,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        let state = ChatState::greeting(&notices.greeting);
        Self {
            service,
            client_id,
            notices,
            presenter,
            active: None,
            roster: Vec::new(),
            state,
            loading: false,
            generation: 0,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn notices(&self) -> &NoticeSettings {
        &self.notices
    }

    pub fn active(&self) -> Option<&SessionId> {
        self.active.as_ref()
    }

    pub fn roster(&self) -> &[SessionSummary] {
        &self.roster
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Changes whenever the chat state is replaced wholesale or a new turn
    /// takes over the stream.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Hand the current snapshot to the presenter.
    pub(crate) fn publish(&mut self) {
        let view = StoreView {
            active: self.active.as_ref(),
            roster: &self.roster,
            state: &self.state,
            loading: self.loading,
            notices: &self.notices,
        };
        self.presenter.render(&view);
    }

    /// Claim the chat state for a new turn. Any turn still streaming into it
    /// is abandoned, and its leftover placeholder is dropped.
    pub(crate) fn begin_turn(&mut self) -> u64 {
        self.generation += 1;
        if self.state.remove_pending() {
            debug!("superseded turn left a placeholder; removed");
        }
        self.generation
    }

    pub(crate) fn state_mut(&mut self) -> &mut ChatState {
        &mut self.state
    }

    /// Make a server-assigned id the active session without touching the
    /// chat state: the state already belongs to that conversation.
    pub(crate) fn adopt(&mut self, session_id: SessionId) {
        info!("adopted new session {session_id}");
        self.active = Some(session_id);
    }

    /// Replace the roster from the server. On failure the previous roster is
    /// kept and the error is only logged.
    pub async fn refresh_roster(&mut self) -> &[SessionSummary] {
        match self.service.roster(&self.client_id).await {
            Ok(roster) => {
                debug!("roster refreshed: {} sessions", roster.len());
                self.roster = roster;
                self.publish();
            }
            Err(e) => warn!("roster refresh failed, keeping previous list: {e}"),
        }
        &self.roster
    }

    /// Make `session_id` active and load its transcript and issue state.
    ///
    /// Any in-flight turn is abandoned. The presenter first sees a loading
    /// state, then the complete snapshot; never a mix of old and new.
    pub async fn switch_to(&mut self, session_id: SessionId) -> &ChatState {
        self.generation += 1;
        self.active = Some(session_id.clone());
        self.state = ChatState::loading(&self.notices.loading);
        self.loading = true;
        self.publish();

        self.state = match self.service.transcript(&self.client_id, &session_id).await {
            Ok(snapshot) => ChatState::from_transcript(snapshot),
            Err(e) => {
                warn!("failed to load session {session_id}: {e}");
                let mut failed = ChatState::new();
                failed.resolve_pending_as_notice(self.notices.load_failed.clone());
                failed
            }
        };
        self.loading = false;
        self.publish();

        self.refresh_roster().await;
        &self.state
    }

    /// Drop the active session and start over with a fresh greeting state.
    /// The server assigns a new id on the next turn.
    pub async fn start_new(&mut self) {
        self.generation += 1;
        self.active = None;
        self.state = ChatState::greeting(&self.notices.greeting);
        self.loading = false;
        self.publish();

        self.refresh_roster().await;
    }

    /// Delete a session server-side. Deleting the active session also starts
    /// a new one. Local state is untouched if the request fails.
    pub async fn delete(&mut self, session_id: &SessionId) -> Result<(), ApiError> {
        if let Err(e) = self.service.reset(&self.client_id, session_id).await {
            warn!("failed to delete session {session_id}: {e}");
            return Err(e);
        }
        info!("deleted session {session_id}");

        if self.active.as_ref() == Some(session_id) {
            self.start_new().await;
        } else {
            self.refresh_roster().await;
        }
        Ok(())
    }
}
