use counsel_core::{ChatState, SessionId, SessionSummary};
use counsel_runtime_config::NoticeSettings;

/// Read-only snapshot handed to a [`Presenter`] after every applied change.
#[derive(Debug, Clone, Copy)]
pub struct StoreView<'a> {
    pub active: Option<&'a SessionId>,
    pub roster: &'a [SessionSummary],
    pub state: &'a ChatState,
    /// A transcript fetch is in flight; `state` holds the loading placeholder.
    pub loading: bool,
    pub notices: &'a NoticeSettings,
}

/// Renders snapshots. Never mutates engine state.
pub trait Presenter {
    fn render(&mut self, view: &StoreView<'_>);
}

/// Presenter that ignores every snapshot.
#[derive(Debug, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn render(&mut self, _view: &StoreView<'_>) {}
}
