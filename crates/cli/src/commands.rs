//! One-shot subcommands: `send`, `history`, `show`.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use counsel_api_client::ApiClient;
use counsel_client::{
    ChatTurnController, ClientIdentity, NullPresenter, Presenter, SessionStore, TurnUpdate,
};
use counsel_core::{ChatState, ClientId, SessionId};
use counsel_runtime_config::ClientConfig;

use crate::config;
use crate::render;

/// Everything a command needs to talk to the server as this client.
pub struct Connection {
    pub config: ClientConfig,
    pub api: ApiClient,
    pub client_id: ClientId,
}

impl Connection {
    pub fn open(server_flag: Option<&str>) -> Result<Self> {
        let config = config::load_config(server_flag)?;
        let identity = ClientIdentity::new(config::identity_path(&config, &config::config_dir()?));
        let client_id = identity.resolve()?;

        let timeout = match config.server.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let api = ApiClient::new(
            &config.server.url,
            timeout,
            Duration::from_secs(config.server.connect_timeout_secs),
        )
        .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            api,
            client_id,
        })
    }

    pub fn into_store(self, presenter: Box<dyn Presenter>) -> SessionStore<ApiClient> {
        SessionStore::new(
            self.api,
            self.client_id,
            self.config.notices,
            presenter,
        )
    }
}

pub async fn run_send(conn: Connection, text: &str, session: Option<String>) -> Result<()> {
    let mut store = conn.into_store(Box::new(NullPresenter));
    if let Some(session) = session {
        store.switch_to(SessionId::new(session)).await;
    }

    let updates = ChatTurnController::new().run_turn(&mut store, text).await;
    if updates.is_empty() {
        bail!("nothing to send");
    }

    print!("{}", render::format_state(store.state(), store.notices()));
    if let Some(id) = store.active() {
        println!("\nsession: {id}");
    }
    if let Some(TurnUpdate::Failed(failure)) = updates.last() {
        bail!("turn failed: {failure:?}");
    }
    Ok(())
}

pub async fn run_history(conn: Connection) -> Result<()> {
    let roster = conn
        .api
        .history(&conn.client_id)
        .await
        .context("Failed to fetch session history")?;
    print!(
        "{}",
        render::format_roster(&roster, None, &conn.config.notices)
    );
    Ok(())
}

pub async fn run_show(conn: Connection, session: &str) -> Result<()> {
    let session_id = SessionId::new(session);
    let snapshot = conn
        .api
        .chat_history(&conn.client_id, &session_id)
        .await
        .with_context(|| format!("Failed to load session {session_id}"))?;
    let state = ChatState::from_transcript(snapshot);
    print!("{}", render::format_state(&state, &conn.config.notices));
    Ok(())
}
