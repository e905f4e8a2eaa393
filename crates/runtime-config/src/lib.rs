//! Shared client configuration types.
//!
//! The CLI reads and writes `counsel.toml` using these types; the client
//! library only consumes the already-loaded values.

use serde::{Deserialize, Serialize};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "counsel.toml";

/// Environment variable that overrides `server.url`.
pub const SERVER_URL_ENV: &str = "COUNSEL_SERVER_URL";

/// Top-level configuration (persisted as `counsel.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub identity: IdentitySettings,
    #[serde(default)]
    pub notices: NoticeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_url")]
    pub url: String,
    /// Overall request timeout. 0 disables it: a chat stream may legitimately
    /// stay open for as long as the server needs.
    #[serde(default)]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            timeout_secs: 0,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentitySettings {
    /// Where the client id is persisted. Relative paths resolve against the
    /// config directory; unset means `client_id` in the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id_file: Option<String>,
}

/// Fixed user-visible texts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoticeSettings {
    #[serde(default = "default_pending")]
    pub pending: String,
    #[serde(default = "default_loading")]
    pub loading: String,
    #[serde(default = "default_load_failed")]
    pub load_failed: String,
    #[serde(default = "default_quota_exceeded")]
    pub quota_exceeded: String,
    #[serde(default = "default_transport_failure")]
    pub transport_failure: String,
    #[serde(default = "default_server_error_prefix")]
    pub server_error_prefix: String,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_untitled")]
    pub untitled: String,
    #[serde(default = "default_no_issues")]
    pub no_issues: String,
}

impl Default for NoticeSettings {
    fn default() -> Self {
        Self {
            pending: default_pending(),
            loading: default_loading(),
            load_failed: default_load_failed(),
            quota_exceeded: default_quota_exceeded(),
            transport_failure: default_transport_failure(),
            server_error_prefix: default_server_error_prefix(),
            greeting: default_greeting(),
            untitled: default_untitled(),
            no_issues: default_no_issues(),
        }
    }
}

impl NoticeSettings {
    /// Notice shown for a server-reported `error` event.
    pub fn server_error(&self, message: &str) -> String {
        format!("{}{}", self.server_error_prefix, message)
    }
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_server_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_pending() -> String {
    "분석 중...".to_string()
}
fn default_loading() -> String {
    "기록을 불러오는 중...".to_string()
}
fn default_load_failed() -> String {
    "기록을 불러오지 못했습니다.".to_string()
}
fn default_quota_exceeded() -> String {
    "상담은 최대 3개까지만 가능합니다. 기존 상담을 완료하거나 삭제해 주세요.".to_string()
}
fn default_transport_failure() -> String {
    "오류가 발생했습니다. 다시 시도해 주세요.".to_string()
}
fn default_server_error_prefix() -> String {
    "오류: ".to_string()
}
fn default_greeting() -> String {
    "새로운 법률 상담을 시작합니다. 어떤 고민이 있으신가요?".to_string()
}
fn default_untitled() -> String {
    "새 상담".to_string()
}
fn default_no_issues() -> String {
    "이슈 감지 중...".to_string()
}

/// Apply environment overrides and normalize values after loading raw TOML.
/// Returns true when any field was updated.
pub fn apply_overrides(config: &mut ClientConfig, server_url_env: Option<&str>) -> bool {
    let mut changed = false;

    if let Some(url) = server_url_env.map(str::trim).filter(|url| !url.is_empty()) {
        if config.server.url != url {
            config.server.url = url.to_string();
            changed = true;
        }
    }

    let trimmed = config.server.url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        config.server.url = default_server_url();
        changed = true;
    } else if trimmed != config.server.url {
        config.server.url = trimmed.to_string();
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: ClientConfig = toml::from_str("").expect("parse empty config");
        assert_eq!(cfg.server.url, "http://localhost:8000");
        assert_eq!(cfg.server.timeout_secs, 0);
        assert_eq!(cfg.server.connect_timeout_secs, 10);
        assert!(cfg.identity.client_id_file.is_none());
        assert_eq!(cfg.notices, NoticeSettings::default());
    }

    #[test]
    fn partial_notices_keep_remaining_defaults() {
        let cfg: ClientConfig = toml::from_str(
            r#"
[notices]
pending = "Thinking..."
"#,
        )
        .expect("parse notices");

        assert_eq!(cfg.notices.pending, "Thinking...");
        assert_eq!(cfg.notices.greeting, default_greeting());
        assert_eq!(cfg.notices.server_error("boom"), "오류: boom");
    }

    #[test]
    fn env_override_replaces_server_url() {
        let mut cfg = ClientConfig::default();
        let changed = apply_overrides(&mut cfg, Some("https://counsel.example.com/"));
        assert!(changed);
        assert_eq!(cfg.server.url, "https://counsel.example.com");
    }

    #[test]
    fn overrides_are_noop_for_clean_values() {
        let mut cfg = ClientConfig::default();
        assert!(!apply_overrides(&mut cfg, None));
        assert!(!apply_overrides(&mut cfg, Some("   ")));
        assert_eq!(cfg.server.url, "http://localhost:8000");
    }

    #[test]
    fn blank_url_falls_back_to_default() {
        let mut cfg: ClientConfig = toml::from_str(
            r#"
[server]
url = ""
"#,
        )
        .expect("parse server config");
        assert!(apply_overrides(&mut cfg, None));
        assert_eq!(cfg.server.url, "http://localhost:8000");
    }

    #[test]
    fn config_serializes_every_section() {
        let encoded = toml::to_string(&ClientConfig::default()).expect("serialize config");
        assert!(encoded.contains("[server]"));
        assert!(encoded.contains("[notices]"));
        assert!(!encoded.contains("client_id_file"));
    }
}
