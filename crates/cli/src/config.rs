use anyhow::{Context, Result, bail};
use counsel_runtime_config::{CONFIG_FILE_NAME, ClientConfig, SERVER_URL_ENV, apply_overrides};
use std::path::{Path, PathBuf};

const DEFAULT_CLIENT_ID_FILE: &str = "client_id";

/// Get the config directory path (~/.config/counsel/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("counsel"))
}

/// Canonical config file path.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Read the config file as written, returning defaults if it does not exist.
pub fn load_file_config(path: &Path) -> Result<ClientConfig> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config at {}", path.display()))
}

/// Effective config: the file, then `COUNSEL_SERVER_URL`, then `--server`.
pub fn load_config(server_flag: Option<&str>) -> Result<ClientConfig> {
    let mut config = load_file_config(&config_path()?)?;
    let env_url = std::env::var(SERVER_URL_ENV).ok();
    apply_overrides(&mut config, env_url.as_deref());
    if let Some(url) = server_flag {
        config.server.url = normalize_server_url(url)?;
    }
    Ok(config)
}

pub fn save_config(path: &Path, config: &ClientConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config dir at {}", dir.display()))?;
    }
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config at {}", path.display()))?;
    Ok(())
}

/// Where the client id lives. Relative paths resolve against `config_dir`.
pub fn identity_path(config: &ClientConfig, config_dir: &Path) -> PathBuf {
    match config.identity.client_id_file.as_deref().map(str::trim) {
        Some(file) if !file.is_empty() => {
            let file = Path::new(file);
            if file.is_absolute() {
                file.to_path_buf()
            } else {
                config_dir.join(file)
            }
        }
        _ => config_dir.join(DEFAULT_CLIENT_ID_FILE),
    }
}

fn normalize_server_url(value: &str) -> Result<String> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("server url cannot be empty");
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        bail!("server url must start with http:// or https://");
    }
    Ok(trimmed.to_string())
}

/// Print current config.
pub fn show_config() -> Result<()> {
    let path = config_path()?;
    let config = load_config(None)?;
    let dir = config_dir()?;

    println!("Config file: {}", path.display());
    if !path.exists() {
        println!("  (not created yet, showing defaults)");
    }
    println!();
    println!("[server]");
    println!("  url                  = {}", config.server.url);
    if std::env::var(SERVER_URL_ENV).is_ok_and(|v| !v.trim().is_empty()) {
        println!("                         (from {SERVER_URL_ENV})");
    }
    println!(
        "  timeout_secs         = {}",
        match config.server.timeout_secs {
            0 => "none".to_string(),
            secs => secs.to_string(),
        }
    );
    println!("  connect_timeout_secs = {}", config.server.connect_timeout_secs);
    println!();
    println!("[identity]");
    println!("  client_id_file = {}", identity_path(&config, &dir).display());
    Ok(())
}

/// Persist a new server URL to the config file.
pub fn set_config(server_url: &str) -> Result<()> {
    let path = config_path()?;
    let mut config = load_file_config(&path)?;
    config.server.url = normalize_server_url(server_url)?;
    save_config(&path, &config)?;
    println!("Configuration updated.");
    show_config()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_file_config(&dir.path().join(CONFIG_FILE_NAME)).expect("load");
        assert_eq!(config.server.url, "http://localhost:8000");
    }

    #[test]
    fn saved_config_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut config = ClientConfig::default();
        config.server.url = "https://counsel.example.com".to_string();
        config.notices.pending = "생각 중...".to_string();

        save_config(&path, &config).expect("save");
        let loaded = load_file_config(&path).expect("load");

        assert_eq!(loaded.server.url, "https://counsel.example.com");
        assert_eq!(loaded.notices.pending, "생각 중...");
        assert_eq!(loaded.notices.greeting, config.notices.greeting);
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[server\nurl = 1").expect("write");
        let err = load_file_config(&path).expect_err("parse fails");
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn identity_path_resolution() {
        let dir = Path::new("/home/u/.config/counsel");
        let mut config = ClientConfig::default();
        assert_eq!(identity_path(&config, dir), dir.join("client_id"));

        config.identity.client_id_file = Some("ids/me".to_string());
        assert_eq!(identity_path(&config, dir), dir.join("ids/me"));

        config.identity.client_id_file = Some("/var/lib/counsel/id".to_string());
        assert_eq!(
            identity_path(&config, dir),
            PathBuf::from("/var/lib/counsel/id")
        );
    }

    #[test]
    fn server_url_must_be_http() {
        assert_eq!(
            normalize_server_url(" https://a.example/ ").expect("valid"),
            "https://a.example"
        );
        assert!(normalize_server_url("ftp://a.example").is_err());
        assert!(normalize_server_url("  ").is_err());
    }
}
