//! Stable per-installation client identifier.

use std::io;
use std::path::{Path, PathBuf};

use counsel_core::ClientId;
use tracing::info;

const ID_PREFIX: &str = "client_";
const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("failed to read client id from {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to persist client id to {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Resolves the client id from its file, creating and persisting a new one
/// on first use. Once written the id never changes.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    path: PathBuf,
}

impl ClientIdentity {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resolve(&self) -> Result<ClientId, IdentityError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                if let Some(existing) = content.lines().map(str::trim).find(|l| !l.is_empty()) {
                    return Ok(ClientId::new(existing));
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(IdentityError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        }

        let id = generate();
        self.persist(&id).map_err(|source| IdentityError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!("created client id {id}");
        Ok(id)
    }

    fn persist(&self, id: &ClientId) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, format!("{id}\n"))?;
        match std::fs::rename(&tmp_path, &self.path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if self.path.exists() {
                    std::fs::remove_file(&self.path)?;
                    std::fs::rename(&tmp_path, &self.path)
                } else {
                    Err(rename_err)
                }
            }
        }
    }
}

/// `client_` followed by 9 random base-36 characters.
pub fn generate() -> ClientId {
    let mut bits = uuid::Uuid::new_v4().as_u128();
    let mut suffix = String::with_capacity(ID_SUFFIX_LEN);
    for _ in 0..ID_SUFFIX_LEN {
        suffix.push(BASE36[(bits % 36) as usize] as char);
        bits /= 36;
    }
    ClientId::new(format!("{ID_PREFIX}{suffix}"))
}
