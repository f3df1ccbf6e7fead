//! Token Storage
//! Mission: Persist the single client-held token between runs

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// One token, one well-known slot. Losing or clearing the file is
/// equivalent to logging out on the next start.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted token, if any. An unreadable or empty file
    /// counts as absent.
    pub fn load(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let token = raw.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    /// Overwrite the slot with a new token.
    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, token)
            .with_context(|| format!("Failed to write token to {}", self.path.display()))
    }

    /// Remove the persisted token. Already-absent is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(anyhow::Error::new(e)
                    .context(format!("Failed to remove token at {}", self.path.display())))
            }
        }
    }
}
