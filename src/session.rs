//! Stored credential: bearer token plus the principal it belongs to.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::AuthResponse;
use crate::config::Config;
use crate::core::User;
use crate::{tlog_debug, tlog_warn, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub saved_at: DateTime<Utc>,
}

impl From<AuthResponse> for Session {
    fn from(auth: AuthResponse) -> Self {
        Self {
            token: auth.token,
            user: auth.user,
            saved_at: Utc::now(),
        }
    }
}

/// Reads and writes the session file.
#[derive(Debug, Clone)]
pub struct SessionManager {
    path: PathBuf,
}

impl SessionManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Manager for `~/.taskman/session.json`.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(Config::session_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored session. A missing file means nobody is logged in; so does
    /// an unreadable one, which is removed.
    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            tlog_debug!("Session file not found: {}", self.path.display());
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Session>(&contents) {
            Ok(session) => {
                tlog_debug!("Session loaded for {}", session.user.email);
                Ok(Some(session))
            }
            Err(e) => {
                tlog_warn!("Discarding corrupt session file {}: {}", self.path.display(), e);
                self.clear()?;
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(session)?;
        fs::write(&temp_path, &contents)?;
        restrict_permissions(&temp_path)?;
        fs::rename(&temp_path, &self.path)?;
        tlog_debug!("Session saved: {}", self.path.display());
        Ok(())
    }

    /// Forget the stored session. Returns whether there was one.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)?;
        Ok(true)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.load(), Ok(Some(_)))
    }
}

// Token file is readable by its owner only.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
