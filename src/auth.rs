//! Session credentials: bearer token and user profile.
//!
//! The token is attached to every HTTP request and to the WebSocket URL.
//! Credentials are created at login, cleared at logout, and cleared when the
//! server reports an authorization failure.
//!
//! # Storage
//!
//! File-backed sessions persist to `{config_dir}/credentials.json` with
//! owner-only permissions. In-memory sessions are used by tests and by
//! `ROOMCHAT_TOKEN` overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File name of the credentials inside the config directory.
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Profile of the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Server-side user id.
    pub id: u64,
    /// Login name.
    pub username: String,
    /// Display name.
    pub nickname: String,
    /// Avatar URL (may be empty).
    #[serde(default)]
    pub avatar: String,
}

/// Persisted credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Bearer token issued at login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Profile of the user the token belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

/// Process-wide credential holder.
///
/// Shared (behind an `Arc`) by the API gateway, which attaches and clears the
/// token, and the transport session, which puts the token in the socket URL.
#[derive(Debug)]
pub struct AuthSession {
    path: Option<PathBuf>,
    current: Mutex<Credentials>,
}

impl AuthSession {
    /// Session that never touches disk.
    pub fn in_memory(credentials: Credentials) -> Self {
        Self {
            path: None,
            current: Mutex::new(credentials),
        }
    }

    /// Session backed by the credentials file in `dir`.
    ///
    /// A missing file yields empty credentials.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let path = dir.join(CREDENTIALS_FILE);
        let credentials = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let creds: Credentials = serde_json::from_str(&content)
                .with_context(|| format!("corrupted credentials file {}", path.display()))?;
            log::debug!("Loaded credentials from {}", path.display());
            creds
        } else {
            log::debug!("No credentials file found, returning empty");
            Credentials::default()
        };

        Ok(Self {
            path: Some(path),
            current: Mutex::new(credentials),
        })
    }

    /// Current bearer token, if logged in.
    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    /// Current user profile, if logged in.
    pub fn profile(&self) -> Option<UserProfile> {
        self.lock().user.clone()
    }

    /// Whether a token is present.
    pub fn is_authenticated(&self) -> bool {
        self.lock().token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Replace the token without touching the profile or disk.
    ///
    /// Used for `ROOMCHAT_TOKEN` overrides.
    pub fn override_token(&self, token: String) {
        self.lock().token = Some(token);
    }

    /// Record a successful login and persist it.
    pub fn store(&self, token: String, user: UserProfile) -> Result<()> {
        let snapshot = {
            let mut current = self.lock();
            current.token = Some(token);
            current.user = Some(user);
            current.clone()
        };
        self.persist(&snapshot)
    }

    /// Forget token and profile, removing the credentials file.
    pub fn clear(&self) -> Result<()> {
        *self.lock() = Credentials::default();

        if let Some(path) = &self.path {
            if path.exists() {
                fs::remove_file(path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
            }
        }
        log::info!("Cleared session credentials");
        Ok(())
    }

    fn persist(&self, credentials: &Credentials) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        fs::write(path, serde_json::to_string_pretty(credentials)?)
            .with_context(|| format!("failed to write {}", path.display()))?;

        #[cfg(unix)]
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

        log::debug!("Saved credentials to {}", path.display());
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Credentials> {
        self.current.lock().expect("credentials lock poisoned")
    }
}
