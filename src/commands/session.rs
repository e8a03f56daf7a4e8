//! Shared bootstrap for commands that talk to the server.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::ApiClient;
use crate::auth::AuthSession;
use crate::config::Config;
use crate::events::AuthListener;

/// Loaded configuration, credentials and API client.
#[derive(Debug)]
pub struct Session {
    /// Effective configuration (file plus environment overrides).
    pub config: Config,
    /// Credentials shared with the API client and the transport.
    pub auth: Arc<AuthSession>,
    /// HTTP gateway.
    pub api: Arc<ApiClient>,
}

impl Session {
    /// Load config and credentials from the config directory.
    ///
    /// `ROOMCHAT_TOKEN` replaces the stored token for this process only.
    pub fn open(listener: Arc<dyn AuthListener>) -> Result<Self> {
        let dir = Config::config_dir()?;
        let config = Config::load_from(&dir)?;
        let auth = Arc::new(AuthSession::load_from(&dir)?);
        if let Some(token) = &config.token_override {
            log::debug!("Using token from ROOMCHAT_TOKEN");
            auth.override_token(token.clone());
        }

        let api = ApiClient::new(config.base_url(), Arc::clone(&auth), listener)
            .context("failed to create HTTP client")?;

        Ok(Self {
            config,
            auth,
            api: Arc::new(api),
        })
    }

    /// Fail early when no token is available.
    pub fn require_login(&self) -> Result<()> {
        if !self.auth.is_authenticated() {
            anyhow::bail!("Not logged in. Run `roomchat login <username>` first.");
        }
        Ok(())
    }
}
