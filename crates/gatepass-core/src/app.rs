//! Wiring of the long-lived pieces a front end needs.

use anyhow::{Context, Result};

use crate::api::ApiClient;
use crate::auth::AuthService;
use crate::config::{Config, paths};
use crate::query::QueryClient;
use crate::screens::Navigator;
use crate::session::SessionStore;

/// One instance per process; clones share state.
#[derive(Clone)]
pub struct App {
    pub config: Config,
    pub session: SessionStore,
    pub api: ApiClient,
    pub queries: QueryClient,
    pub auth: AuthService,
    pub navigator: Navigator,
}

impl App {
    /// Restores the persisted session and builds the client stack on top of it.
    pub fn bootstrap(config: Config) -> Result<Self> {
        let session = SessionStore::open(paths::session_path())?;
        Self::with_session(config, session)
    }

    pub fn with_session(config: Config, session: SessionStore) -> Result<Self> {
        let api = ApiClient::new(&config.api, &session).context("Failed to build API client")?;
        tracing::debug!(base_url = api.base_url(), "api client ready");

        Ok(Self {
            queries: QueryClient::new(api.clone()),
            auth: AuthService::new(api.clone(), session.clone()),
            navigator: Navigator::new(session.clone()),
            config,
            session,
            api,
        })
    }
}
