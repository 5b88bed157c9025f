//! Shared, explicitly-passed application state. No global singletons: every
//! handler and every middleware receives this struct through axum's
//! `State` extractor rather than reaching for a module-level variable, so
//! a test can construct a fresh one against a throwaway database.

use std::sync::Arc;

use cellar_engine::auth::{LoginRateLimiter, TokenIssuer};
use cellar_engine::{Database, Registry};

use crate::config::Config;

pub struct AppState {
    pub db: Database,
    pub registry: Arc<Registry>,
    pub tokens: TokenIssuer,
    pub login_limiter: LoginRateLimiter,
    pub config: Config,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(db: Database, registry: Arc<Registry>, config: Config) -> Self {
        let tokens = TokenIssuer::new(config.jwt.secret.clone(), config.jwt.expiry_seconds);
        let login_limiter = LoginRateLimiter::new(5, std::time::Duration::from_secs(300));
        Self { db, registry, tokens, login_limiter, config }
    }
}
