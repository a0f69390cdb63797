//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::auth::TokenService;
use crate::config::Config;
use crate::forum::Forum;
use forum_core::ports::ForumStore;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub forum: Forum,
    pub tokens: TokenService,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the repositories and the token service around an injected store.
    pub fn new(store: Arc<dyn ForumStore>, config: Arc<Config>) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_hours);
        Self {
            forum: Forum::new(store, tokens.clone()),
            tokens,
            config,
        }
    }
}
