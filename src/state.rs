//! Shared application state handed to every route group.

use crate::config::Config;
use crate::identity::{ChainIdentity, DevHeaderIdentity, IdentityProvider, TokenIdentity, TokenKeys};
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityProvider>,
    pub tokens: Arc<TokenKeys>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Bearer tokens are always accepted; the `x-user-email` header only outside production.
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let tokens = Arc::new(TokenKeys::new(&config.jwt_secret, config.token_ttl));
        let mut chain = ChainIdentity::new().with(Arc::new(TokenIdentity::new(tokens.clone(), store.clone())));
        if config.dev_identity_enabled() {
            tracing::warn!("x-user-email identity header is enabled");
            chain = chain.with(Arc::new(DevHeaderIdentity::new(store.clone())));
        }
        AppState {
            store,
            identity: Arc::new(chain),
            tokens,
            config: Arc::new(config),
        }
    }
}
