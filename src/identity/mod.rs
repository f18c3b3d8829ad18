//! Identity resolution: turns request headers into the `User` making the request.
//!
//! Providers are tried in order by [`ChainIdentity`]. The bearer token provider is always
//! installed; [`DevHeaderIdentity`] trusts a plaintext `x-user-email` header and is only
//! installed outside production (see [`crate::state::AppState::new`]).

mod token;

pub use token::{Claims, TokenKeys};

use crate::error::AppError;
use crate::model::User;
use crate::service::validation::normalize_email;
use crate::store::Store;
use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::sync::Arc;

pub const DEV_EMAIL_HEADER: &str = "x-user-email";

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` means "no identity claimed by this provider"; the next one is tried.
    async fn identify(&self, headers: &HeaderMap) -> Result<Option<User>, AppError>;
}

/// Resolves `Authorization: Bearer <jwt>`. The user row is re-read so role changes and
/// deletions take effect before the token expires.
pub struct TokenIdentity {
    keys: Arc<TokenKeys>,
    store: Arc<dyn Store>,
}

impl TokenIdentity {
    pub fn new(keys: Arc<TokenKeys>, store: Arc<dyn Store>) -> Self {
        TokenIdentity { keys, store }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

#[async_trait]
impl IdentityProvider for TokenIdentity {
    async fn identify(&self, headers: &HeaderMap) -> Result<Option<User>, AppError> {
        let Some(token) = bearer_token(headers) else {
            return Ok(None);
        };
        let claims = match self.keys.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "rejected bearer token");
                return Ok(None);
            }
        };
        let user = self.store.user_by_id(claims.sub).await?;
        Ok(user.filter(|u| u.email == claims.email))
    }
}

/// Development shortcut: whoever names an existing email in `x-user-email` is that user.
pub struct DevHeaderIdentity {
    store: Arc<dyn Store>,
}

impl DevHeaderIdentity {
    pub fn new(store: Arc<dyn Store>) -> Self {
        DevHeaderIdentity { store }
    }
}

#[async_trait]
impl IdentityProvider for DevHeaderIdentity {
    async fn identify(&self, headers: &HeaderMap) -> Result<Option<User>, AppError> {
        let claimed = headers
            .get(DEV_EMAIL_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| normalize_email(Some(v)));
        match claimed {
            Some(email) => self.store.user_by_email(&email).await,
            None => Ok(None),
        }
    }
}

#[derive(Default)]
pub struct ChainIdentity {
    providers: Vec<Arc<dyn IdentityProvider>>,
}

impl ChainIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.push(provider);
        self
    }
}

#[async_trait]
impl IdentityProvider for ChainIdentity {
    async fn identify(&self, headers: &HeaderMap) -> Result<Option<User>, AppError> {
        for provider in &self.providers {
            if let Some(user) = provider.identify(headers).await? {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NameMerge};
    use axum::http::HeaderValue;

    async fn store_with_rider() -> (Arc<dyn Store>, User) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let user = store
            .upsert_user("rider@example.com", "rider", NameMerge::PreferIncoming)
            .await
            .unwrap();
        (store, user)
    }

    #[test]
    fn extracts_bearer_token_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer   abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn token_resolves_to_stored_user() {
        let (store, user) = store_with_rider().await;
        let keys = Arc::new(TokenKeys::new("secret", chrono::Duration::hours(1)));
        let token = keys.issue(&user).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());

        let provider = TokenIdentity::new(keys, store);
        assert_eq!(provider.identify(&headers).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn chain_falls_through_to_dev_header() {
        let (store, user) = store_with_rider().await;
        let keys = Arc::new(TokenKeys::new("secret", chrono::Duration::hours(1)));
        let chain = ChainIdentity::new()
            .with(Arc::new(TokenIdentity::new(keys, store.clone())))
            .with(Arc::new(DevHeaderIdentity::new(store)));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer not-a-jwt"));
        headers.insert(DEV_EMAIL_HEADER, HeaderValue::from_static(" Rider@Example.com "));
        assert_eq!(chain.identify(&headers).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn unknown_dev_email_is_anonymous() {
        let (store, _) = store_with_rider().await;
        let mut headers = HeaderMap::new();
        headers.insert(DEV_EMAIL_HEADER, HeaderValue::from_static("ghost@example.com"));
        assert_eq!(DevHeaderIdentity::new(store).identify(&headers).await.unwrap(), None);
    }
}
