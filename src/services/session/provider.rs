//! Session provider interface consumed by the pipeline, one instance per realm.
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::realm::Realm;

/// Identity-provider errors.
///
/// Kept apart from `ClientError`: the authorizer swallows these (best-effort),
/// recovery turns them into a terminal redirect.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("identity provider rejected the refresh: {0}")]
    Rejected(String),

    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid identity provider response: {0}")]
    InvalidResponse(String),
}

/// The currently authenticated identity of one realm.
#[async_trait]
pub trait Principal: Send + Sync {
    fn uid(&self) -> &str;

    // Returns a bearer token.
    //
    // - `force_refresh = false` may serve a cached token
    // - `force_refresh = true` always re-issues against the identity provider
    async fn get_token(&self, force_refresh: bool) -> Result<String, SessionError>;
}

#[async_trait]
pub trait RealmSessionProvider: Send + Sync {
    fn realm(&self) -> Realm;

    /// Resolves once the initial session state is known (restored or absent).
    async fn ready(&self);

    fn current(&self) -> Option<Arc<dyn Principal>>;
}
