//! Realm session backed by a refresh token and the identity provider's
//! secure-token endpoint (`grant_type=refresh_token`).
//!
//! - `ready()` restores the persisted session once
//! - the id token is cached until it is within `REFRESH_MARGIN_SECONDS` of expiry
//! - refreshes rotate the stored refresh token
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};
use url::Url;

use crate::realm::Realm;
use crate::services::session::provider::{Principal, RealmSessionProvider, SessionError};

const REFRESH_MARGIN_SECONDS: i64 = 300;

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    // the endpoint sends seconds as a string, e.g. "3600"
    expires_in: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
struct IssuedToken {
    id_token: String,
    refresh_token: String,
    user_id: String,
    expires_at: DateTime<Utc>,
}

impl IssuedToken {
    fn expires_within(&self, margin: ChronoDuration, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= margin
    }
}

#[derive(Clone, Debug)]
struct SecureTokenClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl SecureTokenClient {
    async fn exchange(&self, refresh_token: &str) -> Result<IssuedToken, SessionError> {
        let res = self
            .http
            .post(self.endpoint.clone())
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(SessionError::Rejected(reason));
        }

        let body: RefreshResponse = res
            .json()
            .await
            .map_err(|e| SessionError::InvalidResponse(e.to_string()))?;

        let expires_in: i64 = body.expires_in.parse().map_err(|_| {
            SessionError::InvalidResponse(format!("expires_in {:?}", body.expires_in))
        })?;

        Ok(IssuedToken {
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            user_id: body.user_id,
            expires_at: Utc::now() + ChronoDuration::seconds(expires_in),
        })
    }
}

pub struct SecureTokenPrincipal {
    uid: String,
    client: SecureTokenClient,
    // Serialises refreshes for this principal.
    token: Mutex<IssuedToken>,
}

impl std::fmt::Debug for SecureTokenPrincipal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print tokens
        f.debug_struct("SecureTokenPrincipal")
            .field("uid", &self.uid)
            .finish()
    }
}

#[async_trait]
impl Principal for SecureTokenPrincipal {
    fn uid(&self) -> &str {
        &self.uid
    }

    async fn get_token(&self, force_refresh: bool) -> Result<String, SessionError> {
        let mut current = self.token.lock().await;

        let margin = ChronoDuration::seconds(REFRESH_MARGIN_SECONDS);
        if !force_refresh && !current.expires_within(margin, Utc::now()) {
            return Ok(current.id_token.clone());
        }

        debug!(uid = %self.uid, force_refresh, "refreshing id token");
        let issued = self.client.exchange(&current.refresh_token).await?;
        let id_token = issued.id_token.clone();
        *current = issued;

        Ok(id_token)
    }
}

pub struct SecureTokenSession {
    realm: Realm,
    client: SecureTokenClient,
    persisted_refresh_token: Option<String>,
    restored: OnceCell<()>,
    principal: RwLock<Option<Arc<SecureTokenPrincipal>>>,
}

impl std::fmt::Debug for SecureTokenSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureTokenSession")
            .field("realm", &self.realm)
            .field("endpoint", &self.client.endpoint.as_str())
            .field("restored", &self.restored.initialized())
            .finish()
    }
}

impl SecureTokenSession {
    pub fn new(
        realm: Realm,
        http: reqwest::Client,
        endpoint: Url,
        api_key: impl Into<String>,
        persisted_refresh_token: Option<String>,
    ) -> Self {
        Self {
            realm,
            client: SecureTokenClient {
                http,
                endpoint,
                api_key: api_key.into(),
            },
            persisted_refresh_token,
            restored: OnceCell::new(),
            principal: RwLock::new(None),
        }
    }

    /// Replace the session with the one identified by `refresh_token`.
    ///
    /// Waits for a pending restore first so it cannot overwrite the new principal.
    pub async fn sign_in_with(&self, refresh_token: &str) -> Result<(), SessionError> {
        self.ready().await;
        let issued = self.client.exchange(refresh_token).await?;
        info!(realm = %self.realm, uid = %issued.user_id, "signed in");
        self.set_principal(Some(self.principal_from(issued)));
        Ok(())
    }

    pub async fn sign_out(&self) {
        self.ready().await;
        info!(realm = %self.realm, "signed out");
        self.set_principal(None);
    }

    async fn restore(&self) {
        let Some(refresh_token) = self.persisted_refresh_token.as_deref() else {
            debug!(realm = %self.realm, "no persisted session");
            return;
        };

        match self.client.exchange(refresh_token).await {
            Ok(issued) => {
                info!(realm = %self.realm, uid = %issued.user_id, "session restored");
                self.set_principal(Some(self.principal_from(issued)));
            }
            Err(err) => {
                warn!(realm = %self.realm, error = ?err, "failed to restore session");
            }
        }
    }

    fn principal_from(&self, issued: IssuedToken) -> Arc<SecureTokenPrincipal> {
        Arc::new(SecureTokenPrincipal {
            uid: issued.user_id.clone(),
            client: self.client.clone(),
            token: Mutex::new(issued),
        })
    }

    fn set_principal(&self, principal: Option<Arc<SecureTokenPrincipal>>) {
        *self
            .principal
            .write()
            .unwrap_or_else(PoisonError::into_inner) = principal;
    }
}

#[async_trait]
impl RealmSessionProvider for SecureTokenSession {
    fn realm(&self) -> Realm {
        self.realm
    }

    async fn ready(&self) {
        self.restored.get_or_init(|| self.restore()).await;
    }

    fn current(&self) -> Option<Arc<dyn Principal>> {
        self.principal
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .map(|p| p as Arc<dyn Principal>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issued(expires_in_seconds: i64, now: DateTime<Utc>) -> IssuedToken {
        IssuedToken {
            id_token: "id".into(),
            refresh_token: "rt".into(),
            user_id: "u".into(),
            expires_at: now + ChronoDuration::seconds(expires_in_seconds),
        }
    }

    #[test]
    fn tokens_near_expiry_need_refresh() {
        let now = Utc::now();
        let margin = ChronoDuration::seconds(REFRESH_MARGIN_SECONDS);
        assert!(issued(60, now).expires_within(margin, now));
        assert!(issued(-10, now).expires_within(margin, now));
        assert!(!issued(3600, now).expires_within(margin, now));
    }

    #[tokio::test]
    async fn session_without_persisted_token_resolves_signed_out() {
        let endpoint = Url::parse("http://127.0.0.1:9/v1/token").unwrap();
        let session =
            SecureTokenSession::new(Realm::EndUser, reqwest::Client::new(), endpoint, "key", None);
        session.ready().await;
        assert!(session.current().is_none());
        assert_eq!(session.realm(), Realm::EndUser);
    }
}
