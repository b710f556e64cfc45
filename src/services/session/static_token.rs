use std::sync::Arc;

use async_trait::async_trait;

use crate::realm::Realm;
use crate::services::session::provider::{Principal, RealmSessionProvider, SessionError};

/// Fixed-token principal. A forced refresh returns the same token.
#[derive(Clone)]
pub struct StaticPrincipal {
    uid: String,
    token: String,
}

impl std::fmt::Debug for StaticPrincipal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticPrincipal")
            .field("uid", &self.uid)
            .finish()
    }
}

#[async_trait]
impl Principal for StaticPrincipal {
    fn uid(&self) -> &str {
        &self.uid
    }

    async fn get_token(&self, _force_refresh: bool) -> Result<String, SessionError> {
        Ok(self.token.clone())
    }
}

/// Session that is resolved from the start: either a fixed principal or none.
///
/// Used for realms configured with a static token and for realms with no
/// identity provider at all.
#[derive(Clone, Debug)]
pub struct StaticSession {
    realm: Realm,
    principal: Option<Arc<StaticPrincipal>>,
}

impl StaticSession {
    pub fn signed_in(realm: Realm, uid: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            realm,
            principal: Some(Arc::new(StaticPrincipal {
                uid: uid.into(),
                token: token.into(),
            })),
        }
    }

    pub fn signed_out(realm: Realm) -> Self {
        Self {
            realm,
            principal: None,
        }
    }
}

#[async_trait]
impl RealmSessionProvider for StaticSession {
    fn realm(&self) -> Realm {
        self.realm
    }

    async fn ready(&self) {}

    fn current(&self) -> Option<Arc<dyn Principal>> {
        self.principal
            .clone()
            .map(|p| p as Arc<dyn Principal>)
    }
}
