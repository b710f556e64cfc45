/*
 * Responsibility
 * - Shared context handed to both pipeline stages: the two realm session providers
 * - Clone is cheap (Arc inside); the two sessions are independent, never merged
 */
use std::sync::Arc;

use crate::realm::Realm;
use crate::services::session::RealmSessionProvider;

#[derive(Clone)]
pub struct RealmSessions {
    enduser: Arc<dyn RealmSessionProvider>,
    backoffice: Arc<dyn RealmSessionProvider>,
}

impl std::fmt::Debug for RealmSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealmSessions")
            .field("enduser", &self.enduser.realm())
            .field("backoffice", &self.backoffice.realm())
            .finish()
    }
}

impl RealmSessions {
    pub fn new(
        enduser: Arc<dyn RealmSessionProvider>,
        backoffice: Arc<dyn RealmSessionProvider>,
    ) -> Self {
        if enduser.realm() != Realm::EndUser || backoffice.realm() != Realm::Backoffice {
            tracing::warn!(
                enduser = %enduser.realm(),
                backoffice = %backoffice.realm(),
                "session providers registered under a different realm than they report"
            );
        }
        Self {
            enduser,
            backoffice,
        }
    }

    pub fn provider(&self, realm: Realm) -> &Arc<dyn RealmSessionProvider> {
        match realm {
            Realm::EndUser => &self.enduser,
            Realm::Backoffice => &self.backoffice,
        }
    }
}
