//! Post-flight stage: the 401 recovery state machine.
//!
//! - success: clear the fingerprint's ledger entry
//! - 401 under the retry cap: force-refresh the realm implied by the url and
//!   hand the request back for one replay
//! - anything else terminal: clear, redirect to the realm's login page, and
//!   surface the error exactly as received
//!
//! Recovery asks a single realm. Unlike pre-flight there is no fallback chain:
//! a 401 means that realm's session is stale or wrong, and refreshing the other
//! one would hide which.

use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::realm::Realm;
use crate::request::{ApiResponse, RequestDescriptor};
use crate::services::navigation::LoginRedirector;
use crate::services::retry_ledger::{Fingerprint, RetryLedger};
use crate::services::route_classifier::RouteClassifier;
use crate::services::session::{Principal, RealmSessionProvider};
use crate::state::RealmSessions;

/// Outcome of handling a failed request.
#[derive(Debug)]
pub enum Recovery {
    /// Send this request again; it carries a force-refreshed token.
    Replay(RequestDescriptor),
    /// Terminal. Holds the error that was passed in.
    Fail(ClientError),
}

#[derive(Clone, Debug)]
pub struct ResponseRecovery {
    classifier: RouteClassifier,
    sessions: RealmSessions,
    ledger: RetryLedger,
    redirector: LoginRedirector,
}

impl ResponseRecovery {
    pub fn new(
        classifier: RouteClassifier,
        sessions: RealmSessions,
        ledger: RetryLedger,
        redirector: LoginRedirector,
    ) -> Self {
        Self {
            classifier,
            sessions,
            ledger,
            redirector,
        }
    }

    pub fn ledger(&self) -> &RetryLedger {
        &self.ledger
    }

    pub fn on_success(&self, response: &ApiResponse) {
        let key = self
            .classifier
            .fingerprint(&response.request.method, &response.request.url);
        if self.ledger.clear(&key) {
            debug!(fingerprint = %key, "recovered, retry entry cleared");
        }
    }

    pub async fn on_error(&self, error: ClientError) -> Recovery {
        if error.status() != Some(StatusCode::UNAUTHORIZED) {
            return Recovery::Fail(error);
        }
        let Some(request) = error.request().cloned() else {
            return Recovery::Fail(error);
        };

        let key = self.classifier.fingerprint(&request.method, &request.url);
        let realm = self.classifier.classify(&request.url).recovery_realm();

        if self.ledger.is_exhausted(&key) {
            warn!(fingerprint = %key, %realm, "still unauthorized after refresh, giving up");
            return self.give_up(&key, realm, error);
        }
        self.ledger.record_attempt(&key);

        let provider = self.sessions.provider(realm);
        provider.ready().await;

        let Some(principal) = provider.current() else {
            info!(fingerprint = %key, %realm, "unauthorized with no session to refresh");
            return self.give_up(&key, realm, error);
        };

        let token = match principal.get_token(true).await {
            Ok(token) => token,
            Err(err) => {
                warn!(
                    fingerprint = %key,
                    %realm,
                    uid = %principal.uid(),
                    error = ?err,
                    "forced token refresh failed"
                );
                return self.give_up(&key, realm, error);
            }
        };

        let mut replay = request;
        if let Err(err) = replay.set_bearer(&token) {
            warn!(
                fingerprint = %key,
                %realm,
                error = %err,
                "refreshed token rejected as header value"
            );
            return self.give_up(&key, realm, error);
        }

        debug!(
            fingerprint = %key,
            %realm,
            uid = %principal.uid(),
            "replaying with refreshed token"
        );
        Recovery::Replay(replay)
    }

    fn give_up(&self, key: &Fingerprint, realm: Realm, error: ClientError) -> Recovery {
        self.ledger.clear(key);
        self.redirector.redirect(realm.login_target());
        Recovery::Fail(error)
    }
}
