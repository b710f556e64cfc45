//! Pre-flight stage: attach a bearer token from the right realm.
//!
//! The realm order comes from the route classifier. The primary realm is asked
//! first; the fallback realm only when the primary has no principal. Lookup
//! failures never abort the request: it goes out unauthenticated and the
//! backend decides.

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::realm::Realm;
use crate::request::{REQUEST_ID_HEADER, RequestDescriptor};
use crate::services::route_classifier::RouteClassifier;
use crate::services::session::{Principal, RealmSessionProvider};
use crate::state::RealmSessions;

#[derive(Clone, Debug)]
pub struct RequestAuthorizer {
    classifier: RouteClassifier,
    sessions: RealmSessions,
}

impl RequestAuthorizer {
    pub fn new(classifier: RouteClassifier, sessions: RealmSessions) -> Self {
        Self {
            classifier,
            sessions,
        }
    }

    /// Mutate `request` headers before transmission.
    ///
    /// Returns the realm whose token was attached, if any.
    pub async fn authorize(&self, request: &mut RequestDescriptor) -> Option<Realm> {
        ensure_request_id(request);

        let order = self.classifier.classify(&request.url).realm_order();
        let authorized = self.attach_bearer(request, order).await;

        ensure_json_content_type(request);

        debug!(
            method = %request.method,
            url = %request.url,
            realm = authorized.map(|r| r.as_str()).unwrap_or("none"),
            "request authorized"
        );
        authorized
    }

    async fn attach_bearer(
        &self,
        request: &mut RequestDescriptor,
        order: [Realm; 2],
    ) -> Option<Realm> {
        for realm in order {
            let provider = self.sessions.provider(realm);
            provider.ready().await;

            let Some(principal) = provider.current() else {
                debug!(%realm, "no principal");
                continue;
            };

            let token = match principal.get_token(false).await {
                Ok(token) => token,
                Err(err) => {
                    warn!(
                        %realm,
                        uid = %principal.uid(),
                        error = ?err,
                        "token lookup failed, sending unauthenticated"
                    );
                    return None;
                }
            };

            if let Err(err) = request.set_bearer(&token) {
                warn!(
                    %realm,
                    uid = %principal.uid(),
                    error = %err,
                    "token rejected as header value"
                );
                return None;
            }
            return Some(realm);
        }
        None
    }
}

fn ensure_request_id(request: &mut RequestDescriptor) {
    if request.headers.contains_key(REQUEST_ID_HEADER) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
        request.headers.insert(REQUEST_ID_HEADER, value);
    }
}

/// Default `Content-Type: application/json` unless the body is multipart/binary
/// or a content type is already present (header names are case-insensitive).
fn ensure_json_content_type(request: &mut RequestDescriptor) {
    if request.body.is_raw() {
        return;
    }
    request
        .headers
        .entry(CONTENT_TYPE)
        .or_insert(HeaderValue::from_static("application/json"));
}
