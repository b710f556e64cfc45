//! Factory: build the authenticated client from application `Config`.
use std::sync::Arc;

use crate::client::AuthClient;
use crate::config::Config;
use crate::error::ClientError;
use crate::realm::Realm;
use crate::services::navigation::{LoginRedirector, Navigator};
use crate::services::retry_ledger::RetryLedger;
use crate::services::route_classifier::RouteClassifier;
use crate::services::session::{RealmSessionProvider, SecureTokenSession, StaticSession};
use crate::services::transport::ReqwestTransport;
use crate::state::RealmSessions;

pub fn build_session(
    config: &Config,
    realm: Realm,
    http: &reqwest::Client,
) -> Arc<dyn RealmSessionProvider> {
    let realm_config = config.realm(realm);

    if let Some(token) = realm_config.static_token.as_deref() {
        return Arc::new(StaticSession::signed_in(realm, format!("{realm}-static"), token));
    }

    match realm_config.api_key.as_deref() {
        Some(api_key) => Arc::new(SecureTokenSession::new(
            realm,
            http.clone(),
            config.securetoken_endpoint.clone(),
            api_key,
            realm_config.refresh_token.clone(),
        )),
        None => {
            tracing::info!(%realm, "no identity provider configured, realm stays signed out");
            Arc::new(StaticSession::signed_out(realm))
        }
    }
}

pub fn build_client(
    config: &Config,
    navigator: Arc<dyn Navigator>,
) -> Result<AuthClient<ReqwestTransport>, ClientError> {
    let transport = ReqwestTransport::new(&config.api_base_url, config.http_timeout)?;

    let identity_http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(|e| ClientError::Configuration(format!("identity http client: {e}")))?;

    let sessions = RealmSessions::new(
        build_session(config, Realm::EndUser, &identity_http),
        build_session(config, Realm::Backoffice, &identity_http),
    );

    let classifier = RouteClassifier::new(
        config.api_base_url.clone(),
        &config.backoffice_path_prefix,
        config.client_query_params.clone(),
    );

    let redirector = LoginRedirector::new(
        navigator,
        config.enduser_login_path.clone(),
        config.backoffice_login_path.clone(),
    );

    Ok(AuthClient::new(
        transport,
        classifier,
        sessions,
        RetryLedger::new(config.retry_cap),
        redirector,
    ))
}
