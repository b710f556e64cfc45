/*
 * Responsibility
 * - Drive one request through authorize → send → recovery
 * - Replays re-enter send + recovery with the token recovery attached
 *   (pre-flight runs once per caller request)
 * - The loop is bounded by the retry ledger, not by a local counter
 */
use reqwest::Method;
use serde::Serialize;
use tracing::debug;

use crate::error::ClientError;
use crate::middleware::{Recovery, RequestAuthorizer, ResponseRecovery};
use crate::request::{ApiResponse, RequestDescriptor};
use crate::services::navigation::LoginRedirector;
use crate::services::retry_ledger::RetryLedger;
use crate::services::route_classifier::RouteClassifier;
use crate::services::transport::Transport;
use crate::state::RealmSessions;

#[derive(Clone, Debug)]
pub struct AuthClient<T: Transport> {
    transport: T,
    sessions: RealmSessions,
    authorizer: RequestAuthorizer,
    recovery: ResponseRecovery,
}

impl<T: Transport> AuthClient<T> {
    pub fn new(
        transport: T,
        classifier: RouteClassifier,
        sessions: RealmSessions,
        ledger: RetryLedger,
        redirector: LoginRedirector,
    ) -> Self {
        Self {
            transport,
            authorizer: RequestAuthorizer::new(classifier.clone(), sessions.clone()),
            recovery: ResponseRecovery::new(classifier, sessions.clone(), ledger, redirector),
            sessions,
        }
    }

    pub fn sessions(&self) -> &RealmSessions {
        &self.sessions
    }

    pub fn ledger(&self) -> &RetryLedger {
        self.recovery.ledger()
    }

    /// Run `request` through the whole pipeline.
    ///
    /// On an unrecoverable 401 the login redirect has already happened when
    /// this returns, and the error is the 401 itself.
    pub async fn execute(
        &self,
        mut request: RequestDescriptor,
    ) -> Result<ApiResponse, ClientError> {
        self.authorizer.authorize(&mut request).await;

        loop {
            match self.dispatch(request).await {
                Ok(response) => {
                    self.recovery.on_success(&response);
                    return Ok(response);
                }
                Err(error) => match self.recovery.on_error(error).await {
                    Recovery::Replay(next) => request = next,
                    Recovery::Fail(error) => return Err(error),
                },
            }
        }
    }

    async fn dispatch(&self, request: RequestDescriptor) -> Result<ApiResponse, ClientError> {
        let raw = self.transport.send(&request).await?;

        debug!(
            backend = self.transport.backend_name(),
            method = %request.method,
            url = %request.url,
            request_id = request.request_id().unwrap_or_default(),
            status = raw.status.as_u16(),
            "response received"
        );

        if raw.status.is_success() {
            Ok(ApiResponse {
                status: raw.status,
                headers: raw.headers,
                body: raw.body,
                request,
            })
        } else {
            Err(ClientError::Status {
                status: raw.status,
                request: Box::new(request),
                headers: raw.headers,
                body: raw.body,
            })
        }
    }

    pub async fn get(&self, url: &str) -> Result<ApiResponse, ClientError> {
        self.execute(RequestDescriptor::new(Method::GET, url)).await
    }

    pub async fn delete(&self, url: &str) -> Result<ApiResponse, ClientError> {
        self.execute(RequestDescriptor::new(Method::DELETE, url)).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ApiResponse, ClientError> {
        let request = RequestDescriptor::new(Method::POST, url).json(body)?;
        self.execute(request).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ApiResponse, ClientError> {
        let request = RequestDescriptor::new(Method::PUT, url).json(body)?;
        self.execute(request).await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ApiResponse, ClientError> {
        let request = RequestDescriptor::new(Method::PATCH, url).json(body)?;
        self.execute(request).await
    }
}
