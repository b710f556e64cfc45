//! In-crate fakes for the pipeline unit tests.
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::ClientError;
use crate::realm::Realm;
use crate::request::{RawResponse, RequestDescriptor};
use crate::services::route_classifier::RouteClassifier;
use crate::services::session::{Principal, RealmSessionProvider, SessionError};
use crate::services::transport::Transport;

pub(crate) fn classifier() -> RouteClassifier {
    RouteClassifier::new(
        "https://api.example.com",
        "/clients",
        vec!["cpf".to_string(), "clientCpf".to_string()],
    )
}

/// Principal with scripted token behaviour. Records every `force_refresh` flag.
#[derive(Clone)]
pub(crate) struct FakePrincipal {
    uid: String,
    token: String,
    fresh_token: Option<String>,
    fail_lookup: bool,
    fail_refresh: bool,
    calls: Arc<Mutex<Vec<bool>>>,
}

impl FakePrincipal {
    pub(crate) fn new(uid: &str, token: &str) -> Self {
        Self {
            uid: uid.to_string(),
            token: token.to_string(),
            fresh_token: None,
            fail_lookup: false,
            fail_refresh: false,
            calls: Arc::default(),
        }
    }

    pub(crate) fn refreshing_to(mut self, token: &str) -> Self {
        self.fresh_token = Some(token.to_string());
        self
    }

    pub(crate) fn failing_lookup(mut self) -> Self {
        self.fail_lookup = true;
        self
    }

    pub(crate) fn failing_refresh(mut self) -> Self {
        self.fail_refresh = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<bool> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Principal for FakePrincipal {
    fn uid(&self) -> &str {
        &self.uid
    }

    async fn get_token(&self, force_refresh: bool) -> Result<String, SessionError> {
        self.calls.lock().unwrap().push(force_refresh);
        tokio::task::yield_now().await;

        if force_refresh {
            if self.fail_refresh {
                return Err(SessionError::Rejected("TOKEN_EXPIRED".into()));
            }
            return Ok(self.fresh_token.clone().unwrap_or_else(|| self.token.clone()));
        }
        if self.fail_lookup {
            return Err(SessionError::InvalidResponse("lookup failed".into()));
        }
        Ok(self.token.clone())
    }
}

#[derive(Clone)]
pub(crate) struct FakeSession {
    realm: Realm,
    principal: Option<Arc<FakePrincipal>>,
    ready_calls: Arc<AtomicUsize>,
}

impl FakeSession {
    pub(crate) fn signed_in(realm: Realm, principal: FakePrincipal) -> Self {
        Self {
            realm,
            principal: Some(Arc::new(principal)),
            ready_calls: Arc::default(),
        }
    }

    pub(crate) fn signed_out(realm: Realm) -> Self {
        Self {
            realm,
            principal: None,
            ready_calls: Arc::default(),
        }
    }

    pub(crate) fn ready_calls(&self) -> usize {
        self.ready_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RealmSessionProvider for FakeSession {
    fn realm(&self) -> Realm {
        self.realm
    }

    async fn ready(&self) {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }

    fn current(&self) -> Option<Arc<dyn Principal>> {
        self.principal.clone().map(|p| p as Arc<dyn Principal>)
    }
}

#[derive(Clone, Copy)]
enum Scripted {
    Status(StatusCode),
    Unreachable,
}

/// Transport that answers from a script and records what it was sent.
///
/// Once the script runs out it answers with `fallback`.
#[derive(Clone, Debug)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    fallback: Scripted,
    sent: Arc<Mutex<Vec<RequestDescriptor>>>,
}

impl std::fmt::Debug for Scripted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scripted::Status(s) => write!(f, "{s}"),
            Scripted::Unreachable => f.write_str("unreachable"),
        }
    }
}

impl ScriptedTransport {
    pub(crate) fn new(statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        Self {
            script: Arc::new(Mutex::new(statuses.into_iter().map(Scripted::Status).collect())),
            fallback: Scripted::Status(StatusCode::OK),
            sent: Arc::default(),
        }
    }

    pub(crate) fn always(status: StatusCode) -> Self {
        Self {
            script: Arc::default(),
            fallback: Scripted::Status(status),
            sent: Arc::default(),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            script: Arc::default(),
            fallback: Scripted::Unreachable,
            sent: Arc::default(),
        }
    }

    pub(crate) fn sent(&self) -> Vec<RequestDescriptor> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn backend_name(&self) -> &'static str {
        "scripted"
    }

    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse, ClientError> {
        self.sent.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
        tokio::task::yield_now().await;

        match next {
            Scripted::Status(status) => Ok(RawResponse::new(status)),
            Scripted::Unreachable => Err(ClientError::Transport {
                message: "connection refused".into(),
                status: None,
                request: Some(Box::new(request.clone())),
            }),
        }
    }
}
