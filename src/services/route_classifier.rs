//! Maps a request url to the realm that should authorize it.
//!
//! Pure string handling: no session lookups, no I/O.

use reqwest::Method;

use crate::realm::{LoginTarget, Realm};
use crate::services::retry_ledger::Fingerprint;

/// Result of classifying one request url.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Path is under the back-office namespace.
    pub is_backoffice: bool,
    /// Query carries a non-empty client-identifying parameter.
    pub has_client_param: bool,
}

impl Classification {
    /// Pre-flight order: `[primary, fallback]`.
    pub fn realm_order(&self) -> [Realm; 2] {
        if self.is_backoffice {
            [Realm::Backoffice, Realm::EndUser]
        } else if self.has_client_param {
            // accountant acting on behalf of a client against an end-user endpoint
            [Realm::Backoffice, Realm::EndUser]
        } else {
            [Realm::EndUser, Realm::Backoffice]
        }
    }

    pub fn primary(&self) -> Realm {
        self.realm_order()[0]
    }

    /// The single realm a 401 is recovered against. No fallback.
    pub fn recovery_realm(&self) -> Realm {
        if self.is_backoffice || self.has_client_param {
            Realm::Backoffice
        } else {
            Realm::EndUser
        }
    }

    pub fn login_target(&self) -> LoginTarget {
        self.recovery_realm().login_target()
    }
}

#[derive(Debug, Clone)]
pub struct RouteClassifier {
    base_url: String,
    // stored without surrounding slashes, e.g. "clients"
    backoffice_prefix: String,
    client_params: Vec<String>,
}

impl RouteClassifier {
    pub fn new(
        base_url: impl Into<String>,
        backoffice_prefix: impl AsRef<str>,
        client_params: Vec<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            backoffice_prefix: backoffice_prefix.as_ref().trim_matches('/').to_string(),
            client_params,
        }
    }

    /// Strip the configured base url, if the url starts with it.
    pub fn relative<'a>(&self, url: &'a str) -> &'a str {
        if self.base_url.is_empty() {
            return url;
        }
        match url.strip_prefix(self.base_url.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') => rest,
            _ => url,
        }
    }

    /// Split into path and the first `?`-delimited query segment.
    pub fn split<'a>(&self, url: &'a str) -> (&'a str, Option<&'a str>) {
        let mut segments = self.relative(url).split('?');
        let path = segments.next().unwrap_or_default();
        (path, segments.next())
    }

    pub fn is_backoffice_path(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        let prefix = self.backoffice_prefix.as_str();
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    pub fn has_client_param(&self, query: Option<&str>) -> bool {
        let Some(query) = query else {
            return false;
        };
        url::form_urlencoded::parse(query.as_bytes()).any(|(name, value)| {
            !value.is_empty() && self.client_params.iter().any(|p| p.as_str() == name)
        })
    }

    pub fn classify(&self, url: &str) -> Classification {
        let (path, query) = self.split(url);
        Classification {
            is_backoffice: self.is_backoffice_path(path),
            has_client_param: self.has_client_param(query),
        }
    }

    /// Retry bookkeeping key: method and path only (query and body ignored).
    pub fn fingerprint(&self, method: &Method, url: &str) -> Fingerprint {
        let (path, _) = self.split(url);
        Fingerprint::new(method, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RouteClassifier {
        RouteClassifier::new(
            "https://api.example.com/v1/",
            "/clients",
            vec!["cpf".to_string(), "clientCpf".to_string()],
        )
    }

    #[test]
    fn backoffice_paths_ignore_the_query() {
        let c = classifier();
        for url in [
            "/clients",
            "/clients?page=1",
            "/clients/42/declarations",
            "/clients?cpf=",
            "https://api.example.com/v1/clients/42?foo=bar",
        ] {
            let class = c.classify(url);
            assert!(class.is_backoffice, "{url}");
            assert_eq!(class.realm_order(), [Realm::Backoffice, Realm::EndUser]);
        }
    }

    #[test]
    fn client_param_makes_backoffice_primary() {
        let c = classifier();
        for url in [
            "/irpf-declarations/2024?cpf=12345678900",
            "/irpf-declarations/2024?year=2024&clientCpf=123",
            "https://api.example.com/v1/transactions?clientCpf=1",
        ] {
            let class = c.classify(url);
            assert!(!class.is_backoffice, "{url}");
            assert!(class.has_client_param, "{url}");
            assert_eq!(class.primary(), Realm::Backoffice);
            assert_eq!(class.recovery_realm(), Realm::Backoffice);
        }
    }

    #[test]
    fn empty_client_param_does_not_count() {
        let class = classifier().classify("/irpf-declarations/2024?cpf=&clientCpf=");
        assert!(!class.has_client_param);
        assert_eq!(class.primary(), Realm::EndUser);
    }

    #[test]
    fn plain_paths_are_enduser_first() {
        let class = classifier().classify("/irpf-declarations/2024/transactions");
        assert_eq!(class.realm_order(), [Realm::EndUser, Realm::Backoffice]);
        assert_eq!(class.login_target(), LoginTarget::EndUser);
    }

    #[test]
    fn prefix_must_end_at_a_segment() {
        let c = classifier();
        assert!(!c.classify("/clientsettings").is_backoffice);
        assert!(!c.classify("/api/clients").is_backoffice);
    }

    #[test]
    fn only_the_first_query_segment_is_parsed() {
        let c = classifier();
        assert!(!c.classify("/transactions?page=1?cpf=123").has_client_param);
        assert!(c.classify("/transactions?cpf=123?page=1").has_client_param);
    }

    #[test]
    fn foreign_hosts_are_not_stripped() {
        let c = classifier();
        assert_eq!(
            c.relative("https://api.example.com/v10/clients"),
            "https://api.example.com/v10/clients"
        );
        assert_eq!(c.relative("https://api.example.com/v1/clients"), "/clients");
    }

    #[test]
    fn fingerprint_ignores_query_and_base_url() {
        let c = classifier();
        let a = c.fingerprint(&Method::GET, "/clients?page=1");
        let b = c.fingerprint(&Method::GET, "https://api.example.com/v1/clients?page=2");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "GET:/clients");
        assert_ne!(a, c.fingerprint(&Method::POST, "/clients"));
    }
}
