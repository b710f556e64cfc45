/*
 * Responsibility
 * - Read settings from the environment (.env supported)
 * - Validate them (missing / malformed values fail start-up)
 */
use std::fmt;
use std::time::Duration;

use url::Url;

use crate::realm::Realm;
use crate::services::retry_ledger::DEFAULT_RETRY_CAP;

pub const DEFAULT_SECURETOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com/v1/token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// How one realm obtains its session.
///
/// Priority: a static token, then a secure-token session (api key + optional
/// persisted refresh token), otherwise the realm is always signed out.
#[derive(Clone, Default)]
pub struct RealmConfig {
    pub api_key: Option<String>,
    pub refresh_token: Option<String>,
    pub static_token: Option<String>,
}

impl fmt::Debug for RealmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print secrets
        f.debug_struct("RealmConfig")
            .field("api_key", &self.api_key.is_some())
            .field("refresh_token", &self.refresh_token.is_some())
            .field("static_token", &self.static_token.is_some())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub app_env: AppEnv,

    pub api_base_url: String,
    pub backoffice_path_prefix: String,
    pub client_query_params: Vec<String>,

    pub enduser_login_path: String,
    pub backoffice_login_path: String,

    pub retry_cap: u32,
    pub http_timeout: Duration,

    pub securetoken_endpoint: Url,
    pub enduser: RealmConfig,
    pub backoffice: RealmConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (environment, map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let api_base_url = non_empty("API_BASE_URL").ok_or(ConfigError::Missing("API_BASE_URL"))?;
        Url::parse(&api_base_url).map_err(|_| ConfigError::Invalid("API_BASE_URL"))?;

        let backoffice_path_prefix =
            non_empty("BACKOFFICE_PATH_PREFIX").unwrap_or_else(|| "/clients".to_string());
        if !backoffice_path_prefix.starts_with('/') {
            return Err(ConfigError::Invalid("BACKOFFICE_PATH_PREFIX"));
        }

        let client_query_params = non_empty("CLIENT_QUERY_PARAMS")
            .unwrap_or_else(|| "cpf,clientCpf".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let enduser_login_path =
            non_empty("ENDUSER_LOGIN_PATH").unwrap_or_else(|| "/login".to_string());
        let backoffice_login_path =
            non_empty("BACKOFFICE_LOGIN_PATH").unwrap_or_else(|| "/backoffice/login".to_string());
        if enduser_login_path == backoffice_login_path {
            return Err(ConfigError::Invalid("BACKOFFICE_LOGIN_PATH"));
        }

        let retry_cap = lookup("AUTH_RETRY_CAP")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRY_CAP);

        let http_timeout = Duration::from_secs(
            lookup("HTTP_TIMEOUT_SECONDS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        );

        let securetoken_endpoint = Url::parse(
            &non_empty("SECURETOKEN_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_SECURETOKEN_ENDPOINT.to_string()),
        )
        .map_err(|_| ConfigError::Invalid("SECURETOKEN_ENDPOINT"))?;

        let enduser = RealmConfig {
            api_key: non_empty("ENDUSER_API_KEY"),
            refresh_token: non_empty("ENDUSER_REFRESH_TOKEN"),
            static_token: non_empty("ENDUSER_STATIC_TOKEN"),
        };
        let backoffice = RealmConfig {
            api_key: non_empty("BACKOFFICE_API_KEY"),
            refresh_token: non_empty("BACKOFFICE_REFRESH_TOKEN"),
            static_token: non_empty("BACKOFFICE_STATIC_TOKEN"),
        };
        if enduser.refresh_token.is_some() && enduser.api_key.is_none() {
            return Err(ConfigError::Missing("ENDUSER_API_KEY"));
        }
        if backoffice.refresh_token.is_some() && backoffice.api_key.is_none() {
            return Err(ConfigError::Missing("BACKOFFICE_API_KEY"));
        }

        Ok(Self {
            app_env,
            api_base_url,
            backoffice_path_prefix,
            client_query_params,
            enduser_login_path,
            backoffice_login_path,
            retry_cap,
            http_timeout,
            securetoken_endpoint,
            enduser,
            backoffice,
        })
    }

    pub fn realm(&self, realm: Realm) -> &RealmConfig {
        match realm {
            Realm::EndUser => &self.enduser,
            Realm::Backoffice => &self.backoffice,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let c = config(&[("API_BASE_URL", "https://api.example.com/v1")]).unwrap();
        assert_eq!(c.app_env, AppEnv::Development);
        assert_eq!(c.backoffice_path_prefix, "/clients");
        assert_eq!(c.client_query_params, vec!["cpf", "clientCpf"]);
        assert_eq!(c.enduser_login_path, "/login");
        assert_eq!(c.backoffice_login_path, "/backoffice/login");
        assert_eq!(c.retry_cap, 1);
        assert_eq!(c.http_timeout, Duration::from_secs(30));
        assert_eq!(c.securetoken_endpoint.as_str(), DEFAULT_SECURETOKEN_ENDPOINT);
        assert!(c.realm(Realm::EndUser).api_key.is_none());
    }

    #[test]
    fn base_url_is_required_and_validated() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("API_BASE_URL"))));
        assert!(matches!(
            config(&[("API_BASE_URL", "api.example.com")]),
            Err(ConfigError::Invalid("API_BASE_URL"))
        ));
    }

    #[test]
    fn refresh_token_needs_an_api_key() {
        let err = config(&[
            ("API_BASE_URL", "https://api.example.com"),
            ("BACKOFFICE_REFRESH_TOKEN", "rt"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("BACKOFFICE_API_KEY")));
    }

    #[test]
    fn login_paths_must_differ() {
        let err = config(&[
            ("API_BASE_URL", "https://api.example.com"),
            ("BACKOFFICE_LOGIN_PATH", "/login"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("BACKOFFICE_LOGIN_PATH")));
    }

    #[test]
    fn overrides_are_read() {
        let c = config(&[
            ("APP_ENV", "prod"),
            ("API_BASE_URL", "https://api.example.com"),
            ("CLIENT_QUERY_PARAMS", " cpf , customerId ,"),
            ("AUTH_RETRY_CAP", "2"),
            ("HTTP_TIMEOUT_SECONDS", "5"),
            ("ENDUSER_API_KEY", "key"),
            ("ENDUSER_REFRESH_TOKEN", "rt"),
        ])
        .unwrap();
        assert!(c.app_env.is_production());
        assert_eq!(c.client_query_params, vec!["cpf", "customerId"]);
        assert_eq!(c.retry_cap, 2);
        assert_eq!(c.http_timeout, Duration::from_secs(5));
        assert_eq!(c.enduser.refresh_token.as_deref(), Some("rt"));
    }
}
