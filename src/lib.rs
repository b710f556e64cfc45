//! Dual-realm authenticated HTTP client for the tax-declaration API.
//!
//! Every request is authorized with a bearer token from the end-user or the
//! back-office realm (chosen from the url), and a 401 gets exactly one forced
//! token refresh and replay before the user is sent to the matching login page.
pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod realm;
pub mod request;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use client::AuthClient;
pub use config::Config;
pub use error::ClientError;
pub use realm::{LoginTarget, Realm};
pub use request::{ApiResponse, FormPart, RequestBody, RequestDescriptor};
pub use state::RealmSessions;
