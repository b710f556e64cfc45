//! Per-fingerprint retry counter that breaks 401 → refresh → 401 loops.
//!
//! The ledger is a loop-breaker, not a mutex: two concurrent requests with the
//! same fingerprint may both see zero attempts and both retry. The lock below
//! only protects the map itself and is never held across an await.
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use reqwest::Method;

pub const DEFAULT_RETRY_CAP: u32 = 1;

/// `"{METHOD}:{path}"`. Query string and body are not part of the key, so
/// different payloads sent to the same path share one retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(method: &Method, path: &str) -> Self {
        Self(format!(
            "{}:/{}",
            method.as_str().to_ascii_uppercase(),
            path.trim_start_matches('/')
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug)]
pub struct RetryLedger {
    entries: Arc<Mutex<HashMap<Fingerprint, u32>>>,
    cap: u32,
}

impl Default for RetryLedger {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_CAP)
    }
}

impl RetryLedger {
    pub fn new(cap: u32) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            cap,
        }
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Fingerprint, u32>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attempts recorded so far; 0 for unseen fingerprints.
    pub fn attempts(&self, key: &Fingerprint) -> u32 {
        self.entries().get(key).copied().unwrap_or(0)
    }

    pub fn is_exhausted(&self, key: &Fingerprint) -> bool {
        self.attempts(key) >= self.cap
    }

    /// Increment by one and return the new count. Callers check the cap first.
    pub fn record_attempt(&self, key: &Fingerprint) -> u32 {
        let mut entries = self.entries();
        let attempts = entries.entry(key.clone()).or_insert(0);
        *attempts = attempts.saturating_add(1);
        *attempts
    }

    /// Remove the entry. Returns whether one existed.
    pub fn clear(&self, key: &Fingerprint) -> bool {
        self.entries().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_fingerprint_has_no_attempts() {
        let ledger = RetryLedger::default();
        let key = Fingerprint::new(&Method::GET, "/clients");
        assert_eq!(ledger.attempts(&key), 0);
        assert!(!ledger.is_exhausted(&key));
        assert!(ledger.is_empty());
    }

    #[test]
    fn one_attempt_exhausts_the_default_cap() {
        let ledger = RetryLedger::default();
        let key = Fingerprint::new(&Method::GET, "/clients");
        assert_eq!(ledger.record_attempt(&key), 1);
        assert!(ledger.is_exhausted(&key));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn clear_removes_rather_than_decrements() {
        let ledger = RetryLedger::default();
        let key = Fingerprint::new(&Method::POST, "irpf-declarations");
        ledger.record_attempt(&key);
        assert!(ledger.clear(&key));
        assert!(!ledger.clear(&key));
        assert_eq!(ledger.attempts(&key), 0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn clones_share_state() {
        let ledger = RetryLedger::default();
        let other = ledger.clone();
        let key = Fingerprint::new(&Method::PUT, "/x");
        other.record_attempt(&key);
        assert_eq!(ledger.attempts(&key), 1);
    }

    #[test]
    fn key_format_is_uppercase_method_and_rooted_path() {
        let key = Fingerprint::new(&Method::from_bytes(b"patch").unwrap(), "clients/7");
        assert_eq!(key.to_string(), "PATCH:/clients/7");
    }
}
