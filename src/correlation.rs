use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::AuthToken;

/// Temporary credentials older than this are forgotten.
pub const DEFAULT_TEMPORARY_TTL: Duration = Duration::from_secs(15 * 60);

/// Access credentials are kept this long after issue.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Temporary,
    Access,
}

#[derive(Debug)]
struct Entry {
    secret: String,
    kind: CredentialKind,
    issued_at: Instant,
}

/// Maps a token to its secret between the legs of a handshake.
///
/// The authorization callback only returns the token; the secret received
/// with it is looked up here. Entries are keyed by provider and token, and a
/// reissued token overwrites the previous secret. Every entry expires:
/// temporary ones after `ttl`, access ones after `access_ttl`. Expired
/// entries are dropped on the next insert, so the table only holds what is
/// live.
#[derive(Debug)]
pub struct CorrelationTable {
    entries: Mutex<HashMap<(String, String), Entry>>,
    ttl: Duration,
    access_ttl: Duration,
}

impl Default for CorrelationTable {
    fn default() -> Self {
        CorrelationTable::with_ttls(DEFAULT_TEMPORARY_TTL, DEFAULT_ACCESS_TTL)
    }
}

impl CorrelationTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        CorrelationTable::with_ttls(ttl, DEFAULT_ACCESS_TTL)
    }

    pub fn with_ttls(temporary: Duration, access: Duration) -> Self {
        CorrelationTable {
            entries: Mutex::new(HashMap::new()),
            ttl: temporary,
            access_ttl: access,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, String), Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_live(&self, entry: &Entry) -> bool {
        let ttl = match entry.kind {
            CredentialKind::Temporary => self.ttl,
            CredentialKind::Access => self.access_ttl,
        };
        entry.issued_at.elapsed() < ttl
    }

    pub fn insert(&self, service: &str, credentials: &AuthToken, kind: CredentialKind) {
        let mut entries = self.lock();
        entries.retain(|_, entry| self.is_live(entry));
        entries.insert(
            (service.to_string(), credentials.token().to_string()),
            Entry {
                secret: credentials.secret().to_string(),
                kind,
                issued_at: Instant::now(),
            },
        );
    }

    /// Secret of a live token.
    pub fn lookup(&self, service: &str, token: &str) -> Option<String> {
        let mut entries = self.lock();
        let key = (service.to_string(), token.to_string());
        let live = match entries.get(&key) {
            Some(entry) => self.is_live(entry),
            None => return None,
        };
        if live {
            entries.get(&key).map(|entry| entry.secret.clone())
        } else {
            entries.remove(&key);
            None
        }
    }

    pub fn kind(&self, service: &str, token: &str) -> Option<CredentialKind> {
        self.lock()
            .get(&(service.to_string(), token.to_string()))
            .filter(|entry| self.is_live(entry))
            .map(|entry| entry.kind)
    }

    pub fn remove(&self, service: &str, token: &str) -> Option<String> {
        self.lock()
            .remove(&(service.to_string(), token.to_string()))
            .map(|entry| entry.secret)
    }

    /// Drops expired entries.
    pub fn purge_expired(&self) {
        self.lock().retain(|_, entry| self.is_live(entry));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn lookup_is_scoped_by_service() {
        let table = CorrelationTable::new();
        table.insert("twitter", &AuthToken::new("T", "S"), CredentialKind::Temporary);
        assert_eq!(table.lookup("twitter", "T"), Some("S".to_string()));
        assert_eq!(table.lookup("smugmug", "T"), None);
        assert_eq!(table.kind("twitter", "T"), Some(CredentialKind::Temporary));
    }

    #[test]
    fn last_write_wins() {
        let table = CorrelationTable::new();
        table.insert("svc", &AuthToken::new("T", "S1"), CredentialKind::Temporary);
        table.insert("svc", &AuthToken::new("T", "S2"), CredentialKind::Temporary);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("svc", "T"), Some("S2".to_string()));
    }

    #[test]
    fn expired_temporary_entries_are_evicted() {
        let table = CorrelationTable::with_ttl(Duration::from_secs(0));
        table.insert("svc", &AuthToken::new("T", "S"), CredentialKind::Temporary);
        table.insert("svc", &AuthToken::new("A", "AS"), CredentialKind::Access);
        assert_eq!(table.lookup("svc", "T"), None);
        assert_eq!(table.lookup("svc", "A"), Some("AS".to_string()));
        table.purge_expired();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn access_entries_expire_too() {
        let table = CorrelationTable::with_ttls(Duration::from_secs(60), Duration::from_secs(0));
        table.insert("svc", &AuthToken::new("A1", "S1"), CredentialKind::Access);
        assert_eq!(table.kind("svc", "A1"), None);
        table.insert("svc", &AuthToken::new("A2", "S2"), CredentialKind::Access);
        table.insert("svc", &AuthToken::new("T", "S"), CredentialKind::Temporary);
        // the inserts above pruned the stale access entries
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("svc", "T"), Some("S".to_string()));
    }

    #[test]
    fn remove_returns_the_secret() {
        let table = CorrelationTable::new();
        table.insert("svc", &AuthToken::new("T", "S"), CredentialKind::Temporary);
        assert_eq!(table.remove("svc", "T"), Some("S".to_string()));
        assert!(table.is_empty());
        assert_eq!(table.remove("svc", "T"), None);
    }

    #[test]
    fn concurrent_handshakes_do_not_interfere() {
        let table = Arc::new(CorrelationTable::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    let token = AuthToken::new(format!("T{}", i), format!("S{}", i));
                    table.insert("svc", &token, CredentialKind::Temporary);
                    table.lookup("svc", token.token())
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Some(format!("S{}", i)));
        }
        assert_eq!(table.len(), 8);
    }
}
