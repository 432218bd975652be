//! Persistence port for user progress plus an in-memory implementation.
//!
//! Transactions are optimistic: read a versioned snapshot, compute the new
//! document without holding the lock, then write only if the version is
//! unchanged. A conflict recomputes from the fresh snapshot; a missing document
//! aborts immediately.
//!
//! `InMemoryStore` is not durable: documents live only as long as the process.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::domain::UserProgress;
use crate::error::PersistenceError;

/// Transaction body: pure function from the current document to the next one.
pub type TxFn<'a> = &'a (dyn Fn(&UserProgress) -> UserProgress + Send + Sync);

/// Non-transactional increments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressPatch {
    pub add_practice_time: u64,
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Read the user's document, `None` when it does not exist.
    async fn get(&self, user: &str) -> Result<Option<UserProgress>, PersistenceError>;

    /// Create the document; fails if one already exists.
    async fn create(&self, user: &str, doc: UserProgress) -> Result<(), PersistenceError>;

    /// All-or-nothing read-modify-write. Returns the committed document.
    async fn run_transaction(&self, user: &str, tx: TxFn<'_>) -> Result<UserProgress, PersistenceError>;

    /// Blind increment, no conflict detection.
    async fn update(&self, user: &str, patch: ProgressPatch) -> Result<UserProgress, PersistenceError>;
}

pub const DEFAULT_MAX_TX_ATTEMPTS: u32 = 5;

#[derive(Debug)]
struct Versioned {
    version: u64,
    doc: UserProgress,
}

#[derive(Debug)]
pub struct InMemoryStore {
    docs: RwLock<HashMap<String, Versioned>>,
    max_attempts: u32,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TX_ATTEMPTS)
    }
}

fn poisoned<E>(_: E) -> PersistenceError {
    PersistenceError::Backend("progress store lock poisoned".into())
}

impl InMemoryStore {
    pub fn new(max_attempts: u32) -> Self {
        Self { docs: RwLock::new(HashMap::new()), max_attempts: max_attempts.max(1) }
    }

    fn snapshot(&self, user: &str) -> Result<(u64, UserProgress), PersistenceError> {
        let docs = self.docs.read().map_err(poisoned)?;
        docs.get(user)
            .map(|v| (v.version, v.doc.clone()))
            .ok_or_else(|| PersistenceError::Missing { user: user.to_string() })
    }
}

#[async_trait]
impl ProgressStore for InMemoryStore {
    async fn get(&self, user: &str) -> Result<Option<UserProgress>, PersistenceError> {
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs.get(user).map(|v| v.doc.clone()))
    }

    async fn create(&self, user: &str, doc: UserProgress) -> Result<(), PersistenceError> {
        let mut docs = self.docs.write().map_err(poisoned)?;
        if docs.contains_key(user) {
            return Err(PersistenceError::AlreadyExists { user: user.to_string() });
        }
        docs.insert(user.to_string(), Versioned { version: 0, doc });
        Ok(())
    }

    #[instrument(level = "debug", skip(self, tx), fields(%user))]
    async fn run_transaction(&self, user: &str, tx: TxFn<'_>) -> Result<UserProgress, PersistenceError> {
        for attempt in 1..=self.max_attempts {
            let (version, current) = self.snapshot(user)?;
            let next = tx(&current);

            let mut docs = self.docs.write().map_err(poisoned)?;
            match docs.get_mut(user) {
                None => {
                    warn!(target: "progress", %user, attempt, "Document vanished mid-transaction; aborting");
                    return Err(PersistenceError::Missing { user: user.to_string() });
                }
                Some(slot) if slot.version == version => {
                    slot.doc = next.clone();
                    slot.version += 1;
                    return Ok(next);
                }
                Some(_) => {
                    debug!(target: "progress", %user, attempt, "Write conflict; recomputing");
                }
            }
        }
        warn!(target: "progress", %user, attempts = self.max_attempts, "Transaction gave up after repeated conflicts");
        Err(PersistenceError::Conflict { attempts: self.max_attempts })
    }

    async fn update(&self, user: &str, patch: ProgressPatch) -> Result<UserProgress, PersistenceError> {
        let mut docs = self.docs.write().map_err(poisoned)?;
        let slot = docs
            .get_mut(user)
            .ok_or_else(|| PersistenceError::Missing { user: user.to_string() })?;
        slot.doc.practice_time = slot.doc.practice_time.saturating_add(patch.add_practice_time);
        slot.version += 1;
        Ok(slot.doc.clone())
    }
}

/// Out-of-band writers used to simulate concurrent sessions.
#[cfg(test)]
impl InMemoryStore {
    /// Overwrite a document, bumping its version.
    pub fn put(&self, user: &str, doc: UserProgress) -> Result<(), PersistenceError> {
        let mut docs = self.docs.write().map_err(poisoned)?;
        let version = docs.get(user).map(|v| v.version + 1).unwrap_or(0);
        docs.insert(user.to_string(), Versioned { version, doc });
        Ok(())
    }

    pub fn remove(&self, user: &str) -> Result<bool, PersistenceError> {
        Ok(self.docs.write().map_err(poisoned)?.remove(user).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn bump_points(p: &UserProgress) -> UserProgress {
        UserProgress { points: p.points + 10, ..p.clone() }
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = InMemoryStore::default();
        store.create("u1", UserProgress::new("Novizio")).await.unwrap();
        let doc = store.get("u1").await.unwrap().unwrap();
        assert_eq!(doc.rank, "Novizio");
        assert!(store.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_twice_fails() {
        let store = InMemoryStore::default();
        store.create("u1", UserProgress::default()).await.unwrap();
        let err = store.create("u1", UserProgress::default()).await.unwrap_err();
        assert_eq!(err, PersistenceError::AlreadyExists { user: "u1".into() });
    }

    #[tokio::test]
    async fn transaction_on_missing_document_aborts() {
        let store = InMemoryStore::default();
        let err = store.run_transaction("ghost", &bump_points).await.unwrap_err();
        assert_eq!(err, PersistenceError::Missing { user: "ghost".into() });
        assert!(store.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn document_deleted_mid_transaction_is_not_recreated() {
        let store = InMemoryStore::default();
        store.create("u1", UserProgress::default()).await.unwrap();
        let tx = |p: &UserProgress| {
            store.remove("u1").unwrap();
            bump_points(p)
        };
        let err = store.run_transaction("u1", &tx).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Missing { .. }));
        assert!(store.get("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn conflict_recomputes_from_fresh_snapshot() {
        let store = InMemoryStore::default();
        store.create("u1", UserProgress::default()).await.unwrap();
        let calls = AtomicU32::new(0);
        let tx = |p: &UserProgress| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                // A competing writer lands between our read and our write.
                store.put("u1", UserProgress { points: 5, ..UserProgress::default() }).unwrap();
            }
            bump_points(p)
        };
        let doc = store.run_transaction("u1", &tx).await.unwrap();
        assert_eq!(doc.points, 15);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausted_conflicts_leave_document_untouched() {
        let store = InMemoryStore::new(3);
        let original = UserProgress { points: 40, exercise_count: 4, ..UserProgress::default() };
        store.create("u1", original.clone()).await.unwrap();
        let tx = |p: &UserProgress| {
            store.put("u1", original.clone()).unwrap();
            bump_points(p)
        };
        let err = store.run_transaction("u1", &tx).await.unwrap_err();
        assert_eq!(err, PersistenceError::Conflict { attempts: 3 });
        assert_eq!(store.get("u1").await.unwrap().unwrap(), original);
    }

    #[tokio::test]
    async fn update_adds_practice_time() {
        let store = InMemoryStore::default();
        store.create("u1", UserProgress::default()).await.unwrap();
        store.update("u1", ProgressPatch { add_practice_time: 12 }).await.unwrap();
        let doc = store.update("u1", ProgressPatch { add_practice_time: 8 }).await.unwrap();
        assert_eq!(doc.practice_time, 20);
        assert!(store.update("nobody", ProgressPatch::default()).await.is_err());
    }
}
