//! Applicant registry
//!
//! Owns one [`ApplicantRecord`] per applicant behind an injected
//! [`ApplicantStore`]. Mutations for one applicant are serialized through a
//! per-id async lock; different applicants never contend.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::types::{ApplicantId, ApplicantRecord};

/// Backing storage for applicant records.
///
/// The default [`MemoryStore`] loses everything on restart; a durable store
/// implements the same four calls.
pub trait ApplicantStore: Send + Sync {
    fn load(&self, id: ApplicantId) -> Option<ApplicantRecord>;
    fn save(&self, record: ApplicantRecord);
    fn remove(&self, id: ApplicantId) -> Option<ApplicantRecord>;
    fn ids(&self) -> Vec<ApplicantId>;
}

#[derive(Default)]
pub struct MemoryStore {
    records: DashMap<ApplicantId, ApplicantRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ApplicantStore for MemoryStore {
    fn load(&self, id: ApplicantId) -> Option<ApplicantRecord> {
        self.records.get(&id).map(|r| r.value().clone())
    }

    fn save(&self, record: ApplicantRecord) {
        self.records.insert(record.id, record);
    }

    fn remove(&self, id: ApplicantId) -> Option<ApplicantRecord> {
        self.records.remove(&id).map(|(_, record)| record)
    }

    fn ids(&self) -> Vec<ApplicantId> {
        self.records.iter().map(|entry| *entry.key()).collect()
    }
}

pub struct Registry {
    store: Arc<dyn ApplicantStore>,
    locks: DashMap<ApplicantId, Arc<Mutex<()>>>,
}

impl Registry {
    pub fn new(store: Arc<dyn ApplicantStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Serializes work on one applicant. Hold the guard across read-modify-write.
    pub async fn lock(&self, id: ApplicantId) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone();
        mutex.lock_owned().await
    }

    pub fn get(&self, id: ApplicantId) -> Option<ApplicantRecord> {
        self.store.load(id)
    }

    /// Stores a fresh record, replacing any previous one.
    pub fn create(&self, id: ApplicantId, now: DateTime<Utc>) -> ApplicantRecord {
        let record = ApplicantRecord::new(id, now);
        self.store.save(record.clone());
        record
    }

    pub fn save(&self, record: ApplicantRecord) {
        self.store.save(record);
    }

    pub fn delete(&self, id: ApplicantId) {
        self.store.remove(id);
    }

    /// Applies `f` to the stored record. Callers hold [`Registry::lock`].
    pub fn update<R>(&self, id: ApplicantId, f: impl FnOnce(&mut ApplicantRecord) -> R) -> Option<R> {
        let mut record = self.store.load(id)?;
        let out = f(&mut record);
        self.store.save(record);
        Some(out)
    }

    pub fn touch(&self, id: ApplicantId, now: DateTime<Utc>) -> bool {
        self.update(id, |record| record.touch(now)).is_some()
    }

    /// Deletes idle or collecting records inactive for longer than `window`.
    ///
    /// Records whose lock is currently held are skipped and picked up by the
    /// next sweep.
    pub fn expire_inactive(&self, now: DateTime<Utc>, window: Duration) -> Vec<ApplicantId> {
        let mut expired = Vec::new();
        for id in self.store.ids() {
            let mutex = self.locks.get(&id).map(|entry| entry.value().clone());
            let _guard = match &mutex {
                Some(m) => match m.try_lock() {
                    Ok(guard) => Some(guard),
                    Err(_) => continue,
                },
                None => None,
            };
            let Some(record) = self.store.load(id) else {
                continue;
            };
            if record.status.is_pre_submission() && now.signed_duration_since(record.last_activity) > window {
                self.store.remove(id);
                expired.push(id);
            }
        }
        for id in &expired {
            self.locks.remove_if(id, |_, m| Arc::strong_count(m) == 1);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.store.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
