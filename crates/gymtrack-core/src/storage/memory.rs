//! In-memory member store for embedding and tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{check_read, check_write, MemberStore};
use crate::error::StoreError;
use crate::member::{Member, MemberPatch, NewMember, OwnerId};

#[derive(Default)]
struct Inner {
    next_seq: u64,
    /// owner -> (insertion sequence, member)
    collections: BTreeMap<OwnerId, Vec<(u64, Member)>>,
}

/// Member store kept in process memory.
///
/// Can be switched offline to exercise the unavailable-store path.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection with fully-formed members, ids included.
    pub fn with_members(owner: &OwnerId, members: impl IntoIterator<Item = Member>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().unwrap_or_else(|e| e.into_inner());
            for member in members {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner
                    .collections
                    .entry(owner.clone())
                    .or_default()
                    .push((seq, member));
            }
        }
        store
    }

    /// While offline every call fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

impl MemberStore for InMemoryStore {
    fn list(&self, owner: &OwnerId) -> Result<Vec<Member>, StoreError> {
        let inner = self.lock()?;
        let mut rows = inner.collections.get(owner).cloned().unwrap_or_default();
        rows.sort_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, m)| check_read(m)).collect()
    }

    fn get(&self, owner: &OwnerId, id: &str) -> Result<Option<Member>, StoreError> {
        let inner = self.lock()?;
        inner
            .collections
            .get(owner)
            .and_then(|rows| rows.iter().find(|(_, m)| m.id == id))
            .map(|(_, m)| check_read(m.clone()))
            .transpose()
    }

    fn create(&self, owner: &OwnerId, member: NewMember) -> Result<String, StoreError> {
        let member = member.with_id(Uuid::new_v4().to_string());
        check_write(&member)?;
        let id = member.id.clone();

        let mut inner = self.lock()?;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .collections
            .entry(owner.clone())
            .or_default()
            .push((seq, member));
        Ok(id)
    }

    fn update(&self, owner: &OwnerId, id: &str, patch: &MemberPatch) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let member = inner
            .collections
            .get_mut(owner)
            .and_then(|rows| rows.iter_mut().find(|(_, m)| m.id == id))
            .map(|(_, m)| m)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        let mut updated = member.clone();
        patch.apply_to(&mut updated);
        check_write(&updated)?;
        *member = updated;
        Ok(())
    }

    fn delete(&self, owner: &OwnerId, id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let rows = inner
            .collections
            .get_mut(owner)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        let before = rows.len();
        rows.retain(|(_, m)| m.id != id);
        if rows.len() == before {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        Ok(())
    }
}
