//! In-memory record store.
//!
//! Owns the canonical member collection and the store name. All mutations go
//! through this handle, which bumps a revision broadcast over a watch channel
//! so the persister can observe changes.

mod merge;

pub use merge::*;

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tokio::sync::watch;

use crate::errors::AppError;
use crate::models::{
    generate_id, normalize_birthday_month, CandidateMember, Member, MemberUpdate, Snapshot,
};

#[derive(Debug)]
struct Inner {
    members: Vec<Member>,
    store_name: String,
    revision: u64,
}

/// Cloneable handle to the canonical record collection.
#[derive(Clone)]
pub struct RecordStore {
    inner: Arc<RwLock<Inner>>,
    revision_tx: Arc<watch::Sender<u64>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::from_snapshot(Snapshot::default())
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let (revision_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                members: snapshot.members,
                store_name: snapshot.store_name,
                revision: 0,
            })),
            revision_tx: Arc::new(revision_tx),
        }
    }

    /// Subscribe to revision bumps. Every mutation sends a new revision.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut inner = self.inner.write().expect("record store lock poisoned");
        let result = f(&mut inner);
        inner.revision += 1;
        self.revision_tx.send_replace(inner.revision);
        result
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        let inner = self.inner.read().expect("record store lock poisoned");
        f(&inner)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.read(|inner| Snapshot::new(inner.store_name.clone(), inner.members.clone()))
    }

    pub fn members(&self) -> Vec<Member> {
        self.read(|inner| inner.members.clone())
    }

    pub fn len(&self) -> usize {
        self.read(|inner| inner.members.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of records not yet marked used.
    pub fn active_count(&self) -> usize {
        self.read(|inner| inner.members.iter().filter(|m| !m.is_used).count())
    }

    pub fn store_name(&self) -> String {
        self.read(|inner| inner.store_name.clone())
    }

    pub fn set_store_name(&self, name: String) {
        self.mutate(|inner| inner.store_name = name);
    }

    /// Phone values currently in the collection (trimmed).
    pub fn phones(&self) -> HashSet<String> {
        self.read(|inner| {
            inner
                .members
                .iter()
                .map(|m| m.phone.trim().to_string())
                .collect()
        })
    }

    /// Add a single record. With `dedupe` on, a phone already in the
    /// collection blocks the operation.
    pub fn add_single(
        &self,
        candidate: CandidateMember,
        dedupe: bool,
    ) -> Result<Member, AppError> {
        let phone = candidate.phone.trim().to_string();
        if candidate.name.trim().is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }
        if phone.is_empty() {
            return Err(AppError::Validation("Phone is required".to_string()));
        }
        if dedupe && self.phones().contains(&phone) {
            return Err(AppError::DuplicatePhone(phone));
        }

        let member = Member {
            id: generate_id(),
            name: candidate.name.trim().to_string(),
            phone,
            is_used: candidate.is_used,
            voucher_type: candidate.voucher_type,
            is_vip: candidate.is_vip,
            birthday_month: normalize_birthday_month(
                candidate.birthday_month.as_deref().unwrap_or(""),
            ),
            note: candidate.note.unwrap_or_default(),
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        self.mutate(|inner| inner.members.insert(0, member.clone()));
        Ok(member)
    }

    /// Merge an inbound batch through the resolver. Survivors are prepended
    /// (most-recent-first); a non-empty inbound store name is adopted only
    /// when the current one is empty.
    pub fn merge_import(
        &self,
        candidates: Vec<CandidateMember>,
        inbound_store_name: &str,
        policy: MergePolicy,
    ) -> MergeOutcome {
        let outcome = merge::resolve(&self.phones(), candidates, policy);
        if !outcome.accepted.is_empty() || !inbound_store_name.is_empty() {
            self.mutate(|inner| {
                for member in outcome.accepted.iter().rev() {
                    inner.members.insert(0, member.clone());
                }
                if inner.store_name.is_empty() && !inbound_store_name.is_empty() {
                    inner.store_name = inbound_store_name.to_string();
                }
            });
        }
        outcome
    }

    /// Apply a partial update to an existing record.
    ///
    /// Duplicate checking defaults off when editing (the record's own phone
    /// would flag as a false duplicate); when enabled, changing the phone to
    /// one used by a different record is rejected and the original retained.
    pub fn update_member(
        &self,
        id: &str,
        update: MemberUpdate,
        check_duplicates: bool,
    ) -> Result<Member, AppError> {
        self.mutate(|inner| {
            let current_phone = inner
                .members
                .iter()
                .find(|m| m.id == id)
                .map(|m| m.phone.clone())
                .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;

            if let Some(new_phone) = update.phone.as_deref() {
                let new_phone = new_phone.trim();
                if check_duplicates && new_phone != current_phone {
                    let taken = inner
                        .members
                        .iter()
                        .any(|m| m.id != id && m.phone.trim() == new_phone);
                    if taken {
                        return Err(AppError::DuplicatePhone(new_phone.to_string()));
                    }
                }
            }

            let member = inner
                .members
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;
            if let Some(name) = update.name {
                member.name = name.trim().to_string();
            }
            if let Some(phone) = update.phone {
                member.phone = phone.trim().to_string();
            }
            if let Some(is_used) = update.is_used {
                member.is_used = is_used;
            }
            if let Some(voucher_type) = update.voucher_type {
                member.voucher_type = voucher_type;
            }
            if let Some(is_vip) = update.is_vip {
                member.is_vip = is_vip;
            }
            if let Some(birthday_month) = update.birthday_month {
                member.birthday_month = normalize_birthday_month(&birthday_month);
            }
            if let Some(note) = update.note {
                member.note = note;
            }
            Ok(member.clone())
        })
    }

    pub fn get_member(&self, id: &str) -> Option<Member> {
        self.read(|inner| inner.members.iter().find(|m| m.id == id).cloned())
    }

    pub fn delete_member(&self, id: &str) -> Result<(), AppError> {
        if self.get_member(id).is_none() {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }
        self.mutate(|inner| inner.members.retain(|m| m.id != id));
        Ok(())
    }

    /// Clear all records and the store name.
    pub fn clear(&self) {
        self.mutate(|inner| {
            inner.members.clear();
            inner.store_name.clear();
        });
    }

    /// Case-insensitive name search, substring phone search.
    pub fn search(&self, term: &str) -> Vec<Member> {
        let needle = term.to_lowercase();
        self.read(|inner| {
            inner
                .members
                .iter()
                .filter(|m| m.name.to_lowercase().contains(&needle) || m.phone.contains(term))
                .cloned()
                .collect()
        })
    }

    /// Members whose birthday month matches (month given as "1".."12").
    pub fn birthday_members(&self, month: &str) -> Vec<Member> {
        self.read(|inner| {
            inner
                .members
                .iter()
                .filter(|m| m.birthday_month == month)
                .cloned()
                .collect()
        })
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, phone: &str) -> CandidateMember {
        CandidateMember {
            id: None,
            name: name.to_string(),
            phone: phone.to_string(),
            is_used: false,
            voucher_type: Default::default(),
            is_vip: false,
            birthday_month: None,
            note: None,
            created_at: None,
        }
    }

    #[test]
    fn test_add_single_duplicate_blocked() {
        let store = RecordStore::new();
        store.add_single(candidate("Alice", "0911000000"), true).unwrap();

        let err = store
            .add_single(candidate("Alias", "0911000000"), true)
            .unwrap_err();
        assert_eq!(err.error_code(), crate::errors::codes::DUPLICATE_PHONE);
        assert_eq!(store.len(), 1);

        // Dedupe bypassed: duplicate allowed
        store
            .add_single(candidate("Alias", "0911000000"), false)
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_merge_prepends_most_recent_first() {
        let store = RecordStore::new();
        store.add_single(candidate("Old", "0900000000"), true).unwrap();
        store.merge_import(
            vec![
                candidate("First", "0911000000"),
                candidate("Second", "0922000000"),
            ],
            "",
            MergePolicy::import(),
        );

        let names: Vec<String> = store.members().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["First", "Second", "Old"]);
    }

    #[test]
    fn test_store_name_adopted_only_when_empty() {
        let store = RecordStore::new();
        store.merge_import(vec![], "Imported", MergePolicy::import());
        assert_eq!(store.store_name(), "Imported");

        store.merge_import(vec![], "Other", MergePolicy::import());
        assert_eq!(store.store_name(), "Imported");
    }

    #[test]
    fn test_edit_phone_collision_rejected() {
        let store = RecordStore::new();
        let alice = store.add_single(candidate("Alice", "0911000000"), true).unwrap();
        store.add_single(candidate("Bob", "0922000000"), true).unwrap();

        let update = MemberUpdate {
            phone: Some("0922000000".to_string()),
            ..Default::default()
        };
        let err = store
            .update_member(&alice.id, update, true)
            .unwrap_err();
        assert_eq!(err.error_code(), crate::errors::codes::DUPLICATE_PHONE);
        // Original phone retained
        assert_eq!(store.get_member(&alice.id).unwrap().phone, "0911000000");
    }

    #[test]
    fn test_edit_own_phone_not_a_false_duplicate() {
        let store = RecordStore::new();
        let alice = store.add_single(candidate("Alice", "0911000000"), true).unwrap();

        // Saving the record with its own phone passes even with checking on
        let update = MemberUpdate {
            name: Some("Alice Chen".to_string()),
            phone: Some("0911000000".to_string()),
            ..Default::default()
        };
        let updated = store.update_member(&alice.id, update, true).unwrap();
        assert_eq!(updated.name, "Alice Chen");
    }

    #[test]
    fn test_search_and_birthday_queries() {
        let store = RecordStore::new();
        let mut c = candidate("Alice", "0911000000");
        c.birthday_month = Some("4".to_string());
        store.add_single(c, true).unwrap();
        store.add_single(candidate("Bob", "0922000000"), true).unwrap();

        assert_eq!(store.search("ali").len(), 1);
        assert_eq!(store.search("0922").len(), 1);
        assert_eq!(store.search("zzz").len(), 0);
        assert_eq!(store.birthday_members("4").len(), 1);
        assert_eq!(store.birthday_members("5").len(), 0);
    }

    #[test]
    fn test_clear_resets_everything() {
        let store = RecordStore::new();
        store.set_store_name("Corner".to_string());
        store.add_single(candidate("Alice", "0911000000"), true).unwrap();

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.store_name(), "");
    }

    #[test]
    fn test_revision_bumps_on_mutation() {
        let store = RecordStore::new();
        let rx = store.subscribe();
        assert_eq!(*rx.borrow(), 0);
        store.set_store_name("x".to_string());
        assert_eq!(*rx.borrow(), 1);
        store.add_single(candidate("Alice", "0911000000"), true).unwrap();
        assert_eq!(*rx.borrow(), 2);
    }
}
