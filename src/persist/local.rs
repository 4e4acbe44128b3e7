//! Local key-value store for guest mode.
//!
//! Two entries scoped to the device, mirroring the original browser storage:
//! a JSON-encoded member array and the plain store-name string.

use std::path::{Path, PathBuf};

use crate::errors::AppError;
use crate::models::{Member, Snapshot};

const MEMBERS_ENTRY: &str = "members.json";
const STORE_NAME_ENTRY: &str = "store-name.txt";

/// Guest-mode persistence rooted at the data directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    members_path: PathBuf,
    store_name_path: PathBuf,
}

impl LocalStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            members_path: data_dir.join(MEMBERS_ENTRY),
            store_name_path: data_dir.join(STORE_NAME_ENTRY),
        }
    }

    /// Load the guest snapshot. Missing entries load as empty; malformed
    /// JSON is treated as "nothing to restore" and logged.
    pub async fn load(&self) -> Snapshot {
        let members = match tokio::fs::read_to_string(&self.members_path).await {
            Ok(raw) => match serde_json::from_str::<Vec<Member>>(&raw) {
                Ok(members) => members,
                Err(e) => {
                    tracing::warn!("Discarding malformed local member data: {}", e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        let store_name = tokio::fs::read_to_string(&self.store_name_path)
            .await
            .unwrap_or_default();

        Snapshot::new(store_name, members)
    }

    /// Write both entries from the snapshot.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        if let Some(parent) = self.members_path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }

        let members_json = serde_json::to_string(&snapshot.members)?;
        tokio::fs::write(&self.members_path, members_json).await?;
        tokio::fs::write(&self.store_name_path, &snapshot.store_name).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateMember, VoucherType};
    use crate::store::{MergePolicy, RecordStore};

    fn sample_snapshot() -> Snapshot {
        let store = RecordStore::new();
        store.set_store_name("Corner".to_string());
        store.merge_import(
            vec![CandidateMember {
                id: None,
                name: "Alice".to_string(),
                phone: "0911000000".to_string(),
                is_used: false,
                voucher_type: VoucherType::Paper,
                is_vip: true,
                birthday_month: Some("4".to_string()),
                note: Some("note".to_string()),
                created_at: None,
            }],
            "",
            MergePolicy::import(),
        );
        store.snapshot()
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalStore::new(dir.path());

        let snapshot = sample_snapshot();
        local.save(&snapshot).await.unwrap();
        let loaded = local.load().await;
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn test_missing_entries_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalStore::new(dir.path());
        let loaded = local.load().await;
        assert_eq!(loaded, Snapshot::default());
    }

    #[tokio::test]
    async fn test_malformed_members_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("members.json"), "{broken")
            .await
            .unwrap();
        let local = LocalStore::new(dir.path());
        let loaded = local.load().await;
        assert!(loaded.members.is_empty());
    }

    #[tokio::test]
    async fn test_double_save_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalStore::new(dir.path());

        let snapshot = sample_snapshot();
        local.save(&snapshot).await.unwrap();
        let first = tokio::fs::read(dir.path().join("members.json")).await.unwrap();
        local.save(&snapshot).await.unwrap();
        let second = tokio::fs::read(dir.path().join("members.json")).await.unwrap();
        assert_eq!(first, second);
    }
}
