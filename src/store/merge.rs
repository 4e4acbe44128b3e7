//! Import/merge resolver.
//!
//! Pure candidate-batch resolution: normalize inbound records to the
//! canonical member shape and apply phone-number de-duplication.

use std::collections::HashSet;

use chrono::Utc;

use crate::models::{generate_id, normalize_birthday_month, CandidateMember, Member};

/// How a batch of candidates is folded into the collection.
#[derive(Debug, Clone, Copy)]
pub struct MergePolicy {
    /// Drop candidates whose phone already exists in the collection or
    /// appeared earlier in the same batch
    pub dedupe_by_phone: bool,
    /// Discard inbound identifiers and assign fresh ones (share links must
    /// never collide with local identifiers)
    pub regenerate_ids: bool,
}

impl MergePolicy {
    /// Default policy for batch import: de-duplication on, ids kept.
    pub fn import() -> Self {
        Self {
            dedupe_by_phone: true,
            regenerate_ids: false,
        }
    }

    /// Policy for decoded share links: de-duplication on, ids regenerated.
    pub fn share_link() -> Self {
        Self {
            dedupe_by_phone: true,
            regenerate_ids: true,
        }
    }

    pub fn keep_duplicates(mut self) -> Self {
        self.dedupe_by_phone = false;
        self
    }
}

/// Result of resolving one candidate batch.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Surviving records, in batch order
    pub accepted: Vec<Member>,
    /// Candidates dropped as duplicates
    pub duplicates: usize,
}

impl MergeOutcome {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    /// Nothing survived and duplicates were the cause (reported distinctly
    /// from "no parseable input").
    pub fn all_duplicates(&self) -> bool {
        self.accepted.is_empty() && self.duplicates > 0
    }
}

/// Resolve a candidate batch against the phones already in the collection.
///
/// Candidates lacking an identifier get a fresh one; names and phones are
/// trimmed; birthday months outside "1".."12" are cleared.
pub fn resolve(
    existing_phones: &HashSet<String>,
    candidates: Vec<CandidateMember>,
    policy: MergePolicy,
) -> MergeOutcome {
    let mut accepted = Vec::new();
    let mut seen_phones: HashSet<String> = HashSet::new();
    let mut duplicates = 0;

    for candidate in candidates {
        let phone = candidate.phone.trim().to_string();

        if policy.dedupe_by_phone {
            if existing_phones.contains(&phone) || seen_phones.contains(&phone) {
                duplicates += 1;
                continue;
            }
        }
        seen_phones.insert(phone.clone());

        let id = if policy.regenerate_ids {
            generate_id()
        } else {
            candidate
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(generate_id)
        };

        accepted.push(Member {
            id,
            name: candidate.name.trim().to_string(),
            phone,
            is_used: candidate.is_used,
            voucher_type: candidate.voucher_type,
            is_vip: candidate.is_vip,
            birthday_month: normalize_birthday_month(
                candidate.birthday_month.as_deref().unwrap_or(""),
            ),
            note: candidate.note.unwrap_or_default(),
            created_at: candidate
                .created_at
                .unwrap_or_else(|| Utc::now().timestamp_millis()),
        });
    }

    MergeOutcome {
        accepted,
        duplicates,
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
    fn test_fresh_batch_all_accepted() {
        let outcome = resolve(
            &HashSet::new(),
            vec![
                candidate("Alice", "0911000000"),
                candidate("Bob", "0922000000"),
            ],
            MergePolicy::import(),
        );
        assert_eq!(outcome.accepted_count(), 2);
        assert_eq!(outcome.duplicates, 0);
    }

    #[test]
    fn test_existing_phone_dropped() {
        let existing: HashSet<String> = ["0911000000".to_string()].into_iter().collect();
        let outcome = resolve(
            &existing,
            vec![
                candidate("Alice", "0911000000"),
                candidate("Bob", "0922000000"),
            ],
            MergePolicy::import(),
        );
        assert_eq!(outcome.accepted_count(), 1);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.accepted[0].name, "Bob");
    }

    #[test]
    fn test_in_batch_duplicate_dropped() {
        let outcome = resolve(
            &HashSet::new(),
            vec![
                candidate("Alice", "0911000000"),
                candidate("Alias", " 0911000000 "),
            ],
            MergePolicy::import(),
        );
        assert_eq!(outcome.accepted_count(), 1);
        assert_eq!(outcome.duplicates, 1);
    }

    #[test]
    fn test_all_duplicates_reported_distinctly() {
        let existing: HashSet<String> = ["0911000000".to_string()].into_iter().collect();
        let outcome = resolve(
            &existing,
            vec![candidate("Alice", "0911000000")],
            MergePolicy::import(),
        );
        assert!(outcome.all_duplicates());

        let empty = resolve(&existing, vec![], MergePolicy::import());
        assert!(!empty.all_duplicates());
    }

    #[test]
    fn test_dedupe_disabled_keeps_everything() {
        let existing: HashSet<String> = ["0911000000".to_string()].into_iter().collect();
        let outcome = resolve(
            &existing,
            vec![
                candidate("Alice", "0911000000"),
                candidate("Alias", "0911000000"),
            ],
            MergePolicy::import().keep_duplicates(),
        );
        assert_eq!(outcome.accepted_count(), 2);
        assert_eq!(outcome.duplicates, 0);
    }

    #[test]
    fn test_id_assignment_and_regeneration() {
        let mut with_id = candidate("Alice", "0911000000");
        with_id.id = Some("keep-me".to_string());

        let kept = resolve(
            &HashSet::new(),
            vec![with_id.clone()],
            MergePolicy::import(),
        );
        assert_eq!(kept.accepted[0].id, "keep-me");

        let regenerated = resolve(&HashSet::new(), vec![with_id], MergePolicy::share_link());
        assert_ne!(regenerated.accepted[0].id, "keep-me");
        assert!(!regenerated.accepted[0].id.is_empty());
    }

    #[test]
    fn test_birthday_month_normalized() {
        let mut c = candidate("Alice", "0911000000");
        c.birthday_month = Some("13".to_string());
        let outcome = resolve(&HashSet::new(), vec![c], MergePolicy::import());
        assert_eq!(outcome.accepted[0].birthday_month, "");
    }
}
