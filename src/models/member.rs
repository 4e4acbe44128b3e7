//! Member record model matching the original JSON documents.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Redemption medium for a member's voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherType {
    #[default]
    None,
    Electronic,
    Paper,
}

/// A tracked customer/checkout record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    /// Natural de-duplication key during merges; not enforced unique otherwise
    pub phone: String,
    #[serde(default)]
    pub is_used: bool,
    #[serde(default)]
    pub voucher_type: VoucherType,
    #[serde(default)]
    pub is_vip: bool,
    /// "1".."12", or "" when not set
    #[serde(default)]
    pub birthday_month: String,
    #[serde(default)]
    pub note: String,
    /// Unix millis at creation
    #[serde(default)]
    pub created_at: i64,
}

/// Inbound candidate record from file import, share link or AI extraction.
///
/// Everything except name and phone is optional; the merge resolver fills in
/// defaults and assigns an identifier when one is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMember {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub is_used: bool,
    #[serde(default)]
    pub voucher_type: VoucherType,
    #[serde(default)]
    pub is_vip: bool,
    #[serde(default)]
    pub birthday_month: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl From<Member> for CandidateMember {
    fn from(member: Member) -> Self {
        Self {
            id: Some(member.id),
            name: member.name,
            phone: member.phone,
            is_used: member.is_used,
            voucher_type: member.voucher_type,
            is_vip: member.is_vip,
            birthday_month: Some(member.birthday_month),
            note: Some(member.note),
            created_at: Some(member.created_at),
        }
    }
}

/// Partial update applied to an existing member; `None` fields are left as-is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_used: Option<bool>,
    #[serde(default)]
    pub voucher_type: Option<VoucherType>,
    #[serde(default)]
    pub is_vip: Option<bool>,
    #[serde(default)]
    pub birthday_month: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Generate a fresh opaque record identifier.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Normalize a birthday-month value: "1".."12" pass through, anything else
/// becomes "" (not set).
pub fn normalize_birthday_month(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed.parse::<u8>() {
        Ok(month) if (1..=12).contains(&month) => month.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_birthday_month_valid() {
        assert_eq!(normalize_birthday_month("4"), "4");
        assert_eq!(normalize_birthday_month("12"), "12");
        assert_eq!(normalize_birthday_month(" 04 "), "4");
    }

    #[test]
    fn test_birthday_month_invalid() {
        assert_eq!(normalize_birthday_month(""), "");
        assert_eq!(normalize_birthday_month("0"), "");
        assert_eq!(normalize_birthday_month("13"), "");
        assert_eq!(normalize_birthday_month("April"), "");
    }

    #[test]
    fn test_member_json_shape() {
        let json = r#"{
            "id": "abc",
            "name": "Alice",
            "phone": "0911000000",
            "isUsed": false,
            "voucherType": "ELECTRONIC",
            "isVip": true,
            "birthdayMonth": "4",
            "note": "(04/25)",
            "createdAt": 1700000000000
        }"#;
        let member: Member = serde_json::from_str(json).unwrap();
        assert_eq!(member.voucher_type, VoucherType::Electronic);
        assert!(member.is_vip);
        assert_eq!(member.birthday_month, "4");

        let out = serde_json::to_value(&member).unwrap();
        assert_eq!(out["voucherType"], "ELECTRONIC");
        assert_eq!(out["createdAt"], 1700000000000i64);
    }

    #[test]
    fn test_candidate_defaults() {
        // AI extraction returns only name/phone (+ optional month/note)
        let json = r#"{"name": "Bob", "phone": "0922000000"}"#;
        let candidate: CandidateMember = serde_json::from_str(json).unwrap();
        assert!(candidate.id.is_none());
        assert_eq!(candidate.voucher_type, VoucherType::None);
        assert!(!candidate.is_vip);
        assert!(candidate.birthday_month.is_none());
    }
}
