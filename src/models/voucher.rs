//! Voucher model and the shape returned by voucher extraction.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{generate_id, VoucherType};

/// A standalone voucher record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub code: String,
    pub r#type: VoucherType,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub is_used: bool,
    #[serde(default)]
    pub created_at: i64,
}

/// Voucher fields as returned by the extraction service.
///
/// The service is only required to produce a title; an absent or
/// unrecognized type falls back to `Electronic`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedVoucher {
    pub title: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(
        default = "default_voucher_type",
        deserialize_with = "voucher_type_or_electronic"
    )]
    pub r#type: VoucherType,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<ParsedVoucher> for Voucher {
    fn from(parsed: ParsedVoucher) -> Self {
        Self {
            id: generate_id(),
            title: parsed.title,
            code: parsed.code.unwrap_or_default(),
            r#type: parsed.r#type,
            notes: parsed.notes.unwrap_or_default(),
            is_used: false,
            created_at: Utc::now().timestamp_millis(),
        }
    }
}

fn default_voucher_type() -> VoucherType {
    VoucherType::Electronic
}

fn voucher_type_or_electronic<'de, D>(deserializer: D) -> Result<VoucherType, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some("NONE") => VoucherType::None,
        Some("PAPER") => VoucherType::Paper,
        _ => VoucherType::Electronic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_voucher_type_fallback() {
        let parsed: ParsedVoucher =
            serde_json::from_str(r#"{"title": "Coffee", "type": "GOLD"}"#).unwrap();
        assert_eq!(parsed.r#type, VoucherType::Electronic);

        let parsed: ParsedVoucher = serde_json::from_str(r#"{"title": "Coffee"}"#).unwrap();
        assert_eq!(parsed.r#type, VoucherType::Electronic);

        let parsed: ParsedVoucher =
            serde_json::from_str(r#"{"title": "Coffee", "type": "PAPER"}"#).unwrap();
        assert_eq!(parsed.r#type, VoucherType::Paper);
    }

    #[test]
    fn test_voucher_from_parsed() {
        let parsed: ParsedVoucher =
            serde_json::from_str(r#"{"title": "Coffee", "code": "ABC123"}"#).unwrap();
        let voucher = Voucher::from(parsed);
        assert!(!voucher.id.is_empty());
        assert_eq!(voucher.code, "ABC123");
        assert_eq!(voucher.r#type, VoucherType::Electronic);
        assert!(!voucher.is_used);
        assert!(voucher.created_at > 0);
    }
}
