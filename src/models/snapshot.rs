//! Snapshot document: the export/import file format, the remote row payload
//! and the share-link payload.

use serde::{Deserialize, Serialize};

use super::{CandidateMember, Member};
use crate::errors::AppError;

/// The full persisted state: a store name plus the member collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub store_name: String,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Snapshot {
    pub fn new(store_name: String, members: Vec<Member>) -> Self {
        Self {
            store_name,
            members,
        }
    }

    /// Serialize to the export file format (pretty-printed JSON).
    pub fn to_export_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Suggested export file name, e.g. `checkout-members-MyStore-2026-08-27.json`.
    pub fn export_file_name(&self, date: chrono::NaiveDate) -> String {
        let safe_name = if self.store_name.is_empty() {
            String::new()
        } else {
            format!("-{}", self.store_name)
        };
        format!("checkout-members{}-{}.json", safe_name, date)
    }
}

/// An inbound document from file import or a decoded share link.
///
/// Accepts either `{ "storeName": ..., "members": [...] }` or, for backward
/// compatibility, a bare JSON array of members (store name treated as "").
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum InboundDocument {
    Document {
        #[serde(default, rename = "storeName")]
        store_name: String,
        members: Vec<CandidateMember>,
    },
    BareArray(Vec<CandidateMember>),
}

/// Parsed import payload: candidate records plus the store name carried along.
#[derive(Debug, Clone)]
pub struct ImportDocument {
    pub store_name: String,
    pub candidates: Vec<CandidateMember>,
}

impl ImportDocument {
    /// Parse an import payload from JSON text.
    pub fn from_json(text: &str) -> Result<Self, AppError> {
        let document: InboundDocument = serde_json::from_str(text)
            .map_err(|e| AppError::BadData(format!("Unrecognized import format: {}", e)))?;
        Ok(match document {
            InboundDocument::Document {
                store_name,
                members,
            } => Self {
                store_name,
                candidates: members,
            },
            InboundDocument::BareArray(members) => Self {
                store_name: String::new(),
                candidates: members,
            },
        })
    }
}
