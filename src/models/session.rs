//! Account session model.

use serde::{Deserialize, Serialize};

/// An authenticated account session.
///
/// Created on sign-in, persisted in the data dir, re-derived on startup and
/// cleared on sign-out. The token is opaque to this application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Display identifier (the account email)
    pub username: String,
    /// Account identifier addressing the remote snapshot row
    pub user_id: String,
    /// Opaque access token
    pub token: String,
}
