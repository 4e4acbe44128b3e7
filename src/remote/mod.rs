//! Remote account client.
//!
//! Thin wrapper over a Supabase-style REST API: password auth plus one
//! account-scoped snapshot row, upserted last-write-wins. Data calls require
//! a session; callers check `current_session` first.

use std::path::{Path, PathBuf};

use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::errors::AppError;
use crate::models::{Session, Snapshot};

const SESSION_ENTRY: &str = "session.json";

/// Client for the remote authentication and storage API.
#[derive(Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<AuthUser>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    #[serde(default)]
    members: Vec<crate::models::Member>,
    #[serde(default)]
    store_name: String,
}

impl RemoteClient {
    pub fn new(base_url: &str, anon_key: &str, data_dir: &Path) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            session_path: data_dir.join(SESSION_ENTRY),
        }
    }

    // ==================== AUTH ====================

    /// Register a new account and persist the resulting session.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        self.auth_request(&url, email, password).await
    }

    /// Sign in with the password grant and persist the resulting session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        self.auth_request(&url, email, password).await
    }

    async fn auth_request(
        &self,
        url: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Auth("Email and password are required".to_string()));
        }

        let response = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let body: AuthErrorBody = response.json().await.unwrap_or_default();
            let message = body
                .error_description
                .or(body.msg)
                .or(body.message)
                .unwrap_or_else(|| "Authentication failed".to_string());
            return Err(AppError::Auth(message));
        }

        let body: AuthResponse = response.json().await?;
        let user = body
            .user
            .ok_or_else(|| AppError::Auth("Authentication failed".to_string()))?;

        let session = Session {
            username: user.email.unwrap_or_else(|| email.to_string()),
            user_id: user.id,
            token: body.access_token.unwrap_or_else(|| "temp-token".to_string()),
        };
        self.persist_session(&session).await?;
        Ok(session)
    }

    /// Sign out: clear the persisted session and notify the provider
    /// best-effort.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        if let Some(session) = self.current_session().await {
            let url = format!("{}/auth/v1/logout", self.base_url);
            let result = self
                .http
                .post(&url)
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.token)
                .send()
                .await;
            if let Err(e) = result {
                tracing::warn!("Provider sign-out failed: {}", e);
            }
        }
        match tokio::fs::remove_file(&self.session_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Re-derive the session persisted at sign-in, if any.
    pub async fn current_session(&self) -> Option<Session> {
        let raw = tokio::fs::read_to_string(&self.session_path).await.ok()?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("Discarding malformed persisted session: {}", e);
                None
            }
        }
    }

    async fn persist_session(&self, session: &Session) -> Result<(), AppError> {
        if let Some(parent) = self.session_path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        let raw = serde_json::to_string(session)?;
        tokio::fs::write(&self.session_path, raw).await?;
        Ok(())
    }

    // ==================== SNAPSHOT ROW ====================

    /// Fetch the stored snapshot for the session's account. A brand-new
    /// account with no row yields an empty snapshot.
    pub async fn fetch_snapshot(&self, session: &Session) -> Result<Snapshot, AppError> {
        let url = format!(
            "{}/rest/v1/user_data?select=members,store_name&user_id=eq.{}",
            self.base_url, session.user_id
        );
        let response = self
            .http
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::NoSession);
        }
        if !response.status().is_success() {
            return Err(AppError::Remote(format!(
                "Snapshot fetch failed with status {}",
                response.status()
            )));
        }

        let mut rows: Vec<SnapshotRow> = response.json().await?;
        Ok(match rows.pop() {
            Some(row) => Snapshot::new(row.store_name, row.members),
            None => Snapshot::default(),
        })
    }

    /// Upsert the snapshot row for the session's account (one row per
    /// account, last-write-wins).
    pub async fn upsert_snapshot(
        &self,
        session: &Session,
        snapshot: &Snapshot,
    ) -> Result<(), AppError> {
        let url = format!("{}/rest/v1/user_data", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Prefer", "resolution=merge-duplicates")
            .bearer_auth(&session.token)
            .json(&json!({
                "user_id": session.user_id,
                "members": snapshot.members,
                "store_name": snapshot.store_name,
                "updated_at": Utc::now().to_rfc3339(),
            }))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::NoSession);
        }
        if !response.status().is_success() {
            return Err(AppError::Remote(format!(
                "Snapshot upsert failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
