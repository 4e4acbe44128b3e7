//! Text/image extraction client.
//!
//! Thin wrapper over a generative AI API that turns unstructured text or an
//! image into candidate records. Any failure (quota, network, malformed
//! response) yields an empty result. Candidates are never trusted as
//! de-duplicated; the merge resolver always re-applies its policy.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::{CandidateMember, ParsedVoucher};

const MEMBER_PROMPT: &str = "Parse the following text into a list of members.\n\
The input is likely a list where each line contains a Name and a Phone Number.\n\
\n\
Extraction Rules:\n\
1. Name: Extract the person's name.\n\
2. Phone: Extract the mobile number (e.g., 09xxxxxxxx).\n\
3. Birthday: If there is a date like (04/25), extract the month \"4\" as birthdayMonth.\n\
4. Note: Keep the original date string or extra text in 'note'.";

const VOUCHER_PROMPT: &str = "Parse the following text into a voucher object.\n\
Extract title, code, type (ELECTRONIC or PAPER), and notes.";

/// Client for the extraction service.
#[derive(Clone)]
pub struct ExtractionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl ExtractionClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Extract candidate records from free text. Empty on any failure.
    pub async fn parse_members_from_text(&self, text: &str) -> Vec<CandidateMember> {
        let parts = vec![json!({ "text": format!("{}\n\nInput Text:\n{}", MEMBER_PROMPT, text) })];
        match self.generate(parts, member_schema()).await {
            Some(raw) => parse_member_list(&raw),
            None => Vec::new(),
        }
    }

    /// Extract candidate records from image bytes. Empty on any failure.
    pub async fn parse_members_from_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Vec<CandidateMember> {
        let parts = vec![
            json!({ "text": MEMBER_PROMPT }),
            json!({
                "inline_data": {
                    "mime_type": mime_type,
                    "data": BASE64.encode(image),
                }
            }),
        ];
        match self.generate(parts, member_schema()).await {
            Some(raw) => parse_member_list(&raw),
            None => Vec::new(),
        }
    }

    /// Extract a single voucher from free text. `None` on any failure.
    pub async fn parse_voucher_from_text(&self, text: &str) -> Option<ParsedVoucher> {
        let parts = vec![json!({ "text": format!("{}\n\nInput Text:\n{}", VOUCHER_PROMPT, text) })];
        let raw = self.generate(parts, voucher_schema()).await?;
        match serde_json::from_str::<ParsedVoucher>(&raw) {
            Ok(voucher) => Some(voucher),
            Err(e) => {
                tracing::error!("Voucher extraction returned malformed JSON: {}", e);
                None
            }
        }
    }

    /// Run one generateContent call, returning the first candidate's text.
    async fn generate(&self, parts: Vec<Value>, response_schema: Value) -> Option<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema,
            }
        });

        let response = match self.http.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Extraction request failed: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::error!("Extraction service returned status {}", response.status());
            return None;
        }

        let body: GenerateResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Extraction response was not valid JSON: {}", e);
                return None;
            }
        };
        let text = body
            .candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .next()?
            .text;
        if text.is_empty() {
            return None;
        }
        Some(text)
    }
}

fn parse_member_list(raw: &str) -> Vec<CandidateMember> {
    match serde_json::from_str(raw) {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::error!("Member extraction returned malformed JSON: {}", e);
            Vec::new()
        }
    }
}

fn member_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": { "type": "STRING" },
                "phone": { "type": "STRING" },
                "birthdayMonth": {
                    "type": "STRING",
                    "description": "1-12 without leading zero if possible, or empty"
                },
                "note": { "type": "STRING" }
            },
            "required": ["name", "phone"]
        }
    })
}

fn voucher_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "code": { "type": "STRING" },
            "type": { "type": "STRING", "enum": ["NONE", "ELECTRONIC", "PAPER"] },
            "notes": { "type": "STRING" }
        },
        "required": ["title"]
    })
}
