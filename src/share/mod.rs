//! Shareable-link codec.
//!
//! Serializes a snapshot to a compact, URL-safe token (JSON, raw deflate,
//! unpadded url-safe base64) carried in a `data` query parameter. Decoding
//! is lossless; any malformed token is ignored rather than surfaced.

use std::io::{Read, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::errors::AppError;
use crate::models::{ImportDocument, Snapshot};

/// Query parameter carrying the encoded snapshot.
pub const SHARE_PARAM: &str = "data";

/// Encode a share link for the snapshot.
///
/// Refuses an empty collection, and refuses links longer than `max_len`
/// (the caller should point the user at file export instead). The
/// collection itself is never modified.
pub fn encode_share_link(
    snapshot: &Snapshot,
    base_url: &str,
    max_len: usize,
) -> Result<String, AppError> {
    if snapshot.members.is_empty() {
        return Err(AppError::Validation("No records to share".to_string()));
    }

    let json = serde_json::to_vec(snapshot)?;
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;
    let token = URL_SAFE_NO_PAD.encode(compressed);

    let url = format!("{}?{}={}", base_url.trim_end_matches('/'), SHARE_PARAM, token);
    if url.len() > max_len {
        return Err(AppError::LinkTooLong {
            length: url.len(),
            max: max_len,
        });
    }
    Ok(url)
}

/// Decode the `data` token of a share link. Returns `None` on any decode or
/// parse failure (the parameter is then silently ignored).
pub fn decode_share_param(token: &str) -> Option<ImportDocument> {
    let compressed = match URL_SAFE_NO_PAD.decode(token.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("Ignoring share token with invalid base64: {}", e);
            return None;
        }
    };

    let mut json = Vec::new();
    if let Err(e) = DeflateDecoder::new(compressed.as_slice()).read_to_end(&mut json) {
        tracing::debug!("Ignoring share token with invalid compression: {}", e);
        return None;
    }

    let text = String::from_utf8(json).ok()?;
    match ImportDocument::from_json(&text) {
        Ok(document) => Some(document),
        Err(e) => {
            tracing::debug!("Ignoring share token with invalid payload: {}", e);
            None
        }
    }
}

/// Extract the share token from a full URL, or accept a bare token.
pub fn share_param_from_url(input: &str) -> Option<&str> {
    match input.split_once('?') {
        Some((_, query)) => query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == SHARE_PARAM).then_some(value)
        }),
        None => Some(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Member, VoucherType};

    fn sample_snapshot() -> Snapshot {
        Snapshot::new(
            "Corner Shop".to_string(),
            vec![Member {
                id: "abc".to_string(),
                name: "Alice".to_string(),
                phone: "0911000000".to_string(),
                is_used: false,
                voucher_type: VoucherType::Electronic,
                is_vip: true,
                birthday_month: "4".to_string(),
                note: "(04/25)".to_string(),
                created_at: 1700000000000,
            }],
        )
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let snapshot = sample_snapshot();
        let url = encode_share_link(&snapshot, "https://checkout-swift.app", 8000).unwrap();

        let token = share_param_from_url(&url).unwrap();
        let decoded = decode_share_param(token).unwrap();

        assert_eq!(decoded.store_name, snapshot.store_name);
        assert_eq!(decoded.candidates.len(), 1);
        let candidate = &decoded.candidates[0];
        assert_eq!(candidate.name, "Alice");
        assert_eq!(candidate.phone, "0911000000");
        assert_eq!(candidate.birthday_month.as_deref(), Some("4"));
        assert_eq!(candidate.voucher_type, VoucherType::Electronic);
        assert_eq!(candidate.created_at, Some(1700000000000));
    }

    #[test]
    fn test_oversized_link_refused() {
        let snapshot = sample_snapshot();
        let err = encode_share_link(&snapshot, "https://checkout-swift.app", 40).unwrap_err();
        assert_eq!(err.error_code(), crate::errors::codes::LINK_TOO_LONG);
    }

    #[test]
    fn test_empty_collection_refused() {
        let err =
            encode_share_link(&Snapshot::default(), "https://checkout-swift.app", 8000)
                .unwrap_err();
        assert_eq!(err.error_code(), crate::errors::codes::VALIDATION_ERROR);
    }

    #[test]
    fn test_malformed_tokens_ignored() {
        assert!(decode_share_param("!!!not-base64!!!").is_none());
        // Valid base64, not deflate
        assert!(decode_share_param(&URL_SAFE_NO_PAD.encode(b"plain text")).is_none());
        // Valid deflate, not a snapshot document
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(b"{\"foo\": 1}").unwrap();
        let token = URL_SAFE_NO_PAD.encode(encoder.finish().unwrap());
        assert!(decode_share_param(&token).is_none());
    }

    #[test]
    fn test_share_param_extraction() {
        assert_eq!(
            share_param_from_url("https://x.app?data=abc&y=1"),
            Some("abc")
        );
        assert_eq!(share_param_from_url("https://x.app?y=1&data=abc"), Some("abc"));
        assert_eq!(share_param_from_url("raw-token"), Some("raw-token"));
        assert_eq!(share_param_from_url("https://x.app?y=1"), None);
    }
}
