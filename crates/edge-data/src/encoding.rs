//! Response encoding normalization.
//!
//! Origins frequently serve JSON without a charset, sometimes with a leading
//! byte-order mark. [`normalize`] strips the mark and declares the charset on
//! the Content-Type so downstream caches and clients decode the body the same
//! way.

use std::fmt;

use edge_core::EdgeResponse;

/// Recognized byte-order marks, checked in order.
const BOMS: [(&[u8], Charset); 3] = [
    (&[0xEF, 0xBB, 0xBF], Charset::Utf8),
    (&[0xFE, 0xFF], Charset::Utf16Be),
    (&[0xFF, 0xFE], Charset::Utf16Le),
];

/// Bodies shorter than this are not inspected.
pub const MIN_INSPECT_LEN: usize = 3;

/// Charset detected from a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Utf16Be,
    Utf16Le,
}

impl Charset {
    /// The `charset=` parameter value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16Be => "utf-16be",
            Self::Utf16Le => "utf-16le",
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of inspecting the leading bytes of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BomDetection {
    /// Detected (or assumed) charset.
    pub charset: Charset,
    /// Number of leading bytes occupied by the mark.
    pub bom_len: usize,
}

/// Inspect up to the first three bytes of `body`.
///
/// Returns `None` when the body is too short to inspect.
pub fn detect_bom(body: &[u8]) -> Option<BomDetection> {
    if body.len() < MIN_INSPECT_LEN {
        return None;
    }

    let (bom_len, charset) = BOMS
        .iter()
        .find(|(bom, _)| body.starts_with(bom))
        .map_or((0, Charset::Utf8), |&(bom, charset)| (bom.len(), charset));

    Some(BomDetection { charset, bom_len })
}

/// What the normalizer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeOutcome {
    /// Content-Type already declared a charset; nothing inspected.
    Declared,
    /// Body inspected.
    Detected(BomDetection),
    /// Body too short to inspect; utf-8 assumed, body untouched.
    Truncated,
}

/// A response with any byte-order mark stripped and its charset declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedResponse {
    /// The rewritten response.
    pub response: EdgeResponse,
    /// How the charset was settled.
    pub outcome: NormalizeOutcome,
}

impl NormalizedResponse {
    /// Unwrap the response.
    pub fn into_response(self) -> EdgeResponse {
        self.response
    }
}

/// Whether a Content-Type already carries a `charset=` parameter.
pub fn declares_charset(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("charset=")
}

/// Normalize a response's encoding.
///
/// The input is left untouched; the returned response owns a copy of the
/// body. Status always passes through unchanged.
pub fn normalize(response: &EdgeResponse) -> NormalizedResponse {
    if response.content_type().is_some_and(declares_charset) {
        return NormalizedResponse {
            response: response.clone(),
            outcome: NormalizeOutcome::Declared,
        };
    }

    let mut normalized = response.clone();
    let (charset, outcome) = match detect_bom(&response.body) {
        Some(detection) => {
            if detection.bom_len > 0 {
                normalized.body.drain(..detection.bom_len);
                // The origin's framing no longer matches the body.
                normalized.remove_header(http::header::CONTENT_LENGTH.as_str());
            }
            (detection.charset, NormalizeOutcome::Detected(detection))
        }
        None => (Charset::Utf8, NormalizeOutcome::Truncated),
    };

    if let Some(content_type) = stamped_content_type(response.content_type(), charset) {
        normalized.set_header(http::header::CONTENT_TYPE.as_str(), content_type);
    }

    NormalizedResponse {
        response: normalized,
        outcome,
    }
}

/// The rewritten Content-Type, or `None` to leave the header alone.
///
/// A blank header counts as missing.
fn stamped_content_type(content_type: Option<&str>, charset: Charset) -> Option<String> {
    let Some(content_type) = content_type.filter(|ct| !ct.trim().is_empty()) else {
        return Some(format!("application/json; charset={charset}"));
    };

    let base = content_type.split(';').next().unwrap_or_default().trim();
    let lower = base.to_ascii_lowercase();
    if lower == "application/json" || lower.starts_with("text/") {
        Some(format!("{base}; charset={charset}"))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(body: &[u8]) -> EdgeResponse {
        EdgeResponse::new(200)
            .with_header("Content-Type", "application/json")
            .with_body(body.to_vec())
    }

    // === Declared charset ===

    #[test]
    fn test_declared_charset_passes_through() {
        let original = EdgeResponse::new(200)
            .with_header("Content-Type", "application/json; charset=gbk")
            .with_body(vec![0xEF, 0xBB, 0xBF, b'{', b'}']);

        let normalized = normalize(&original);
        assert_eq!(normalized.outcome, NormalizeOutcome::Declared);
        assert_eq!(normalized.response, original);
    }

    #[test]
    fn test_charset_check_is_case_insensitive() {
        let original =
            EdgeResponse::new(200).with_header("Content-Type", "text/plain; Charset=ISO-8859-1");
        assert_eq!(normalize(&original).outcome, NormalizeOutcome::Declared);
    }

    // === BOM detection ===

    #[test]
    fn test_utf8_bom_stripped() {
        let normalized = normalize(&json(&[0xEF, 0xBB, 0xBF, b'{', b'}']));
        assert_eq!(normalized.response.body, b"{}");
        assert_eq!(
            normalized.response.content_type(),
            Some("application/json; charset=utf-8")
        );
    }

    #[test]
    fn test_bom_strip_drops_stale_content_length() {
        let original = json(&[0xEF, 0xBB, 0xBF, b'{', b'}']).with_header("Content-Length", "5");
        let normalized = normalize(&original).into_response();
        assert_eq!(normalized.body, b"{}");
        assert_eq!(normalized.header("Content-Length"), None);
    }

    #[test]
    fn test_content_length_kept_without_bom() {
        let original = json(br#"{"a":1}"#).with_header("Content-Length", "7");
        assert_eq!(normalize(&original).response.header("content-length"), Some("7"));
    }

    #[test]
    fn test_utf16_le_bom_stripped() {
        let normalized = normalize(&json(&[0xFF, 0xFE, b'{', 0x00]));
        assert_eq!(normalized.response.body, vec![b'{', 0x00]);
        assert_eq!(
            normalized.response.content_type(),
            Some("application/json; charset=utf-16le")
        );
    }

    #[test]
    fn test_utf16_be_bom_stripped() {
        let normalized = normalize(&json(&[0xFE, 0xFF, 0x00, b'{']));
        assert_eq!(normalized.response.body, vec![0x00, b'{']);
        assert_eq!(
            normalized.response.content_type(),
            Some("application/json; charset=utf-16be")
        );
    }

    #[test]
    fn test_no_bom_defaults_to_utf8() {
        let normalized = normalize(&json(br#"{"a":1}"#));
        assert_eq!(normalized.response.body, br#"{"a":1}"#);
        assert_eq!(
            normalized.outcome,
            NormalizeOutcome::Detected(BomDetection {
                charset: Charset::Utf8,
                bom_len: 0,
            })
        );
    }

    #[test]
    fn test_short_body_is_not_inspected() {
        let normalized = normalize(&json(&[0xFF, 0xFE]));
        assert_eq!(normalized.outcome, NormalizeOutcome::Truncated);
        assert_eq!(normalized.response.body, vec![0xFF, 0xFE]);
        assert_eq!(
            normalized.response.content_type(),
            Some("application/json; charset=utf-8")
        );
    }

    // === Content-Type rewrite ===

    #[test]
    fn test_missing_content_type_becomes_json() {
        let original = EdgeResponse::new(200).with_body(br#"{"a":1}"#.to_vec());
        let normalized = normalize(&original);
        assert_eq!(
            normalized.response.content_type(),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(normalized.response.status, 200);
    }

    #[test]
    fn test_blank_content_type_becomes_json() {
        for blank in ["", "   "] {
            let original = EdgeResponse::new(200)
                .with_header("Content-Type", blank)
                .with_body(br#"{"a":1}"#.to_vec());
            assert_eq!(
                normalize(&original).response.content_type(),
                Some("application/json; charset=utf-8")
            );
        }
    }

    #[test]
    fn test_text_subtype_keeps_base_and_drops_params() {
        let original = EdgeResponse::new(200)
            .with_header("Content-Type", "text/html; boundary=x")
            .with_body(b"<p>hi</p>".to_vec());
        assert_eq!(
            normalize(&original).response.content_type(),
            Some("text/html; charset=utf-8")
        );
    }

    #[test]
    fn test_opaque_type_left_alone() {
        let original = EdgeResponse::new(200)
            .with_header("Content-Type", "application/octet-stream")
            .with_body(vec![1, 2, 3, 4]);
        assert_eq!(
            normalize(&original).response.content_type(),
            Some("application/octet-stream")
        );
    }

    // === Properties ===

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(&json(&[0xEF, 0xBB, 0xBF, b'[', b']'])).into_response();
        let twice = normalize(&once);
        assert_eq!(twice.outcome, NormalizeOutcome::Declared);
        assert_eq!(twice.response, once);
    }

    #[test]
    fn test_original_response_is_untouched() {
        let original = json(&[0xEF, 0xBB, 0xBF, b'{', b'}']);
        let _ = normalize(&original);
        assert_eq!(original.body, vec![0xEF, 0xBB, 0xBF, b'{', b'}']);
        assert_eq!(original.content_type(), Some("application/json"));
    }
}
