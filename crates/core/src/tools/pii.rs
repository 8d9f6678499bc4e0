//! # PII Masking
//!
//! Replaces personally identifying substrings with numbered tokens such as
//! `[PHONE_1]` before any agent sees the request.
//!
//! Detectors run in priority order. A later match that overlaps an earlier
//! one is dropped, so `010-1234-5678` is reported once as a phone number and
//! never again as a bank account.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Category of detected PII
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiKind {
    /// Resident registration number
    Ssn,
    Phone,
    Email,
    Account,
    Address,
}

impl PiiKind {
    fn token_prefix(self) -> &'static str {
        match self {
            PiiKind::Ssn => "SSN",
            PiiKind::Phone => "PHONE",
            PiiKind::Email => "EMAIL",
            PiiKind::Account => "ACCOUNT",
            PiiKind::Address => "ADDR",
        }
    }

    /// Human-readable category label
    pub fn label(self) -> &'static str {
        match self {
            PiiKind::Ssn => "resident registration number",
            PiiKind::Phone => "phone number",
            PiiKind::Email => "email",
            PiiKind::Account => "bank account",
            PiiKind::Address => "address",
        }
    }
}

const PATTERNS: &[(PiiKind, &str)] = &[
    (PiiKind::Ssn, r"\d{6}-[1-4]\d{6}"),
    (PiiKind::Ssn, r"\d{6}-[1-4]X{6}"),
    (PiiKind::Phone, r"01[016789]-?\d{3,4}-?\d{4}"),
    (
        PiiKind::Email,
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}",
    ),
    (PiiKind::Account, r"\d{3,4}-\d{2,4}-\d{4,6}"),
    (
        PiiKind::Address,
        r"(?:[가-힣]+(?:특별시|광역시|시|도)\s+)?[가-힣]+(?:시|군|구)\s+[가-힣]+(?:읍|면|동|로|길)\s*[\d-]+(?:번지)?(?:\s*\d+층)?",
    ),
];

fn detectors() -> &'static [(PiiKind, Regex)] {
    static DETECTORS: OnceLock<Vec<(PiiKind, Regex)>> = OnceLock::new();
    DETECTORS.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|(kind, pattern)| match Regex::new(pattern) {
                Ok(re) => Some((*kind, re)),
                Err(e) => {
                    tracing::warn!(?kind, error = %e, "skipping invalid PII pattern");
                    None
                }
            })
            .collect()
    })
}

/// One masked span, byte offsets into the original text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub kind: PiiKind,
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct MaskResult {
    pub masked: String,
    /// token -> original value
    pub tokens: BTreeMap<String, String>,
    /// Sorted by position
    pub detections: Vec<Detection>,
}

impl MaskResult {
    pub fn is_clean(&self) -> bool {
        self.detections.is_empty()
    }

    /// Category labels in order of first appearance, without repeats
    pub fn detected_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for d in &self.detections {
            let label = d.kind.label();
            if !labels.iter().any(|l| l == label) {
                labels.push(label.to_string());
            }
        }
        labels
    }
}

/// Find every PII span in `text`
pub fn detect(text: &str) -> Vec<Detection> {
    let mut detections: Vec<Detection> = Vec::new();
    let mut counters: BTreeMap<&'static str, usize> = BTreeMap::new();

    for (kind, re) in detectors() {
        for m in re.find_iter(text) {
            let overlaps = detections
                .iter()
                .any(|d| m.start() < d.end && d.start < m.end());
            if overlaps {
                continue;
            }
            let n = counters.entry(kind.token_prefix()).or_insert(0);
            *n += 1;
            detections.push(Detection {
                kind: *kind,
                value: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
                token: format!("[{}_{}]", kind.token_prefix(), n),
            });
        }
    }

    detections.sort_by_key(|d| d.start);
    detections
}

/// Replace every detected span with its token
pub fn mask(text: &str) -> MaskResult {
    let detections = detect(text);
    let mut masked = String::with_capacity(text.len());
    let mut tokens = BTreeMap::new();
    let mut cursor = 0;

    for d in &detections {
        masked.push_str(&text[cursor..d.start]);
        masked.push_str(&d.token);
        tokens.insert(d.token.clone(), d.value.clone());
        cursor = d.end;
    }
    masked.push_str(&text[cursor..]);

    MaskResult {
        masked,
        tokens,
        detections,
    }
}

/// Put original values back in place of their tokens
pub fn unmask(text: &str, tokens: &BTreeMap<String, String>) -> String {
    tokens
        .iter()
        .fold(text.to_string(), |acc, (token, value)| acc.replace(token, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_masked_once() {
        let result = mask("Please call me at 010-1234-5678 tomorrow");
        assert_eq!(result.masked, "Please call me at [PHONE_1] tomorrow");
        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detected_labels(), vec!["phone number".to_string()]);
        assert!(!result.masked.contains("1234-5678"));
    }

    #[test]
    fn test_clean_text_untouched() {
        let result = mask("I want to open a restaurant");
        assert!(result.is_clean());
        assert_eq!(result.masked, "I want to open a restaurant");
        assert!(result.detected_labels().is_empty());
    }

    #[test]
    fn test_multiple_kinds_numbered() {
        let text = "ssn 900101-1234567, mail kim@example.com, 010-1111-2222 or 011-333-4444";
        let result = mask(text);
        assert_eq!(
            result.masked,
            "ssn [SSN_1], mail [EMAIL_1], [PHONE_1] or [PHONE_2]"
        );
        assert_eq!(
            result.detected_labels(),
            vec![
                "resident registration number".to_string(),
                "email".to_string(),
                "phone number".to_string()
            ]
        );
    }

    #[test]
    fn test_account_and_address() {
        let result = mask("계좌 110-123-456789, 주소 서울특별시 마포구 월드컵로 12");
        assert!(result.masked.contains("[ACCOUNT_1]"));
        assert!(result.masked.contains("[ADDR_1]"));
        assert!(!result.masked.contains("월드컵로"));
    }

    #[test]
    fn test_unmask_restores() {
        let text = "reach me at 010-9876-5432 or lee@test.kr";
        let result = mask(text);
        assert_eq!(unmask(&result.masked, &result.tokens), text);
    }
}
