//! Heuristic field extraction from recognized ID-card text.
//!
//! OCR output is noisy and card layouts vary, so extraction is best-effort:
//! first pattern match wins per field, and anything the heuristics cannot
//! recover is reported as the [`UNKNOWN`] sentinel rather than an error.
//! Structured address parsing is not attempted (known limitation).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Sentinel for a field the heuristics could not recover. Fields are never
/// absent — absence is represented, not thrown.
pub const UNKNOWN: &str = "UNKNOWN";

/// Fixed placeholder recorded for the address field when any other field was
/// recovered from the document.
pub const ADDRESS_PLACEHOLDER: &str = "Extracted from ID";

/// Identifier token: at least 3 uppercase letters immediately followed by at
/// least 5 digits (e.g. "VOT12345678").
fn id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Z]{3,}[0-9]{5,}").expect("static pattern"))
}

/// Date-shaped token: DD-DD-DDDD or DD/DD/DDDD. No semantic validation;
/// the pattern alone decides.
fn date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{2}[-/]\d{2}[-/]\d{4}").expect("static pattern"))
}

/// Keywords stripped from a line when deriving the holder's name.
fn name_keyword_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)name|voter|:").expect("static pattern"))
}

/// Structured fields recovered from one scanned document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFields {
    pub id: String,
    pub name: String,
    pub date_of_birth: String,
    pub address: String,
}

impl DocumentFields {
    /// Names of the fields still holding the sentinel, for operator warnings.
    pub fn incomplete_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.id == UNKNOWN {
            missing.push("id");
        }
        if self.name == UNKNOWN {
            missing.push("name");
        }
        if self.date_of_birth == UNKNOWN {
            missing.push("date_of_birth");
        }
        if self.address == UNKNOWN {
            missing.push("address");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.incomplete_fields().is_empty()
    }
}

/// Parse recognized ID-card text into structured fields.
///
/// Never fails: every field defaults to [`UNKNOWN`]. Matching is
/// order-preserving and first-match-wins per field; whitespace-only lines are
/// discarded before matching.
pub fn extract_fields(text: &str) -> DocumentFields {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut id: Option<String> = None;
    let mut date_of_birth: Option<String> = None;
    let mut name: Option<String> = None;

    for line in &lines {
        if id.is_none() {
            if let Some(m) = id_pattern().find(line) {
                id = Some(m.as_str().to_string());
            }
        }
        if date_of_birth.is_none() {
            if let Some(m) = date_pattern().find(line) {
                date_of_birth = Some(m.as_str().to_string());
            }
        }
        if name.is_none() {
            let lower = line.to_lowercase();
            if lower.contains("name") || lower.contains("voter") {
                let stripped = name_keyword_pattern().replace_all(line, "");
                let stripped = stripped.trim();
                if stripped.len() >= 3 {
                    name = Some(stripped.to_string());
                }
            }
        }
    }

    // Cards usually print the holder's name right under the header line, so
    // the second line is the last-resort guess.
    if name.is_none() && lines.len() >= 2 {
        name = Some(lines[1].to_string());
    }

    let any_recovered = id.is_some() || name.is_some() || date_of_birth.is_some();
    let fields = DocumentFields {
        id: id.unwrap_or_else(|| UNKNOWN.to_string()),
        name: name.unwrap_or_else(|| UNKNOWN.to_string()),
        date_of_birth: date_of_birth.unwrap_or_else(|| UNKNOWN.to_string()),
        address: if any_recovered {
            ADDRESS_PLACEHOLDER.to_string()
        } else {
            UNKNOWN.to_string()
        },
    };

    if !fields.is_complete() {
        tracing::debug!(missing = ?fields.incomplete_fields(), "field extraction incomplete");
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_token_from_line() {
        let fields = extract_fields("ELECTORAL ROLL\nJANE DOE\nVOT12345678\n");
        assert_eq!(fields.id, "VOT12345678");
    }

    #[test]
    fn id_defaults_to_unknown_without_matching_token() {
        // "ID" is only two letters, "12345" has no letter prefix
        let fields = extract_fields("ID 12345\nsomething else");
        assert_eq!(fields.id, UNKNOWN);
    }

    #[test]
    fn first_id_token_wins() {
        let fields = extract_fields("ABC11111\nXYZ22222");
        assert_eq!(fields.id, "ABC11111");
    }

    #[test]
    fn extracts_date_with_either_separator() {
        let fields = extract_fields("header\nx\nDOB 12/04/1985");
        assert_eq!(fields.date_of_birth, "12/04/1985");

        let fields = extract_fields("header\nx\nborn 01-01-2000");
        assert_eq!(fields.date_of_birth, "01-01-2000");
    }

    #[test]
    fn date_requires_full_shape() {
        let fields = extract_fields("1/1/2000\n12-04-85");
        assert_eq!(fields.date_of_birth, UNKNOWN);
    }

    #[test]
    fn name_derived_from_keyword_line() {
        let fields = extract_fields("STATE OF EXAMPLE\nName: JANE M DOE\nVOT12345678");
        assert_eq!(fields.name, "JANE M DOE");
    }

    #[test]
    fn voter_keyword_also_marks_name_line() {
        let fields = extract_fields("card\nvoter JOHN SMITH");
        assert_eq!(fields.name, "JOHN SMITH");
    }

    #[test]
    fn short_keyword_line_falls_through_to_second_line() {
        // "Voter ID" strips to "ID" (too short), so the second line is used.
        let fields = extract_fields("Voter ID\nJANE DOE\nVOT12345678");
        assert_eq!(fields.name, "JANE DOE");
    }

    #[test]
    fn single_line_input_has_no_name_fallback() {
        let fields = extract_fields("VOT12345678");
        assert_eq!(fields.name, UNKNOWN);
        assert_eq!(fields.id, "VOT12345678");
    }

    #[test]
    fn whitespace_only_lines_are_discarded() {
        let fields = extract_fields("   \nheader\n   \t \nJANE DOE\n");
        // blank lines do not count: "JANE DOE" is the second real line
        assert_eq!(fields.name, "JANE DOE");
    }

    #[test]
    fn empty_input_is_entirely_unknown() {
        let fields = extract_fields("");
        assert_eq!(fields.id, UNKNOWN);
        assert_eq!(fields.name, UNKNOWN);
        assert_eq!(fields.date_of_birth, UNKNOWN);
        assert_eq!(fields.address, UNKNOWN);
        assert!(!fields.is_complete());
        assert_eq!(
            fields.incomplete_fields(),
            vec!["id", "name", "date_of_birth", "address"]
        );
    }

    #[test]
    fn address_placeholder_set_once_any_field_recovered() {
        let fields = extract_fields("junk line\nVOT12345678");
        assert_eq!(fields.address, ADDRESS_PLACEHOLDER);
        assert_eq!(fields.incomplete_fields(), vec!["date_of_birth"]);
    }

    #[test]
    fn full_card_extracts_every_field() {
        let text = "ELECTORAL COMMISSION\nName: JANE M DOE\nVOT12345678\nDOB 12/04/1985\n";
        let fields = extract_fields(text);
        assert_eq!(
            fields,
            DocumentFields {
                id: "VOT12345678".into(),
                name: "JANE M DOE".into(),
                date_of_birth: "12/04/1985".into(),
                address: ADDRESS_PLACEHOLDER.into(),
            }
        );
        assert!(fields.is_complete());
    }
}
