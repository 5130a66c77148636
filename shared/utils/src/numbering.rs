//! Laboratory Number Formats
//!
//! Pure formatting and parsing for the numbering schemes used across the
//! workflow: test requests (GQ), samples (GS), worksheets (WKS), reports
//! (GR), quotations (QG/QS/QL) and enquiries (ENQ). Sequence values are
//! supplied by the durable counter store; nothing here touches the
//! database.

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

/// Format a date as DDMMYY, the date component shared by request, sample
/// and report numbers.
pub fn date_code(date: NaiveDate) -> String {
    date.format("%d%m%y").to_string()
}

/// Test request number: `GQ-{DDMMYY}-{0N}`.
///
/// The per-day sequence keeps a leading zero for every value, so the
/// series runs 01..09, 010, 011, ... (historical format, preserved).
pub fn request_no(date: NaiveDate, seq: i64) -> String {
    format!("GQ-{}-0{}", date_code(date), seq)
}

/// Enquiry reference: `ENQ-{YYYY}-{NNN}`.
pub fn enquiry_ref(year: i32, seq: i64) -> String {
    format!("ENQ-{}-{:03}", year, seq)
}

/// Report number: `GR - {DDMMYY} - {NNN}` (spaces included).
pub fn report_no(date: NaiveDate, seq: i64) -> String {
    format!("GR - {} - {:03}", date_code(date), seq)
}

/// Worksheet number: `WKS-{year}-{sample_id:04}-{seq:03}` where `seq` is
/// the per-year running sequence.
pub fn worksheet_no(year: i32, sample_id: i64, seq: i64) -> String {
    format!("WKS-{}-{:04}-{:03}", year, sample_id, seq)
}

/// Quotation series prefix by division: GEO and SRV run their own
/// series, every other division shares the QL series.
pub fn quotation_prefix(division: &str) -> &'static str {
    match division {
        "GEO" => "QG",
        "SRV" => "QS",
        _ => "QL",
    }
}

/// Quotation number: `{prefix}-[{initials}-]{seq:03}-{yy}`.
///
/// `prepared_under` initials are display-only and do not affect the
/// sequence; "NONE" and blank are treated as absent.
pub fn quotation_no(division: &str, prepared_under: Option<&str>, seq: i64, year: i32) -> String {
    let prefix = quotation_prefix(division);
    let year_short = year % 100;

    let initials = prepared_under
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("NONE"))
        .map(|s| s.to_uppercase().chars().take(2).collect::<String>());

    match initials {
        Some(initials) => format!("{}-{}-{:03}-{:02}", prefix, initials, seq, year_short),
        None => format!("{}-{:03}-{:02}", prefix, seq, year_short),
    }
}

/// The parts of a request number relevant to sample numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestNoParts {
    /// DDMMYY component, e.g. "121225" from "GQ-121225-01".
    pub date_part: String,
    /// Per-day request sequence, e.g. "01".
    pub request_seq: String,
}

/// Split a request number of the form `GQ-DDMMYY-NN` into its date and
/// sequence parts. Falls back field-by-field when the pattern does not
/// hold: the date part falls back to `created` and the sequence part to
/// "01".
pub fn parse_request_no(request_no: &str, created: NaiveDate) -> RequestNoParts {
    let parts: Vec<&str> = request_no.split('-').collect();

    let date_part = if request_no.len() >= 9 && parts.len() >= 2 {
        parts[1].to_string()
    } else {
        date_code(created)
    };

    let request_seq = if request_no.len() >= 12 && parts.len() >= 3 {
        parts[2].to_string()
    } else {
        "01".to_string()
    };

    RequestNoParts {
        date_part,
        request_seq,
    }
}

/// Sample number for slot `sequence` (1-based across the whole request):
/// `GS-{DDMMYY}-{request_seq}-{sequence}`.
pub fn sample_no(request_no: &str, request_created: NaiveDate, sequence: u32) -> String {
    let parts = parse_request_no(request_no, request_created);
    format!("GS-{}-{}-{}", parts.date_part, parts.request_seq, sequence)
}

/// Sample number fallback used when the owning request row cannot be
/// read: `GS-{DDMMYY}-REQ{request_id:04}-{sequence:02}`.
pub fn sample_no_fallback(today: NaiveDate, request_id: i64, sequence: u32) -> String {
    format!(
        "GS-{}-REQ{:04}-{:02}",
        date_code(today),
        request_id,
        sequence
    )
}

/// Barcode assigned to a sample on acceptance: 16 uppercase hex chars.
pub fn barcode() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..16].to_uppercase()
}

/// Short random token used to de-collide stored filenames.
pub fn file_token() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..8].to_string()
}

/// Stored filename for an uploaded report blob:
/// `{report_no with spaces collapsed}_{item_code}_{token}{ext}`.
pub fn report_filename(report_no: &str, item_code: &str, extension: &str) -> String {
    format!(
        "{}_{}_{}{}",
        report_no.replace(' ', "_"),
        item_code,
        file_token(),
        extension
    )
}

/// Stored filename for a replacement report blob.
pub fn replacement_filename(report_no: &str, extension: &str) -> String {
    format!(
        "rev_{}_{}{}",
        report_no.replace(' ', "_"),
        file_token(),
        extension
    )
}

/// Year component used by worksheet numbering.
pub fn current_year(date: NaiveDate) -> i32 {
    date.year()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_request_no_format() {
        assert_eq!(request_no(d(2025, 12, 12), 1), "GQ-121225-01");
        assert_eq!(request_no(d(2025, 12, 12), 9), "GQ-121225-09");
        // Two-digit sequences keep the leading zero (010, 011, ...)
        assert_eq!(request_no(d(2025, 12, 12), 10), "GQ-121225-010");
    }

    #[test]
    fn test_report_no_format() {
        assert_eq!(report_no(d(2026, 1, 5), 1), "GR - 050126 - 001");
        assert_eq!(report_no(d(2026, 1, 5), 42), "GR - 050126 - 042");
    }

    #[test]
    fn test_worksheet_no_format() {
        assert_eq!(worksheet_no(2026, 7, 3), "WKS-2026-0007-003");
    }

    #[test]
    fn test_quotation_no_with_initials() {
        assert_eq!(quotation_no("GEO", Some("ar"), 1, 2025), "QG-AR-001-25");
        assert_eq!(quotation_no("SRV", Some("AS"), 12, 2025), "QS-AS-012-25");
    }

    #[test]
    fn test_quotation_no_without_initials() {
        assert_eq!(quotation_no("GEO", None, 1, 2025), "QG-001-25");
        assert_eq!(quotation_no("GEO", Some("NONE"), 2, 2025), "QG-002-25");
        assert_eq!(quotation_no("GEO", Some("  "), 3, 2025), "QG-003-25");
        // Any other division shares the QL series
        assert_eq!(quotation_no("LAB", None, 4, 2025), "QL-004-25");
    }

    #[test]
    fn test_parse_request_no_well_formed() {
        let parts = parse_request_no("GQ-121225-01", d(2025, 1, 1));
        assert_eq!(parts.date_part, "121225");
        assert_eq!(parts.request_seq, "01");
    }

    #[test]
    fn test_parse_request_no_missing_sequence() {
        // Long enough to carry a date but no third component
        let parts = parse_request_no("GQ-121225", d(2025, 3, 4));
        assert_eq!(parts.date_part, "121225");
        assert_eq!(parts.request_seq, "01");
    }

    #[test]
    fn test_parse_request_no_unrecognized() {
        let parts = parse_request_no("LEGACY7", d(2025, 3, 4));
        assert_eq!(parts.date_part, "040325");
        assert_eq!(parts.request_seq, "01");
    }

    #[test]
    fn test_sample_no_derivation() {
        assert_eq!(
            sample_no("GQ-121225-01", d(2025, 12, 12), 1),
            "GS-121225-01-1"
        );
        assert_eq!(
            sample_no("GQ-121225-02", d(2025, 12, 12), 13),
            "GS-121225-02-13"
        );
    }

    #[test]
    fn test_sample_no_fallback() {
        assert_eq!(
            sample_no_fallback(d(2025, 12, 12), 7, 2),
            "GS-121225-REQ0007-02"
        );
    }

    #[test]
    fn test_enquiry_ref() {
        assert_eq!(enquiry_ref(2026, 5), "ENQ-2026-005");
    }

    #[test]
    fn test_barcode_shape() {
        let code = barcode();
        assert_eq!(code.len(), 16);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(code, code.to_uppercase());
    }

    #[test]
    fn test_report_filename_strips_spaces() {
        let name = report_filename("GR - 050126 - 001", "RH", ".docx");
        assert!(name.starts_with("GR_-_050126_-_001_RH_"));
        assert!(name.ends_with(".docx"));
        assert!(!name.contains(' '));
    }
}
