//! Quotation Line Expansion
//!
//! Turns a test request's priced line items into a flat, ordered list of
//! test slots, one per physical unit of work. The slot order is the sole
//! determinant of which sample receives which test identity, so it must
//! be reproducible: lines are taken in creation order (ascending tri_id)
//! and the global sequence runs 1..N across the whole request, never
//! resetting per line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One test request line joined with its quotation item identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestLine {
    pub tri_id: i64,
    pub quotation_item_id: i64,
    /// Number of physical samples this line requires (>= 1).
    pub quantity: i32,
    pub item_code: String,
    pub description: String,
    pub test_standard: Option<String>,
    pub unit_rate: Decimal,
}

/// One unit of test work; becomes exactly one sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSlot {
    /// 1-based global sequence within the request.
    pub sequence: u32,
    pub tri_id: i64,
    pub quotation_item_id: i64,
    pub item_code: String,
    pub description: String,
    pub test_standard: Option<String>,
    pub unit_rate: Decimal,
}

/// Expand request lines into slots.
///
/// Lines are ordered by ascending `tri_id` before expansion so the
/// result is stable regardless of input order. An empty input expands to
/// an empty list; callers treat that as a "request has no items" error.
pub fn expand(lines: &[TestLine]) -> Vec<TestSlot> {
    let mut ordered: Vec<&TestLine> = lines.iter().collect();
    ordered.sort_by_key(|line| line.tri_id);

    let mut slots = Vec::new();
    let mut sequence: u32 = 0;

    for line in ordered {
        for _ in 0..line.quantity.max(0) {
            sequence += 1;
            slots.push(TestSlot {
                sequence,
                tri_id: line.tri_id,
                quotation_item_id: line.quotation_item_id,
                item_code: line.item_code.clone(),
                description: line.description.clone(),
                test_standard: line.test_standard.clone(),
                unit_rate: line.unit_rate,
            });
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(tri_id: i64, item_id: i64, code: &str, qty: i32) -> TestLine {
        TestLine {
            tri_id,
            quotation_item_id: item_id,
            quantity: qty,
            item_code: code.to_string(),
            description: format!("{} test", code),
            test_standard: Some("BS 1377".to_string()),
            unit_rate: Decimal::from(150),
        }
    }

    #[test]
    fn test_expansion_total_and_sequence() {
        let lines = vec![line(1, 10, "RH", 2), line(2, 11, "SPT", 1), line(3, 12, "CBR", 3)];
        let slots = expand(&lines);

        assert_eq!(slots.len(), 6);
        let sequences: Vec<u32> = slots.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_expansion_preserves_identity_in_line_order() {
        let lines = vec![line(1, 10, "RH", 2), line(2, 11, "SPT", 1)];
        let slots = expand(&lines);

        let codes: Vec<&str> = slots.iter().map(|s| s.item_code.as_str()).collect();
        assert_eq!(codes, vec!["RH", "RH", "SPT"]);
        assert_eq!(slots[0].tri_id, 1);
        assert_eq!(slots[2].quotation_item_id, 11);
    }

    #[test]
    fn test_expansion_orders_by_tri_id_not_input_order() {
        let lines = vec![line(5, 11, "SPT", 1), line(2, 10, "RH", 1)];
        let slots = expand(&lines);

        assert_eq!(slots[0].item_code, "RH");
        assert_eq!(slots[1].item_code, "SPT");
    }

    #[test]
    fn test_expansion_empty_input() {
        assert!(expand(&[]).is_empty());
    }

    #[test]
    fn test_expansion_ignores_non_positive_quantity() {
        let lines = vec![line(1, 10, "RH", 0), line(2, 11, "SPT", 2)];
        let slots = expand(&lines);

        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(|s| s.item_code == "SPT"));
        assert_eq!(slots[0].sequence, 1);
    }
}
