//! Property-based tests over the sample expansion and lifecycle rules.
//!
//! These check the universal guarantees the rest of the system leans
//! on: conservation of quantities through expansion, strict sequence
//! ordering, and the one-way nature of review transitions.

use proptest::prelude::*;
use rust_decimal::Decimal;

use terralab_utils::allocation::{expand, TestLine};
use terralab_utils::numbering;

use crate::status::{QuotationStatus, ReportStatus, SampleStatus};

prop_compose! {
    fn arb_test_line()(
        tri_id in 1i64..1000,
        quotation_item_id in 1i64..1000,
        quantity in 0i32..8,
        rate in 1i64..10_000
    ) -> TestLine {
        TestLine {
            tri_id,
            quotation_item_id,
            quantity,
            item_code: format!("T{}", quotation_item_id),
            description: format!("Test {}", quotation_item_id),
            test_standard: None,
            unit_rate: Decimal::from(rate),
        }
    }
}

proptest! {
    /// Every unit of ordered quantity becomes exactly one slot.
    #[test]
    fn expansion_conserves_quantity(lines in prop::collection::vec(arb_test_line(), 0..12)) {
        let slots = expand(&lines);
        let expected: i64 = lines.iter().map(|l| l.quantity.max(0) as i64).sum();
        prop_assert_eq!(slots.len() as i64, expected);
    }

    /// Sequence numbers are exactly 1..=N with no gaps or repeats.
    #[test]
    fn expansion_sequences_are_dense(lines in prop::collection::vec(arb_test_line(), 0..12)) {
        let slots = expand(&lines);
        for (i, slot) in slots.iter().enumerate() {
            prop_assert_eq!(slot.sequence, (i + 1) as u32);
        }
    }

    /// Slots come out grouped by ascending tri_id regardless of input order.
    #[test]
    fn expansion_orders_by_tri_id(lines in prop::collection::vec(arb_test_line(), 0..12)) {
        let slots = expand(&lines);
        for pair in slots.windows(2) {
            prop_assert!(pair[0].tri_id <= pair[1].tri_id);
        }
    }

    /// Each slot carries the identity of exactly one input line.
    #[test]
    fn expansion_preserves_line_identity(lines in prop::collection::vec(arb_test_line(), 0..12)) {
        let slots = expand(&lines);
        for slot in &slots {
            let source = lines.iter().find(|l| l.tri_id == slot.tri_id);
            prop_assert!(source.is_some());
            let source = source.unwrap();
            prop_assert_eq!(slot.quotation_item_id, source.quotation_item_id);
            prop_assert_eq!(&slot.item_code, &source.item_code);
        }
    }

    /// Sample numbers carry the request's date and sequence parts plus
    /// the slot position.
    #[test]
    fn sample_no_embeds_position(date in "[0-9]{6}", reqseq in "[0-9]{2}", n in 1u32..200) {
        let request_no = format!("GQ-{}-{}", date, reqseq);
        let created = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let no = numbering::sample_no(&request_no, created, n);
        prop_assert_eq!(no, format!("GS-{}-{}-{}", date, reqseq, n));
    }

    /// Review states never leave a terminal state.
    #[test]
    fn terminal_report_states_are_absorbing(target in prop::sample::select(vec![
        ReportStatus::Draft, ReportStatus::UnderReview, ReportStatus::Approved,
    ])) {
        prop_assert!(!ReportStatus::Approved.can_transition_to(target));
    }

    #[test]
    fn terminal_sample_states_are_absorbing(target in prop::sample::select(vec![
        SampleStatus::Pending, SampleStatus::Accepted, SampleStatus::Rejected,
    ])) {
        prop_assert!(!SampleStatus::Accepted.can_transition_to(target));
        prop_assert!(!SampleStatus::Rejected.can_transition_to(target));
    }

    #[test]
    fn terminal_quotation_states_are_absorbing(target in prop::sample::select(vec![
        QuotationStatus::Draft, QuotationStatus::Sent, QuotationStatus::Approved,
        QuotationStatus::Rejected, QuotationStatus::Clarification,
    ])) {
        prop_assert!(!QuotationStatus::Approved.can_transition_to(target));
        prop_assert!(!QuotationStatus::Rejected.can_transition_to(target));
    }
}
