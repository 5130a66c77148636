//! Test Distribution
//!
//! Groups samples by their persisted test assignment. The stored
//! `assigned_quotation_item_id` on each sample is authoritative; the
//! request's current line items are never replayed here, so edits made
//! after generation cannot re-map samples.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A sample row reduced to the fields distribution cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedSample {
    pub sample_id: i64,
    pub sample_no: String,
    pub quotation_item_id: Option<i64>,
    pub item_code: Option<String>,
    pub test_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRef {
    pub sample_id: i64,
    pub sample_no: String,
}

/// All samples of one request sharing a test type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestGroup {
    pub item_code: String,
    pub test_name: String,
    pub quotation_item_id: i64,
    pub samples: Vec<SampleRef>,
    pub sample_count: usize,
}

/// Group a request's samples by assigned test type, keyed by item code.
///
/// Samples without a persisted assignment are skipped; they predate the
/// assignment columns and must be regenerated before they can take part
/// in worksheets or reports.
pub fn group_by_test(samples: &[AssignedSample]) -> BTreeMap<String, TestGroup> {
    let mut groups: BTreeMap<String, TestGroup> = BTreeMap::new();

    for sample in samples {
        let (Some(item_id), Some(code)) = (sample.quotation_item_id, sample.item_code.as_ref())
        else {
            continue;
        };

        let group = groups.entry(code.clone()).or_insert_with(|| TestGroup {
            item_code: code.clone(),
            test_name: sample
                .test_name
                .clone()
                .unwrap_or_else(|| "Unknown Test".to_string()),
            quotation_item_id: item_id,
            samples: Vec::new(),
            sample_count: 0,
        });

        group.samples.push(SampleRef {
            sample_id: sample.sample_id,
            sample_no: sample.sample_no.clone(),
        });
        group.sample_count += 1;
    }

    groups
}

/// The covered set: every sample assigned to `quotation_item_id`, in the
/// order given (callers pass samples ordered by ascending sample_id).
pub fn covered_set(samples: &[AssignedSample], quotation_item_id: i64) -> Vec<SampleRef> {
    samples
        .iter()
        .filter(|s| s.quotation_item_id == Some(quotation_item_id))
        .map(|s| SampleRef {
            sample_id: s.sample_id,
            sample_no: s.sample_no.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: i64, no: &str, item: Option<(i64, &str, &str)>) -> AssignedSample {
        AssignedSample {
            sample_id: id,
            sample_no: no.to_string(),
            quotation_item_id: item.map(|(i, _, _)| i),
            item_code: item.map(|(_, c, _)| c.to_string()),
            test_name: item.map(|(_, _, n)| n.to_string()),
        }
    }

    #[test]
    fn test_grouping_by_item_code() {
        let samples = vec![
            sample(1, "GS-121225-01-1", Some((10, "RH", "Rebound Hammer"))),
            sample(2, "GS-121225-01-2", Some((10, "RH", "Rebound Hammer"))),
            sample(3, "GS-121225-01-3", Some((11, "SPT", "Standard Penetration"))),
        ];

        let groups = group_by_test(&samples);
        assert_eq!(groups.len(), 2);

        let rh = &groups["RH"];
        assert_eq!(rh.sample_count, 2);
        assert_eq!(rh.quotation_item_id, 10);
        assert_eq!(rh.samples[0].sample_no, "GS-121225-01-1");

        let spt = &groups["SPT"];
        assert_eq!(spt.sample_count, 1);
        assert_eq!(spt.test_name, "Standard Penetration");
    }

    #[test]
    fn test_unassigned_samples_are_skipped() {
        let samples = vec![
            sample(1, "GS-1", Some((10, "RH", "Rebound Hammer"))),
            sample(2, "GS-2", None),
        ];

        let groups = group_by_test(&samples);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["RH"].sample_count, 1);
    }

    #[test]
    fn test_covered_set_preserves_order() {
        let samples = vec![
            sample(1, "GS-1", Some((10, "RH", "Rebound Hammer"))),
            sample(2, "GS-2", Some((11, "SPT", "Standard Penetration"))),
            sample(3, "GS-3", Some((10, "RH", "Rebound Hammer"))),
        ];

        let covered = covered_set(&samples, 10);
        assert_eq!(covered.len(), 2);
        assert_eq!(covered[0].sample_id, 1);
        assert_eq!(covered[1].sample_id, 3);

        assert!(covered_set(&samples, 99).is_empty());
    }
}
