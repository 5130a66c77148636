//! Reports and the consolidated review group.
//!
//! One uploaded file covering several samples is stored as one row per
//! sample, all sharing a report_no; the first row holds the file and
//! the rest link to it through `linked_to_report_id`. Review actions
//! always move the whole group.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::status::ReportStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Report {
    pub report_id: i64,
    /// GR - DDMMYY - NNN, shared by every row of one upload
    pub report_no: String,
    pub sample_id: i64,
    pub original_filename: String,
    pub stored_filename: String,
    pub file_path: String,
    pub file_type: String,
    /// Set on linked fan-out rows, pointing at the group's primary row
    /// (which keeps this NULL and carries the file)
    pub linked_to_report_id: Option<i64>,
    pub covers_test_type: Option<String>,
    pub status: String,
    pub is_locked: bool,
    pub notes: Option<String>,
    pub uploaded_by: Option<String>,
    pub checked_by: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn parsed_status(&self) -> Option<ReportStatus> {
        ReportStatus::parse(&self.status)
    }

    pub fn can_edit(&self) -> bool {
        !self.is_locked && self.parsed_status().is_some_and(|s| s.is_editable())
    }

    pub fn can_submit(&self) -> bool {
        self.parsed_status() == Some(ReportStatus::Draft)
    }

    pub fn can_approve(&self) -> bool {
        self.parsed_status() == Some(ReportStatus::UnderReview)
    }
}

/// One report group in the consolidated listing.
#[derive(Debug, Clone, Serialize)]
pub struct ReportGroup {
    pub report_no: String,
    pub primary_report_id: i64,
    pub original_filename: String,
    pub file_type: String,
    pub status: String,
    pub is_locked: bool,
    pub covers_test_type: Option<String>,
    pub uploaded_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sample_count: usize,
    pub samples: Vec<ReportSampleRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSampleRef {
    pub report_id: i64,
    pub sample_id: i64,
    pub sample_no: String,
}

/// Report detail with the action flags the review screens render.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub report: Report,
    pub sample_no: String,
    pub can_edit: bool,
    pub can_submit: bool,
    pub can_approve: bool,
}

impl ReportDetail {
    pub fn new(report: Report, sample_no: String) -> Self {
        let can_edit = report.can_edit();
        let can_submit = report.can_submit();
        let can_approve = report.can_approve();
        Self {
            report,
            sample_no,
            can_edit,
            can_submit,
            can_approve,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReportRequest {
    pub checked_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApproveReportRequest {
    pub approved_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn report(status: &str, is_locked: bool) -> Report {
        Report {
            report_id: 1,
            report_no: "GR - 121225 - 001".to_string(),
            sample_id: 1,
            original_filename: "cbr.pdf".to_string(),
            stored_filename: "GR-121225-001_ab12cd34.pdf".to_string(),
            file_path: "uploads/GR-121225-001_ab12cd34.pdf".to_string(),
            file_type: "pdf".to_string(),
            linked_to_report_id: None,
            covers_test_type: Some("CBR".to_string()),
            status: status.to_string(),
            is_locked,
            notes: None,
            uploaded_by: Some("tech1".to_string()),
            checked_by: None,
            checked_at: None,
            approved_by: None,
            approved_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_action_flags_follow_status() {
        let draft = report("DRAFT", false);
        assert!(draft.can_edit());
        assert!(draft.can_submit());
        assert!(!draft.can_approve());

        // Submission does not lock the group; the status alone closes
        // the editing window until the review is decided
        let under_review = report("UNDER_REVIEW", false);
        assert!(!under_review.can_edit());
        assert!(!under_review.can_submit());
        assert!(under_review.can_approve());

        let approved = report("APPROVED", true);
        assert!(!approved.can_edit());
        assert!(!approved.can_submit());
        assert!(!approved.can_approve());
    }

    #[test]
    fn test_lock_blocks_edit_even_in_draft() {
        let locked_draft = report("DRAFT", true);
        assert!(!locked_draft.can_edit());
        assert!(locked_draft.can_submit());
    }
}
