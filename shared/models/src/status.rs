//! Lifecycle State Machines
//!
//! Status values are persisted as uppercase text; these enums own the
//! transition rules so handlers never compare raw strings.

use serde::{Deserialize, Serialize};

/// Sample intake states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SampleStatus {
    /// Generated, waiting for lab intake
    Pending,
    /// Accepted into the lab and assigned a storage location
    Accepted,
    /// Rejected at intake with a recorded reason
    Rejected,
}

impl SampleStatus {
    pub fn can_transition_to(&self, target: SampleStatus) -> bool {
        use SampleStatus::*;

        match (self, target) {
            (Pending, Accepted) => true,
            (Pending, Rejected) => true,

            // Intake decisions are final
            (Accepted, _) => false,
            (Rejected, _) => false,

            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SampleStatus::Accepted | SampleStatus::Rejected)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "ACCEPTED" => Some(Self::Accepted),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Report review states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    /// Uploaded, still editable and replaceable
    Draft,
    /// Submitted for review; editing is closed but the lock only
    /// arrives with approval
    UnderReview,
    /// Approved and immutable
    Approved,
}

impl ReportStatus {
    pub fn can_transition_to(&self, target: ReportStatus) -> bool {
        use ReportStatus::*;

        match (self, target) {
            (Draft, UnderReview) => true,
            (UnderReview, Approved) => true,

            // No rejection path back to Draft; a bad report is replaced
            // while still in Draft or superseded by a new upload
            (Approved, _) => false,

            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Approved)
    }

    /// Whether the stored file may still be swapped out.
    pub fn is_editable(&self) -> bool {
        matches!(self, ReportStatus::Draft)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "UNDER_REVIEW" => Some(Self::UnderReview),
            "APPROVED" => Some(Self::Approved),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "DRAFT"),
            Self::UnderReview => write!(f, "UNDER_REVIEW"),
            Self::Approved => write!(f, "APPROVED"),
        }
    }
}

/// Quotation commercial states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotationStatus {
    Draft,
    Sent,
    Approved,
    Rejected,
    /// Client asked for changes; a revision follows
    Clarification,
}

impl QuotationStatus {
    pub fn can_transition_to(&self, target: QuotationStatus) -> bool {
        use QuotationStatus::*;

        match (self, target) {
            (Draft, Sent) => true,

            (Sent, Approved) => true,
            (Sent, Rejected) => true,
            (Sent, Clarification) => true,

            // A clarification round re-sends the revised quotation
            (Clarification, Sent) => true,

            (Approved, _) => false,
            (Rejected, _) => false,

            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QuotationStatus::Approved | QuotationStatus::Rejected)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "SENT" => Some(Self::Sent),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "CLARIFICATION" => Some(Self::Clarification),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "DRAFT"),
            Self::Sent => write!(f, "SENT"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Clarification => write!(f, "CLARIFICATION"),
        }
    }
}

/// Enquiry funnel states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnquiryStatus {
    Open,
    Quoted,
    Closed,
}

impl EnquiryStatus {
    pub fn can_transition_to(&self, target: EnquiryStatus) -> bool {
        use EnquiryStatus::*;

        match (self, target) {
            (Open, Quoted) => true,
            (Open, Closed) => true,
            (Quoted, Closed) => true,
            (Closed, _) => false,
            _ => false,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "QUOTED" => Some(Self::Quoted),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for EnquiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Quoted => write!(f, "QUOTED"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_transitions() {
        assert!(SampleStatus::Pending.can_transition_to(SampleStatus::Accepted));
        assert!(SampleStatus::Pending.can_transition_to(SampleStatus::Rejected));
        assert!(!SampleStatus::Accepted.can_transition_to(SampleStatus::Rejected));
        assert!(!SampleStatus::Rejected.can_transition_to(SampleStatus::Pending));
        assert!(SampleStatus::Accepted.is_terminal());
    }

    #[test]
    fn test_report_transitions() {
        assert!(ReportStatus::Draft.can_transition_to(ReportStatus::UnderReview));
        assert!(ReportStatus::UnderReview.can_transition_to(ReportStatus::Approved));
        assert!(!ReportStatus::Draft.can_transition_to(ReportStatus::Approved));
        assert!(!ReportStatus::Approved.can_transition_to(ReportStatus::Draft));
        assert!(ReportStatus::Draft.is_editable());
        assert!(!ReportStatus::UnderReview.is_editable());
    }

    #[test]
    fn test_quotation_transitions() {
        assert!(QuotationStatus::Draft.can_transition_to(QuotationStatus::Sent));
        assert!(QuotationStatus::Sent.can_transition_to(QuotationStatus::Clarification));
        assert!(QuotationStatus::Clarification.can_transition_to(QuotationStatus::Sent));
        assert!(!QuotationStatus::Approved.can_transition_to(QuotationStatus::Sent));
    }

    #[test]
    fn test_status_round_trip() {
        for s in ["PENDING", "ACCEPTED", "REJECTED"] {
            assert_eq!(SampleStatus::parse(s).unwrap().to_string(), s);
        }
        for s in ["DRAFT", "UNDER_REVIEW", "APPROVED"] {
            assert_eq!(ReportStatus::parse(s).unwrap().to_string(), s);
        }
        assert_eq!(ReportStatus::parse("under_review"), Some(ReportStatus::UnderReview));
        assert_eq!(ReportStatus::parse("bogus"), None);
    }
}
