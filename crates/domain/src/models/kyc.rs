//! KYC (identity verification) document models and review state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Review status of a KYC document.
///
/// Transitions: `pending -> {under_review, approved, rejected}`,
/// `under_review -> {approved, rejected}`. Approved and rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    #[default]
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl KycStatus {
    pub const ALL: [KycStatus; 4] = [
        KycStatus::Pending,
        KycStatus::UnderReview,
        KycStatus::Approved,
        KycStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::UnderReview => "under_review",
            KycStatus::Approved => "approved",
            KycStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, KycStatus::Approved | KycStatus::Rejected)
    }

    /// Whether a document in this status may be moved to `target`.
    ///
    /// `pending -> pending` is allowed as an idempotent re-stamp.
    pub fn can_transition_to(&self, target: KycStatus) -> bool {
        match self {
            KycStatus::Pending => true,
            KycStatus::UnderReview => {
                matches!(target, KycStatus::Approved | KycStatus::Rejected)
            }
            KycStatus::Approved | KycStatus::Rejected => false,
        }
    }

    /// Statuses from which a document may move to `target`.
    pub fn sources_for(target: KycStatus) -> Vec<KycStatus> {
        Self::ALL
            .into_iter()
            .filter(|s| s.can_transition_to(target))
            .collect()
    }

    /// Whether entering this status stamps the reviewer and review time.
    pub fn is_reviewed(&self) -> bool {
        !matches!(self, KycStatus::Pending)
    }
}

impl FromStr for KycStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(KycStatus::Pending),
            "under_review" => Ok(KycStatus::UnderReview),
            "approved" => Ok(KycStatus::Approved),
            "rejected" => Ok(KycStatus::Rejected),
            _ => Err(format!("Unknown KYC status: {}", s)),
        }
    }
}

impl std::fmt::Display for KycStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of identity document submitted for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Passport,
    DriversLicense,
    NationalId,
    UtilityBill,
    BankStatement,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Passport => "passport",
            DocumentType::DriversLicense => "drivers_license",
            DocumentType::NationalId => "national_id",
            DocumentType::UtilityBill => "utility_bill",
            DocumentType::BankStatement => "bank_statement",
        }
    }

    /// Human-readable label for tables.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Passport => "Passport",
            DocumentType::DriversLicense => "Driver's License",
            DocumentType::NationalId => "National ID",
            DocumentType::UtilityBill => "Utility Bill",
            DocumentType::BankStatement => "Bank Statement",
        }
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "passport" => Ok(DocumentType::Passport),
            "drivers_license" => Ok(DocumentType::DriversLicense),
            "national_id" => Ok(DocumentType::NationalId),
            "utility_bill" => Ok(DocumentType::UtilityBill),
            "bank_statement" => Ok(DocumentType::BankStatement),
            _ => Err(format!("Unknown document type: {}", s)),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the `kyc_documents` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KycDocument {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_type: DocumentType,
    pub file_path: String,
    #[serde(default)]
    pub file_name: Option<String>,
    pub status: KycStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<Uuid>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Column values written by a review transition.
///
/// Every field is serialized, including `None`, so that leaving a state
/// clears fields that no longer apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KycReviewUpdate {
    pub status: KycStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl KycReviewUpdate {
    /// Builds the update for moving a document to `status`.
    ///
    /// The rejection reason is kept only for `rejected`; reviewer and review
    /// time are stamped for every status except `pending`.
    pub fn new(
        status: KycStatus,
        rejection_reason: Option<&str>,
        reviewer: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        let reviewed = status.is_reviewed();
        Self {
            status,
            rejection_reason: if status == KycStatus::Rejected {
                shared::validation::normalize_reason(rejection_reason)
            } else {
                None
            },
            reviewed_by: if reviewed { reviewer } else { None },
            reviewed_at: if reviewed { Some(now) } else { None },
            updated_at: now,
        }
    }
}

/// KYC document reshaped for the review table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycDocumentView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub document_type: DocumentType,
    pub document_type_label: String,
    pub file_name: String,
    pub file_path: String,
    pub status: KycStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub reviewed_by: String,
    pub reviewed_at: String,
    pub submitted_at: String,
}

/// Counts of KYC documents by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycStats {
    pub total: i64,
    pub pending: i64,
    pub under_review: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_from_pending() {
        for target in KycStatus::ALL {
            assert!(KycStatus::Pending.can_transition_to(target));
        }
    }

    #[test]
    fn test_transitions_from_under_review() {
        let s = KycStatus::UnderReview;
        assert!(s.can_transition_to(KycStatus::Approved));
        assert!(s.can_transition_to(KycStatus::Rejected));
        assert!(!s.can_transition_to(KycStatus::Pending));
        assert!(!s.can_transition_to(KycStatus::UnderReview));
    }

    #[test]
    fn test_terminal_states() {
        for terminal in [KycStatus::Approved, KycStatus::Rejected] {
            assert!(terminal.is_terminal());
            for target in KycStatus::ALL {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn test_sources_for() {
        assert_eq!(
            KycStatus::sources_for(KycStatus::Approved),
            vec![KycStatus::Pending, KycStatus::UnderReview]
        );
        assert_eq!(
            KycStatus::sources_for(KycStatus::Pending),
            vec![KycStatus::Pending]
        );
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in KycStatus::ALL {
            assert_eq!(status.as_str().parse::<KycStatus>().unwrap(), status);
        }
        assert!("archived".parse::<KycStatus>().is_err());
    }

    #[test]
    fn test_review_update_rejected_keeps_reason_and_stamps() {
        let reviewer = Uuid::new_v4();
        let now = Utc::now();
        let update =
            KycReviewUpdate::new(KycStatus::Rejected, Some(" Blurry scan "), Some(reviewer), now);
        assert_eq!(update.rejection_reason.as_deref(), Some("Blurry scan"));
        assert_eq!(update.reviewed_by, Some(reviewer));
        assert_eq!(update.reviewed_at, Some(now));
    }

    #[test]
    fn test_review_update_approved_drops_reason() {
        let update =
            KycReviewUpdate::new(KycStatus::Approved, Some("ignored"), None, Utc::now());
        assert_eq!(update.rejection_reason, None);
        assert!(update.reviewed_at.is_some());
    }

    #[test]
    fn test_review_update_pending_clears_review_fields() {
        let update = KycReviewUpdate::new(
            KycStatus::Pending,
            Some("ignored"),
            Some(Uuid::new_v4()),
            Utc::now(),
        );
        assert_eq!(update.reviewed_by, None);
        assert_eq!(update.reviewed_at, None);
        assert_eq!(update.rejection_reason, None);

        let json = serde_json::to_value(&update).unwrap();
        assert!(json.get("reviewed_at").unwrap().is_null());
        assert!(json.get("reviewed_by").unwrap().is_null());
    }

    #[test]
    fn test_document_type_labels() {
        assert_eq!(DocumentType::DriversLicense.label(), "Driver's License");
        assert_eq!(
            "national_id".parse::<DocumentType>().unwrap(),
            DocumentType::NationalId
        );
    }
}
