use chrono::{DateTime, Utc};

use super::domain::{AdmitCardDocument, AdmitCardKey, AdmitCardRecord, ExamId, SchoolId};

/// Everything needed to persist a card except the number, which the store
/// assigns inside its own atomic create.
#[derive(Debug, Clone)]
pub struct CardDraft {
    pub key: AdmitCardKey,
    pub document: AdmitCardDocument,
    pub fee_pending_at_issue: bool,
    pub generated_at: DateTime<Utc>,
}

/// Result of an [`AdmitCardStore::issue`] call.
#[derive(Debug, Clone)]
pub enum IssueOutcome {
    /// This call created the record and burned a fresh card number.
    Created(AdmitCardRecord),
    /// A record already existed for the key; the draft was discarded and the
    /// caller receives the winner's record.
    Existing(AdmitCardRecord),
}

impl IssueOutcome {
    pub fn into_record(self) -> AdmitCardRecord {
        match self {
            IssueOutcome::Created(record) | IssueOutcome::Existing(record) => record,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, IssueOutcome::Created(_))
    }
}

/// Storage abstraction for issued admit cards.
///
/// `issue` is the single write path and must be atomic on the
/// (school, exam, student) key: the membership check, the per-school card
/// number assignment, and the insert happen under one uniqueness constraint,
/// so concurrent duplicate requests produce exactly one record and one
/// number. The loser of a race gets [`IssueOutcome::Existing`], never an
/// error. A database-backed implementation maps this to a unique index.
pub trait AdmitCardStore: Send + Sync {
    fn issue(&self, draft: CardDraft) -> Result<IssueOutcome, StoreError>;

    fn fetch(&self, key: &AdmitCardKey) -> Result<Option<AdmitCardRecord>, StoreError>;

    /// All cards issued for one exam, for admin follow-up listings.
    fn issued_for_exam(
        &self,
        school_id: &SchoolId,
        exam_id: &ExamId,
    ) -> Result<Vec<AdmitCardRecord>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("admit card store unavailable: {0}")]
    Unavailable(String),
}
