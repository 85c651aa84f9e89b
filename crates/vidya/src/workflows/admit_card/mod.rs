//! Fee-gated admit card issuance for exams.
//!
//! A per-school policy ([`AdmitCardSettings`]) gates card generation on the
//! share of fees a student has paid. The workflow covers the policy store,
//! the pure eligibility evaluation, single and bulk generation against an
//! idempotent card store, and the pay-to-unlock flow that records a payment
//! and immediately re-evaluates. Directory data (schools, exams, students,
//! classes) and the fee ledger are external systems reached through traits.

pub(crate) mod bulk;
pub mod directory;
pub mod domain;
pub(crate) mod eligibility;
pub mod fees;
pub mod router;
pub mod service;
pub mod settings;
pub mod store;

#[cfg(test)]
mod tests;

pub use bulk::{BulkFailure, BulkReport};
pub use directory::{DirectoryError, SchoolDirectory};
pub use domain::{
    AdmitCardDocument, AdmitCardKey, AdmitCardNo, AdmitCardRecord, AdmitCardView, ClassId,
    ClassRecord, Exam, ExamBlock, ExamId, ExamKind, ExamStatus, ExamView, FeeStatus,
    FeeStatusView, SchoolBlock, SchoolId, SchoolProfile, SignatoryBlock, StudentBlock, StudentId,
    StudentProfile,
};
pub use eligibility::{evaluate, EligibilityVerdict};
pub use fees::{FeeLedger, LedgerError, PaymentMethod, PaymentReceipt};
pub use router::{admit_card_router, BulkGenerateRequest, SaveSettingsRequest};
pub use service::{
    AdmitCardError, AdmitCardService, ExamAdmitEntry, PaymentOutcome, PaymentOutcomeView,
    PaymentRequest, PostPaymentState, StudentOverview,
};
pub use settings::{
    AdmitCardSettings, SettingsError, SettingsStore, SettingsStoreError, SignatureAuthority,
};
pub use store::{AdmitCardStore, CardDraft, IssueOutcome, StoreError};
