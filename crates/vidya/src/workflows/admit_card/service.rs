use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::bulk::{merge_outcomes, BulkReport, StudentOutcome};
use super::directory::{DirectoryError, SchoolDirectory};
use super::domain::{
    AdmitCardDocument, AdmitCardKey, AdmitCardRecord, AdmitCardView, ClassId, ClassRecord, Exam,
    ExamId, ExamView, FeeStatusView, SchoolId, SchoolProfile, StudentId, StudentProfile,
};
use super::eligibility::{evaluate, EligibilityVerdict};
use super::fees::{FeeLedger, LedgerError, PaymentMethod, PaymentReceipt};
use super::settings::{AdmitCardSettings, SettingsError, SettingsStore, SettingsStoreError};
use super::store::{AdmitCardStore, CardDraft, StoreError};

/// Service composing the policy store, directory, fee ledger, and card store
/// into the admit card operations. All fields are shared handles, so the
/// service clones cheaply into bulk worker tasks.
pub struct AdmitCardService<S, D, L, C> {
    policies: Arc<S>,
    directory: Arc<D>,
    ledger: Arc<L>,
    cards: Arc<C>,
    bulk_workers: usize,
}

impl<S, D, L, C> Clone for AdmitCardService<S, D, L, C> {
    fn clone(&self) -> Self {
        Self {
            policies: Arc::clone(&self.policies),
            directory: Arc::clone(&self.directory),
            ledger: Arc::clone(&self.ledger),
            cards: Arc::clone(&self.cards),
            bulk_workers: self.bulk_workers,
        }
    }
}

/// Inbound payload for the pay-to-unlock flow.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub exam_id: ExamId,
    pub amount: u32,
    pub payment_method: PaymentMethod,
}

/// What happened after a payment was durably recorded.
#[derive(Debug, Clone)]
pub enum PostPaymentState {
    /// A card exists (issued now, or already issued earlier).
    Issued(AdmitCardRecord),
    /// Payment accepted but the threshold is still unmet; the caller should
    /// prompt for the remainder.
    ThresholdUnmet {
        fee: FeeStatusView,
        verdict: EligibilityVerdict,
    },
    /// A transient failure hit after the ledger write. The payment is safe
    /// and the card will be produced by the next eligibility check.
    Deferred { reason: String },
}

impl PostPaymentState {
    pub fn summary(&self) -> String {
        match self {
            PostPaymentState::Issued(record) => {
                format!("admit card {} issued", record.admit_card_no)
            }
            PostPaymentState::ThresholdUnmet { verdict, .. } => format!(
                "payment recorded; ₹{} more required to unlock the admit card",
                verdict.min_amount_required
            ),
            PostPaymentState::Deferred { reason } => format!(
                "payment recorded; card generation deferred ({reason}); retry the download shortly"
            ),
        }
    }
}

/// Receipt plus post-payment state returned by [`AdmitCardService::pay_and_generate`].
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub receipt: PaymentReceipt,
    pub state: PostPaymentState,
}

impl PaymentOutcome {
    pub fn view(&self) -> PaymentOutcomeView {
        let (is_generated, admit_card, fee, min_amount_required) = match &self.state {
            PostPaymentState::Issued(record) => (true, Some(record.view()), None, None),
            PostPaymentState::ThresholdUnmet { fee, verdict } => {
                (false, None, Some(*fee), Some(verdict.min_amount_required))
            }
            PostPaymentState::Deferred { .. } => (false, None, None, None),
        };

        PaymentOutcomeView {
            payment: self.receipt.clone(),
            is_generated,
            admit_card,
            fee,
            min_amount_required,
            message: self.state.summary(),
        }
    }
}

/// Serialized shape of a pay-and-download response.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcomeView {
    pub payment: PaymentReceipt,
    pub is_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admit_card: Option<AdmitCardView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<FeeStatusView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_amount_required: Option<u32>,
    pub message: String,
}

/// Per-exam slice of a student's admit card standing.
#[derive(Debug, Clone, Serialize)]
pub struct ExamAdmitEntry {
    pub exam: ExamView,
    pub fee: FeeStatusView,
    pub is_eligible: bool,
    pub min_amount_required: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admit_card: Option<AdmitCardView>,
}

/// Everything the student/parent screen needs in one response.
#[derive(Debug, Clone, Serialize)]
pub struct StudentOverview {
    pub school_id: SchoolId,
    pub student_id: StudentId,
    pub student_name: String,
    pub class_id: ClassId,
    pub exams: Vec<ExamAdmitEntry>,
}

impl<S, D, L, C> AdmitCardService<S, D, L, C>
where
    S: SettingsStore + 'static,
    D: SchoolDirectory + 'static,
    L: FeeLedger + 'static,
    C: AdmitCardStore + 'static,
{
    pub fn new(
        policies: Arc<S>,
        directory: Arc<D>,
        ledger: Arc<L>,
        cards: Arc<C>,
        bulk_workers: usize,
    ) -> Self {
        Self {
            policies,
            directory,
            ledger,
            cards,
            // A zero bound would deadlock the bulk window.
            bulk_workers: bulk_workers.max(1),
        }
    }

    /// Current policy for the school; defaults apply when never saved.
    pub fn settings(&self, school_id: &SchoolId) -> AdmitCardSettings {
        self.policies.get(school_id)
    }

    /// Validate and persist a new policy. Evaluations observe it immediately.
    pub fn save_settings(
        &self,
        school_id: &SchoolId,
        settings: AdmitCardSettings,
    ) -> Result<AdmitCardSettings, AdmitCardError> {
        settings.validate()?;
        self.policies.save(school_id, settings)?;
        info!(%school_id, min_fee_percentage = settings.min_fee_percentage, "admit card settings updated");
        Ok(settings)
    }

    /// Exams visible to the school, with status derived for `today`.
    pub fn exams(&self, school_id: &SchoolId, today: NaiveDate) -> Result<Vec<ExamView>, AdmitCardError> {
        self.require_school(school_id)?;
        let exams = self.directory.exams(school_id)?;
        Ok(exams.iter().map(|exam| exam.view(today)).collect())
    }

    /// Per-exam eligibility, fees, and documents for one student's screen.
    /// Eligibility is recomputed here on every call; nothing is cached.
    pub fn student_overview(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
        today: NaiveDate,
    ) -> Result<StudentOverview, AdmitCardError> {
        self.require_school(school_id)?;
        let student = self.require_student(school_id, student_id)?;
        let settings = self.policies.get(school_id);

        let mut entries = Vec::new();
        for exam in self.directory.exams(school_id)? {
            if !exam.is_scheduled_for(&student.class_id) {
                continue;
            }
            let fee = self
                .ledger
                .fee_status(school_id, student_id, &exam.id)
                .map_err(AdmitCardError::Ledger)?;
            let verdict = evaluate(&settings, &fee);
            let key = AdmitCardKey {
                school_id: school_id.clone(),
                exam_id: exam.id.clone(),
                student_id: student_id.clone(),
            };
            let admit_card = self.cards.fetch(&key)?.map(|record| record.view());

            entries.push(ExamAdmitEntry {
                exam: exam.view(today),
                fee: fee.view(),
                is_eligible: verdict.is_eligible,
                min_amount_required: verdict.min_amount_required,
                admit_card,
            });
        }

        Ok(StudentOverview {
            school_id: school_id.clone(),
            student_id: student.id.clone(),
            student_name: student.name,
            class_id: student.class_id,
            exams: entries,
        })
    }

    /// Generate (or return) the admit card for one student and exam.
    ///
    /// Idempotent: a stored record is returned unchanged, keeping its number
    /// and timestamp. Ineligible students get [`AdmitCardError::NotEligible`]
    /// with the exact shortfall so the caller can route to payment.
    pub fn generate(
        &self,
        school_id: &SchoolId,
        exam_id: &ExamId,
        student_id: &StudentId,
    ) -> Result<AdmitCardRecord, AdmitCardError> {
        self.generate_inner(school_id, exam_id, student_id, false)
    }

    fn generate_inner(
        &self,
        school_id: &SchoolId,
        exam_id: &ExamId,
        student_id: &StudentId,
        force: bool,
    ) -> Result<AdmitCardRecord, AdmitCardError> {
        let key = AdmitCardKey {
            school_id: school_id.clone(),
            exam_id: exam_id.clone(),
            student_id: student_id.clone(),
        };
        if let Some(existing) = self.cards.fetch(&key)? {
            return Ok(existing);
        }

        let school = self.require_school(school_id)?;
        let exam = self.require_exam(school_id, exam_id)?;
        let student = self.require_student(school_id, student_id)?;
        if !exam.is_scheduled_for(&student.class_id) {
            return Err(AdmitCardError::ExamNotForClass {
                exam_id: exam.id,
                class_id: student.class_id,
            });
        }
        let class = self.require_class(school_id, &student.class_id)?;

        let settings = self.policies.get(school_id);
        let fee = self
            .ledger
            .fee_status(school_id, student_id, exam_id)
            .map_err(AdmitCardError::Ledger)?;
        let verdict = evaluate(&settings, &fee);
        let fee_pending = !verdict.is_eligible;
        if fee_pending && !force {
            return Err(AdmitCardError::NotEligible {
                min_amount_required: verdict.min_amount_required,
            });
        }

        let document = AdmitCardDocument::assemble(&school, &class, &exam, &student, &settings);
        let outcome = self.cards.issue(CardDraft {
            key,
            document,
            fee_pending_at_issue: fee_pending,
            generated_at: Utc::now(),
        })?;
        if outcome.was_created() {
            info!(%school_id, %exam_id, %student_id, forced = fee_pending, "admit card issued");
        }
        Ok(outcome.into_record())
    }

    /// Record a fee payment, then issue the card if the threshold now clears.
    ///
    /// The ledger write is the durable commit: every failure after it is
    /// reported as [`PostPaymentState::Deferred`] rather than an error, so
    /// the caller never concludes the payment was lost and never re-charges.
    pub fn pay_and_generate(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentOutcome, AdmitCardError> {
        if request.amount == 0 {
            return Err(AdmitCardError::InvalidAmount);
        }

        let PaymentRequest {
            school_id,
            student_id,
            exam_id,
            amount,
            payment_method,
        } = request;

        // Every precondition runs before the ledger sees the payment.
        self.require_school(&school_id)?;
        let exam = self.require_exam(&school_id, &exam_id)?;
        let student = self.require_student(&school_id, &student_id)?;
        if !exam.is_scheduled_for(&student.class_id) {
            return Err(AdmitCardError::ExamNotForClass {
                exam_id: exam.id,
                class_id: student.class_id,
            });
        }

        let receipt = self
            .ledger
            .record_payment(&school_id, &student_id, &exam_id, amount, payment_method)
            .map_err(AdmitCardError::Payment)?;
        info!(%school_id, %student_id, %exam_id, amount, method = payment_method.label(), "fee payment recorded");

        let state = self.post_payment_state(&school_id, &student_id, &exam_id);
        if let PostPaymentState::Deferred { reason } = &state {
            warn!(%school_id, %student_id, %exam_id, reason, "card generation deferred after payment");
        }

        Ok(PaymentOutcome { receipt, state })
    }

    fn post_payment_state(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
        exam_id: &ExamId,
    ) -> PostPaymentState {
        let fee = match self.ledger.fee_status(school_id, student_id, exam_id) {
            Ok(fee) => fee,
            Err(err) => {
                return PostPaymentState::Deferred {
                    reason: err.to_string(),
                }
            }
        };

        let key = AdmitCardKey {
            school_id: school_id.clone(),
            exam_id: exam_id.clone(),
            student_id: student_id.clone(),
        };
        match self.cards.fetch(&key) {
            Ok(Some(record)) => return PostPaymentState::Issued(record),
            Ok(None) => {}
            Err(err) => {
                return PostPaymentState::Deferred {
                    reason: err.to_string(),
                }
            }
        }

        let settings = self.policies.get(school_id);
        let verdict = evaluate(&settings, &fee);
        if !verdict.is_eligible {
            return PostPaymentState::ThresholdUnmet {
                fee: fee.view(),
                verdict,
            };
        }

        match self.generate_inner(school_id, exam_id, student_id, false) {
            Ok(record) => PostPaymentState::Issued(record),
            Err(err) => PostPaymentState::Deferred {
                reason: err.to_string(),
            },
        }
    }

    /// Run the per-student pipeline for a whole class and fold the outcomes.
    ///
    /// At most `bulk_workers` students are in flight at once. One student's
    /// failure (including a panicked task) becomes a report entry; the batch
    /// itself always completes. With `force`, ineligible students still get a
    /// card flagged `fee_pending_at_issue` and count toward both
    /// `generated_count` and `pending_fee_count`.
    pub async fn bulk_generate(
        &self,
        school_id: &SchoolId,
        exam_id: &ExamId,
        class_id: &ClassId,
        force: bool,
    ) -> Result<BulkReport, AdmitCardError> {
        self.require_school(school_id)?;
        let exam = self.require_exam(school_id, exam_id)?;
        self.require_class(school_id, class_id)?;
        if !exam.is_scheduled_for(class_id) {
            return Err(AdmitCardError::ExamNotForClass {
                exam_id: exam.id,
                class_id: class_id.clone(),
            });
        }

        let roster = self.directory.roster(school_id, class_id)?;
        let total_students = roster.len() as u32;

        let mut join_set: JoinSet<(StudentId, Result<AdmitCardRecord, AdmitCardError>)> =
            JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, StudentId> = HashMap::new();
        let mut outcomes = Vec::with_capacity(roster.len());

        for student_id in roster {
            while join_set.len() >= self.bulk_workers {
                if let Some(outcome) = Self::join_one(&mut join_set, &mut in_flight).await {
                    outcomes.push(outcome);
                }
            }

            let service = self.clone();
            let school = school_id.clone();
            let exam = exam_id.clone();
            let student = student_id.clone();
            let handle = join_set.spawn(async move {
                let result = service.generate_inner(&school, &exam, &student, force);
                (student, result)
            });
            in_flight.insert(handle.id(), student_id);
        }

        while let Some(outcome) = Self::join_one(&mut join_set, &mut in_flight).await {
            outcomes.push(outcome);
        }

        let report = merge_outcomes(
            school_id.clone(),
            exam_id.clone(),
            class_id.clone(),
            total_students,
            outcomes,
        );
        info!(
            %school_id, %exam_id, %class_id,
            total = report.total_students,
            generated = report.generated_count,
            pending_fee = report.pending_fee_count,
            failed = report.failures.len(),
            "bulk admit card generation completed"
        );
        Ok(report)
    }

    /// Await one bulk task, degrading a panic into a per-student failure.
    async fn join_one(
        join_set: &mut JoinSet<(StudentId, Result<AdmitCardRecord, AdmitCardError>)>,
        in_flight: &mut HashMap<tokio::task::Id, StudentId>,
    ) -> Option<StudentOutcome> {
        match join_set.join_next_with_id().await? {
            Ok((task_id, (student_id, result))) => {
                in_flight.remove(&task_id);
                Some(StudentOutcome::classify(student_id, result))
            }
            Err(join_err) => {
                let student_id = in_flight
                    .remove(&join_err.id())
                    .unwrap_or_else(|| StudentId("unknown".to_string()));
                Some(StudentOutcome::Failed {
                    student_id,
                    reason: format!("generation task failed: {join_err}"),
                })
            }
        }
    }

    fn require_school(&self, school_id: &SchoolId) -> Result<SchoolProfile, AdmitCardError> {
        self.directory
            .school(school_id)?
            .ok_or_else(|| AdmitCardError::SchoolNotFound(school_id.clone()))
    }

    fn require_exam(
        &self,
        school_id: &SchoolId,
        exam_id: &ExamId,
    ) -> Result<Exam, AdmitCardError> {
        self.directory
            .exam(school_id, exam_id)?
            .ok_or_else(|| AdmitCardError::ExamNotFound(exam_id.clone()))
    }

    fn require_student(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
    ) -> Result<StudentProfile, AdmitCardError> {
        self.directory
            .student(school_id, student_id)?
            .ok_or_else(|| AdmitCardError::StudentNotFound(student_id.clone()))
    }

    fn require_class(
        &self,
        school_id: &SchoolId,
        class_id: &ClassId,
    ) -> Result<ClassRecord, AdmitCardError> {
        self.directory
            .class(school_id, class_id)?
            .ok_or_else(|| AdmitCardError::ClassNotFound(class_id.clone()))
    }
}

/// Error raised by the admit card operations.
#[derive(Debug, thiserror::Error)]
pub enum AdmitCardError {
    #[error(transparent)]
    InvalidSettings(#[from] SettingsError),
    #[error("payment amount must be greater than zero")]
    InvalidAmount,
    #[error("school '{0}' not found")]
    SchoolNotFound(SchoolId),
    #[error("exam '{0}' not found")]
    ExamNotFound(ExamId),
    #[error("student '{0}' not found")]
    StudentNotFound(StudentId),
    #[error("class '{0}' not found")]
    ClassNotFound(ClassId),
    #[error("exam '{exam_id}' is not scheduled for class '{class_id}'")]
    ExamNotForClass { exam_id: ExamId, class_id: ClassId },
    /// Expected and user-recoverable: the caller routes to pay-to-unlock.
    #[error("fee threshold not met; ₹{min_amount_required} more required")]
    NotEligible { min_amount_required: u32 },
    /// The payment itself failed; no admit card side effect happened.
    #[error("payment failed: {0}")]
    Payment(#[source] LedgerError),
    /// Fee lookup failed; transient, retry later.
    #[error("fee ledger lookup failed: {0}")]
    Ledger(#[source] LedgerError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    SettingsStore(#[from] SettingsStoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
