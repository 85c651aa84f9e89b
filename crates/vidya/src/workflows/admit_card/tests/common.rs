use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use axum::response::Response;
use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::workflows::admit_card::directory::{DirectoryError, SchoolDirectory};
use crate::workflows::admit_card::domain::{
    AdmitCardKey, AdmitCardNo, AdmitCardRecord, ClassId, ClassRecord, Exam, ExamId, ExamKind,
    FeeStatus, SchoolId, SchoolProfile, StudentId, StudentProfile,
};
use crate::workflows::admit_card::fees::{FeeLedger, LedgerError, PaymentMethod, PaymentReceipt};
use crate::workflows::admit_card::service::AdmitCardService;
use crate::workflows::admit_card::settings::{
    AdmitCardSettings, SettingsStore, SettingsStoreError,
};
use crate::workflows::admit_card::store::{AdmitCardStore, CardDraft, IssueOutcome, StoreError};
use crate::workflows::admit_card::admit_card_router;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Fixed "today" inside the annual exam window, for deterministic views.
pub(super) fn today() -> NaiveDate {
    date(2026, 3, 5)
}

pub(super) fn school_id() -> SchoolId {
    SchoolId("sunrise".to_string())
}

pub(super) fn class_10a() -> ClassId {
    ClassId("10-a".to_string())
}

pub(super) fn class_10b() -> ClassId {
    ClassId("10-b".to_string())
}

pub(super) fn annual_exam_id() -> ExamId {
    ExamId("annual-2026".to_string())
}

pub(super) fn quarterly_exam_id() -> ExamId {
    ExamId("quarterly-2025".to_string())
}

/// Class 10-A, photo on file.
pub(super) fn asha() -> StudentId {
    StudentId("stu-101".to_string())
}

/// Class 10-A, no photo on file.
pub(super) fn vikram() -> StudentId {
    StudentId("stu-102".to_string())
}

/// Class 10-A.
pub(super) fn meera() -> StudentId {
    StudentId("stu-103".to_string())
}

/// Class 10-B.
pub(super) fn rohan() -> StudentId {
    StudentId("stu-201".to_string())
}

pub(super) fn seeded_directory() -> MemoryDirectory {
    let mut directory = MemoryDirectory::default();
    let school = school_id();

    directory.schools.insert(
        school.clone(),
        SchoolProfile {
            id: school.clone(),
            name: "Sunrise Public School".to_string(),
            address: "14 Lakeview Road, Pune".to_string(),
            logo_ref: Some("assets/sunrise/logo.png".to_string()),
            seal_ref: Some("assets/sunrise/seal.png".to_string()),
            director: "A. Deshmukh".to_string(),
            principal: "S. Verma".to_string(),
        },
    );

    directory.classes.insert(
        (school.clone(), class_10a()),
        ClassRecord {
            id: class_10a(),
            label: "Class 10-A".to_string(),
            teacher: "R. Iyer".to_string(),
        },
    );
    directory.classes.insert(
        (school.clone(), class_10b()),
        ClassRecord {
            id: class_10b(),
            label: "Class 10-B".to_string(),
            teacher: "K. Bose".to_string(),
        },
    );

    directory.exams.insert(
        (school.clone(), annual_exam_id()),
        Exam {
            id: annual_exam_id(),
            name: "Annual Examination 2026".to_string(),
            kind: ExamKind::Annual,
            starts_on: date(2026, 3, 2),
            ends_on: date(2026, 3, 12),
            class_ids: vec![class_10a(), class_10b()],
            instructions: vec![
                "Carry this card to every paper.".to_string(),
                "Reach the hall 20 minutes early.".to_string(),
            ],
        },
    );
    directory.exams.insert(
        (school.clone(), quarterly_exam_id()),
        Exam {
            id: quarterly_exam_id(),
            name: "Quarterly Examination 2025".to_string(),
            kind: ExamKind::Quarterly,
            starts_on: date(2025, 9, 10),
            ends_on: date(2025, 9, 18),
            class_ids: vec![class_10a()],
            instructions: Vec::new(),
        },
    );

    for (student_id, name, class_id, roll_no, photo_ref) in [
        (asha(), "Asha Rao", class_10a(), "12", Some("photos/stu-101.jpg")),
        (vikram(), "Vikram Shah", class_10a(), "13", None),
        (meera(), "Meera Nair", class_10a(), "14", Some("photos/stu-103.jpg")),
        (rohan(), "Rohan Das", class_10b(), "07", Some("photos/stu-201.jpg")),
    ] {
        directory.students.insert(
            (school.clone(), student_id.clone()),
            StudentProfile {
                id: student_id,
                name: name.to_string(),
                class_id,
                roll_no: roll_no.to_string(),
                photo_ref: photo_ref.map(str::to_string),
            },
        );
    }

    directory
}

pub(super) struct Deps {
    pub(super) policies: Arc<MemorySettings>,
    pub(super) directory: Arc<MemoryDirectory>,
    pub(super) ledger: Arc<MemoryLedger>,
    pub(super) cards: Arc<MemoryCardStore>,
}

pub(super) fn seeded_deps() -> Deps {
    deps_with_directory(seeded_directory())
}

pub(super) fn deps_with_directory(directory: MemoryDirectory) -> Deps {
    Deps {
        policies: Arc::new(MemorySettings::default()),
        directory: Arc::new(directory),
        ledger: Arc::new(MemoryLedger::default()),
        cards: Arc::new(MemoryCardStore::default()),
    }
}

pub(super) fn service_from(
    deps: &Deps,
) -> AdmitCardService<MemorySettings, MemoryDirectory, MemoryLedger, MemoryCardStore> {
    AdmitCardService::new(
        deps.policies.clone(),
        deps.directory.clone(),
        deps.ledger.clone(),
        deps.cards.clone(),
        4,
    )
}

pub(super) fn router_from(deps: &Deps) -> axum::Router {
    admit_card_router(Arc::new(service_from(deps)))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 16)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    pub(super) schools: HashMap<SchoolId, SchoolProfile>,
    pub(super) classes: HashMap<(SchoolId, ClassId), ClassRecord>,
    pub(super) exams: HashMap<(SchoolId, ExamId), Exam>,
    pub(super) students: HashMap<(SchoolId, StudentId), StudentProfile>,
}

impl SchoolDirectory for MemoryDirectory {
    fn school(&self, school_id: &SchoolId) -> Result<Option<SchoolProfile>, DirectoryError> {
        Ok(self.schools.get(school_id).cloned())
    }

    fn exam(&self, school_id: &SchoolId, exam_id: &ExamId) -> Result<Option<Exam>, DirectoryError> {
        Ok(self.exams.get(&(school_id.clone(), exam_id.clone())).cloned())
    }

    fn exams(&self, school_id: &SchoolId) -> Result<Vec<Exam>, DirectoryError> {
        let mut exams: Vec<Exam> = self
            .exams
            .iter()
            .filter(|((school, _), _)| school == school_id)
            .map(|(_, exam)| exam.clone())
            .collect();
        exams.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(exams)
    }

    fn student(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
    ) -> Result<Option<StudentProfile>, DirectoryError> {
        Ok(self
            .students
            .get(&(school_id.clone(), student_id.clone()))
            .cloned())
    }

    fn class(
        &self,
        school_id: &SchoolId,
        class_id: &ClassId,
    ) -> Result<Option<ClassRecord>, DirectoryError> {
        Ok(self
            .classes
            .get(&(school_id.clone(), class_id.clone()))
            .cloned())
    }

    fn roster(
        &self,
        school_id: &SchoolId,
        class_id: &ClassId,
    ) -> Result<Vec<StudentId>, DirectoryError> {
        let mut roster: Vec<StudentId> = self
            .students
            .iter()
            .filter(|((school, _), student)| school == school_id && student.class_id == *class_id)
            .map(|(_, student)| student.id.clone())
            .collect();
        roster.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(roster)
    }
}

#[derive(Default)]
pub(super) struct MemorySettings {
    saved: RwLock<HashMap<SchoolId, AdmitCardSettings>>,
}

impl SettingsStore for MemorySettings {
    fn get(&self, school_id: &SchoolId) -> AdmitCardSettings {
        self.saved
            .read()
            .expect("settings lock poisoned")
            .get(school_id)
            .copied()
            .unwrap_or_default()
    }

    fn save(
        &self,
        school_id: &SchoolId,
        settings: AdmitCardSettings,
    ) -> Result<(), SettingsStoreError> {
        self.saved
            .write()
            .expect("settings lock poisoned")
            .insert(school_id.clone(), settings);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryLedger {
    fees: Mutex<HashMap<(SchoolId, StudentId, ExamId), FeeStatus>>,
    sequence: AtomicU64,
}

impl MemoryLedger {
    pub(super) fn set_fee(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
        exam_id: &ExamId,
        total_fee: u32,
        paid_fee: u32,
    ) {
        self.fees.lock().expect("ledger lock poisoned").insert(
            (school_id.clone(), student_id.clone(), exam_id.clone()),
            FeeStatus {
                total_fee,
                paid_fee,
            },
        );
    }
}

impl FeeLedger for MemoryLedger {
    fn fee_status(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
        exam_id: &ExamId,
    ) -> Result<FeeStatus, LedgerError> {
        Ok(self
            .fees
            .lock()
            .expect("ledger lock poisoned")
            .get(&(school_id.clone(), student_id.clone(), exam_id.clone()))
            .copied()
            .unwrap_or(FeeStatus::zero()))
    }

    fn record_payment(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
        exam_id: &ExamId,
        amount: u32,
        method: PaymentMethod,
    ) -> Result<PaymentReceipt, LedgerError> {
        let mut fees = self.fees.lock().expect("ledger lock poisoned");
        let entry = fees
            .entry((school_id.clone(), student_id.clone(), exam_id.clone()))
            .or_insert(FeeStatus::zero());
        entry.paid_fee = entry.paid_fee.saturating_add(amount);

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentReceipt {
            payment_id: format!("pay-{sequence:06}"),
            amount,
            method,
            recorded_at: Utc::now(),
        })
    }
}

#[derive(Default)]
pub(super) struct MemoryCardStore {
    state: Mutex<CardStoreState>,
}

#[derive(Default)]
struct CardStoreState {
    records: HashMap<AdmitCardKey, AdmitCardRecord>,
    next_no: HashMap<SchoolId, u64>,
}

impl MemoryCardStore {
    pub(super) fn count(&self) -> usize {
        self.state.lock().expect("card store lock poisoned").records.len()
    }
}

impl AdmitCardStore for MemoryCardStore {
    fn issue(&self, draft: CardDraft) -> Result<IssueOutcome, StoreError> {
        let mut state = self.state.lock().expect("card store lock poisoned");
        if let Some(existing) = state.records.get(&draft.key) {
            return Ok(IssueOutcome::Existing(existing.clone()));
        }

        let counter = state
            .next_no
            .entry(draft.key.school_id.clone())
            .or_insert(0);
        *counter += 1;
        let admit_card_no = AdmitCardNo(format!("AC-{:05}", counter));

        let record = AdmitCardRecord {
            school_id: draft.key.school_id.clone(),
            exam_id: draft.key.exam_id.clone(),
            student_id: draft.key.student_id.clone(),
            admit_card_no,
            generated_at: draft.generated_at,
            fee_pending_at_issue: draft.fee_pending_at_issue,
            document: draft.document,
        };
        state.records.insert(draft.key, record.clone());
        Ok(IssueOutcome::Created(record))
    }

    fn fetch(&self, key: &AdmitCardKey) -> Result<Option<AdmitCardRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .expect("card store lock poisoned")
            .records
            .get(key)
            .cloned())
    }

    fn issued_for_exam(
        &self,
        school_id: &SchoolId,
        exam_id: &ExamId,
    ) -> Result<Vec<AdmitCardRecord>, StoreError> {
        let state = self.state.lock().expect("card store lock poisoned");
        let mut records: Vec<AdmitCardRecord> = state
            .records
            .values()
            .filter(|record| record.school_id == *school_id && record.exam_id == *exam_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.admit_card_no.0.cmp(&b.admit_card_no.0));
        Ok(records)
    }
}

/// Ledger whose calls always exceed their deadline.
pub(super) struct TimeoutLedger;

impl FeeLedger for TimeoutLedger {
    fn fee_status(
        &self,
        _school_id: &SchoolId,
        _student_id: &StudentId,
        _exam_id: &ExamId,
    ) -> Result<FeeStatus, LedgerError> {
        Err(LedgerError::Timeout)
    }

    fn record_payment(
        &self,
        _school_id: &SchoolId,
        _student_id: &StudentId,
        _exam_id: &ExamId,
        _amount: u32,
        _method: PaymentMethod,
    ) -> Result<PaymentReceipt, LedgerError> {
        Err(LedgerError::Timeout)
    }
}

/// Ledger that serves reads but refuses every payment.
pub(super) struct RejectingLedger {
    pub(super) fee: FeeStatus,
}

impl FeeLedger for RejectingLedger {
    fn fee_status(
        &self,
        _school_id: &SchoolId,
        _student_id: &StudentId,
        _exam_id: &ExamId,
    ) -> Result<FeeStatus, LedgerError> {
        Ok(self.fee)
    }

    fn record_payment(
        &self,
        _school_id: &SchoolId,
        _student_id: &StudentId,
        _exam_id: &ExamId,
        _amount: u32,
        _method: PaymentMethod,
    ) -> Result<PaymentReceipt, LedgerError> {
        Err(LedgerError::Rejected("card declined".to_string()))
    }
}

/// Accepts the payment, then fails every read after it. Exercises the
/// deferred-generation path without losing the payment.
#[derive(Default)]
pub(super) struct OutageAfterPaymentLedger {
    pub(super) inner: MemoryLedger,
    reads_down: AtomicBool,
}

impl OutageAfterPaymentLedger {
    pub(super) fn set_fee(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
        exam_id: &ExamId,
        total_fee: u32,
        paid_fee: u32,
    ) {
        self.inner
            .set_fee(school_id, student_id, exam_id, total_fee, paid_fee);
    }

    /// Bring reads back, as if the replica recovered.
    pub(super) fn restore(&self) {
        self.reads_down.store(false, Ordering::SeqCst);
    }
}

impl FeeLedger for OutageAfterPaymentLedger {
    fn fee_status(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
        exam_id: &ExamId,
    ) -> Result<FeeStatus, LedgerError> {
        if self.reads_down.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("read replica down".to_string()));
        }
        self.inner.fee_status(school_id, student_id, exam_id)
    }

    fn record_payment(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
        exam_id: &ExamId,
        amount: u32,
        method: PaymentMethod,
    ) -> Result<PaymentReceipt, LedgerError> {
        let receipt = self
            .inner
            .record_payment(school_id, student_id, exam_id, amount, method)?;
        self.reads_down.store(true, Ordering::SeqCst);
        Ok(receipt)
    }
}

/// Ledger that panics for one student, for bulk isolation tests.
pub(super) struct PanicLedger {
    pub(super) target: StudentId,
    pub(super) inner: MemoryLedger,
}

impl FeeLedger for PanicLedger {
    fn fee_status(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
        exam_id: &ExamId,
    ) -> Result<FeeStatus, LedgerError> {
        if *student_id == self.target {
            panic!("ledger corrupted for {student_id}");
        }
        self.inner.fee_status(school_id, student_id, exam_id)
    }

    fn record_payment(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
        exam_id: &ExamId,
        amount: u32,
        method: PaymentMethod,
    ) -> Result<PaymentReceipt, LedgerError> {
        self.inner
            .record_payment(school_id, student_id, exam_id, amount, method)
    }
}

/// Card store that is down for every call.
pub(super) struct UnavailableStore;

impl AdmitCardStore for UnavailableStore {
    fn issue(&self, _draft: CardDraft) -> Result<IssueOutcome, StoreError> {
        Err(StoreError::Unavailable("card store offline".to_string()))
    }

    fn fetch(&self, _key: &AdmitCardKey) -> Result<Option<AdmitCardRecord>, StoreError> {
        Err(StoreError::Unavailable("card store offline".to_string()))
    }

    fn issued_for_exam(
        &self,
        _school_id: &SchoolId,
        _exam_id: &ExamId,
    ) -> Result<Vec<AdmitCardRecord>, StoreError> {
        Err(StoreError::Unavailable("card store offline".to_string()))
    }
}
