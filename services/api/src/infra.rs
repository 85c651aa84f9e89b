use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use vidya::workflows::admit_card::{
    AdmitCardKey, AdmitCardNo, AdmitCardRecord, AdmitCardSettings, AdmitCardStore, CardDraft,
    ClassId, ClassRecord, DirectoryError, Exam, ExamId, ExamKind, FeeLedger, FeeStatus,
    IssueOutcome, LedgerError, PaymentMethod, PaymentReceipt, SchoolDirectory, SchoolId,
    SchoolProfile, SettingsStore, SettingsStoreError, StoreError, StudentId, StudentProfile,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemorySettingsStore {
    saved: RwLock<HashMap<SchoolId, AdmitCardSettings>>,
}

impl SettingsStore for InMemorySettingsStore {
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
pub(crate) struct InMemorySchoolDirectory {
    schools: HashMap<SchoolId, SchoolProfile>,
    classes: HashMap<(SchoolId, ClassId), ClassRecord>,
    exams: HashMap<(SchoolId, ExamId), Exam>,
    students: HashMap<(SchoolId, StudentId), StudentProfile>,
}

impl SchoolDirectory for InMemorySchoolDirectory {
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
pub(crate) struct InMemoryFeeLedger {
    fees: Mutex<HashMap<(SchoolId, StudentId, ExamId), FeeStatus>>,
    sequence: AtomicU64,
}

impl InMemoryFeeLedger {
    pub(crate) fn set_fee(
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

impl FeeLedger for InMemoryFeeLedger {
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
            recorded_at: chrono::Utc::now(),
        })
    }
}

#[derive(Default)]
pub(crate) struct InMemoryAdmitCardStore {
    state: Mutex<CardStoreState>,
}

#[derive(Default)]
struct CardStoreState {
    records: HashMap<AdmitCardKey, AdmitCardRecord>,
    next_no: HashMap<SchoolId, u64>,
}

impl AdmitCardStore for InMemoryAdmitCardStore {
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

pub(crate) fn sample_school() -> SchoolId {
    SchoolId("sunrise".to_string())
}

pub(crate) fn sample_class_10a() -> ClassId {
    ClassId("10-a".to_string())
}

pub(crate) fn sample_class_10b() -> ClassId {
    ClassId("10-b".to_string())
}

pub(crate) fn sample_annual_exam() -> ExamId {
    ExamId("annual-2026".to_string())
}

pub(crate) fn sample_student_asha() -> StudentId {
    StudentId("stu-101".to_string())
}

fn seed_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid seed date")
}

/// Directory snapshot for one sample school, stand-in for the admin CRUD.
pub(crate) fn seeded_directory() -> InMemorySchoolDirectory {
    let mut directory = InMemorySchoolDirectory::default();
    let school = sample_school();

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
        (school.clone(), sample_class_10a()),
        ClassRecord {
            id: sample_class_10a(),
            label: "Class 10-A".to_string(),
            teacher: "R. Iyer".to_string(),
        },
    );
    directory.classes.insert(
        (school.clone(), sample_class_10b()),
        ClassRecord {
            id: sample_class_10b(),
            label: "Class 10-B".to_string(),
            teacher: "K. Bose".to_string(),
        },
    );

    directory.exams.insert(
        (school.clone(), sample_annual_exam()),
        Exam {
            id: sample_annual_exam(),
            name: "Annual Examination 2026".to_string(),
            kind: ExamKind::Annual,
            starts_on: seed_date(2026, 3, 2),
            ends_on: seed_date(2026, 3, 12),
            class_ids: vec![sample_class_10a(), sample_class_10b()],
            instructions: vec![
                "Carry this card to every paper.".to_string(),
                "Reach the hall 20 minutes early.".to_string(),
            ],
        },
    );
    directory.exams.insert(
        (school.clone(), ExamId("quarterly-2025".to_string())),
        Exam {
            id: ExamId("quarterly-2025".to_string()),
            name: "Quarterly Examination 2025".to_string(),
            kind: ExamKind::Quarterly,
            starts_on: seed_date(2025, 9, 10),
            ends_on: seed_date(2025, 9, 18),
            class_ids: vec![sample_class_10a()],
            instructions: Vec::new(),
        },
    );

    for (student_id, name, class_id, roll_no, photo_ref) in [
        ("stu-101", "Asha Rao", sample_class_10a(), "12", Some("photos/stu-101.jpg")),
        ("stu-102", "Vikram Shah", sample_class_10a(), "13", None),
        ("stu-103", "Meera Nair", sample_class_10a(), "14", Some("photos/stu-103.jpg")),
        ("stu-201", "Rohan Das", sample_class_10b(), "07", Some("photos/stu-201.jpg")),
    ] {
        let student_id = StudentId(student_id.to_string());
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

/// Fee figures to pair with [`seeded_directory`]: one student short of the
/// default 30% threshold, one exactly at it, one fully paid, one unpaid.
pub(crate) fn seeded_ledger() -> InMemoryFeeLedger {
    let ledger = InMemoryFeeLedger::default();
    let school = sample_school();
    let annual = sample_annual_exam();
    let quarterly = ExamId("quarterly-2025".to_string());

    ledger.set_fee(&school, &StudentId("stu-101".to_string()), &annual, 10_000, 2_000);
    ledger.set_fee(&school, &StudentId("stu-102".to_string()), &annual, 10_000, 3_000);
    ledger.set_fee(&school, &StudentId("stu-103".to_string()), &annual, 10_000, 10_000);
    ledger.set_fee(&school, &StudentId("stu-201".to_string()), &annual, 8_000, 0);

    ledger.set_fee(&school, &StudentId("stu-101".to_string()), &quarterly, 4_000, 4_000);
    ledger.set_fee(&school, &StudentId("stu-102".to_string()), &quarterly, 4_000, 1_000);
    ledger.set_fee(&school, &StudentId("stu-103".to_string()), &quarterly, 4_000, 4_000);

    ledger
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
