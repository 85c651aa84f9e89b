use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::settings::{AdmitCardSettings, SignatureAuthority};

/// Identifier wrapper for a tenant school.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchoolId(pub String);

/// Identifier wrapper for an enrolled student.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for an exam created by the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExamId(pub String);

/// Identifier wrapper for a class/section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassId(pub String);

/// Admit card number, unique per school, assigned exactly once at generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdmitCardNo(pub String);

impl fmt::Display for SchoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ExamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AdmitCardNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exam categories offered by the academic calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamKind {
    UnitTest,
    Quarterly,
    HalfYearly,
    Annual,
}

impl ExamKind {
    pub const fn label(self) -> &'static str {
        match self {
            ExamKind::UnitTest => "unit_test",
            ExamKind::Quarterly => "quarterly",
            ExamKind::HalfYearly => "half_yearly",
            ExamKind::Annual => "annual",
        }
    }
}

/// Lifecycle phase of an exam, derived from its dates rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    Upcoming,
    Ongoing,
    Completed,
}

impl ExamStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ExamStatus::Upcoming => "upcoming",
            ExamStatus::Ongoing => "ongoing",
            ExamStatus::Completed => "completed",
        }
    }
}

/// Exam record as served by the external admin CRUD; read-only inside the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub name: String,
    pub kind: ExamKind,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub class_ids: Vec<ClassId>,
    pub instructions: Vec<String>,
}

impl Exam {
    /// Both boundary dates count as part of the exam window.
    pub fn status(&self, today: NaiveDate) -> ExamStatus {
        if today < self.starts_on {
            ExamStatus::Upcoming
        } else if today > self.ends_on {
            ExamStatus::Completed
        } else {
            ExamStatus::Ongoing
        }
    }

    pub fn is_scheduled_for(&self, class_id: &ClassId) -> bool {
        self.class_ids.iter().any(|id| id == class_id)
    }

    pub fn view(&self, today: NaiveDate) -> ExamView {
        ExamView {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            starts_on: self.starts_on,
            ends_on: self.ends_on,
            status: self.status(today).label(),
            instructions: self.instructions.clone(),
        }
    }
}

/// Exam payload exposed over the API, with the derived status attached.
#[derive(Debug, Clone, Serialize)]
pub struct ExamView {
    pub id: ExamId,
    pub name: String,
    pub kind: ExamKind,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub status: &'static str,
    pub instructions: Vec<String>,
}

/// Student snapshot from the directory; the core never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub name: String,
    pub class_id: ClassId,
    pub roll_no: String,
    pub photo_ref: Option<String>,
}

/// Class/section snapshot with the assigned class teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub id: ClassId,
    pub label: String,
    pub teacher: String,
}

/// School branding and signatory data used on the printed card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolProfile {
    pub id: SchoolId,
    pub name: String,
    pub address: String,
    pub logo_ref: Option<String>,
    pub seal_ref: Option<String>,
    pub director: String,
    pub principal: String,
}

/// Fee figures for one (school, student, exam), supplied by the external ledger.
///
/// `pending_fee` and `paid_percentage` are always derived so a payment made
/// through any channel is reflected on the next read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeStatus {
    pub total_fee: u32,
    pub paid_fee: u32,
}

impl FeeStatus {
    pub const fn zero() -> Self {
        Self {
            total_fee: 0,
            paid_fee: 0,
        }
    }

    pub fn pending_fee(&self) -> u32 {
        self.total_fee.saturating_sub(self.paid_fee)
    }

    /// Defined as 0% when no fee is assigned, so a missing ledger entry is a
    /// conservative "nothing paid" rather than a division error.
    pub fn paid_percentage(&self) -> f64 {
        if self.total_fee == 0 {
            return 0.0;
        }
        f64::from(self.paid_fee) * 100.0 / f64::from(self.total_fee)
    }

    pub fn view(&self) -> FeeStatusView {
        FeeStatusView {
            total_fee: self.total_fee,
            paid_fee: self.paid_fee,
            pending_fee: self.pending_fee(),
            paid_percentage: self.paid_percentage(),
        }
    }
}

/// Fee figures plus the derived fields, as serialized in API responses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeeStatusView {
    pub total_fee: u32,
    pub paid_fee: u32,
    pub pending_fee: u32,
    pub paid_percentage: f64,
}

/// Uniqueness key for admit card records: one card per student per exam.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdmitCardKey {
    pub school_id: SchoolId,
    pub exam_id: ExamId,
    pub student_id: StudentId,
}

/// School branding block embedded in the card payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolBlock {
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_ref: Option<String>,
}

/// Student block embedded in the card payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentBlock {
    pub name: String,
    pub roll_no: String,
    pub class_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
}

/// Exam block embedded in the card payload, frozen at generation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamBlock {
    pub name: String,
    pub kind: ExamKind,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub instructions: Vec<String>,
}

/// Signing authority block, present only when the policy shows a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatoryBlock {
    pub authority: SignatureAuthority,
    pub name: String,
}

/// Immutable document payload behind a generated admit card.
///
/// Everything here is a snapshot: later edits to the exam, the student, or
/// the settings do not rewrite an already issued card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmitCardDocument {
    pub school: SchoolBlock,
    pub student: StudentBlock,
    pub exam: ExamBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatory: Option<SignatoryBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seal_ref: Option<String>,
}

impl AdmitCardDocument {
    /// Assemble the printable payload, honoring the school's display policy.
    pub fn assemble(
        school: &SchoolProfile,
        class: &ClassRecord,
        exam: &Exam,
        student: &StudentProfile,
        settings: &AdmitCardSettings,
    ) -> Self {
        let signatory = settings.show_signature.then(|| {
            let name = match settings.signature_authority {
                SignatureAuthority::Director => school.director.clone(),
                SignatureAuthority::Principal => school.principal.clone(),
                SignatureAuthority::ClassTeacher => class.teacher.clone(),
            };
            SignatoryBlock {
                authority: settings.signature_authority,
                name,
            }
        });

        Self {
            school: SchoolBlock {
                name: school.name.clone(),
                address: school.address.clone(),
                logo_ref: school.logo_ref.clone(),
            },
            student: StudentBlock {
                name: student.name.clone(),
                roll_no: student.roll_no.clone(),
                class_label: class.label.clone(),
                photo_ref: settings
                    .show_photo
                    .then(|| student.photo_ref.clone())
                    .flatten(),
            },
            exam: ExamBlock {
                name: exam.name.clone(),
                kind: exam.kind,
                starts_on: exam.starts_on,
                ends_on: exam.ends_on,
                instructions: exam.instructions.clone(),
            },
            signatory,
            seal_ref: settings.show_seal.then(|| school.seal_ref.clone()).flatten(),
        }
    }
}

/// Persisted admit card. A stored record IS a generated card; eligibility is
/// never stored and is recomputed from live settings and fees on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmitCardRecord {
    pub school_id: SchoolId,
    pub exam_id: ExamId,
    pub student_id: StudentId,
    pub admit_card_no: AdmitCardNo,
    pub generated_at: DateTime<Utc>,
    /// Set only on admin-forced issuance to a student whose fees were still
    /// short at that moment; drives the pending-fee follow-up list.
    pub fee_pending_at_issue: bool,
    pub document: AdmitCardDocument,
}

impl AdmitCardRecord {
    pub fn key(&self) -> AdmitCardKey {
        AdmitCardKey {
            school_id: self.school_id.clone(),
            exam_id: self.exam_id.clone(),
            student_id: self.student_id.clone(),
        }
    }

    pub fn view(&self) -> AdmitCardView {
        AdmitCardView {
            admit_card_no: self.admit_card_no.clone(),
            is_generated: true,
            generated_at: self.generated_at,
            fee_pending_at_issue: self.fee_pending_at_issue,
            document: self.document.clone(),
        }
    }
}

/// Card payload exposed over the API once generated.
#[derive(Debug, Clone, Serialize)]
pub struct AdmitCardView {
    pub admit_card_no: AdmitCardNo,
    pub is_generated: bool,
    pub generated_at: DateTime<Utc>,
    pub fee_pending_at_issue: bool,
    pub document: AdmitCardDocument,
}
