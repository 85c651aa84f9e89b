use serde::Serialize;

use super::domain::{ClassId, ExamId, SchoolId, StudentId};
use super::service::AdmitCardError;

/// Aggregate outcome of one class-wide generation run.
///
/// The run always completes: per-student problems land in the counters or in
/// `failures`, never as an error for the batch itself.
#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub school_id: SchoolId,
    pub exam_id: ExamId,
    pub class_id: ClassId,
    /// Roster size, regardless of per-student outcomes.
    pub total_students: u32,
    pub generated_count: u32,
    pub pending_fee_count: u32,
    pub failures: Vec<BulkFailure>,
}

/// A student the batch could not process; not generated, not pending-fee.
#[derive(Debug, Clone, Serialize)]
pub struct BulkFailure {
    pub student_id: StudentId,
    pub reason: String,
}

/// Classified result of one student's pass through the generation pipeline.
#[derive(Debug)]
pub(crate) enum StudentOutcome {
    /// A card exists after the call (created now or on an earlier run).
    Issued { fee_pending: bool },
    /// Fee threshold unmet and the run was not forced; no card created.
    FeesPending,
    Failed {
        student_id: StudentId,
        reason: String,
    },
}

impl StudentOutcome {
    pub(crate) fn classify(
        student_id: StudentId,
        result: Result<super::domain::AdmitCardRecord, AdmitCardError>,
    ) -> Self {
        match result {
            Ok(record) => StudentOutcome::Issued {
                fee_pending: record.fee_pending_at_issue,
            },
            Err(AdmitCardError::NotEligible { .. }) => StudentOutcome::FeesPending,
            Err(other) => StudentOutcome::Failed {
                student_id,
                reason: other.to_string(),
            },
        }
    }
}

/// Fold per-student outcomes into the report. Pure; the counts are sums over
/// the collected outcomes rather than shared mutable counters.
pub(crate) fn merge_outcomes(
    school_id: SchoolId,
    exam_id: ExamId,
    class_id: ClassId,
    total_students: u32,
    outcomes: Vec<StudentOutcome>,
) -> BulkReport {
    let mut report = BulkReport {
        school_id,
        exam_id,
        class_id,
        total_students,
        generated_count: 0,
        pending_fee_count: 0,
        failures: Vec::new(),
    };

    for outcome in outcomes {
        match outcome {
            StudentOutcome::Issued { fee_pending } => {
                report.generated_count += 1;
                if fee_pending {
                    report.pending_fee_count += 1;
                }
            }
            StudentOutcome::FeesPending => report.pending_fee_count += 1,
            StudentOutcome::Failed { student_id, reason } => {
                report.failures.push(BulkFailure { student_id, reason });
            }
        }
    }

    report
}
