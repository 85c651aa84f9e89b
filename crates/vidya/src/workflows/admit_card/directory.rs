use super::domain::{
    ClassId, ClassRecord, Exam, ExamId, SchoolId, SchoolProfile, StudentId, StudentProfile,
};

/// Read-only window onto the school/exam/student CRUD that lives outside
/// this core. Lookups return `None` for unknown identifiers; `Err` is
/// reserved for the backing service being unreachable.
pub trait SchoolDirectory: Send + Sync {
    fn school(&self, school_id: &SchoolId) -> Result<Option<SchoolProfile>, DirectoryError>;

    fn exam(&self, school_id: &SchoolId, exam_id: &ExamId) -> Result<Option<Exam>, DirectoryError>;

    /// Every exam created for the school, any class.
    fn exams(&self, school_id: &SchoolId) -> Result<Vec<Exam>, DirectoryError>;

    fn student(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
    ) -> Result<Option<StudentProfile>, DirectoryError>;

    fn class(
        &self,
        school_id: &SchoolId,
        class_id: &ClassId,
    ) -> Result<Option<ClassRecord>, DirectoryError>;

    /// Student ids enrolled in the class. Callers resolve the class first, so
    /// an unknown class here is indistinguishable from an empty one.
    fn roster(
        &self,
        school_id: &SchoolId,
        class_id: &ClassId,
    ) -> Result<Vec<StudentId>, DirectoryError>;
}

/// Directory transport failure; treated as transient by the workflow.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("school directory unavailable: {0}")]
    Unavailable(String),
}
