use serde::{Deserialize, Serialize};

use super::domain::SchoolId;

/// Who signs the issued card on behalf of the school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureAuthority {
    Director,
    Principal,
    ClassTeacher,
}

impl SignatureAuthority {
    pub const fn label(self) -> &'static str {
        match self {
            SignatureAuthority::Director => "director",
            SignatureAuthority::Principal => "principal",
            SignatureAuthority::ClassTeacher => "class_teacher",
        }
    }
}

/// Per-school admit card policy, read by every eligibility evaluation.
///
/// Handed to the evaluator as a plain value; nothing in the workflow mutates
/// it in place, so an admin update can never race an in-flight evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmitCardSettings {
    /// Minimum paid-fee percentage (0-100) required before a card is released.
    pub min_fee_percentage: u8,
    /// When false, every student is eligible regardless of fees.
    pub require_fee_clearance: bool,
    pub signature_authority: SignatureAuthority,
    pub show_photo: bool,
    pub show_signature: bool,
    pub show_seal: bool,
}

impl AdmitCardSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.min_fee_percentage > 100 {
            return Err(SettingsError::FeePercentageOutOfRange(
                self.min_fee_percentage,
            ));
        }
        Ok(())
    }
}

impl Default for AdmitCardSettings {
    fn default() -> Self {
        Self {
            min_fee_percentage: 30,
            require_fee_clearance: true,
            signature_authority: SignatureAuthority::Director,
            show_photo: true,
            show_signature: true,
            show_seal: true,
        }
    }
}

/// Rejected policy input, surfaced before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("min_fee_percentage must be between 0 and 100, got {0}")]
    FeePercentageOutOfRange(u8),
}

/// Storage abstraction for the per-school policy singleton.
pub trait SettingsStore: Send + Sync {
    /// Latest saved policy, or [`AdmitCardSettings::default`] when the school
    /// has never saved one. Absence is not an error, and implementations must
    /// not serve a cached value once `save` has returned.
    fn get(&self, school_id: &SchoolId) -> AdmitCardSettings;

    fn save(
        &self,
        school_id: &SchoolId,
        settings: AdmitCardSettings,
    ) -> Result<(), SettingsStoreError>;
}

/// Storage-side failure; validation never reaches here.
#[derive(Debug, thiserror::Error)]
pub enum SettingsStoreError {
    #[error("settings store unavailable: {0}")]
    Unavailable(String),
}
