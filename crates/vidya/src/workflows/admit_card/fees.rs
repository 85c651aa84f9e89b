use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ExamId, FeeStatus, SchoolId, StudentId};

/// Payment channels accepted by the fee counter and the online gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    NetBanking,
    Wallet,
}

impl PaymentMethod {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::NetBanking => "net_banking",
            PaymentMethod::Wallet => "wallet",
        }
    }
}

/// Ledger acknowledgement for one recorded payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment_id: String,
    pub amount: u32,
    pub method: PaymentMethod,
    pub recorded_at: DateTime<Utc>,
}

/// Boundary to the external fee ledger and payment gateway.
///
/// Both calls cross the network, so implementations must carry their own
/// deadline and report expiry as [`LedgerError::Timeout`]. The workflow
/// treats a timeout as transient (retry later), never as an eligibility
/// verdict.
pub trait FeeLedger: Send + Sync {
    /// Fee figures for the student and exam. A student with no fee record
    /// yields [`FeeStatus::zero`], not an error.
    fn fee_status(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
        exam_id: &ExamId,
    ) -> Result<FeeStatus, LedgerError>;

    /// Append a payment to the ledger. Once this returns `Ok` the payment is
    /// durable regardless of what happens to card generation afterwards.
    fn record_payment(
        &self,
        school_id: &SchoolId,
        student_id: &StudentId,
        exam_id: &ExamId,
        amount: u32,
        method: PaymentMethod,
    ) -> Result<PaymentReceipt, LedgerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Call deadline exceeded. Transient and retryable.
    #[error("fee ledger timed out")]
    Timeout,
    #[error("fee ledger unavailable: {0}")]
    Unavailable(String),
    /// The gateway or ledger refused the payment itself.
    #[error("payment rejected: {0}")]
    Rejected(String),
}
