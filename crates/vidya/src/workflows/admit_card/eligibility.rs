use serde::{Deserialize, Serialize};

use super::domain::FeeStatus;
use super::settings::AdmitCardSettings;

/// Outcome of one eligibility evaluation. Never stored; recomputed from the
/// live policy and ledger figures on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub is_eligible: bool,
    /// Exact additional payment that would clear the threshold. Zero whenever
    /// the threshold is already met or no fee is assigned.
    pub min_amount_required: u32,
}

/// Combine the school policy with a student's fee figures.
///
/// Pure and total: identical inputs always produce the identical verdict,
/// and no input can make it fail. All money math is integer arithmetic so
/// boundary percentages behave exactly.
pub fn evaluate(settings: &AdmitCardSettings, fee: &FeeStatus) -> EligibilityVerdict {
    // Policy objects above 100% cannot be saved; clamp anyway so a bad value
    // degrades to "full clearance" instead of overflowing the shortfall.
    let min_pct = settings.min_fee_percentage.min(100);

    let is_eligible = !settings.require_fee_clearance || meets_threshold(min_pct, fee);

    EligibilityVerdict {
        is_eligible,
        min_amount_required: shortfall(min_pct, fee),
    }
}

fn meets_threshold(min_pct: u8, fee: &FeeStatus) -> bool {
    if fee.total_fee == 0 {
        // Paid percentage is defined as 0 for an unassigned fee, so only a
        // zero threshold can pass.
        return min_pct == 0;
    }
    u64::from(fee.paid_fee) * 100 >= u64::from(fee.total_fee) * u64::from(min_pct)
}

/// `max(0, ceil(pct% of total) - paid)`; never exceeds the pending fee.
fn shortfall(min_pct: u8, fee: &FeeStatus) -> u32 {
    let target = (u64::from(fee.total_fee) * u64::from(min_pct)).div_ceil(100);
    target.saturating_sub(u64::from(fee.paid_fee)) as u32
}
