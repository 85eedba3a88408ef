//! Per-deposit lockup multiplier
//!
//! Cliff and Monthly lockups weight by time remaining until expiry;
//! Constant and Daily lockups weight by the still-locked fraction of the
//! lockup duration. Both saturate at the registrar's horizon. The final
//! multiplier is rounded to 3 fractional digits to match the governance
//! UI's display arithmetic; rounding is applied uniformly to every deposit.
//! No tuning constants: a total that disagrees with the UI is a rounding or
//! decoding problem, not something to patch with a fudge factor.

use crate::constants::{MULTIPLIER_ROUND_DECIMALS, MULTIPLIER_SAFETY_RAIL};
use crate::deposits::{DepositEntry, LockupKind};
use crate::error::PowerError;
use crate::registrar::RegistrarParams;

/// Compute the voting-power multiplier for one deposit at `now`.
///
/// `now` is pinned once per batch; passing it explicitly keeps every wallet
/// in a run on the same clock and lets tests inject time.
pub fn lockup_multiplier(deposit: &DepositEntry, registrar: &RegistrarParams, now: i64) -> f64 {
    let lockup = &deposit.lockup;

    // No lockup, or a lockup ending at or before now, is fully unlocked.
    if lockup.kind == LockupKind::None || lockup.end_ts <= now {
        return 1.0;
    }

    let saturation = registrar.lockup_saturation_secs as f64;
    let baseline_scaled = registrar.baseline_vote_weight_scaled_factor as f64;
    let max_extra_scaled = registrar.max_extra_lockup_vote_weight_scaled_factor as f64;

    let remaining = (lockup.end_ts - lockup.start_ts.max(now)) as f64;
    let duration = ((lockup.end_ts - lockup.start_ts).max(1)) as f64;

    let ratio = match lockup.kind {
        LockupKind::Cliff | LockupKind::Monthly => (remaining / saturation).min(1.0),
        LockupKind::Constant | LockupKind::Daily => {
            let unlocked_ratio = ((now - lockup.start_ts) as f64 / duration).clamp(0.0, 1.0);
            let locked_ratio = 1.0 - unlocked_ratio;
            (locked_ratio * duration / saturation).min(1.0)
        }
        LockupKind::None => unreachable!("handled above"),
    };

    let bonus_scaled = max_extra_scaled * ratio;
    let multiplier = round_to(
        (baseline_scaled + bonus_scaled) / baseline_scaled,
        MULTIPLIER_ROUND_DECIMALS,
    );

    if multiplier > MULTIPLIER_SAFETY_RAIL {
        eprintln!(
            "Warning: multiplier {:.3} clamped to safety rail {} (deposit offset {})",
            multiplier, MULTIPLIER_SAFETY_RAIL, deposit.offset
        );
        return MULTIPLIER_SAFETY_RAIL;
    }

    multiplier
}

/// Verify the multiplier stayed inside its proven bounds. A violation here
/// is a code or config bug, so it halts the batch.
pub fn check_multiplier_bounds(multiplier: f64, registrar: &RegistrarParams) -> Result<(), PowerError> {
    let floor = 1.0;
    let ceiling = 1.0 + registrar.max_extra() / registrar.baseline();
    let epsilon = 0.5 * 10f64.powi(-MULTIPLIER_ROUND_DECIMALS);

    if multiplier < floor - epsilon || multiplier > ceiling + epsilon {
        return Err(PowerError::InvariantViolation(format!(
            "multiplier {} outside [{}, {}]",
            multiplier, floor, ceiling
        )));
    }
    Ok(())
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
