//! Registrar loader
//!
//! The registrar carries the three weight parameters every multiplier is
//! derived from, so it is resolved strictly: the deterministic PDA must
//! exist and the decoded values must pass sanity bounds. There is no
//! best-effort fallback; wrong registrar parameters would silently corrupt
//! every total downstream.

use solana_sdk::pubkey::Pubkey;

use crate::constants::{SCALED_FACTOR_BASE, registrar_bounds, registrar_layout};
use crate::error::PowerError;
use crate::rpc::ChainReader;

/// Numeric registrar parameters consumed by the multiplier engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistrarParams {
    /// Saturation horizon: lockups at or beyond this gain the full bonus
    pub lockup_saturation_secs: u64,
    /// Baseline weight for all deposited amounts, scaled by 1e9
    pub baseline_vote_weight_scaled_factor: u64,
    /// Maximum extra weight for a saturated lockup, scaled by 1e9
    pub max_extra_lockup_vote_weight_scaled_factor: u64,
    /// Signed exponent converting native amounts to display units
    pub digit_shift: i8,
}

impl RegistrarParams {
    /// Baseline factor as a plain multiplier (scaled factor / 1e9)
    pub fn baseline(&self) -> f64 {
        self.baseline_vote_weight_scaled_factor as f64 / SCALED_FACTOR_BASE as f64
    }

    /// Max extra factor as a plain multiplier
    pub fn max_extra(&self) -> f64 {
        self.max_extra_lockup_vote_weight_scaled_factor as f64 / SCALED_FACTOR_BASE as f64
    }

    /// Convert a native amount to display units. The governance token uses
    /// 6-decimal base units; all power arithmetic runs on display units.
    pub fn amount_display(&self, amount_native: u64) -> f64 {
        amount_native as f64 / 10f64.powi(i32::from(self.digit_shift.unsigned_abs()))
    }
}

/// Derive the registrar PDA for (realm, governing mint) under the VSR program
pub fn derive_registrar_address(vsr_program: &Pubkey, realm: &Pubkey, governing_token_mint: &Pubkey) -> Pubkey {
    let (address, _bump) = Pubkey::find_program_address(
        &[registrar_layout::SEED_PREFIX, realm.as_ref(), governing_token_mint.as_ref()],
        vsr_program,
    );
    address
}

/// Decode the registrar's first voting-mint config from raw account data
pub fn decode_registrar(data: &[u8]) -> Result<RegistrarParams, PowerError> {
    if data.len() < registrar_layout::MIN_SIZE {
        return Err(PowerError::Config(format!(
            "registrar account too small: {} bytes",
            data.len()
        )));
    }

    let params = RegistrarParams {
        baseline_vote_weight_scaled_factor: read_u64(data, registrar_layout::BASELINE_SCALED_OFFSET),
        max_extra_lockup_vote_weight_scaled_factor: read_u64(data, registrar_layout::MAX_EXTRA_SCALED_OFFSET),
        lockup_saturation_secs: read_u64(data, registrar_layout::SATURATION_SECS_OFFSET),
        digit_shift: data[registrar_layout::DIGIT_SHIFT_OFFSET] as i8,
    };

    validate(&params)?;
    Ok(params)
}

/// Fetch and decode the registrar. A missing account is fatal: scanning for
/// a "close enough" registrar is exactly the failure mode this forbids.
pub async fn load_registrar(
    reader: &ChainReader,
    vsr_program: &Pubkey,
    realm: &Pubkey,
    governing_token_mint: &Pubkey,
) -> Result<RegistrarParams, PowerError> {
    let address = derive_registrar_address(vsr_program, realm, governing_token_mint);

    let data = reader.get_account(&address).await?.ok_or_else(|| {
        PowerError::Config(format!(
            "registrar not found at derived address {} (realm {}, mint {})",
            address, realm, governing_token_mint
        ))
    })?;

    decode_registrar(&data)
}

fn validate(params: &RegistrarParams) -> Result<(), PowerError> {
    let baseline = params.baseline_vote_weight_scaled_factor;
    if !(registrar_bounds::MIN_BASELINE_SCALED..=registrar_bounds::MAX_BASELINE_SCALED).contains(&baseline) {
        return Err(PowerError::InvariantViolation(format!(
            "registrar baseline factor {} outside [{}, {}]",
            baseline,
            registrar_bounds::MIN_BASELINE_SCALED,
            registrar_bounds::MAX_BASELINE_SCALED
        )));
    }

    let max_extra = params.max_extra_lockup_vote_weight_scaled_factor;
    if max_extra > registrar_bounds::MAX_EXTRA_SCALED {
        return Err(PowerError::InvariantViolation(format!(
            "registrar max extra factor {} above {}",
            max_extra,
            registrar_bounds::MAX_EXTRA_SCALED
        )));
    }

    let saturation = params.lockup_saturation_secs;
    if !(registrar_bounds::MIN_SATURATION_SECS..=registrar_bounds::MAX_SATURATION_SECS).contains(&saturation) {
        return Err(PowerError::InvariantViolation(format!(
            "registrar saturation {}s outside [{}s, {}s]",
            saturation,
            registrar_bounds::MIN_SATURATION_SECS,
            registrar_bounds::MAX_SATURATION_SECS
        )));
    }

    Ok(())
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(data[offset..offset + 8].try_into().expect("bounds checked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SECS_PER_YEAR;

    /// Build raw registrar data with the given voting-mint parameters
    fn registrar_data(baseline: u64, max_extra: u64, saturation: u64, digit_shift: i8) -> Vec<u8> {
        let mut data = vec![0u8; 880];
        data[registrar_layout::BASELINE_SCALED_OFFSET..registrar_layout::BASELINE_SCALED_OFFSET + 8]
            .copy_from_slice(&baseline.to_le_bytes());
        data[registrar_layout::MAX_EXTRA_SCALED_OFFSET..registrar_layout::MAX_EXTRA_SCALED_OFFSET + 8]
            .copy_from_slice(&max_extra.to_le_bytes());
        data[registrar_layout::SATURATION_SECS_OFFSET..registrar_layout::SATURATION_SECS_OFFSET + 8]
            .copy_from_slice(&saturation.to_le_bytes());
        data[registrar_layout::DIGIT_SHIFT_OFFSET] = digit_shift as u8;
        data
    }

    #[test]
    fn test_decode_valid_registrar() {
        let data = registrar_data(1_000_000_000, 3_000_000_000, 31_536_000, -6);
        let params = decode_registrar(&data).unwrap();

        assert_eq!(params.baseline_vote_weight_scaled_factor, 1_000_000_000);
        assert_eq!(params.max_extra_lockup_vote_weight_scaled_factor, 3_000_000_000);
        assert_eq!(params.lockup_saturation_secs, 31_536_000);
        assert_eq!(params.digit_shift, -6);
        assert_eq!(params.baseline(), 1.0);
        assert_eq!(params.max_extra(), 3.0);
    }

    #[test]
    fn test_amount_display_divides_by_digit_shift() {
        let data = registrar_data(1_000_000_000, 0, 31_536_000, -6);
        let params = decode_registrar(&data).unwrap();
        assert_eq!(params.amount_display(144_708_981_722), 144_708.981722);
        // Sign of digit_shift does not matter; only the magnitude is applied
        let data = registrar_data(1_000_000_000, 0, 31_536_000, 6);
        let params = decode_registrar(&data).unwrap();
        assert_eq!(params.amount_display(1_000_000), 1.0);
    }

    #[test]
    fn test_zero_baseline_is_fatal() {
        let data = registrar_data(0, 0, 31_536_000, -6);
        let err = decode_registrar(&data).unwrap_err();
        assert!(matches!(err, PowerError::InvariantViolation(_)));
    }

    #[test]
    fn test_saturation_out_of_range_is_fatal() {
        // One day is far below the 1-year floor
        let data = registrar_data(1_000_000_000, 0, 86_400, -6);
        assert!(decode_registrar(&data).is_err());

        // 20 years is above the ceiling
        let data = registrar_data(1_000_000_000, 0, 20 * SECS_PER_YEAR as u64, -6);
        assert!(decode_registrar(&data).is_err());
    }

    #[test]
    fn test_excessive_max_extra_is_fatal() {
        let data = registrar_data(1_000_000_000, 11_000_000_000, 31_536_000, -6);
        assert!(decode_registrar(&data).is_err());
    }

    #[test]
    fn test_truncated_account_is_config_error() {
        let err = decode_registrar(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, PowerError::Config(_)));
    }

    #[test]
    fn test_registrar_pda_is_deterministic() {
        let program = Pubkey::new_unique();
        let realm = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let a = derive_registrar_address(&program, &realm, &mint);
        let b = derive_registrar_address(&program, &realm, &mint);
        assert_eq!(a, b);
        assert_ne!(a, derive_registrar_address(&program, &realm, &Pubkey::new_unique()));
    }
}
