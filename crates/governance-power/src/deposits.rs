//! Voter account deposit parser
//!
//! Decodes the fixed 2,728-byte Voter blob into deposit entries. Two paths:
//! the canonical typed layout, and a probing scan for long-lived accounts
//! whose canonical slots decode to nothing. Every suppressed entry is
//! recorded with its reason; the parser never multiplies or aggregates.
//!
//! Key design decisions:
//! - Layout drift is handled as an explicit fallback, not overlapping probes
//!   mixed into calculation code.
//! - Data-shape failures become filter records, never errors; the aggregator
//!   always receives a complete account audit.
//! - Filter rules apply uniformly to both decode paths.

use serde::{Deserialize, Serialize};

use crate::constants::{SECS_PER_YEAR, filters, scan, voter_layout};
use crate::registrar::RegistrarParams;

// =============================================================================
// Deposit Types
// =============================================================================

/// Lockup flavor of a deposit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockupKind {
    None,
    Daily,
    Monthly,
    Cliff,
    Constant,
}

impl LockupKind {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(LockupKind::None),
            1 => Some(LockupKind::Daily),
            2 => Some(LockupKind::Monthly),
            3 => Some(LockupKind::Cliff),
            4 => Some(LockupKind::Constant),
            _ => None,
        }
    }
}

/// Lockup window for a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lockup {
    pub kind: LockupKind,
    pub start_ts: i64,
    pub end_ts: i64,
}

impl Lockup {
    pub fn none() -> Self {
        Self {
            kind: LockupKind::None,
            start_ts: 0,
            end_ts: 0,
        }
    }
}

/// One live deposit decoded from a Voter account
#[derive(Debug, Clone)]
pub struct DepositEntry {
    /// Byte offset of the entry (canonical: slot offset; scan: amount offset)
    pub offset: u32,
    pub amount_deposited_native: u64,
    pub amount_initially_locked_native: u64,
    pub lockup: Lockup,
}

/// Why an entry was suppressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    Unused,
    Zero,
    OutOfRange,
    Shadow,
    Duplicate,
    ParseError,
}

/// Audit record for one suppressed entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRecord {
    pub offset: u32,
    pub amount: f64,
    pub reason: FilterReason,
}

/// Parser output: live deposits plus the suppression audit
#[derive(Debug, Clone, Default)]
pub struct ParsedDeposits {
    pub deposits: Vec<DepositEntry>,
    pub filtered: Vec<FilterRecord>,
}

// =============================================================================
// Parsing
// =============================================================================

/// Decode all deposits of one Voter account.
///
/// The canonical layout is tried first; the probing scan only runs when no
/// canonical slot is in use, which is the signature of a legacy account.
pub fn parse_voter_deposits(
    data: &[u8],
    registrar: &RegistrarParams,
    shadow_amounts: &[f64],
    now: i64,
) -> ParsedDeposits {
    let mut result = ParsedDeposits::default();

    let candidates = match canonical_entries(data, registrar, &mut result.filtered) {
        entries if !entries.is_empty() => entries,
        _ => scan_entries(data, now),
    };

    apply_filters(data, candidates, registrar, shadow_amounts, &mut result);
    result
}

/// A decoded entry not yet passed through the filter rules
struct RawDeposit {
    offset: u32,
    amount_offset: usize,
    amount_deposited_native: u64,
    amount_initially_locked_native: u64,
    lockup: Lockup,
}

/// Walk the 32 canonical slots. Returns every used entry; unused slots that
/// still carry an amount are recorded as phantoms, silently-empty slots are
/// not audit-worthy.
fn canonical_entries(
    data: &[u8],
    registrar: &RegistrarParams,
    filtered: &mut Vec<FilterRecord>,
) -> Vec<RawDeposit> {
    let mut entries = Vec::new();
    if data.len() != voter_layout::ACCOUNT_SIZE {
        return entries;
    }

    for slot in 0..voter_layout::ENTRY_COUNT {
        let base = voter_layout::HEADER_SIZE + slot * voter_layout::ENTRY_SIZE;
        if base + voter_layout::ENTRY_SIZE > data.len() {
            break;
        }

        let is_used = data[base + voter_layout::ENTRY_IS_USED];
        let amount = read_u64(data, base + voter_layout::ENTRY_AMOUNT_DEPOSITED);

        match is_used {
            0 => {
                if amount > 0 {
                    filtered.push(FilterRecord {
                        offset: base as u32,
                        amount: registrar.amount_display(amount),
                        reason: FilterReason::Unused,
                    });
                }
            }
            1 => {
                let Some(kind) = LockupKind::from_byte(data[base + voter_layout::ENTRY_LOCKUP_KIND]) else {
                    filtered.push(FilterRecord {
                        offset: base as u32,
                        amount: registrar.amount_display(amount),
                        reason: FilterReason::ParseError,
                    });
                    continue;
                };

                entries.push(RawDeposit {
                    offset: base as u32,
                    amount_offset: base + voter_layout::ENTRY_AMOUNT_DEPOSITED,
                    amount_deposited_native: amount,
                    amount_initially_locked_native: read_u64(data, base + voter_layout::ENTRY_AMOUNT_INITIALLY_LOCKED),
                    lockup: Lockup {
                        kind,
                        start_ts: read_i64(data, base + voter_layout::ENTRY_LOCKUP_START_TS),
                        end_ts: read_i64(data, base + voter_layout::ENTRY_LOCKUP_END_TS),
                    },
                });
            }
            // Anything else is not a valid slot marker; the account is not
            // in canonical shape.
            _ => {}
        }
    }

    entries
}

/// Probe the known legacy amount offsets. For each nonzero amount, the first
/// plausible lockup end timestamp within the search window decides the
/// lockup; no timestamp means the deposit is unlocked.
fn scan_entries(data: &[u8], now: i64) -> Vec<RawDeposit> {
    let mut entries = Vec::new();
    let horizon = now + scan::TS_HORIZON_YEARS * SECS_PER_YEAR;

    for &offset in scan::PROBE_OFFSETS.iter() {
        if offset + 8 > data.len() {
            continue;
        }
        let amount = read_u64(data, offset);
        if amount == 0 {
            continue;
        }

        let lockup = match find_lockup_end(data, offset, now, horizon) {
            Some((ts_offset, end_ts)) => {
                let kind = if ts_offset - offset <= scan::CLIFF_TS_MAX_DELTA {
                    LockupKind::Cliff
                } else {
                    LockupKind::Constant
                };
                // The slot before the end timestamp holds the start when the
                // entry shape carries one; otherwise anchor at now.
                let start_candidate = read_i64(data, ts_offset - 8);
                let start_ts = if start_candidate > 0 && start_candidate <= now && start_candidate < end_ts {
                    start_candidate
                } else {
                    now
                };
                Lockup {
                    kind,
                    start_ts,
                    end_ts,
                }
            }
            None => Lockup::none(),
        };

        entries.push(RawDeposit {
            offset: offset as u32,
            amount_offset: offset,
            amount_deposited_native: amount,
            amount_initially_locked_native: amount,
            lockup,
        });
    }

    entries
}

/// Search forward from the amount for the first i64 that reads as a lockup
/// end timestamp in (now, horizon). 8-byte stride; fields are 8-aligned in
/// every observed shape.
fn find_lockup_end(data: &[u8], amount_offset: usize, now: i64, horizon: i64) -> Option<(usize, i64)> {
    let mut offset = amount_offset + 8;
    let window_end = amount_offset + 8 + scan::TS_SEARCH_WINDOW;

    while offset + 8 <= data.len() && offset + 8 <= window_end {
        let ts = read_i64(data, offset);
        if ts > now && ts < horizon {
            return Some((offset, ts));
        }
        offset += 8;
    }
    None
}

// =============================================================================
// Filter Rules
// =============================================================================

/// Apply the uniform suppression rules, in order: zero amount, sanity
/// envelope, shadow sentinel, per-account duplicate.
fn apply_filters(
    data: &[u8],
    candidates: Vec<RawDeposit>,
    registrar: &RegistrarParams,
    shadow_amounts: &[f64],
    result: &mut ParsedDeposits,
) {
    let mut seen_amounts = std::collections::HashSet::new();

    for raw in candidates {
        let display = registrar.amount_display(raw.amount_deposited_native);

        if raw.amount_deposited_native == 0 {
            result.filtered.push(FilterRecord {
                offset: raw.offset,
                amount: 0.0,
                reason: FilterReason::Zero,
            });
            continue;
        }

        if !(filters::MIN_DISPLAY_AMOUNT..=filters::MAX_DISPLAY_AMOUNT).contains(&display) {
            result.filtered.push(FilterRecord {
                offset: raw.offset,
                amount: display,
                reason: FilterReason::OutOfRange,
            });
            continue;
        }

        if is_shadow(data, &raw, display, shadow_amounts) {
            result.filtered.push(FilterRecord {
                offset: raw.offset,
                amount: display,
                reason: FilterReason::Shadow,
            });
            continue;
        }

        let dedup_key = (display * 10f64.powi(filters::DEDUP_DECIMALS)).round() as i64;
        if !seen_amounts.insert(dedup_key) {
            result.filtered.push(FilterRecord {
                offset: raw.offset,
                amount: display,
                reason: FilterReason::Duplicate,
            });
            continue;
        }

        result.deposits.push(DepositEntry {
            offset: raw.offset,
            amount_deposited_native: raw.amount_deposited_native,
            amount_initially_locked_native: raw.amount_initially_locked_native,
            lockup: raw.lockup,
        });
    }
}

/// Shadow / phantom rule: a sentinel amount whose companion config bytes
/// (the 32 bytes immediately after the amount) are all zero is a
/// delegation marker, not real stake.
fn is_shadow(data: &[u8], raw: &RawDeposit, display: f64, shadow_amounts: &[f64]) -> bool {
    let is_sentinel = shadow_amounts
        .iter()
        .any(|sentinel| (display - sentinel).abs() < filters::SHADOW_TOLERANCE);
    if !is_sentinel {
        return false;
    }

    let companion_start = raw.amount_offset + 8;
    let companion_end = companion_start + filters::SHADOW_COMPANION_BYTES;
    if companion_end > data.len() {
        return false;
    }

    data[companion_start..companion_end].iter().all(|&byte| byte == 0)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(data[offset..offset + 8].try_into().expect("bounds checked"))
}

fn read_i64(data: &[u8], offset: usize) -> i64 {
    i64::from_le_bytes(data[offset..offset + 8].try_into().expect("bounds checked"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_750_000_000;

    fn registrar() -> RegistrarParams {
        RegistrarParams {
            lockup_saturation_secs: 31_536_000,
            baseline_vote_weight_scaled_factor: 1_000_000_000,
            max_extra_lockup_vote_weight_scaled_factor: 3_000_000_000,
            digit_shift: -6,
        }
    }

    fn shadow() -> Vec<f64> {
        filters::DEFAULT_SHADOW_AMOUNTS.to_vec()
    }

    /// Empty canonical-layout voter account
    fn voter_data() -> Vec<u8> {
        vec![0u8; voter_layout::ACCOUNT_SIZE]
    }

    /// Write one canonical deposit entry slot
    fn write_entry(data: &mut [u8], slot: usize, is_used: u8, amount: u64, initial: u64, lockup: Lockup) {
        let base = voter_layout::HEADER_SIZE + slot * voter_layout::ENTRY_SIZE;
        data[base + voter_layout::ENTRY_IS_USED] = is_used;
        data[base + voter_layout::ENTRY_AMOUNT_DEPOSITED..base + voter_layout::ENTRY_AMOUNT_DEPOSITED + 8]
            .copy_from_slice(&amount.to_le_bytes());
        data[base + voter_layout::ENTRY_AMOUNT_INITIALLY_LOCKED..base + voter_layout::ENTRY_AMOUNT_INITIALLY_LOCKED + 8]
            .copy_from_slice(&initial.to_le_bytes());
        data[base + voter_layout::ENTRY_LOCKUP_KIND] = match lockup.kind {
            LockupKind::None => 0,
            LockupKind::Daily => 1,
            LockupKind::Monthly => 2,
            LockupKind::Cliff => 3,
            LockupKind::Constant => 4,
        };
        data[base + voter_layout::ENTRY_LOCKUP_START_TS..base + voter_layout::ENTRY_LOCKUP_START_TS + 8]
            .copy_from_slice(&lockup.start_ts.to_le_bytes());
        data[base + voter_layout::ENTRY_LOCKUP_END_TS..base + voter_layout::ENTRY_LOCKUP_END_TS + 8]
            .copy_from_slice(&lockup.end_ts.to_le_bytes());
    }

    #[test]
    fn test_canonical_single_unlocked_deposit() {
        let mut data = voter_data();
        write_entry(&mut data, 0, 1, 144_708_981_722, 0, Lockup::none());

        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert_eq!(parsed.deposits.len(), 1);
        assert!(parsed.filtered.is_empty());

        let deposit = &parsed.deposits[0];
        assert_eq!(deposit.amount_deposited_native, 144_708_981_722);
        assert_eq!(deposit.lockup.kind, LockupKind::None);
        assert_eq!(deposit.offset, voter_layout::HEADER_SIZE as u32);
    }

    #[test]
    fn test_unused_slot_with_amount_is_phantom() {
        let mut data = voter_data();
        write_entry(&mut data, 0, 1, 100_000_000_000, 0, Lockup::none());
        write_entry(&mut data, 1, 0, 55_000_000_000, 0, Lockup::none());

        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert_eq!(parsed.deposits.len(), 1);
        assert_eq!(parsed.filtered.len(), 1);
        assert_eq!(parsed.filtered[0].reason, FilterReason::Unused);
        assert_eq!(parsed.filtered[0].amount, 55_000.0);
    }

    #[test]
    fn test_zero_amount_deposit_is_filtered() {
        let mut data = voter_data();
        write_entry(&mut data, 0, 1, 0, 0, Lockup::none());

        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert!(parsed.deposits.is_empty());
        assert_eq!(parsed.filtered.len(), 1);
        assert_eq!(parsed.filtered[0].reason, FilterReason::Zero);
    }

    #[test]
    fn test_out_of_envelope_amounts_are_filtered() {
        let mut data = voter_data();
        // 10 tokens: below the 50-token floor
        write_entry(&mut data, 0, 1, 10_000_000, 0, Lockup::none());
        // 30M tokens: above the ceiling
        write_entry(&mut data, 1, 1, 30_000_000_000_000, 0, Lockup::none());

        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert!(parsed.deposits.is_empty());
        assert_eq!(parsed.filtered.len(), 2);
        assert!(parsed.filtered.iter().all(|f| f.reason == FilterReason::OutOfRange));
    }

    #[test]
    fn test_shadow_sentinel_with_zero_companion_is_filtered() {
        let mut data = voter_data();
        // 1000-token sentinel, all companion bytes zero
        write_entry(&mut data, 0, 1, 1_000_000_000, 0, Lockup::none());
        // Real deposit alongside it
        write_entry(&mut data, 1, 1, 50_000_000_000, 0, Lockup::none());

        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert_eq!(parsed.deposits.len(), 1);
        assert_eq!(parsed.deposits[0].amount_deposited_native, 50_000_000_000);
        assert_eq!(parsed.filtered.len(), 1);
        assert_eq!(parsed.filtered[0].reason, FilterReason::Shadow);
        assert_eq!(parsed.filtered[0].amount, 1_000.0);
    }

    #[test]
    fn test_sentinel_amount_with_live_lockup_is_not_shadow() {
        let mut data = voter_data();
        // 1000 tokens but with a real lockup in the companion bytes
        let lockup = Lockup {
            kind: LockupKind::Cliff,
            start_ts: NOW - 1_000,
            end_ts: NOW + 1_000_000,
        };
        write_entry(&mut data, 0, 1, 1_000_000_000, 1_000_000_000, lockup);

        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert_eq!(parsed.deposits.len(), 1);
        assert!(parsed.filtered.is_empty());
    }

    #[test]
    fn test_duplicate_amount_within_account_is_filtered() {
        let mut data = voter_data();
        write_entry(&mut data, 0, 1, 123_456_789_000, 0, Lockup::none());
        write_entry(&mut data, 1, 1, 123_456_789_000, 0, Lockup::none());

        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert_eq!(parsed.deposits.len(), 1);
        assert_eq!(parsed.filtered.len(), 1);
        assert_eq!(parsed.filtered[0].reason, FilterReason::Duplicate);
    }

    #[test]
    fn test_invalid_lockup_kind_is_parse_error() {
        let mut data = voter_data();
        write_entry(&mut data, 0, 1, 100_000_000_000, 0, Lockup::none());
        let base = voter_layout::HEADER_SIZE + voter_layout::ENTRY_LOCKUP_KIND;
        data[base] = 99;

        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert!(parsed.deposits.is_empty());
        assert_eq!(parsed.filtered.len(), 1);
        assert_eq!(parsed.filtered[0].reason, FilterReason::ParseError);
    }

    #[test]
    fn test_scan_fallback_finds_legacy_unlocked_amount() {
        // No canonical slot in use; an amount sits at a legacy offset
        let mut data = voter_data();
        let offset = 184;
        data[offset..offset + 8].copy_from_slice(&75_000_000_000u64.to_le_bytes());
        // Knock out canonical slot coverage of that offset: slot 1 starts at
        // 160, so byte 160 (is_used) stays 0 and the slot is unused.

        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert_eq!(parsed.deposits.len(), 1);
        assert_eq!(parsed.deposits[0].amount_deposited_native, 75_000_000_000);
        assert_eq!(parsed.deposits[0].lockup.kind, LockupKind::None);
        assert_eq!(parsed.deposits[0].offset, 184);
    }

    #[test]
    fn test_scan_fallback_infers_cliff_from_nearby_end_ts() {
        let mut data = voter_data();
        let offset = 264;
        let end_ts = NOW + 2 * SECS_PER_YEAR;
        data[offset..offset + 8].copy_from_slice(&75_000_000_000u64.to_le_bytes());
        data[offset + 16..offset + 24].copy_from_slice(&end_ts.to_le_bytes());

        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert_eq!(parsed.deposits.len(), 1);
        let deposit = &parsed.deposits[0];
        assert_eq!(deposit.lockup.kind, LockupKind::Cliff);
        assert_eq!(deposit.lockup.end_ts, end_ts);
    }

    #[test]
    fn test_scan_ignores_past_and_far_future_timestamps() {
        // Offset 424 is the last probe, so the decoy timestamps after it
        // cannot themselves be misread as amounts by later probes.
        let mut data = voter_data();
        let offset = 424;
        data[offset..offset + 8].copy_from_slice(&75_000_000_000u64.to_le_bytes());
        // Already-expired timestamp: not plausible, deposit reads unlocked
        data[offset + 8..offset + 16].copy_from_slice(&(NOW - 100).to_le_bytes());
        // 50 years out: beyond the horizon
        data[offset + 16..offset + 24].copy_from_slice(&(NOW + 50 * SECS_PER_YEAR).to_le_bytes());

        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert_eq!(parsed.deposits.len(), 1);
        assert_eq!(parsed.deposits[0].lockup.kind, LockupKind::None);
    }

    #[test]
    fn test_scan_deduplicates_overlapping_probes() {
        // The same amount visible at two probe offsets must be counted once
        let mut data = voter_data();
        data[192..200].copy_from_slice(&75_000_000_000u64.to_le_bytes());
        data[200..208].copy_from_slice(&75_000_000_000u64.to_le_bytes());

        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert_eq!(parsed.deposits.len(), 1);
        assert_eq!(parsed.filtered.len(), 1);
        assert_eq!(parsed.filtered[0].reason, FilterReason::Duplicate);
    }

    #[test]
    fn test_canonical_used_slot_suppresses_scan() {
        // One canonical deposit; garbage at a probe offset must not be read
        let mut data = voter_data();
        write_entry(&mut data, 0, 1, 100_000_000_000, 0, Lockup::none());
        data[424..432].copy_from_slice(&999_000_000_000u64.to_le_bytes());

        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert_eq!(parsed.deposits.len(), 1);
        assert_eq!(parsed.deposits[0].amount_deposited_native, 100_000_000_000);
    }

    #[test]
    fn test_wrong_size_account_yields_nothing_canonical() {
        let data = vec![0u8; 512];
        let parsed = parse_voter_deposits(&data, &registrar(), &shadow(), NOW);
        assert!(parsed.deposits.is_empty());
    }
}
