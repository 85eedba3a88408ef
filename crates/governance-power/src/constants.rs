//! Fixed on-chain layout contracts and tuning constants
//!
//! Every byte offset used by the decoders lives here, grouped per account
//! type, so layout drift shows up as a constant change instead of a magic
//! number buried in calculation code.

/// Mainnet voter-stake-registry program (default, overridable in config.toml)
pub const DEFAULT_VSR_PROGRAM: &str = "vsr2nfGVNHmSY8uxoBGqq8AQbwz3JwaEaHqGbsTPXqQ";

/// Mainnet SPL Governance program (default, overridable in config.toml)
pub const DEFAULT_GOVERNANCE_PROGRAM: &str = "GovER5Lthms3bLBqWub97yVrMmEogzX7xNjdXpPPCVZw";

/// Scaled-factor base for registrar vote weight factors (1e9 = 1.0x)
pub const SCALED_FACTOR_BASE: u64 = 1_000_000_000;

pub const SECS_PER_DAY: i64 = 86_400;
pub const SECS_PER_YEAR: i64 = (365.25 * SECS_PER_DAY as f64) as i64;

/// VSR `Voter` account layout
///
/// The account is a fixed 2,728-byte blob: a header followed by a dense
/// array of 32 deposit entry slots. Long-lived accounts exist in two
/// historical shapes; the authority is probed at both known offsets.
pub mod voter_layout {
    /// Exact data length of every Voter account; also the getProgramAccounts
    /// dataSize filter that defines the snapshot.
    pub const ACCOUNT_SIZE: usize = 2_728;

    /// Canonical authority field (current deployments)
    pub const AUTHORITY_OFFSET: usize = 32;
    /// Legacy authority field (seen in accounts created by early deployments)
    pub const LEGACY_AUTHORITY_OFFSET: usize = 8;

    pub const HEADER_SIZE: usize = 104;
    pub const ENTRY_SIZE: usize = 56;
    pub const ENTRY_COUNT: usize = 32;

    // Field offsets within one deposit entry slot
    pub const ENTRY_IS_USED: usize = 0;
    pub const ENTRY_AMOUNT_DEPOSITED: usize = 1;
    pub const ENTRY_AMOUNT_INITIALLY_LOCKED: usize = 9;
    pub const ENTRY_LOCKUP_KIND: usize = 17;
    pub const ENTRY_LOCKUP_START_TS: usize = 18;
    pub const ENTRY_LOCKUP_END_TS: usize = 26;
}

/// VSR `Registrar` account layout
///
/// Header is 8 bytes of discriminator, four pubkeys and a 32-byte reserved
/// block; the first voting-mint config follows with its own two pubkeys
/// before the numeric fields this system consumes.
pub mod registrar_layout {
    pub const BASELINE_SCALED_OFFSET: usize = 232;
    pub const MAX_EXTRA_SCALED_OFFSET: usize = 240;
    pub const SATURATION_SECS_OFFSET: usize = 248;
    pub const DIGIT_SHIFT_OFFSET: usize = 256;

    /// Minimum data length to read all four fields
    pub const MIN_SIZE: usize = 257;

    /// PDA seed prefix: (b"registrar", realm, governing_token_mint)
    pub const SEED_PREFIX: &[u8] = b"registrar";
}

/// SPL Governance `TokenOwnerRecord` layout
pub mod token_owner_record_layout {
    pub const GOVERNING_TOKEN_MINT_OFFSET: usize = 1;
    pub const GOVERNING_TOKEN_OWNER_OFFSET: usize = 65;
    pub const DEPOSIT_AMOUNT_OFFSET: usize = 97;
    /// `Option<Pubkey>` marker byte; delegate pubkey follows when it is 1
    pub const DELEGATE_OPTION_OFFSET: usize = 105;

    /// Minimum data length to read through the deposit amount
    pub const MIN_SIZE: usize = 105;
}

/// Fallback scan parameters for legacy voter accounts whose canonical slots
/// decode to nothing (see `deposits::scan_deposits`)
pub mod scan {
    /// Candidate amount offsets observed across historical account shapes
    pub const PROBE_OFFSETS: [usize; 11] = [104, 112, 184, 192, 200, 208, 264, 272, 344, 352, 424];

    /// How far past the amount to search for a lockup end timestamp
    pub const TS_SEARCH_WINDOW: usize = 128;

    /// A probed end timestamp is plausible within (now, now + 10 years)
    pub const TS_HORIZON_YEARS: i64 = 10;

    /// End timestamps at most this far past the amount belong to an entry
    /// shape that stores an explicit cliff window; farther ones are the
    /// constant-lockup shape.
    pub const CLIFF_TS_MAX_DELTA: usize = 32;
}

/// Deposit filter envelope
pub mod filters {
    /// Display amounts outside this range come from misread offsets
    pub const MIN_DISPLAY_AMOUNT: f64 = 50.0;
    pub const MAX_DISPLAY_AMOUNT: f64 = 20_000_000.0;

    /// Delegation-marker sentinel amounts (display units); overridable via
    /// config.toml `[filters] shadow_amounts`
    pub const DEFAULT_SHADOW_AMOUNTS: [f64; 2] = [1_000.0, 11_000.0];

    /// A sentinel only counts as shadow when this many bytes of companion
    /// config after the amount are all zero
    pub const SHADOW_COMPANION_BYTES: usize = 32;

    /// Sentinel match tolerance in display units
    pub const SHADOW_TOLERANCE: f64 = 1.0;

    /// Per-account dedup key precision (fractional digits)
    pub const DEDUP_DECIMALS: i32 = 6;
}

/// Registrar parameter sanity bounds (out of range is fatal)
pub mod registrar_bounds {
    use super::{SCALED_FACTOR_BASE, SECS_PER_YEAR};

    pub const MIN_BASELINE_SCALED: u64 = 1;
    pub const MAX_BASELINE_SCALED: u64 = 10 * SCALED_FACTOR_BASE;
    pub const MAX_EXTRA_SCALED: u64 = 10 * SCALED_FACTOR_BASE;
    pub const MIN_SATURATION_SECS: u64 = SECS_PER_YEAR as u64;
    pub const MAX_SATURATION_SECS: u64 = 10 * SECS_PER_YEAR as u64;
}

/// RPC retry policy
pub mod backoff {
    pub const BASE_DELAY_MS: u64 = 500;
    pub const MAX_DELAY_MS: u64 = 8_000;
    pub const MAX_ATTEMPTS: u32 = 5;
}

/// Absolute safety rail for the lockup multiplier; any clamp is logged
pub const MULTIPLIER_SAFETY_RAIL: f64 = 5.0;

/// Multiplier rounding matches the governance UI's display arithmetic
pub const MULTIPLIER_ROUND_DECIMALS: i32 = 3;

/// Tolerance used by the `verify` subcommand (relative, 0.5%)
pub const VERIFY_TOLERANCE: f64 = 0.005;

/// Snapshot schema version written by the snapshot writer
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Default output filename for the batch snapshot
pub const SNAPSHOT_FILENAME: &str = "native-governance-power.json";

/// Default output filename for the per-deposit audit ledger
pub const AUDIT_LEDGER_FILENAME: &str = "deposits_audit.csv";
