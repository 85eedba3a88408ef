//! Power aggregator
//!
//! Combines resolver, parser and multiplier output into one PowerResult per
//! wallet. All inputs are immutable borrows of the run snapshot and the
//! pinned `now`; scoring is pure CPU, so a single wallet re-scored in
//! isolation always equals its entry in a batch.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::aliases::WalletAliasMap;
use crate::authority::{Classification, TokenOwnerRecord, resolve_accounts};
use crate::deposits::{FilterRecord, LockupKind, parse_voter_deposits};
use crate::error::PowerError;
use crate::multiplier::{check_multiplier_bounds, lockup_multiplier};
use crate::registrar::RegistrarParams;
use crate::rpc::SnapshotAccount;

/// Which side of the ledger a deposit lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSide {
    Native,
    Delegated,
}

impl From<Classification> for PowerSide {
    fn from(classification: Classification) -> Self {
        if classification.is_native() {
            PowerSide::Native
        } else {
            PowerSide::Delegated
        }
    }
}

/// One counted deposit in the audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRecord {
    /// Voter account the deposit lives in (base58)
    pub account: String,
    pub offset: u32,
    /// Display-unit amount
    pub amount: f64,
    pub lockup_kind: LockupKind,
    pub lockup_end_ts: Option<i64>,
    pub multiplier: f64,
    pub voting_power: f64,
    pub classification: PowerSide,
}

/// Scored wallet: the immutable product of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerResult {
    pub wallet: String,
    pub native_power: f64,
    pub delegated_power: f64,
    pub total_power: f64,
    pub deposits: Vec<DepositRecord>,
    pub filtered: Vec<FilterRecord>,
}

impl PowerResult {
    pub fn has_power(&self) -> bool {
        self.total_power > 0.0
    }
}

/// Everything a scoring pass needs: one snapshot, one clock.
///
/// Built once per run and shared by reference; there is no hidden cache or
/// TTL, and two wallets in the same batch can never observe different chain
/// state or different times.
pub struct PowerEngine<'a> {
    pub snapshot: &'a [SnapshotAccount],
    pub records: &'a [TokenOwnerRecord],
    pub registrar: &'a RegistrarParams,
    pub aliases: &'a WalletAliasMap,
    pub shadow_amounts: &'a [f64],
    pub now: i64,
}

impl PowerEngine<'_> {
    /// Score one wallet against the run snapshot
    pub fn score_wallet(&self, wallet: &Pubkey) -> Result<PowerResult, PowerError> {
        let resolved = resolve_accounts(wallet, self.snapshot, self.records, self.aliases);

        let mut result = PowerResult {
            wallet: wallet.to_string(),
            native_power: 0.0,
            delegated_power: 0.0,
            total_power: 0.0,
            deposits: Vec::new(),
            filtered: Vec::new(),
        };

        for classified in resolved.native.iter().chain(resolved.delegated.iter()) {
            let parsed = parse_voter_deposits(
                &classified.account.data,
                self.registrar,
                self.shadow_amounts,
                self.now,
            );
            result.filtered.extend(parsed.filtered);

            for deposit in &parsed.deposits {
                let multiplier = lockup_multiplier(deposit, self.registrar, self.now);
                check_multiplier_bounds(multiplier, self.registrar)?;

                let amount = round6(self.registrar.amount_display(deposit.amount_deposited_native));
                let voting_power = round6(amount * multiplier);

                if classified.classification.is_native() {
                    result.native_power += voting_power;
                } else {
                    result.delegated_power += voting_power;
                }

                result.deposits.push(DepositRecord {
                    account: classified.account.pubkey.to_string(),
                    offset: deposit.offset,
                    amount,
                    lockup_kind: deposit.lockup.kind,
                    lockup_end_ts: (deposit.lockup.kind != LockupKind::None).then_some(deposit.lockup.end_ts),
                    multiplier,
                    voting_power,
                    classification: classified.classification.into(),
                });
            }
        }

        result.native_power = round6(result.native_power);
        result.delegated_power = round6(result.delegated_power);
        result.total_power = round6(result.native_power + result.delegated_power);
        Ok(result)
    }

    /// Score every citizen against the same snapshot and clock
    pub fn score_all(&self, citizens: &[Pubkey]) -> Result<Vec<PowerResult>, PowerError> {
        citizens.iter().map(|wallet| self.score_wallet(wallet)).collect()
    }
}

/// Display-unit rounding used for every serialized amount
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
