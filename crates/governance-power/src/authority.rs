//! Authority resolver
//!
//! Decides, for a query wallet, which Voter accounts in the snapshot count
//! as native (direct authority, verified alias, shared alias) and which
//! count as delegated (a TokenOwnerRecord whose governance_delegate points
//! at the wallet). Native classification always wins; an account is never
//! counted in both sets.
//!
//! Historical deployments wrote the wallet into two different header
//! fields, so both offsets are probed and either may match.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::aliases::WalletAliasMap;
use crate::constants::{token_owner_record_layout as tor, voter_layout};
use crate::error::PowerError;
use crate::rpc::SnapshotAccount;

/// How a Voter account was matched to the query wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Account authority is the wallet itself
    Direct,
    /// Authority is a verified alias of the wallet (either direction)
    Alias,
    /// An alias of the wallet equals an alias of the authority
    CrossAlias,
    /// Routed here by a governance_delegate pointer
    Delegate,
}

impl Classification {
    /// Native deposits belong to the wallet; delegated ones are routed to it
    pub fn is_native(&self) -> bool {
        !matches!(self, Classification::Delegate)
    }
}

/// Both candidate authority fields of a Voter account header
#[derive(Debug, Clone, Copy)]
pub struct VoterAuthorities {
    /// Canonical field at bytes [32..64]
    pub authority: Pubkey,
    /// Legacy field at bytes [8..40]
    pub legacy_authority: Pubkey,
}

impl VoterAuthorities {
    pub fn matches(&self, wallet: &Pubkey) -> bool {
        self.authority == *wallet || self.legacy_authority == *wallet
    }
}

/// Read both authority candidates from raw Voter data
pub fn parse_voter_authorities(data: &[u8]) -> Result<VoterAuthorities, PowerError> {
    if data.len() < voter_layout::AUTHORITY_OFFSET + 32 {
        return Err(PowerError::Decode(format!(
            "voter account too small for authority: {} bytes",
            data.len()
        )));
    }

    Ok(VoterAuthorities {
        authority: read_pubkey(data, voter_layout::AUTHORITY_OFFSET),
        legacy_authority: read_pubkey(data, voter_layout::LEGACY_AUTHORITY_OFFSET),
    })
}

/// Decoded TokenOwnerRecord fields consumed by the resolver
#[derive(Debug, Clone, Copy)]
pub struct TokenOwnerRecord {
    pub governing_token_mint: Pubkey,
    pub governing_token_owner: Pubkey,
    pub governing_token_deposit_amount: u64,
    pub governance_delegate: Option<Pubkey>,
}

/// Decode a TokenOwnerRecord account
pub fn parse_token_owner_record(data: &[u8]) -> Result<TokenOwnerRecord, PowerError> {
    if data.len() < tor::MIN_SIZE {
        return Err(PowerError::Decode(format!(
            "token owner record too small: {} bytes",
            data.len()
        )));
    }

    let governance_delegate = match data.get(tor::DELEGATE_OPTION_OFFSET) {
        Some(&1) if data.len() >= tor::DELEGATE_OPTION_OFFSET + 1 + 32 => {
            Some(read_pubkey(data, tor::DELEGATE_OPTION_OFFSET + 1))
        }
        _ => None,
    };

    Ok(TokenOwnerRecord {
        governing_token_mint: read_pubkey(data, tor::GOVERNING_TOKEN_MINT_OFFSET),
        governing_token_owner: read_pubkey(data, tor::GOVERNING_TOKEN_OWNER_OFFSET),
        governing_token_deposit_amount: u64::from_le_bytes(
            data[tor::DEPOSIT_AMOUNT_OFFSET..tor::DEPOSIT_AMOUNT_OFFSET + 8]
                .try_into()
                .expect("bounds checked"),
        ),
        governance_delegate,
    })
}

/// One classified Voter account
#[derive(Debug, Clone)]
pub struct ClassifiedAccount<'a> {
    pub account: &'a SnapshotAccount,
    pub classification: Classification,
}

/// Resolver output: disjoint native and delegated account sets
#[derive(Debug, Default)]
pub struct ResolvedAccounts<'a> {
    pub native: Vec<ClassifiedAccount<'a>>,
    pub delegated: Vec<ClassifiedAccount<'a>>,
}

/// Classify every snapshot account against one query wallet.
///
/// Rules are applied in order and the first match wins: direct authority,
/// alias-table membership (either direction), shared alias, then the
/// delegate pointer from the wallet's inbound TokenOwnerRecords.
pub fn resolve_accounts<'a>(
    wallet: &Pubkey,
    snapshot: &'a [SnapshotAccount],
    records: &[TokenOwnerRecord],
    aliases: &WalletAliasMap,
) -> ResolvedAccounts<'a> {
    // Owners that routed their power to this wallet, excluding the wallet
    // itself: self-delegation adds nothing and must not double-count.
    let delegators: Vec<Pubkey> = records
        .iter()
        .filter(|record| {
            record.governance_delegate == Some(*wallet) && record.governing_token_owner != *wallet
        })
        .map(|record| record.governing_token_owner)
        .collect();

    let mut resolved = ResolvedAccounts::default();

    for account in snapshot {
        let Ok(authorities) = parse_voter_authorities(&account.data) else {
            // Too small to carry an authority; the deposit parser will never
            // see it either way.
            continue;
        };

        let classification = classify(wallet, &authorities, aliases, &delegators);
        match classification {
            Some(c) if c.is_native() => resolved.native.push(ClassifiedAccount {
                account,
                classification: c,
            }),
            Some(c) => resolved.delegated.push(ClassifiedAccount {
                account,
                classification: c,
            }),
            None => {}
        }
    }

    resolved
}

fn classify(
    wallet: &Pubkey,
    authorities: &VoterAuthorities,
    aliases: &WalletAliasMap,
    delegators: &[Pubkey],
) -> Option<Classification> {
    if authorities.matches(wallet) {
        return Some(Classification::Direct);
    }

    let authority = &authorities.authority;
    if aliases.is_alias_pair(wallet, authority) || aliases.is_alias_pair(wallet, &authorities.legacy_authority) {
        return Some(Classification::Alias);
    }

    if aliases.shares_alias(wallet, authority) {
        return Some(Classification::CrossAlias);
    }

    if delegators.iter().any(|owner| authorities.matches(owner)) {
        return Some(Classification::Delegate);
    }

    None
}

fn read_pubkey(data: &[u8], offset: usize) -> Pubkey {
    Pubkey::new_from_array(data[offset..offset + 32].try_into().expect("bounds checked"))
}
