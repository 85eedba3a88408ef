//! Verified wallet alias table
//!
//! An externally curated mapping `main_wallet -> [alias_wallet, ...]` used by
//! the authority resolver to treat deposits held under a citizen's other
//! wallets as native. The table is a trust input; nothing here derives
//! aliases from chain state.

use anyhow::{Context, Result};
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

/// Immutable alias table, loaded once per run
#[derive(Debug, Default, Clone)]
pub struct WalletAliasMap {
    map: HashMap<Pubkey, HashSet<Pubkey>>,
}

impl WalletAliasMap {
    /// Load from a `{ "main_b58": ["alias_b58", ...] }` JSON file.
    /// A missing file is an empty map; a malformed one is a config error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read alias file: {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Malformed alias file: {}", path.display()))
    }

    fn from_json(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        let object = value.as_object().context("Expected a JSON object")?;

        let mut map = HashMap::new();
        for (main, aliases) in object {
            let main = Pubkey::from_str(main).with_context(|| format!("Invalid wallet key: {}", main))?;
            let list = aliases
                .as_array()
                .with_context(|| format!("Aliases for {} must be an array", main))?;

            let mut set = HashSet::new();
            for alias in list {
                let alias_str = alias.as_str().context("Alias entries must be strings")?;
                let alias =
                    Pubkey::from_str(alias_str).with_context(|| format!("Invalid alias: {}", alias_str))?;
                set.insert(alias);
            }
            map.insert(main, set);
        }

        Ok(Self { map })
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Aliases registered for a main wallet
    pub fn aliases_of(&self, wallet: &Pubkey) -> Option<&HashSet<Pubkey>> {
        self.map.get(wallet)
    }

    /// True when either wallet lists the other as an alias
    pub fn is_alias_pair(&self, a: &Pubkey, b: &Pubkey) -> bool {
        self.aliases_of(a).is_some_and(|set| set.contains(b))
            || self.aliases_of(b).is_some_and(|set| set.contains(a))
    }

    /// True when the two wallets share at least one alias
    pub fn shares_alias(&self, a: &Pubkey, b: &Pubkey) -> bool {
        match (self.aliases_of(a), self.aliases_of(b)) {
            (Some(sa), Some(sb)) => !sa.is_disjoint(sb),
            _ => false,
        }
    }

    /// Build a table from in-memory pairs (fixtures, embedded defaults)
    pub fn from_pairs(pairs: &[(Pubkey, Vec<Pubkey>)]) -> Self {
        let map = pairs
            .iter()
            .map(|(main, aliases)| (*main, aliases.iter().copied().collect()))
            .collect();
        Self { map }
    }
}
