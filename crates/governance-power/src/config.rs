//! Configuration for the voting-power scanner

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants;

// =============================================================================
// File-based Configuration (config.toml)
// =============================================================================

/// Configuration loaded from config.toml
#[derive(Debug, Deserialize)]
pub struct FileConfig {
    pub dao: DaoConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
}

/// Target DAO addresses (base58)
#[derive(Debug, Deserialize)]
pub struct DaoConfig {
    /// Realm pubkey
    pub realm: String,
    /// Governing token mint pubkey
    pub governing_token_mint: String,
    /// VSR program id (defaults to the mainnet deployment)
    #[serde(default = "default_vsr_program")]
    pub vsr_program: String,
    /// SPL Governance program id (defaults to the mainnet deployment)
    #[serde(default = "default_governance_program")]
    pub governance_program: String,
}

/// RPC endpoint section; `HELIUS_RPC_URL` or `--rpc-url` override it
#[derive(Debug, Default, Deserialize)]
pub struct RpcConfig {
    #[serde(default)]
    pub url: Option<String>,
}

/// Input/output file locations
#[derive(Debug, Deserialize)]
pub struct FilesConfig {
    /// Wallet alias table; absent file means no aliases
    #[serde(default = "default_aliases_path")]
    pub aliases: PathBuf,
    /// Citizens wallet list (JSON array of base58 strings)
    #[serde(default = "default_citizens_path")]
    pub citizens: PathBuf,
    /// Directory for the JSON snapshot and audit ledger
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Deposit filter overrides
#[derive(Debug, Deserialize)]
pub struct FiltersConfig {
    /// Delegation-marker sentinel amounts (display units)
    #[serde(default = "default_shadow_amounts")]
    pub shadow_amounts: Vec<f64>,
}

fn default_vsr_program() -> String {
    constants::DEFAULT_VSR_PROGRAM.to_string()
}

fn default_governance_program() -> String {
    constants::DEFAULT_GOVERNANCE_PROGRAM.to_string()
}

fn default_aliases_path() -> PathBuf {
    PathBuf::from("wallet_aliases.json")
}

fn default_citizens_path() -> PathBuf {
    PathBuf::from("citizens.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_shadow_amounts() -> Vec<f64> {
    constants::filters::DEFAULT_SHADOW_AMOUNTS.to_vec()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            aliases: default_aliases_path(),
            citizens: default_citizens_path(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            shadow_amounts: default_shadow_amounts(),
        }
    }
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse {}. Required fields: dao.realm, dao.governing_token_mint",
                path.display()
            )
        })
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Main configuration struct with parsed values
#[derive(Debug)]
pub struct Config {
    pub realm: Pubkey,
    pub governing_token_mint: Pubkey,
    pub vsr_program: Pubkey,
    pub governance_program: Pubkey,
    pub rpc_url: String,
    pub aliases_path: PathBuf,
    pub citizens_path: PathBuf,
    pub output_dir: PathBuf,
    pub shadow_amounts: Vec<f64>,
}

impl Config {
    /// Build runtime config. Precedence for the RPC endpoint:
    /// `--rpc-url` flag, then `HELIUS_RPC_URL`, then config.toml.
    pub fn from_file(file_config: &FileConfig, rpc_url_flag: Option<String>) -> Result<Self> {
        let rpc_url = rpc_url_flag
            .or_else(|| std::env::var("HELIUS_RPC_URL").ok())
            .or_else(|| file_config.rpc.url.clone())
            .context("No RPC endpoint: set rpc.url in config.toml, HELIUS_RPC_URL, or --rpc-url")?;

        Ok(Self {
            realm: parse_pubkey(&file_config.dao.realm, "dao.realm")?,
            governing_token_mint: parse_pubkey(&file_config.dao.governing_token_mint, "dao.governing_token_mint")?,
            vsr_program: parse_pubkey(&file_config.dao.vsr_program, "dao.vsr_program")?,
            governance_program: parse_pubkey(&file_config.dao.governance_program, "dao.governance_program")?,
            rpc_url,
            aliases_path: file_config.files.aliases.clone(),
            citizens_path: file_config.files.citizens.clone(),
            output_dir: file_config.files.output_dir.clone(),
            shadow_amounts: file_config.filters.shadow_amounts.clone(),
        })
    }
}

fn parse_pubkey(value: &str, field: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).with_context(|| format!("Invalid {} address: {}", field, value))
}

/// Load the citizens wallet list: a JSON array of base58 strings,
/// deduplicated with input order preserved.
pub fn load_citizens(path: &Path) -> Result<Vec<Pubkey>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read citizens file: {}", path.display()))?;

    let wallets: Vec<String> = serde_json::from_str(&content)
        .with_context(|| format!("Malformed citizens file: {}", path.display()))?;

    let mut seen = std::collections::HashSet::new();
    let mut citizens = Vec::new();
    for wallet in &wallets {
        let pubkey = parse_pubkey(wallet, "citizens entry")?;
        if seen.insert(pubkey) {
            citizens.push(pubkey);
        }
    }

    Ok(citizens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> String {
        let realm = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        format!(
            "[dao]\nrealm = \"{}\"\ngoverning_token_mint = \"{}\"\n\n[rpc]\nurl = \"https://rpc.example\"\n",
            realm, mint
        )
    }

    #[test]
    fn test_parse_minimal_config() {
        let file_config: FileConfig = toml::from_str(&sample_toml()).unwrap();
        let config = Config::from_file(&file_config, None).unwrap();

        assert_eq!(config.rpc_url, "https://rpc.example");
        assert_eq!(config.vsr_program.to_string(), constants::DEFAULT_VSR_PROGRAM);
        assert_eq!(
            config.governance_program.to_string(),
            constants::DEFAULT_GOVERNANCE_PROGRAM
        );
        assert_eq!(config.shadow_amounts, vec![1_000.0, 11_000.0]);
        assert_eq!(config.citizens_path, PathBuf::from("citizens.json"));
    }

    #[test]
    fn test_rpc_flag_overrides_file() {
        let file_config: FileConfig = toml::from_str(&sample_toml()).unwrap();
        let config = Config::from_file(&file_config, Some("https://flag.example".to_string())).unwrap();
        assert_eq!(config.rpc_url, "https://flag.example");
    }

    #[test]
    fn test_invalid_realm_is_config_error() {
        let toml_str = "[dao]\nrealm = \"not-a-pubkey\"\ngoverning_token_mint = \"also-bad\"\n[rpc]\nurl = \"x\"\n";
        let file_config: FileConfig = toml::from_str(toml_str).unwrap();
        let err = Config::from_file(&file_config, None).unwrap_err();
        assert!(err.to_string().contains("dao.realm"));
    }

    #[test]
    fn test_shadow_amount_override() {
        let mut toml_str = sample_toml();
        toml_str.push_str("\n[filters]\nshadow_amounts = [500.0]\n");
        let file_config: FileConfig = toml::from_str(&toml_str).unwrap();
        let config = Config::from_file(&file_config, None).unwrap();
        assert_eq!(config.shadow_amounts, vec![500.0]);
    }
}
