//! Chain reader: the only module that performs I/O
//!
//! Two-call contract per run: one getProgramAccounts snapshot of every VSR
//! Voter account, plus individual reads for the registrar and the governance
//! program's TokenOwnerRecords. Everything downstream is pure CPU over the
//! returned buffers, so every wallet in a batch is scored against the same
//! chain state.

use solana_client::client_error::ClientError;
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, MemcmpEncodedBytes, RpcFilterType};
use solana_commitment_config::CommitmentConfig;
use solana_rpc_client::http_sender::HttpSender;
use solana_rpc_client::rpc_client::RpcClientConfig;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

use crate::constants::{backoff, token_owner_record_layout, voter_layout};
use crate::error::PowerError;

/// One account captured in the run snapshot: pubkey plus raw data. The
/// decoders only ever see this shape, never a live client handle.
#[derive(Debug, Clone)]
pub struct SnapshotAccount {
    pub pubkey: Pubkey,
    pub data: Vec<u8>,
}

/// Read-only RPC wrapper with retry
pub struct ChainReader {
    client: RpcClient,
}

impl ChainReader {
    /// Build a reader with system proxy disabled.
    ///
    /// On some macOS environments, system proxy detection can panic. This
    /// avoids that path by disabling automatic system proxy usage.
    pub fn new(url: &str) -> Self {
        let client = reqwest_012::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("build reqwest client");
        let sender = HttpSender::new_with_client(url.to_string(), client);
        let client = RpcClient::new_sender(sender, RpcClientConfig::with_commitment(CommitmentConfig::confirmed()));
        Self { client }
    }

    /// Fetch every VSR Voter account in one shot (dataSize == 2728),
    /// sorted by pubkey so batch output is reproducible.
    pub async fn snapshot_vsr(&self, vsr_program: &Pubkey) -> Result<Vec<SnapshotAccount>, PowerError> {
        let filters = vec![RpcFilterType::DataSize(voter_layout::ACCOUNT_SIZE as u64)];
        let mut accounts = self.program_accounts(vsr_program, filters).await?;
        accounts.sort_by_key(|a| a.pubkey);
        Ok(accounts)
    }

    /// Fetch every TokenOwnerRecord for the governing token mint, sorted by
    /// pubkey for the same reproducibility guarantee.
    pub async fn token_owner_records(
        &self,
        governance_program: &Pubkey,
        governing_token_mint: &Pubkey,
    ) -> Result<Vec<SnapshotAccount>, PowerError> {
        let filters = vec![RpcFilterType::Memcmp(Memcmp::new(
            token_owner_record_layout::GOVERNING_TOKEN_MINT_OFFSET,
            MemcmpEncodedBytes::Base58(governing_token_mint.to_string()),
        ))];
        let mut accounts = self.program_accounts(governance_program, filters).await?;
        accounts.sort_by_key(|a| a.pubkey);
        Ok(accounts)
    }

    /// Fetch a single account's data, or None if it does not exist
    pub async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Vec<u8>>, PowerError> {
        let result = self
            .with_retry(|| {
                self.client
                    .get_account_with_commitment(pubkey, CommitmentConfig::confirmed())
            })
            .await?;
        Ok(result.value.map(|account| account.data))
    }

    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        filters: Vec<RpcFilterType>,
    ) -> Result<Vec<SnapshotAccount>, PowerError> {
        let config = RpcProgramAccountsConfig {
            filters: Some(filters),
            account_config: RpcAccountInfoConfig {
                encoding: Some(solana_account_decoder::UiAccountEncoding::Base64),
                commitment: Some(CommitmentConfig::confirmed()),
                ..Default::default()
            },
            ..Default::default()
        };

        let accounts = self
            .with_retry(|| {
                #[allow(deprecated)]
                let accounts = self.client.get_program_accounts_with_config(program_id, config.clone());
                accounts
            })
            .await?;

        Ok(accounts
            .into_iter()
            .map(|(pubkey, account)| SnapshotAccount {
                pubkey,
                data: account.data,
            })
            .collect())
    }

    /// Run an RPC call with exponential backoff. Authentication failures
    /// abort immediately; everything else is retried up to the attempt cap.
    async fn with_retry<T>(&self, op: impl Fn() -> Result<T, ClientError>) -> Result<T, PowerError> {
        let mut delay_ms = backoff::BASE_DELAY_MS;

        for attempt in 1..=backoff::MAX_ATTEMPTS {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if !is_retryable(&e) => {
                    return Err(PowerError::Transport {
                        retryable: false,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    if attempt == backoff::MAX_ATTEMPTS {
                        return Err(PowerError::Transport {
                            retryable: true,
                            message: format!("{} (after {} attempts)", e, attempt),
                        });
                    }
                    eprintln!("Warning: RPC attempt {}/{} failed: {}", attempt, backoff::MAX_ATTEMPTS, e);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(backoff::MAX_DELAY_MS);
                }
            }
        }

        unreachable!("retry loop always returns")
    }
}

/// Authentication problems will not improve with retries; network and
/// rate-limit errors usually do.
fn is_retryable(error: &ClientError) -> bool {
    let message = error.to_string();
    !(message.contains("401")
        || message.contains("403")
        || message.contains("Unauthorized")
        || message.contains("unauthorized")
        || message.contains("invalid api key")
        || message.contains("API key"))
}
