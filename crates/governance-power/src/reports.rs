//! Audit ledger generation (CSV alongside the JSON snapshot)

use anyhow::{Context, Result};
use csv::Writer;
use std::path::Path;

use crate::constants::AUDIT_LEDGER_FILENAME;
use crate::power::PowerResult;

/// Generate deposits_audit.csv: one row per counted deposit and one per
/// suppressed entry, so a snapshot can be reviewed line by line without
/// re-reading chain state.
pub fn generate_audit_ledger(output_dir: &Path, results: &[PowerResult]) -> Result<()> {
    let path = output_dir.join(AUDIT_LEDGER_FILENAME);
    let mut wtr = Writer::from_path(&path).with_context(|| format!("Failed to open {}", path.display()))?;

    wtr.write_record([
        "Wallet",
        "Account",
        "Offset",
        "Amount",
        "Lockup_Kind",
        "Lockup_End_Ts",
        "Multiplier",
        "Voting_Power",
        "Classification",
        "Filter_Reason",
    ])
    .context("Failed to write audit ledger header")?;

    for result in results {
        for deposit in &result.deposits {
            wtr.write_record([
                result.wallet.as_str(),
                deposit.account.as_str(),
                &deposit.offset.to_string(),
                &format!("{:.6}", deposit.amount),
                &format!("{:?}", deposit.lockup_kind),
                &deposit.lockup_end_ts.map(|ts| ts.to_string()).unwrap_or_default(),
                &format!("{:.3}", deposit.multiplier),
                &format!("{:.6}", deposit.voting_power),
                &format!("{:?}", deposit.classification).to_lowercase(),
                "",
            ])
            .context("Failed to write audit ledger row")?;
        }

        for filtered in &result.filtered {
            wtr.write_record([
                result.wallet.as_str(),
                "",
                &filtered.offset.to_string(),
                &format!("{:.6}", filtered.amount),
                "",
                "",
                "",
                "",
                "",
                &serde_json::to_string(&filtered.reason)
                    .map(|s| s.trim_matches('"').to_string())
                    .unwrap_or_default(),
            ])
            .context("Failed to write audit ledger row")?;
        }
    }

    wtr.flush().context("Failed to flush audit ledger")?;
    Ok(())
}

/// Console summary after a batch run
pub fn print_summary(results: &[PowerResult], snapshot_path: &Path) {
    let with_power = results.iter().filter(|r| r.has_power()).count();
    let total_native: f64 = results.iter().map(|r| r.native_power).sum();
    let total_delegated: f64 = results.iter().map(|r| r.delegated_power).sum();

    println!();
    println!("Citizens scored:      {}", results.len());
    println!("Citizens with power:  {}", with_power);
    println!("Total native power:   {:.2}", total_native);
    println!("Total delegated:      {:.2}", total_delegated);
    println!("Snapshot written to:  {}", snapshot_path.display());
}

/// Single-wallet console output
pub fn print_wallet_result(result: &PowerResult) {
    println!("Wallet {}", result.wallet);
    println!("  native:    {:.6}", result.native_power);
    println!("  delegated: {:.6}", result.delegated_power);
    println!("  total:     {:.6}", result.total_power);

    for deposit in &result.deposits {
        println!(
            "  deposit {} @{}: {:.6} x {:.3} = {:.6} ({:?}, {})",
            deposit.account,
            deposit.offset,
            deposit.amount,
            deposit.multiplier,
            deposit.voting_power,
            deposit.lockup_kind,
            format!("{:?}", deposit.classification).to_lowercase(),
        );
    }

    for filtered in &result.filtered {
        println!(
            "  filtered @{}: {:.6} ({:?})",
            filtered.offset, filtered.amount, filtered.reason
        );
    }
}
