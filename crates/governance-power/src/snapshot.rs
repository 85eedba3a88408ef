//! Snapshot writer and verifier
//!
//! One JSON document per run is the authoritative, reproducible artefact;
//! consumers of voting power read it rather than recomputing. The verifier
//! compares a freshly computed batch against such a document within a
//! relative tolerance.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{SNAPSHOT_SCHEMA_VERSION, VERIFY_TOLERANCE};
use crate::error::PowerError;
use crate::power::{PowerResult, round6};

/// Run-level totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_citizens: usize,
    pub citizens_with_power: usize,
    pub total_native: f64,
    pub total_delegated: f64,
}

/// The durable run artefact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    /// ISO-8601 UTC render of `now_used`; derived from the pinned clock so
    /// the same batch always serializes byte-identically
    pub generated_at: String,
    /// The pinned unix timestamp every multiplier in this run used
    pub now_used: i64,
    pub summary: Summary,
    pub citizens: Vec<PowerResult>,
}

impl Snapshot {
    /// Assemble a snapshot from a scored batch
    pub fn build(citizens: Vec<PowerResult>, now_used: i64) -> Self {
        let summary = Summary {
            total_citizens: citizens.len(),
            citizens_with_power: citizens.iter().filter(|c| c.has_power()).count(),
            total_native: round6(citizens.iter().map(|c| c.native_power).sum()),
            total_delegated: round6(citizens.iter().map(|c| c.delegated_power).sum()),
        };

        let generated_at = DateTime::from_timestamp(now_used, 0)
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();

        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            generated_at,
            now_used,
            summary,
            citizens,
        }
    }

    /// Serialize to pretty JSON. Struct field order is fixed, so the same
    /// batch always yields byte-identical output.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize snapshot")
    }

    /// Write the document, creating the output directory if needed
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.to_json()?).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Load an existing snapshot (the `verify` fixture)
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Malformed snapshot: {}", path.display()))
    }
}

/// Compare computed results against an expected fixture.
///
/// Native, delegated and total power must each agree within 0.5% relative
/// tolerance per wallet. Returns the first mismatch as the error so the
/// exit code reflects a verification failure.
pub fn verify_against(expected: &Snapshot, computed: &[PowerResult]) -> Result<(), PowerError> {
    for expected_citizen in &expected.citizens {
        let Some(computed_citizen) = computed.iter().find(|c| c.wallet == expected_citizen.wallet) else {
            return Err(PowerError::VerificationMismatch {
                wallet: expected_citizen.wallet.clone(),
                expected: expected_citizen.total_power,
                actual: 0.0,
            });
        };

        for (expected_value, actual_value) in [
            (expected_citizen.native_power, computed_citizen.native_power),
            (expected_citizen.delegated_power, computed_citizen.delegated_power),
            (expected_citizen.total_power, computed_citizen.total_power),
        ] {
            if !within_tolerance(expected_value, actual_value) {
                return Err(PowerError::VerificationMismatch {
                    wallet: expected_citizen.wallet.clone(),
                    expected: expected_citizen.total_power,
                    actual: computed_citizen.total_power,
                });
            }
        }
    }

    Ok(())
}

fn within_tolerance(expected: f64, actual: f64) -> bool {
    if expected == 0.0 {
        return actual.abs() < 1e-6;
    }
    ((actual - expected) / expected).abs() <= VERIFY_TOLERANCE
}
