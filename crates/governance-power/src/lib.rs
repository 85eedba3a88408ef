//! Governance voting-power engine
//!
//! Read-only decoder and calculator over a snapshot of a DAO's voter-stake
//! registry. One run takes one chain snapshot and one timestamp, classifies
//! every Voter account against each queried wallet, decodes deposits,
//! applies lockup multipliers and aggregates native plus delegated power
//! into a reproducible JSON artefact.

pub mod aliases;
pub mod authority;
pub mod config;
pub mod constants;
pub mod deposits;
pub mod error;
pub mod multiplier;
pub mod power;
pub mod registrar;
pub mod reports;
pub mod rpc;
pub mod snapshot;
