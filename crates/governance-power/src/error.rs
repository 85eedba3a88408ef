//! Error taxonomy
//!
//! Fatal conditions carry their taxonomy label to the CLI exit code. Decode
//! failures are deliberately absent from the fatal path: a malformed account
//! becomes a per-deposit filter record, never a run abort.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PowerError {
    /// Missing RPC URL, unparseable pubkey, malformed alias or citizens file.
    /// Fatal, no retry.
    #[error("ConfigError: {0}")]
    Config(String),

    /// RPC problem. Retryable errors are backed off and retried before this
    /// surfaces; fatal ones (authentication) abort immediately.
    #[error("TransportError: {message}")]
    Transport { retryable: bool, message: String },

    /// A specific account failed to parse. Callers convert this into a
    /// `parse_error` filter record; it never aborts a batch.
    #[error("DecodeError: {0}")]
    Decode(String),

    /// Registrar parameters out of range, or a computed multiplier outside
    /// its proven bounds. Indicates a code or config bug; the batch halts
    /// rather than emitting wrong totals.
    #[error("InvariantViolation: {0}")]
    InvariantViolation(String),

    /// `verify` found a computed result outside tolerance of the fixture.
    #[error("VerificationMismatch: {wallet}: expected {expected}, computed {actual}")]
    VerificationMismatch {
        wallet: String,
        expected: f64,
        actual: f64,
    },
}

impl PowerError {
    /// CLI exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PowerError::VerificationMismatch { .. } => 1,
            PowerError::Config(_) => 2,
            PowerError::InvariantViolation(_) => 2,
            PowerError::Decode(_) => 2,
            PowerError::Transport { .. } => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_match_cli_contract() {
        assert_eq!(PowerError::Config("x".into()).exit_code(), 2);
        assert_eq!(
            PowerError::Transport {
                retryable: false,
                message: "x".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(
            PowerError::VerificationMismatch {
                wallet: "w".into(),
                expected: 1.0,
                actual: 2.0
            }
            .exit_code(),
            1
        );
        assert_eq!(PowerError::InvariantViolation("x".into()).exit_code(), 2);
    }

    #[test]
    fn test_error_messages_carry_taxonomy_label() {
        let err = PowerError::Config("missing rpc url".into());
        assert!(err.to_string().starts_with("ConfigError:"));

        let err = PowerError::Transport {
            retryable: true,
            message: "timeout".into(),
        };
        assert!(err.to_string().starts_with("TransportError:"));
    }
}
