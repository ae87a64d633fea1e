//! Fatal failures of a single invocation.
//!
//! Conditions that users can fix themselves (malformed hand, missing reply
//! target, puzzle not found, no yaku) never show up here; composers turn them
//! into ordinary replies.

use crate::{relay::RelayError, signer::SignError};

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("kind {0} is not supported")]
    UnsupportedKind(u32),
    #[error("root is not found")]
    MissingThreadRoot,
    #[error("no persona is defined for pubkey {0}")]
    UnknownPersona(String),
    #[error("unknown tile token: {0}")]
    UnknownToken(String),
    #[error("unknown emoji shortcode: {0}")]
    UnknownShortcode(String),
    #[error("quiz corpus is empty")]
    EmptyCorpus,
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),
    #[error("signing failed: {0}")]
    Sign(#[from] SignError),
}

pub type Result<T, E = ResponseError> = std::result::Result<T, E>;
