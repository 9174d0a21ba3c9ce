//! Error types for decoding, cache registration and bulk loading

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use super::registry::ParserId;

/// Raised when account bytes cannot be read as the record kind they claim to be
///
/// Decode failures never escape the cache: `AccountCache::add` logs them and
/// returns `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("account data too short: need {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },

    #[error("unknown discriminant {0}")]
    UnknownDiscriminant(u8),

    #[error("expected {expected} account, found key {found}")]
    UnexpectedKey { expected: &'static str, found: u8 },

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("borsh decode failed: {0}")]
    Borsh(String),

    #[error("no decoder for owner {0}")]
    UnsupportedOwner(Pubkey),
}

impl DecodeError {
    pub(crate) fn too_short(need: usize, got: usize) -> Self {
        DecodeError::TooShort { need, got }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::InvalidField { field, reason: reason.into() }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(e: std::io::Error) -> Self {
        DecodeError::Borsh(e.to_string())
    }
}

/// Registry and cache-level failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("address {address} already bound to {existing:?}, refusing {requested:?}")]
    ParserConflict { address: Pubkey, existing: ParserId, requested: ParserId },
}

/// Failures of the bulk loader and of fetch-on-miss queries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("account {0} not found")]
    NotFound(Pubkey),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
