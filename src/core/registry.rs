//! Parser registry
//!
//! Decoders form a closed set identified by [`ParserId`]. Most accounts are
//! resolved by owner program; the registry holds address-specific overrides,
//! including ones discovered while decoding other records (an edition PDA
//! derived from a metadata mint, a vault's fraction mint).

use std::collections::HashMap;

use parking_lot::RwLock;
use solana_sdk::pubkey::Pubkey;
use tracing::warn;

use super::error::{CacheError, DecodeError};
use crate::accounts::program_ids::*;
use crate::accounts::{self, auction, metadata, metaplex, token, vault, AccountData, AccountRecord};

/// Identity of a decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserId {
    /// Stores the raw bytes untouched
    PassThrough,
    Metadata,
    Vault,
    Auction,
    Metaplex,
    /// Mint or token account of either token program
    Token,
    /// Mint only
    Mint,
}

impl ParserId {
    /// Decoder used for an account when no override is registered
    pub fn for_owner(owner: &Pubkey) -> ParserId {
        if *owner == METADATA_PROGRAM_ID {
            ParserId::Metadata
        } else if *owner == VAULT_PROGRAM_ID {
            ParserId::Vault
        } else if *owner == AUCTION_PROGRAM_ID {
            ParserId::Auction
        } else if *owner == METAPLEX_PROGRAM_ID {
            ParserId::Metaplex
        } else if *owner == SPL_TOKEN_PROGRAM_ID || *owner == SPL_TOKEN_2022_PROGRAM_ID {
            ParserId::Token
        } else {
            ParserId::PassThrough
        }
    }

    pub fn decode(self, account: &AccountData) -> Result<AccountRecord, DecodeError> {
        match self {
            ParserId::PassThrough => Ok(AccountRecord::Raw(account.data.clone())),
            ParserId::Metadata => metadata::decode(&account.data),
            ParserId::Vault => vault::decode(&account.data),
            ParserId::Auction => auction::decode(&account.data),
            ParserId::Metaplex => metaplex::decode(&account.data),
            ParserId::Token => token::decode(&account.owner, &account.data),
            ParserId::Mint => token::parse_mint(&account.owner, &account.data).map(AccountRecord::Mint),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ParserId::PassThrough => "pass-through",
            ParserId::Metadata => "metadata",
            ParserId::Vault => "vault",
            ParserId::Auction => "auction",
            ParserId::Metaplex => "metaplex",
            ParserId::Token => "token",
            ParserId::Mint => "mint",
        }
    }
}

/// Address -> decoder overrides
#[derive(Debug, Default)]
pub struct ParserRegistry {
    by_address: RwLock<HashMap<Pubkey, ParserId>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `address` to `parser`
    ///
    /// Re-registering the same parser is a no-op. Binding a different parser
    /// is refused; use `AccountCache::replace_parser` to switch decoders and
    /// re-decode the cached bytes in one step.
    ///
    /// # Returns
    /// `Ok(true)` when a new binding was created, `Ok(false)` when it existed
    pub fn register(&self, address: Pubkey, parser: ParserId) -> Result<bool, CacheError> {
        let mut map = self.by_address.write();
        match map.get(&address) {
            Some(existing) if *existing == parser => Ok(false),
            Some(existing) => {
                warn!(
                    address = %address,
                    existing = existing.name(),
                    requested = parser.name(),
                    "parser conflict rejected"
                );
                Err(CacheError::ParserConflict { address, existing: *existing, requested: parser })
            }
            None => {
                map.insert(address, parser);
                Ok(true)
            }
        }
    }

    pub fn lookup(&self, address: &Pubkey) -> Option<ParserId> {
        self.by_address.read().get(address).copied()
    }

    /// Registered override, otherwise the owner's default decoder
    pub fn resolve(&self, address: &Pubkey, owner: &Pubkey) -> ParserId {
        self.lookup(address).unwrap_or_else(|| ParserId::for_owner(owner))
    }

    pub fn unregister(&self, address: &Pubkey) -> Option<ParserId> {
        self.by_address.write().remove(address)
    }

    /// Overwrite a binding unconditionally; callers must re-decode
    pub(crate) fn rebind(&self, address: Pubkey, parser: ParserId) -> Option<ParserId> {
        self.by_address.write().insert(address, parser)
    }

    /// Addresses bound to `parser`
    pub fn addresses_for(&self, parser: ParserId) -> Vec<Pubkey> {
        self.by_address
            .read()
            .iter()
            .filter(|(_, p)| **p == parser)
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_address.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.read().is_empty()
    }
}

/// Decode with an explicit parser or the owner default
pub fn decode_with(parser: Option<ParserId>, account: &AccountData) -> Result<AccountRecord, DecodeError> {
    match parser {
        Some(p) => p.decode(account),
        None => accounts::decode_account(account),
    }
}
