//! Program ID constants
//!
//! Owners are compared as `Pubkey` values so dispatch never needs a string
//! conversion.

use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

/// Token metadata program
pub const METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Token vault program
pub const VAULT_PROGRAM_ID: Pubkey = pubkey!("vau1zxA2LbssAUEF7Gpw91zMM1LvXrvpzJtmZ58rPsn");

/// Auction program
pub const AUCTION_PROGRAM_ID: Pubkey = pubkey!("auctxRXPeJoc4817jDhf4HbjnhEcr1cCXenosMhK5R8");

/// Metaplex auction-manager program
pub const METAPLEX_PROGRAM_ID: Pubkey = pubkey!("p1exdMJcjVao65QdewkaZRUnU6VPSXhus9n2GzWfh98");

pub const SPL_TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

pub const SPL_TOKEN_2022_PROGRAM_ID: Pubkey =
    pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");

/// The four programs whose accounts make up the meta state
pub const META_PROGRAMS: [Pubkey; 4] =
    [METADATA_PROGRAM_ID, VAULT_PROGRAM_ID, AUCTION_PROGRAM_ID, METAPLEX_PROGRAM_ID];
