//! Token vault program accounts
//!
//! Vaults, safety deposit boxes and external price accounts. Each account
//! starts with a one-byte [`VaultKey`].

use borsh::{BorshDeserialize, BorshSerialize};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use solana_sdk::pubkey::Pubkey;

use super::{borsh_prefix, AccountRecord};
use crate::core::error::DecodeError;

/// Byte offset of `token_type_count` inside a vault account
pub const TOKEN_TYPE_COUNT_OFFSET: usize = 194;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize, TryFromPrimitive, IntoPrimitive,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum VaultKey {
    Uninitialized = 0,
    SafetyDepositBoxV1 = 1,
    ExternalAccountKeyV1 = 2,
    VaultV1 = 3,
}

/// Vault lifecycle: Inactive -> Active -> Combined -> Deactivated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum VaultState {
    Inactive = 0,
    Active = 1,
    Combined = 2,
    Deactivated = 3,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Vault {
    pub key: VaultKey,
    pub token_program: Pubkey,
    pub fraction_mint: Pubkey,
    pub authority: Pubkey,
    pub fraction_treasury: Pubkey,
    pub redeem_treasury: Pubkey,
    pub allow_further_share_creation: bool,
    pub pricing_lookup_address: Pubkey,
    /// Number of safety deposit boxes added so far
    pub token_type_count: u8,
    pub state: VaultState,
    pub locked_price_per_share: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct SafetyDepositBox {
    pub key: VaultKey,
    pub vault: Pubkey,
    pub token_mint: Pubkey,
    pub store: Pubkey,
    /// 0-based insertion position within the vault
    pub order: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct ExternalPriceAccount {
    pub key: VaultKey,
    pub price_per_share: u64,
    pub price_mint: Pubkey,
    pub allowed_to_combine: bool,
}

/// Decode a vault-program account
pub fn decode(data: &[u8]) -> Result<AccountRecord, DecodeError> {
    let first = *data.first().ok_or_else(|| DecodeError::too_short(1, 0))?;
    let key = VaultKey::try_from(first).map_err(|_| DecodeError::UnknownDiscriminant(first))?;

    match key {
        VaultKey::VaultV1 => borsh_prefix(data).map(AccountRecord::Vault),
        VaultKey::SafetyDepositBoxV1 => borsh_prefix(data).map(AccountRecord::SafetyDepositBox),
        VaultKey::ExternalAccountKeyV1 => borsh_prefix(data).map(AccountRecord::ExternalPriceAccount),
        VaultKey::Uninitialized => {
            Err(DecodeError::UnexpectedKey { expected: "initialized vault", found: first })
        }
    }
}
