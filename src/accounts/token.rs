//! SPL Token and Token-2022 mint / token account parsing
//!
//! Mints feed the mint cache (fraction mints of vaults, printing mints);
//! token accounts are kept so wallet holdings can be joined against boxes.

use solana_sdk::pubkey::Pubkey;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account, Mint};
use spl_token_2022::{
    extension::StateWithExtensions,
    state::{Account as Account2022, Mint as Mint2022},
};

use super::program_ids::{SPL_TOKEN_2022_PROGRAM_ID, SPL_TOKEN_PROGRAM_ID};
use super::AccountRecord;
use crate::core::error::DecodeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintInfo {
    pub supply: u64,
    pub decimals: u8,
    pub mint_authority: Option<Pubkey>,
    pub is_initialized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccountInfo {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

fn to_pubkey<K: AsRef<[u8]>>(key: K) -> Option<Pubkey> {
    let bytes: [u8; 32] = key.as_ref().try_into().ok()?;
    Some(Pubkey::new_from_array(bytes))
}

/// `COption` of raw key bytes into an optional key
fn authority(value: impl Into<Option<[u8; 32]>>) -> Option<Pubkey> {
    value.into().map(Pubkey::new_from_array)
}

/// Parse a mint owned by either token program
///
/// # Arguments
/// * `owner` - Account owner, selects SPL Token or Token-2022 layout
/// * `data` - Raw account data
///
/// # Returns
/// `MintInfo` on success
pub fn parse_mint(owner: &Pubkey, data: &[u8]) -> Result<MintInfo, DecodeError> {
    if *owner == SPL_TOKEN_2022_PROGRAM_ID {
        let mint = StateWithExtensions::<Mint2022>::unpack(data)
            .map_err(|e| DecodeError::invalid("mint", e.to_string()))?;
        return Ok(MintInfo {
            supply: mint.base.supply,
            decimals: mint.base.decimals,
            mint_authority: authority(mint.base.mint_authority.map(|k| k.to_bytes())),
            is_initialized: mint.base.is_initialized,
        });
    }

    if data.len() < Mint::LEN {
        return Err(DecodeError::too_short(Mint::LEN, data.len()));
    }
    let mint = Mint::unpack_from_slice(&data[..Mint::LEN])
        .map_err(|e| DecodeError::invalid("mint", e.to_string()))?;
    Ok(MintInfo {
        supply: mint.supply,
        decimals: mint.decimals,
        mint_authority: authority(mint.mint_authority.map(|k| k.to_bytes())),
        is_initialized: mint.is_initialized,
    })
}

/// Parse a token account owned by either token program
pub fn parse_token_account(owner: &Pubkey, data: &[u8]) -> Result<TokenAccountInfo, DecodeError> {
    let invalid = |field: &'static str| DecodeError::invalid(field, "not a 32-byte key");
    if *owner == SPL_TOKEN_2022_PROGRAM_ID {
        let account = StateWithExtensions::<Account2022>::unpack(data)
            .map_err(|e| DecodeError::invalid("token_account", e.to_string()))?;
        return Ok(TokenAccountInfo {
            mint: to_pubkey(account.base.mint).ok_or_else(|| invalid("mint"))?,
            owner: to_pubkey(account.base.owner).ok_or_else(|| invalid("owner"))?,
            amount: account.base.amount,
        });
    }

    if data.len() < Account::LEN {
        return Err(DecodeError::too_short(Account::LEN, data.len()));
    }
    let account = Account::unpack_from_slice(&data[..Account::LEN])
        .map_err(|e| DecodeError::invalid("token_account", e.to_string()))?;
    Ok(TokenAccountInfo {
        mint: to_pubkey(account.mint).ok_or_else(|| invalid("mint"))?,
        owner: to_pubkey(account.owner).ok_or_else(|| invalid("owner"))?,
        amount: account.amount,
    })
}

/// Decode any account owned by a token program
///
/// Classic token accounts are 165 bytes and mints 82; Token-2022 accounts
/// may carry extensions, so a mint parse is tried first and the token
/// account layout second.
pub fn decode(owner: &Pubkey, data: &[u8]) -> Result<AccountRecord, DecodeError> {
    if *owner != SPL_TOKEN_PROGRAM_ID && *owner != SPL_TOKEN_2022_PROGRAM_ID {
        return Err(DecodeError::UnsupportedOwner(*owner));
    }
    if *owner == SPL_TOKEN_PROGRAM_ID {
        return match data.len() {
            Mint::LEN => parse_mint(owner, data).map(AccountRecord::Mint),
            Account::LEN => parse_token_account(owner, data).map(AccountRecord::TokenAccount),
            len => Err(DecodeError::invalid("token", format!("unexpected length {}", len))),
        };
    }
    match parse_mint(owner, data) {
        Ok(mint) => Ok(AccountRecord::Mint(mint)),
        Err(_) => parse_token_account(owner, data).map(AccountRecord::TokenAccount),
    }
}

#[cfg(test)]
pub(crate) fn mint_bytes(supply: u64, decimals: u8) -> Vec<u8> {
    use spl_token::solana_program::program_option::COption;
    let mint = Mint {
        mint_authority: COption::None,
        supply,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    };
    let mut data = vec![0u8; Mint::LEN];
    Mint::pack(mint, &mut data).unwrap();
    data
}
