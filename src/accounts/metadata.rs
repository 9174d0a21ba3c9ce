//! Token metadata program accounts
//!
//! Metadata, master editions (v1/v2), editions and edition markers. Every
//! account starts with a one-byte [`MetadataKey`].

use borsh::{BorshDeserialize, BorshSerialize};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use solana_sdk::pubkey::Pubkey;

use super::program_ids::METADATA_PROGRAM_ID;
use super::utils::trim_nul;
use super::{borsh_prefix, AccountRecord};
use crate::core::error::DecodeError;

pub const METADATA_PREFIX: &[u8] = b"metadata";
pub const EDITION_SUFFIX: &[u8] = b"edition";

/// Editions tracked by a single marker account
pub const EDITION_MARKER_BIT_SIZE: u64 = 248;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize, TryFromPrimitive, IntoPrimitive,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum MetadataKey {
    Uninitialized = 0,
    EditionV1 = 1,
    MasterEditionV1 = 2,
    ReservationListV1 = 3,
    MetadataV1 = 4,
    ReservationListV2 = 5,
    MasterEditionV2 = 6,
    EditionMarker = 7,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Creator {
    pub address: Pubkey,
    pub verified: bool,
    /// Percentage share, 0..=100
    pub share: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Data {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Option<Vec<Creator>>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Metadata {
    pub key: MetadataKey,
    pub update_authority: Pubkey,
    pub mint: Pubkey,
    pub data: Data,
    pub primary_sale_happened: bool,
    pub is_mutable: bool,
}

impl Metadata {
    /// Address of the edition or master edition account that belongs to this mint
    pub fn edition_address(&self) -> Pubkey {
        edition_address(&self.mint)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct MasterEditionV1 {
    pub key: MetadataKey,
    pub supply: u64,
    pub max_supply: Option<u64>,
    pub printing_mint: Pubkey,
    pub one_time_printing_authorization_mint: Pubkey,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct MasterEditionV2 {
    pub key: MetadataKey,
    pub supply: u64,
    pub max_supply: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterEdition {
    V1(MasterEditionV1),
    V2(MasterEditionV2),
}

impl MasterEdition {
    pub fn supply(&self) -> u64 {
        match self {
            MasterEdition::V1(m) => m.supply,
            MasterEdition::V2(m) => m.supply,
        }
    }

    pub fn max_supply(&self) -> Option<u64> {
        match self {
            MasterEdition::V1(m) => m.max_supply,
            MasterEdition::V2(m) => m.max_supply,
        }
    }

    /// Only v1 master editions print through a dedicated mint
    pub fn printing_mint(&self) -> Option<Pubkey> {
        match self {
            MasterEdition::V1(m) => Some(m.printing_mint),
            MasterEdition::V2(_) => None,
        }
    }

    pub fn one_time_printing_authorization_mint(&self) -> Option<Pubkey> {
        match self {
            MasterEdition::V1(m) => Some(m.one_time_printing_authorization_mint),
            MasterEdition::V2(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Edition {
    pub key: MetadataKey,
    /// Master edition this print belongs to
    pub parent: Pubkey,
    pub edition: u64,
}

/// Bitset of minted print ordinals for one block of 248 editions
#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct EditionMarker {
    pub key: MetadataKey,
    pub ledger: [u8; 31],
}

impl EditionMarker {
    pub fn new() -> Self {
        Self { key: MetadataKey::EditionMarker, ledger: [0; 31] }
    }

    /// Which marker account (by block number) tracks `edition`
    pub fn marker_number(edition: u64) -> u64 {
        edition / EDITION_MARKER_BIT_SIZE
    }

    /// Byte index and mask for `edition` within this marker's ledger
    #[inline]
    pub fn index_and_mask(edition: u64) -> (usize, u8) {
        let offset = edition % EDITION_MARKER_BIT_SIZE;
        let index = (offset / 8) as usize;
        let mask = 1u8 << (7 - (offset % 8) as u8);
        (index, mask)
    }

    pub fn edition_taken(&self, edition: u64) -> bool {
        let (index, mask) = Self::index_and_mask(edition);
        self.ledger[index] & mask != 0
    }

    pub fn mark_edition(&mut self, edition: u64) {
        let (index, mask) = Self::index_and_mask(edition);
        self.ledger[index] |= mask;
    }

    /// Number of editions marked in this block
    pub fn taken_count(&self) -> u32 {
        self.ledger.iter().map(|b| b.count_ones()).sum()
    }
}

impl Default for EditionMarker {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive the edition PDA for a mint
pub fn edition_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[METADATA_PREFIX, METADATA_PROGRAM_ID.as_ref(), mint.as_ref(), EDITION_SUFFIX],
        &METADATA_PROGRAM_ID,
    )
    .0
}

/// Derive the metadata PDA for a mint
pub fn metadata_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[METADATA_PREFIX, METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &METADATA_PROGRAM_ID,
    )
    .0
}

/// Decode a metadata-program account
///
/// Reservation lists are recognised but kept as raw bytes.
pub fn decode(data: &[u8]) -> Result<AccountRecord, DecodeError> {
    let first = *data.first().ok_or_else(|| DecodeError::too_short(1, 0))?;
    let key = MetadataKey::try_from(first).map_err(|_| DecodeError::UnknownDiscriminant(first))?;

    match key {
        MetadataKey::MetadataV1 => decode_metadata(data).map(AccountRecord::Metadata),
        MetadataKey::MasterEditionV1 => {
            let m: MasterEditionV1 = borsh_prefix(data)?;
            Ok(AccountRecord::MasterEdition(MasterEdition::V1(m)))
        }
        MetadataKey::MasterEditionV2 => {
            let m: MasterEditionV2 = borsh_prefix(data)?;
            Ok(AccountRecord::MasterEdition(MasterEdition::V2(m)))
        }
        MetadataKey::EditionV1 => borsh_prefix(data).map(AccountRecord::Edition),
        MetadataKey::EditionMarker => borsh_prefix(data).map(AccountRecord::EditionMarker),
        MetadataKey::ReservationListV1 | MetadataKey::ReservationListV2 => {
            Ok(AccountRecord::Raw(data.to_vec()))
        }
        MetadataKey::Uninitialized => {
            Err(DecodeError::UnexpectedKey { expected: "initialized metadata", found: first })
        }
    }
}

/// Decode a metadata record and strip NUL padding from its string slots
pub fn decode_metadata(data: &[u8]) -> Result<Metadata, DecodeError> {
    let mut metadata: Metadata = borsh_prefix(data)?;
    if metadata.key != MetadataKey::MetadataV1 {
        return Err(DecodeError::UnexpectedKey { expected: "metadata", found: metadata.key.into() });
    }
    metadata.data.name = trim_nul(&metadata.data.name);
    metadata.data.symbol = trim_nul(&metadata.data.symbol);
    metadata.data.uri = trim_nul(&metadata.data.uri);
    if metadata.data.seller_fee_basis_points > 10_000 {
        return Err(DecodeError::invalid(
            "seller_fee_basis_points",
            format!("{} exceeds 10000", metadata.data.seller_fee_basis_points),
        ));
    }
    Ok(metadata)
}
