//! Auction program accounts
//!
//! The auction program writes no key byte, so accounts are told apart by
//! their data length: bidder metadata and bidder pots have fixed sizes, the
//! extended auction PDA is allocated at its maximum size, and everything
//! else at least [`BASE_AUCTION_DATA_SIZE`] long is auction data.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use super::program_ids::AUCTION_PROGRAM_ID;
use super::{borsh_prefix, AccountRecord};
use crate::core::error::DecodeError;

pub const AUCTION_PREFIX: &[u8] = b"auction";
pub const EXTENDED_SUFFIX: &[u8] = b"extended";
pub const METADATA_SUFFIX: &[u8] = b"metadata";

pub const BASE_AUCTION_DATA_SIZE: usize = 32 + 32 + 9 + 9 + 9 + 9 + 1 + 32 + 1 + 8 + 8 + 8;
pub const BID_LENGTH: usize = 32 + 8;
pub const MAX_AUCTION_DATA_EXTENDED_SIZE: usize = 8 + 9 + 2 + 9 + 33 + 158;
pub const BIDDER_METADATA_LEN: usize = 32 + 32 + 8 + 8 + 1;
pub const BIDDER_POT_LEN: usize = 32 + 32 + 32 + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub enum AuctionState {
    Created,
    Started,
    Ended,
}

/// Price floor; every variant carries 32 bytes so the account size is fixed
#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub enum PriceFloor {
    None([u8; 32]),
    /// Minimum price in the first 8 bytes, little-endian
    MinimumPrice([u8; 32]),
    BlindedPrice([u8; 32]),
}

impl PriceFloor {
    pub fn minimum(amount: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&amount.to_le_bytes());
        PriceFloor::MinimumPrice(bytes)
    }

    pub fn minimum_price(&self) -> Option<u64> {
        match self {
            PriceFloor::MinimumPrice(bytes) => {
                let mut le = [0u8; 8];
                le.copy_from_slice(&bytes[..8]);
                Some(u64::from_le_bytes(le))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BidStateType {
    EnglishAuction,
    OpenEdition,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Bid {
    pub bidder: Pubkey,
    pub amount: u64,
}

/// Bids are kept in ascending amount order; the best bid is last
#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub enum BidState {
    EnglishAuction { bids: Vec<Bid>, max: u64 },
    OpenEdition { bids: Vec<Bid>, max: u64 },
}

impl BidState {
    pub fn kind(&self) -> BidStateType {
        match self {
            BidState::EnglishAuction { .. } => BidStateType::EnglishAuction,
            BidState::OpenEdition { .. } => BidStateType::OpenEdition,
        }
    }

    pub fn bids(&self) -> &[Bid] {
        match self {
            BidState::EnglishAuction { bids, .. } | BidState::OpenEdition { bids, .. } => bids,
        }
    }

    /// Number of winning places
    pub fn max(&self) -> u64 {
        match self {
            BidState::EnglishAuction { max, .. } | BidState::OpenEdition { max, .. } => *max,
        }
    }

    /// Zero-based winning place of `bidder`, if they currently hold one
    pub fn winner_index(&self, bidder: &Pubkey) -> Option<usize> {
        let bids = self.bids();
        let position = bids.iter().position(|b| &b.bidder == bidder)?;
        let zero_based = bids.len() - position - 1;
        if (zero_based as u64) < self.max() {
            Some(zero_based)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct AuctionData {
    pub authority: Pubkey,
    pub token_mint: Pubkey,
    /// Unix timestamp of the latest bid
    pub last_bid: Option<i64>,
    pub ended_at: Option<i64>,
    pub end_auction_at: Option<i64>,
    /// Seconds a late bid extends the auction by
    pub end_auction_gap: Option<i64>,
    pub price_floor: PriceFloor,
    pub state: AuctionState,
    pub bid_state: BidState,
}

impl AuctionData {
    /// Whether the auction is over at unix time `now`
    ///
    /// A recent bid inside the gap window keeps the auction open past
    /// `ended_at`.
    pub fn ended(&self, now: i64) -> bool {
        let ended_at = match self.ended_at {
            Some(t) => t,
            None => return false,
        };
        if ended_at >= now {
            return false;
        }
        match (self.end_auction_gap, self.last_bid) {
            (Some(gap), Some(last_bid)) => last_bid.saturating_add(gap) < now,
            _ => true,
        }
    }

    pub fn winner_index(&self, bidder: &Pubkey) -> Option<usize> {
        self.bid_state.winner_index(bidder)
    }

    pub fn bid_count(&self) -> usize {
        self.bid_state.bids().len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct AuctionDataExtended {
    pub total_uncancelled_bids: u64,
    pub tick_size: Option<u64>,
    pub gap_tick_size_percentage: Option<u8>,
    pub instant_sale_price: Option<u64>,
    pub name: Option<[u8; 32]>,
}

impl AuctionDataExtended {
    pub fn name(&self) -> Option<String> {
        self.name
            .as_ref()
            .map(|raw| String::from_utf8_lossy(raw).trim_end_matches('\0').to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct BidderMetadata {
    pub bidder_pubkey: Pubkey,
    pub auction_pubkey: Pubkey,
    pub last_bid: u64,
    pub last_bid_timestamp: i64,
    /// A cancelled bidder never counts as a current winner
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct BidderPot {
    /// Token account holding the escrowed bid
    pub bidder_pot: Pubkey,
    pub bidder_act: Pubkey,
    pub auction_act: Pubkey,
    pub emptied: bool,
}

/// Derive the extended-data PDA of the auction created for `vault`
pub fn auction_extended_address(vault: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[AUCTION_PREFIX, AUCTION_PROGRAM_ID.as_ref(), vault.as_ref(), EXTENDED_SUFFIX],
        &AUCTION_PROGRAM_ID,
    )
    .0
}

/// Derive the auction PDA created for `vault`
pub fn auction_address(vault: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[AUCTION_PREFIX, AUCTION_PROGRAM_ID.as_ref(), vault.as_ref()],
        &AUCTION_PROGRAM_ID,
    )
    .0
}

/// Derive the bidder metadata PDA for `bidder` on `auction`
pub fn bidder_metadata_address(auction: &Pubkey, bidder: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[
            AUCTION_PREFIX,
            AUCTION_PROGRAM_ID.as_ref(),
            auction.as_ref(),
            bidder.as_ref(),
            METADATA_SUFFIX,
        ],
        &AUCTION_PROGRAM_ID,
    )
    .0
}

/// Decode an auction-program account, dispatching on data length
pub fn decode(data: &[u8]) -> Result<AccountRecord, DecodeError> {
    match data.len() {
        BIDDER_METADATA_LEN => decode_bidder_metadata(data).map(AccountRecord::BidderMetadata),
        BIDDER_POT_LEN => decode_bidder_pot(data).map(AccountRecord::BidderPot),
        MAX_AUCTION_DATA_EXTENDED_SIZE => borsh_prefix(data).map(AccountRecord::AuctionDataExtended),
        len if len >= BASE_AUCTION_DATA_SIZE => borsh_prefix(data).map(AccountRecord::AuctionData),
        len => Err(DecodeError::too_short(BASE_AUCTION_DATA_SIZE, len)),
    }
}

#[cfg(feature = "parse-borsh")]
pub fn decode_bidder_metadata(data: &[u8]) -> Result<BidderMetadata, DecodeError> {
    borsh_prefix(data)
}

#[cfg(feature = "parse-borsh")]
pub fn decode_bidder_pot(data: &[u8]) -> Result<BidderPot, DecodeError> {
    borsh_prefix(data)
}

#[cfg(not(feature = "parse-borsh"))]
pub fn decode_bidder_metadata(data: &[u8]) -> Result<BidderMetadata, DecodeError> {
    use super::utils::*;
    let short = || DecodeError::too_short(BIDDER_METADATA_LEN, data.len());
    Ok(BidderMetadata {
        bidder_pubkey: read_pubkey(data, 0).ok_or_else(short)?,
        auction_pubkey: read_pubkey(data, 32).ok_or_else(short)?,
        last_bid: read_u64_le(data, 64).ok_or_else(short)?,
        last_bid_timestamp: read_i64_le(data, 72).ok_or_else(short)?,
        cancelled: read_bool(data, 80).ok_or_else(short)?,
    })
}

#[cfg(not(feature = "parse-borsh"))]
pub fn decode_bidder_pot(data: &[u8]) -> Result<BidderPot, DecodeError> {
    use super::utils::*;
    let short = || DecodeError::too_short(BIDDER_POT_LEN, data.len());
    Ok(BidderPot {
        bidder_pot: read_pubkey(data, 0).ok_or_else(short)?,
        bidder_act: read_pubkey(data, 32).ok_or_else(short)?,
        auction_act: read_pubkey(data, 64).ok_or_else(short)?,
        emptied: read_bool(data, 96).ok_or_else(short)?,
    })
}
