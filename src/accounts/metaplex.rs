//! Metaplex auction-manager program accounts
//!
//! Stores, whitelisted creators and v2 auction managers are borsh encoded.
//! Bid redemption tickets and safety deposit configs are written by the
//! program with manual offsets and are read here the same way.

use borsh::{BorshDeserialize, BorshSerialize};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use smallvec::SmallVec;
use solana_sdk::pubkey::Pubkey;

use super::program_ids::METAPLEX_PROGRAM_ID;
use super::utils::*;
use super::{borsh_prefix, AccountRecord};
use crate::core::error::DecodeError;

pub const METAPLEX_PREFIX: &[u8] = b"metaplex";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize, TryFromPrimitive, IntoPrimitive,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum MetaplexKey {
    Uninitialized = 0,
    OriginalAuthorityLookupV1 = 1,
    BidRedemptionTicketV1 = 2,
    StoreV1 = 3,
    WhitelistedCreatorV1 = 4,
    PayoutTicketV1 = 5,
    SafetyDepositValidationTicketV1 = 6,
    AuctionManagerV1 = 7,
    PrizeTrackingTicketV1 = 8,
    SafetyDepositConfigV1 = 9,
    AuctionManagerV2 = 10,
    BidRedemptionTicketV2 = 11,
    AuctionWinnerTokenTypeTrackerV1 = 12,
    StoreIndexerV1 = 13,
    AuctionCacheV1 = 14,
    StoreConfigV1 = 15,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Store {
    pub key: MetaplexKey,
    pub public: bool,
    pub auction_program: Pubkey,
    pub token_vault_program: Pubkey,
    pub token_metadata_program: Pubkey,
    pub token_program: Pubkey,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct WhitelistedCreator {
    pub key: MetaplexKey,
    pub address: Pubkey,
    pub activated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub enum AuctionManagerStatus {
    Initialized,
    Validated,
    Running,
    Disbursing,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct AuctionManagerStateV2 {
    pub status: AuctionManagerStatus,
    pub safety_config_items_validated: u64,
    pub bids_pushed_to_accept_payment: u64,
    pub has_participation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct AuctionManagerV2 {
    pub key: MetaplexKey,
    pub store: Pubkey,
    /// Seller; the only wallet allowed to claim unsold items
    pub authority: Pubkey,
    pub auction: Pubkey,
    pub vault: Pubkey,
    pub accept_payment: Pubkey,
    pub state: AuctionManagerStateV2,
}

/// Per-bid record of which prizes have been redeemed
///
/// Layout: key, winner-index option flag, optional u64 winner index,
/// auction manager, then a bitmask with one bit per safety deposit box
/// order, most significant bit first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidRedemptionTicketV2 {
    pub winner_index: Option<u64>,
    pub auction_manager: Pubkey,
    pub redeemed: SmallVec<[u8; 8]>,
}

impl BidRedemptionTicketV2 {
    /// Start of the bitmask given whether a winner index is stored
    pub fn bitmask_offset(has_winner_index: bool) -> usize {
        if has_winner_index {
            42
        } else {
            34
        }
    }

    /// Whether the prize in the box with `order` has been redeemed
    pub fn is_redeemed(&self, order: u64) -> bool {
        msb_bit_is_set(&self.redeemed, order as usize).unwrap_or(false)
    }

    pub fn mark_redeemed(&mut self, order: u64) {
        let index = (order / 8) as usize;
        if self.redeemed.len() <= index {
            self.redeemed.resize(index + 1, 0);
        }
        self.redeemed[index] |= 1u8 << (7 - (order % 8) as u8);
    }

    /// Serialize in on-chain layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![MetaplexKey::BidRedemptionTicketV2 as u8];
        match self.winner_index {
            Some(index) => {
                out.push(1);
                out.extend_from_slice(&index.to_le_bytes());
            }
            None => out.push(0),
        }
        out.extend_from_slice(self.auction_manager.as_ref());
        out.extend_from_slice(&self.redeemed);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WinningConfigType {
    TokenOnlyTransfer,
    FullRightsTransfer,
    PrintingV1,
    PrintingV2,
    Participation,
}

impl TryFrom<u8> for WinningConfigType {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => WinningConfigType::TokenOnlyTransfer,
            1 => WinningConfigType::FullRightsTransfer,
            2 => WinningConfigType::PrintingV1,
            3 => WinningConfigType::PrintingV2,
            4 => WinningConfigType::Participation,
            other => {
                return Err(DecodeError::invalid("winning_config_type", format!("unknown value {}", other)))
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinningConstraint {
    NoParticipationPrize,
    ParticipationPrizeGiven,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonWinningConstraint {
    NoParticipationPrize,
    GivenForFixedPrice,
    GivenForBidPrice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipationConfigV2 {
    pub winner_constraint: WinningConstraint,
    pub non_winning_constraint: NonWinningConstraint,
    pub fixed_price: Option<u64>,
}

/// `(amount each winner in the range gets, length of the range)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountRange(pub u64, pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyDepositConfig {
    pub auction_manager: Pubkey,
    /// Matches `SafetyDepositBox::order` of the box it configures
    pub order: u64,
    pub winning_config_type: WinningConfigType,
    /// Byte width of amounts in `amount_ranges` (1, 2, 4 or 8)
    pub amount_type: u8,
    /// Byte width of lengths in `amount_ranges`
    pub length_type: u8,
    pub amount_ranges: Vec<AmountRange>,
    pub participation_config: Option<ParticipationConfigV2>,
    /// Lamports collected to the accept-payment account for participation prizes
    pub participation_state: Option<u64>,
}

const ORDER_POSITION: usize = 33;
const WINNING_CONFIG_POSITION: usize = 41;
const AMOUNT_POSITION: usize = 42;
const LENGTH_POSITION: usize = 43;
const AMOUNT_RANGE_SIZE_POSITION: usize = 44;
const AMOUNT_RANGE_FIRST_EL_POSITION: usize = 48;

impl SafetyDepositConfig {
    /// Items a winner at `winner_index` receives from this box
    ///
    /// Walks the amount ranges, each covering `length` consecutive winners.
    pub fn amount_for_winner(&self, winner_index: u64) -> u64 {
        let mut start = 0u64;
        for AmountRange(amount, length) in &self.amount_ranges {
            let end = start.saturating_add(*length);
            if winner_index >= start && winner_index < end {
                return *amount;
            }
            start = end;
        }
        0
    }

    /// Number of winners this box pays out to
    pub fn winner_count(&self) -> u64 {
        self.amount_ranges
            .iter()
            .fold(0u64, |acc, AmountRange(_, length)| acc.saturating_add(*length))
    }

    /// Serialize in on-chain layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![MetaplexKey::SafetyDepositConfigV1 as u8];
        out.extend_from_slice(self.auction_manager.as_ref());
        out.extend_from_slice(&self.order.to_le_bytes());
        out.push(self.winning_config_type as u8);
        out.push(self.amount_type);
        out.push(self.length_type);
        out.extend_from_slice(&(self.amount_ranges.len() as u32).to_le_bytes());
        for AmountRange(amount, length) in &self.amount_ranges {
            out.extend_from_slice(&amount.to_le_bytes()[..self.amount_type as usize]);
            out.extend_from_slice(&length.to_le_bytes()[..self.length_type as usize]);
        }
        match &self.participation_config {
            Some(config) => {
                out.push(1);
                out.push(config.winner_constraint as u8);
                out.push(config.non_winning_constraint as u8);
                match config.fixed_price {
                    Some(price) => {
                        out.push(1);
                        out.extend_from_slice(&price.to_le_bytes());
                    }
                    None => out.push(0),
                }
            }
            None => out.push(0),
        }
        match self.participation_state {
            Some(collected) => {
                out.push(1);
                out.extend_from_slice(&collected.to_le_bytes());
            }
            None => out.push(0),
        }
        out
    }
}

/// Derive the auction manager PDA for an auction
pub fn auction_manager_address(auction: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[METAPLEX_PREFIX, auction.as_ref()], &METAPLEX_PROGRAM_ID).0
}

/// Derive the bid redemption ticket PDA of a bidder metadata account
pub fn bid_redemption_address(auction: &Pubkey, bidder_metadata: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[METAPLEX_PREFIX, auction.as_ref(), bidder_metadata.as_ref()],
        &METAPLEX_PROGRAM_ID,
    )
    .0
}

/// Derive the whitelisted-creator PDA for `creator` in `store`
pub fn whitelisted_creator_address(store: &Pubkey, creator: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[METAPLEX_PREFIX, METAPLEX_PROGRAM_ID.as_ref(), store.as_ref(), creator.as_ref()],
        &METAPLEX_PROGRAM_ID,
    )
    .0
}

/// Decode a metaplex-program account
///
/// Keys without a typed record (v1 managers, payout tickets, indexers, ...)
/// come back as raw bytes.
pub fn decode(data: &[u8]) -> Result<AccountRecord, DecodeError> {
    let first = *data.first().ok_or_else(|| DecodeError::too_short(1, 0))?;
    let key = MetaplexKey::try_from(first).map_err(|_| DecodeError::UnknownDiscriminant(first))?;

    match key {
        MetaplexKey::StoreV1 => borsh_prefix(data).map(AccountRecord::Store),
        MetaplexKey::WhitelistedCreatorV1 => borsh_prefix(data).map(AccountRecord::WhitelistedCreator),
        MetaplexKey::AuctionManagerV2 => borsh_prefix(data).map(AccountRecord::AuctionManager),
        MetaplexKey::BidRedemptionTicketV2 => {
            decode_bid_redemption_v2(data).map(AccountRecord::BidRedemptionTicket)
        }
        MetaplexKey::SafetyDepositConfigV1 => {
            decode_safety_deposit_config(data).map(AccountRecord::SafetyDepositConfig)
        }
        MetaplexKey::Uninitialized => {
            Err(DecodeError::UnexpectedKey { expected: "initialized metaplex", found: first })
        }
        _ => Ok(AccountRecord::Raw(data.to_vec())),
    }
}

pub fn decode_bid_redemption_v2(data: &[u8]) -> Result<BidRedemptionTicketV2, DecodeError> {
    let has_winner_index = read_bool(data, 1).ok_or_else(|| DecodeError::too_short(2, data.len()))?;
    let offset = BidRedemptionTicketV2::bitmask_offset(has_winner_index);
    if data.len() < offset {
        return Err(DecodeError::too_short(offset, data.len()));
    }
    let winner_index = if has_winner_index { read_u64_le(data, 2) } else { None };
    let auction_manager = read_pubkey(data, offset - 32).ok_or_else(|| DecodeError::too_short(offset, data.len()))?;
    Ok(BidRedemptionTicketV2 {
        winner_index,
        auction_manager,
        redeemed: SmallVec::from_slice(&data[offset..]),
    })
}

pub fn decode_safety_deposit_config(data: &[u8]) -> Result<SafetyDepositConfig, DecodeError> {
    let short = |need: usize| DecodeError::too_short(need, data.len());

    let auction_manager = read_pubkey(data, 1).ok_or_else(|| short(ORDER_POSITION))?;
    let order = read_u64_le(data, ORDER_POSITION).ok_or_else(|| short(ORDER_POSITION + 8))?;
    let winning_config_type =
        WinningConfigType::try_from(read_u8(data, WINNING_CONFIG_POSITION).ok_or_else(|| short(42))?)?;
    let amount_type = read_u8(data, AMOUNT_POSITION).ok_or_else(|| short(43))?;
    let length_type = read_u8(data, LENGTH_POSITION).ok_or_else(|| short(44))?;
    for (field, width) in [("amount_type", amount_type), ("length_type", length_type)] {
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(DecodeError::invalid(field, format!("unsupported width {}", width)));
        }
    }
    let range_count = read_u32_le(data, AMOUNT_RANGE_SIZE_POSITION).ok_or_else(|| short(48))? as usize;

    let mut offset = AMOUNT_RANGE_FIRST_EL_POSITION;
    let stride = amount_type as usize + length_type as usize;
    let need = offset.saturating_add(range_count.saturating_mul(stride));
    if data.len() < need {
        return Err(short(need));
    }
    let mut amount_ranges = Vec::with_capacity(range_count);
    for _ in 0..range_count {
        let amount = read_uint_of_width(data, offset, amount_type as usize).ok_or_else(|| short(need))?;
        offset += amount_type as usize;
        let length = read_uint_of_width(data, offset, length_type as usize).ok_or_else(|| short(need))?;
        offset += length_type as usize;
        amount_ranges.push(AmountRange(amount, length));
    }

    let participation_config = match read_u8(data, offset) {
        Some(1) => {
            let winner_constraint = match read_u8(data, offset + 1) {
                Some(0) => WinningConstraint::NoParticipationPrize,
                Some(1) => WinningConstraint::ParticipationPrizeGiven,
                _ => return Err(DecodeError::invalid("winner_constraint", "out of range")),
            };
            let non_winning_constraint = match read_u8(data, offset + 2) {
                Some(0) => NonWinningConstraint::NoParticipationPrize,
                Some(1) => NonWinningConstraint::GivenForFixedPrice,
                Some(2) => NonWinningConstraint::GivenForBidPrice,
                _ => return Err(DecodeError::invalid("non_winning_constraint", "out of range")),
            };
            offset += 3;
            let fixed_price = match read_u8(data, offset) {
                Some(1) => {
                    let price = read_u64_le(data, offset + 1).ok_or_else(|| short(offset + 9))?;
                    offset += 9;
                    Some(price)
                }
                Some(_) => {
                    offset += 1;
                    None
                }
                None => return Err(short(offset + 1)),
            };
            Some(ParticipationConfigV2 { winner_constraint, non_winning_constraint, fixed_price })
        }
        Some(_) => {
            offset += 1;
            None
        }
        None => return Err(short(offset + 1)),
    };

    // older configs may end before the participation state flag
    let participation_state = match read_u8(data, offset) {
        Some(1) => Some(read_u64_le(data, offset + 1).ok_or_else(|| short(offset + 9))?),
        _ => None,
    };

    Ok(SafetyDepositConfig {
        auction_manager,
        order,
        winning_config_type,
        amount_type,
        length_type,
        amount_ranges,
        participation_config,
        participation_state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_auction_manager_v2() {
        let manager = AuctionManagerV2 {
            key: MetaplexKey::AuctionManagerV2,
            store: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            auction: Pubkey::new_unique(),
            vault: Pubkey::new_unique(),
            accept_payment: Pubkey::new_unique(),
            state: AuctionManagerStateV2 {
                status: AuctionManagerStatus::Running,
                safety_config_items_validated: 2,
                bids_pushed_to_accept_payment: 0,
                has_participation: false,
            },
        };
        let mut bytes = borsh::to_vec(&manager).unwrap();
        bytes.extend_from_slice(&[0u8; 16]);
        assert_eq!(decode(&bytes).unwrap(), AccountRecord::AuctionManager(manager));
    }

    #[test]
    fn test_bid_redemption_offsets() {
        let manager = Pubkey::new_unique();
        let mut ticket = BidRedemptionTicketV2 {
            winner_index: Some(3),
            auction_manager: manager,
            redeemed: SmallVec::from_slice(&[0u8; 2]),
        };
        ticket.mark_redeemed(0);
        ticket.mark_redeemed(9);
        let bytes = ticket.to_bytes();
        assert_eq!(bytes[42], 0b1000_0000);
        assert_eq!(bytes[43], 0b0100_0000);

        let decoded = decode_bid_redemption_v2(&bytes).unwrap();
        assert_eq!(decoded, ticket);
        assert!(decoded.is_redeemed(0));
        assert!(decoded.is_redeemed(9));
        assert!(!decoded.is_redeemed(1));
        assert!(!decoded.is_redeemed(200));

        let open = BidRedemptionTicketV2 {
            winner_index: None,
            auction_manager: manager,
            redeemed: SmallVec::from_slice(&[0b0010_0000]),
        };
        let bytes = open.to_bytes();
        assert_eq!(bytes.len(), 35);
        let decoded = decode_bid_redemption_v2(&bytes).unwrap();
        assert_eq!(decoded.winner_index, None);
        assert!(decoded.is_redeemed(2));
    }

    #[test]
    fn test_safety_deposit_config_variable_widths() {
        let config = SafetyDepositConfig {
            auction_manager: Pubkey::new_unique(),
            order: 1,
            winning_config_type: WinningConfigType::PrintingV2,
            amount_type: 2,
            length_type: 1,
            amount_ranges: vec![AmountRange(1, 3), AmountRange(300, 2)],
            participation_config: Some(ParticipationConfigV2 {
                winner_constraint: WinningConstraint::ParticipationPrizeGiven,
                non_winning_constraint: NonWinningConstraint::GivenForFixedPrice,
                fixed_price: Some(1_000_000),
            }),
            participation_state: Some(42),
        };
        let bytes = config.to_bytes();
        match decode(&bytes).unwrap() {
            AccountRecord::SafetyDepositConfig(decoded) => {
                assert_eq!(decoded, config);
                assert_eq!(decoded.amount_for_winner(0), 1);
                assert_eq!(decoded.amount_for_winner(3), 300);
                assert_eq!(decoded.amount_for_winner(5), 0);
                assert_eq!(decoded.winner_count(), 5);
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_safety_deposit_config_rejects_bad_width() {
        let mut bytes = SafetyDepositConfig {
            auction_manager: Pubkey::new_unique(),
            order: 0,
            winning_config_type: WinningConfigType::TokenOnlyTransfer,
            amount_type: 1,
            length_type: 1,
            amount_ranges: vec![],
            participation_config: None,
            participation_state: None,
        }
        .to_bytes();
        bytes[AMOUNT_POSITION] = 3;
        assert!(matches!(decode(&bytes), Err(DecodeError::InvalidField { field: "amount_type", .. })));
    }

    #[test]
    fn test_unmodelled_keys_stay_raw() {
        let bytes = vec![MetaplexKey::PayoutTicketV1 as u8, 1, 2, 3];
        assert_eq!(decode(&bytes).unwrap(), AccountRecord::Raw(bytes.clone()));
    }
}
