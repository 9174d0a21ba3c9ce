pub mod auction;
pub mod metadata;
pub mod metaplex;
pub mod program_ids;
pub mod token;
pub mod utils;
pub mod vault;

use borsh::BorshDeserialize;
use solana_sdk::account::Account;
use solana_sdk::pubkey::Pubkey;

use crate::core::error::DecodeError;
pub use auction::{AuctionData, AuctionDataExtended, BidderMetadata, BidderPot};
pub use metadata::{Edition, EditionMarker, MasterEdition, Metadata};
pub use metaplex::{AuctionManagerV2, BidRedemptionTicketV2, SafetyDepositConfig, Store, WhitelistedCreator};
use program_ids::*;
pub use token::{MintInfo, TokenAccountInfo};
pub use utils::*;
pub use vault::{ExternalPriceAccount, SafetyDepositBox, Vault};

/// Account data from an RPC response or an account subscription
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountData {
    pub pubkey: Pubkey,
    pub executable: bool,
    pub lamports: u64,
    pub owner: Pubkey,
    pub rent_epoch: u64,
    pub data: Vec<u8>,
}

impl AccountData {
    pub fn new(pubkey: Pubkey, owner: Pubkey, lamports: u64, data: Vec<u8>) -> Self {
        Self { pubkey, executable: false, lamports, owner, rent_epoch: 0, data }
    }

    pub fn from_account(pubkey: Pubkey, account: Account) -> Self {
        Self {
            pubkey,
            executable: account.executable,
            lamports: account.lamports,
            owner: account.owner,
            rent_epoch: account.rent_epoch,
            data: account.data,
        }
    }

    /// Closed accounts come back with no data
    pub fn is_closed(&self) -> bool {
        self.data.is_empty()
    }
}

/// A decoded record together with the address it was read from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedAccount<T> {
    pub pubkey: Pubkey,
    pub info: T,
}

impl<T> ParsedAccount<T> {
    pub fn new(pubkey: Pubkey, info: T) -> Self {
        Self { pubkey, info }
    }
}

/// Every record kind the decoders can produce
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountRecord {
    /// Undecoded bytes, stored by the pass-through parser
    Raw(Vec<u8>),
    Metadata(Metadata),
    MasterEdition(MasterEdition),
    Edition(Edition),
    EditionMarker(EditionMarker),
    Vault(Vault),
    SafetyDepositBox(SafetyDepositBox),
    ExternalPriceAccount(ExternalPriceAccount),
    AuctionData(AuctionData),
    AuctionDataExtended(AuctionDataExtended),
    BidderMetadata(BidderMetadata),
    BidderPot(BidderPot),
    AuctionManager(AuctionManagerV2),
    BidRedemptionTicket(BidRedemptionTicketV2),
    SafetyDepositConfig(SafetyDepositConfig),
    Store(Store),
    WhitelistedCreator(WhitelistedCreator),
    Mint(MintInfo),
    TokenAccount(TokenAccountInfo),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Raw,
    Metadata,
    MasterEdition,
    Edition,
    EditionMarker,
    Vault,
    SafetyDepositBox,
    ExternalPriceAccount,
    AuctionData,
    AuctionDataExtended,
    BidderMetadata,
    BidderPot,
    AuctionManager,
    BidRedemptionTicket,
    SafetyDepositConfig,
    Store,
    WhitelistedCreator,
    Mint,
    TokenAccount,
}

impl AccountRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            AccountRecord::Raw(_) => RecordKind::Raw,
            AccountRecord::Metadata(_) => RecordKind::Metadata,
            AccountRecord::MasterEdition(_) => RecordKind::MasterEdition,
            AccountRecord::Edition(_) => RecordKind::Edition,
            AccountRecord::EditionMarker(_) => RecordKind::EditionMarker,
            AccountRecord::Vault(_) => RecordKind::Vault,
            AccountRecord::SafetyDepositBox(_) => RecordKind::SafetyDepositBox,
            AccountRecord::ExternalPriceAccount(_) => RecordKind::ExternalPriceAccount,
            AccountRecord::AuctionData(_) => RecordKind::AuctionData,
            AccountRecord::AuctionDataExtended(_) => RecordKind::AuctionDataExtended,
            AccountRecord::BidderMetadata(_) => RecordKind::BidderMetadata,
            AccountRecord::BidderPot(_) => RecordKind::BidderPot,
            AccountRecord::AuctionManager(_) => RecordKind::AuctionManager,
            AccountRecord::BidRedemptionTicket(_) => RecordKind::BidRedemptionTicket,
            AccountRecord::SafetyDepositConfig(_) => RecordKind::SafetyDepositConfig,
            AccountRecord::Store(_) => RecordKind::Store,
            AccountRecord::WhitelistedCreator(_) => RecordKind::WhitelistedCreator,
            AccountRecord::Mint(_) => RecordKind::Mint,
            AccountRecord::TokenAccount(_) => RecordKind::TokenAccount,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, AccountRecord::Raw(_))
    }
}

/// Borsh-decode `T` from the front of `data`, ignoring trailing padding
pub(crate) fn borsh_prefix<T: BorshDeserialize>(data: &[u8]) -> Result<T, DecodeError> {
    let mut slice = data;
    T::deserialize(&mut slice).map_err(DecodeError::from)
}

/// Decode an account by its owner program
///
/// Accounts of unknown programs are kept raw.
pub fn decode_account(account: &AccountData) -> Result<AccountRecord, DecodeError> {
    if account.data.is_empty() {
        return Err(DecodeError::too_short(1, 0));
    }
    let owner = &account.owner;
    if *owner == METADATA_PROGRAM_ID {
        metadata::decode(&account.data)
    } else if *owner == VAULT_PROGRAM_ID {
        vault::decode(&account.data)
    } else if *owner == AUCTION_PROGRAM_ID {
        auction::decode(&account.data)
    } else if *owner == METAPLEX_PROGRAM_ID {
        metaplex::decode(&account.data)
    } else if *owner == SPL_TOKEN_PROGRAM_ID || *owner == SPL_TOKEN_2022_PROGRAM_ID {
        token::decode(owner, &account.data)
    } else {
        Ok(AccountRecord::Raw(account.data.clone()))
    }
}
