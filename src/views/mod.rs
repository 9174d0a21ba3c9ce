//! Derived views over a [`MetaState`](crate::state::MetaState)
//!
//! Pure functions: they never mutate the state they are given and can be
//! called repeatedly. `now` is always an explicit unix timestamp.

pub mod auction_view;
pub mod bids;
pub mod countdown;
pub mod instant_sale;

pub use auction_view::{
    artwork_max_supply, artwork_supply, assemble_all_auction_views, assemble_auction_view,
    redemption_keys_for_wallet, AuctionView, AuctionViewItem, AuctionViewState,
};
pub use bids::{bids_for_auction, get_auction_bids, get_highest_bid, is_bidder_a_winner, winning_bidder_index};
pub use countdown::{time_to_auction_end, Countdown};
pub use instant_sale::{instant_sale_state, is_already_bought, should_hide_auction_card, InstantSaleState};

/// A fully joined auction inside a [`MetaState`](crate::state::MetaState)
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use smallvec::SmallVec;
    use solana_sdk::pubkey::Pubkey;

    use crate::accounts::auction::{auction_extended_address, bidder_metadata_address, Bid, BidState};
    use crate::accounts::metaplex::{bid_redemption_address, AuctionManagerStatus, WinningConfigType};
    use crate::accounts::vault::VaultState;
    use crate::accounts::{
        decode_account, testing, AccountData, AccountRecord, AuctionData, AuctionManagerV2, BidRedemptionTicketV2,
        BidderMetadata, BidderPot, Vault,
    };
    use crate::state::MetaState;

    pub const NOW: i64 = 1_700_000_000;

    pub struct AuctionFixture {
        pub state: MetaState,
        pub manager: Pubkey,
        pub auction: Pubkey,
        pub vault: Pubkey,
        pub authority: Pubkey,
        auction_data: AuctionData,
        vault_data: Vault,
        manager_data: AuctionManagerV2,
        pots: HashMap<Pubkey, Pubkey>,
    }

    fn put(state: &mut MetaState, account: AccountData) {
        let record = decode_account(&account).unwrap();
        state.apply(account.pubkey, &record);
    }

    impl AuctionFixture {
        /// Live single-winner English auction with `boxes` items, all won by place 0
        pub fn build(boxes: u8, instant_sale_price: Option<u64>) -> Self {
            let mut state = MetaState::new();
            let fixture = insert_auction(&mut state, boxes, None, instant_sale_price);
            Self { state, ..fixture }
        }

        /// Another complete auction in the same state
        ///
        /// # Returns
        /// Its manager address
        pub fn add_auction(&mut self, boxes: u8, ended_at: Option<i64>) -> Pubkey {
            insert_auction(&mut self.state, boxes, ended_at, None).manager
        }

        pub fn set_manager_status(&mut self, status: AuctionManagerStatus) {
            self.manager_data.state.status = status;
            self.state.apply(self.manager, &AccountRecord::AuctionManager(self.manager_data.clone()));
        }

        pub fn set_vault_state(&mut self, vault_state: VaultState) {
            self.vault_data.state = vault_state;
            self.state.apply(self.vault, &AccountRecord::Vault(self.vault_data.clone()));
        }

        pub fn set_ended_at(&mut self, ended_at: Option<i64>) {
            self.auction_data.ended_at = ended_at;
            self.state.apply(self.auction, &AccountRecord::AuctionData(self.auction_data.clone()));
        }

        pub fn add_bid(&mut self, wallet: Pubkey, amount: u64, timestamp: i64, cancelled: bool) {
            let metadata = BidderMetadata {
                bidder_pubkey: wallet,
                auction_pubkey: self.auction,
                last_bid: amount,
                last_bid_timestamp: timestamp,
                cancelled,
            };
            self.state
                .apply(bidder_metadata_address(&self.auction, &wallet), &AccountRecord::BidderMetadata(metadata));
            self.set_pot_emptied(wallet, false);

            if !cancelled {
                if let BidState::EnglishAuction { bids, max } = &mut self.auction_data.bid_state {
                    if (bids.len() as u64) < *max {
                        bids.push(Bid { bidder: wallet, amount });
                    }
                }
                self.state.apply(self.auction, &AccountRecord::AuctionData(self.auction_data.clone()));
            }
        }

        pub fn set_pot_emptied(&mut self, wallet: Pubkey, emptied: bool) {
            let pot = BidderPot {
                bidder_pot: Pubkey::new_unique(),
                bidder_act: wallet,
                auction_act: self.auction,
                emptied,
            };
            let address = *self.pots.entry(wallet).or_insert_with(Pubkey::new_unique);
            self.state.apply(address, &AccountRecord::BidderPot(pot));
        }

        /// Store `wallet`'s ticket with `orders` redeemed, replacing any earlier one
        pub fn add_redemption(&mut self, wallet: Pubkey, winner_index: Option<u64>, orders: &[u64]) -> Pubkey {
            let mut ticket =
                BidRedemptionTicketV2 { winner_index, auction_manager: self.manager, redeemed: SmallVec::new() };
            for order in orders {
                ticket.mark_redeemed(*order);
            }
            let address = bid_redemption_address(&self.auction, &bidder_metadata_address(&self.auction, &wallet));
            self.state.apply(address, &AccountRecord::BidRedemptionTicket(ticket));
            address
        }
    }

    fn insert_auction(
        state: &mut MetaState,
        boxes: u8,
        ended_at: Option<i64>,
        instant_sale_price: Option<u64>,
    ) -> AuctionFixture {
        let vault = Pubkey::new_unique();
        let auction = Pubkey::new_unique();
        let manager = Pubkey::new_unique();

        let vault_data = testing::vault_record(boxes, VaultState::Combined);
        state.apply(vault, &AccountRecord::Vault(vault_data.clone()));

        for order in 0..boxes {
            let mint = Pubkey::new_unique();
            put(state, testing::metadata_account(Pubkey::new_unique(), mint, &format!("Item {}", order)));
            put(state, testing::safety_deposit_box_account(Pubkey::new_unique(), vault, mint, order));
            put(
                state,
                testing::safety_deposit_config_account(
                    Pubkey::new_unique(),
                    manager,
                    u64::from(order),
                    WinningConfigType::FullRightsTransfer,
                ),
            );
        }

        let mut auction_data = testing::auction_record(Vec::new(), 1);
        auction_data.ended_at = ended_at;
        state.apply(auction, &AccountRecord::AuctionData(auction_data.clone()));
        if let Some(price) = instant_sale_price {
            put(state, testing::auction_extended_account(auction_extended_address(&vault), Some(price)));
        }

        let manager_data = testing::manager_record(auction, vault, AuctionManagerStatus::Running);
        state.apply(manager, &AccountRecord::AuctionManager(manager_data.clone()));

        AuctionFixture {
            state: MetaState::new(),
            manager,
            auction,
            vault,
            authority: manager_data.authority,
            auction_data,
            vault_data,
            manager_data,
            pots: HashMap::new(),
        }
    }
}
