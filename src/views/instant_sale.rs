//! Instant-sale state machine
//!
//! An instant sale is an auction whose price floor equals the extended
//! instant-sale price: the first bid at that price buys the item.

use solana_sdk::pubkey::Pubkey;

use super::auction_view::AuctionView;
use crate::accounts::auction::BidStateType;
use crate::accounts::vault::VaultState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstantSaleState {
    NotInstantSale,
    CanBuy,
    /// Bought and redeemed, or the pot was already paid out
    AlreadyBought,
    CanClaimPurchasedItem,
    /// Owner, sale ended: reclaim unsold items
    CanClaimItem,
    /// Owner, sale still open
    CanEndInstantSale,
}

/// Whether `view`'s requester already received what they bought
///
/// English auctions check the redemption bitmask of every box owed to the
/// requester's winning place; open editions only need a redemption ticket.
pub fn is_already_bought(view: &AuctionView) -> bool {
    if view.my_bidder_pot.as_ref().map_or(false, |p| p.info.emptied) {
        return true;
    }
    let ticket = match &view.my_bid_redemption {
        Some(ticket) => ticket,
        None => return false,
    };
    match view.auction.info.bid_state.kind() {
        BidStateType::EnglishAuction => {
            let winner_index = ticket.info.winner_index.map(|i| i as usize).or_else(|| {
                view.my_bidder_metadata
                    .as_ref()
                    .and_then(|m| view.auction.info.winner_index(&m.info.bidder_pubkey))
            });
            match winner_index {
                Some(index) => {
                    let orders = view.orders_for_winner(index);
                    !orders.is_empty() && orders.iter().all(|order| ticket.info.is_redeemed(*order))
                }
                None => false,
            }
        }
        BidStateType::OpenEdition => true,
    }
}

pub fn instant_sale_state(view: &AuctionView, wallet: Option<&Pubkey>) -> InstantSaleState {
    if !view.is_instant_sale {
        return InstantSaleState::NotInstantSale;
    }
    if view.is_owner(wallet) {
        return if view.auction.info.ended_at.is_some() {
            InstantSaleState::CanClaimItem
        } else {
            InstantSaleState::CanEndInstantSale
        };
    }
    if view.my_bidder_pot.is_none() {
        return InstantSaleState::CanBuy;
    }
    if is_already_bought(view) {
        return InstantSaleState::AlreadyBought;
    }
    let cancelled = view.my_bidder_metadata.as_ref().map_or(true, |m| m.info.cancelled);
    if cancelled {
        InstantSaleState::CanBuy
    } else {
        InstantSaleState::CanClaimPurchasedItem
    }
}

/// Listing cards are hidden for sold-out instant sales, unless the
/// requester owns the sale or still has funds in an unemptied pot, and for
/// every auction whose vault was deactivated
pub fn should_hide_auction_card(view: &AuctionView, wallet: Option<&Pubkey>) -> bool {
    let sold_out = view.auction.info.bid_count() as u64 == view.auction.info.bid_state.max();
    // no pot counts as emptied: nothing left to claim
    let pot_emptied = view.my_bidder_pot.as_ref().map_or(true, |p| p.info.emptied);
    let hidden_sale = view.is_instant_sale && pot_emptied && !view.is_owner(wallet) && sold_out;
    hidden_sale || view.vault.info.state == VaultState::Deactivated
}
