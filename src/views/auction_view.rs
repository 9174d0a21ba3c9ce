//! Auction view assembly
//!
//! Joins manager -> auction -> vault -> boxes -> metadata and overlays the
//! requesting wallet's bid records. Anything missing from the join yields
//! `None`, never a partial view; defective managers are the one exception
//! and are returned without thumbnail metadata.

use std::cmp::Ordering;
use std::collections::HashMap;

use solana_sdk::pubkey::Pubkey;

use crate::accounts::auction::{auction_extended_address, bidder_metadata_address};
use crate::accounts::metaplex::{bid_redemption_address, AuctionManagerStatus, WinningConfigType};
use crate::accounts::{
    AuctionData, AuctionDataExtended, AuctionManagerV2, BidRedemptionTicketV2, BidderMetadata, BidderPot,
    MasterEdition, Metadata, SafetyDepositBox, Vault,
};
use crate::state::{MetaState, Parsed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuctionViewState {
    Live,
    Upcoming,
    Ended,
    BuyNow,
    /// Manager never finished validation
    Defective,
}

impl AuctionViewState {
    pub fn of(auction: &AuctionData, now: i64) -> Self {
        use crate::accounts::auction::AuctionState;
        if auction.ended(now) {
            AuctionViewState::Ended
        } else {
            match auction.state {
                AuctionState::Started => AuctionViewState::Live,
                AuctionState::Created => AuctionViewState::Upcoming,
                AuctionState::Ended => AuctionViewState::BuyNow,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuctionViewItem {
    pub metadata: Option<Parsed<Metadata>>,
    pub safety_deposit: Parsed<SafetyDepositBox>,
    pub master_edition: Option<Parsed<MasterEdition>>,
    pub winning_config_type: WinningConfigType,
    /// Units of this box the winner receives
    pub amount: u64,
}

#[derive(Debug, Clone)]
pub struct AuctionView {
    pub auction: Parsed<AuctionData>,
    pub auction_manager: Parsed<AuctionManagerV2>,
    pub vault: Parsed<Vault>,
    pub auction_extended: Option<Parsed<AuctionDataExtended>>,
    pub state: AuctionViewState,
    /// One list per winning place
    pub items: Vec<Vec<AuctionViewItem>>,
    pub participation_item: Option<AuctionViewItem>,
    /// First item of the first winner, else the participation item; only
    /// `Defective` views may lack one with metadata
    pub thumbnail: Option<AuctionViewItem>,
    pub my_bidder_metadata: Option<Parsed<BidderMetadata>>,
    pub my_bidder_pot: Option<Parsed<BidderPot>>,
    pub my_bid_redemption: Option<Parsed<BidRedemptionTicketV2>>,
    /// Boxes the vault declares
    pub total_expected: usize,
    pub is_instant_sale: bool,
    pub instant_sale_price: Option<u64>,
}

impl AuctionView {
    pub fn is_owner(&self, wallet: Option<&Pubkey>) -> bool {
        wallet.map_or(false, |w| *w == self.auction_manager.info.authority)
    }

    /// Safety-deposit orders the winner at `winner_index` is owed
    pub fn orders_for_winner(&self, winner_index: usize) -> Vec<u64> {
        self.items
            .get(winner_index)
            .map(|items| items.iter().map(|i| u64::from(i.safety_deposit.info.order)).collect())
            .unwrap_or_default()
    }
}

/// auction -> bid redemption ticket address for `wallet`
pub fn redemption_keys_for_wallet(state: &MetaState, wallet: &Pubkey) -> HashMap<Pubkey, Pubkey> {
    state
        .auctions
        .keys()
        .map(|auction| {
            let bidder_metadata = bidder_metadata_address(auction, wallet);
            (*auction, bid_redemption_address(auction, &bidder_metadata))
        })
        .collect()
}

/// Metadata for a box token mint
///
/// The mint is the metadata mint for plain items; for limited editions it is
/// the printing mint, and for V1 participation the one-time auth mint.
fn resolve_item(
    state: &MetaState,
    safety_deposit: &Parsed<SafetyDepositBox>,
    winning_config_type: WinningConfigType,
    amount: u64,
) -> AuctionViewItem {
    let mint = &safety_deposit.info.token_mint;
    let metadata = state
        .metadata_by_mint(mint)
        .or_else(|| {
            state
                .master_editions_by_printing_mint
                .get(mint)
                .or_else(|| state.master_editions_by_one_time_auth_mint.get(mint))
                .and_then(|me| state.metadata_for_master_edition(me))
        })
        .cloned();
    let master_edition = metadata.as_ref().and_then(|m| state.master_edition_for(&m.pubkey)).cloned();

    AuctionViewItem { metadata, safety_deposit: safety_deposit.clone(), master_edition, winning_config_type, amount }
}

/// Assemble the view of the auction run by `manager_address`
///
/// # Arguments
/// * `wallet` - Requesting wallet; selects the `my_*` records
/// * `redemption_keys` - auction -> redemption ticket address for `wallet`
/// * `now` - Unix time used to decide whether the auction ended
/// * `desired` - Only return views in this state; `Defective` selects
///   managers stuck in `Initialized`, any other filter excludes them
pub fn assemble_auction_view(
    state: &MetaState,
    manager_address: &Pubkey,
    wallet: Option<&Pubkey>,
    redemption_keys: &HashMap<Pubkey, Pubkey>,
    now: i64,
    desired: Option<AuctionViewState>,
) -> Option<AuctionView> {
    let auction_manager = state.auction_managers.get(manager_address)?.clone();
    let auction = state.auctions.get(&auction_manager.info.auction)?.clone();
    let vault = state.vaults.get(&auction_manager.info.vault)?.clone();

    let view_state = AuctionViewState::of(&auction.info, now);
    let initialized = auction_manager.info.state.status == AuctionManagerStatus::Initialized;
    match desired {
        Some(AuctionViewState::Defective) if !initialized => return None,
        Some(AuctionViewState::Defective) => {}
        Some(wanted) if wanted != view_state => return None,
        _ if initialized => return None,
        _ => {}
    }

    let total_expected = usize::from(vault.info.token_type_count);
    let boxes = state.boxes_for_vault(&vault.pubkey);
    if boxes.len() < total_expected {
        return None;
    }
    let box_at = |order: u64| u8::try_from(order).ok().and_then(|o| state.box_for_vault_and_order(&vault.pubkey, o));

    let configs = state.configs_for_manager(manager_address);
    let winners = configs
        .iter()
        .filter(|c| c.info.winning_config_type != WinningConfigType::Participation)
        .map(|c| c.info.winner_count())
        .max()
        .unwrap_or(0)
        .min(auction.info.bid_state.max());

    let mut items: Vec<Vec<AuctionViewItem>> = Vec::new();
    for winner in 0..winners {
        let mut won = Vec::new();
        for config in &configs {
            if config.info.winning_config_type == WinningConfigType::Participation {
                continue;
            }
            let amount = config.info.amount_for_winner(winner);
            if amount == 0 {
                continue;
            }
            won.push(resolve_item(state, box_at(config.info.order)?, config.info.winning_config_type, amount));
        }
        items.push(won);
    }

    let participation_item = match configs
        .iter()
        .find(|c| c.info.winning_config_type == WinningConfigType::Participation)
    {
        Some(config) => Some(resolve_item(state, box_at(config.info.order)?, WinningConfigType::Participation, 1)),
        None => None,
    };

    let thumbnail = items.first().and_then(|w| w.first()).or(participation_item.as_ref()).cloned();
    if desired != Some(AuctionViewState::Defective) && thumbnail.as_ref().map_or(true, |t| t.metadata.is_none()) {
        return None;
    }

    let auction_extended = state.auctions_extended.get(&auction_extended_address(&vault.pubkey)).cloned();
    let instant_sale_price = auction_extended.as_ref().and_then(|e| e.info.instant_sale_price);
    let is_instant_sale = instant_sale_price.map_or(false, |price| auction.info.price_floor.minimum_price() == Some(price));

    let (my_bidder_metadata, my_bidder_pot) = match wallet {
        Some(w) => (
            state.bidder_metadata_for(&auction.pubkey, w).cloned(),
            state.bidder_pot_for(&auction.pubkey, w).cloned(),
        ),
        None => (None, None),
    };
    let my_bid_redemption = redemption_keys
        .get(&auction.pubkey)
        .and_then(|key| state.bid_redemptions.get(key))
        .cloned();

    Some(AuctionView {
        auction,
        auction_manager,
        vault,
        auction_extended,
        state: view_state,
        items,
        participation_item,
        thumbnail,
        my_bidder_metadata,
        my_bidder_pot,
        my_bid_redemption,
        total_expected,
        is_instant_sale,
        instant_sale_price,
    })
}

/// Every assemblable view, most recently ended first; never-ended last
pub fn assemble_all_auction_views(
    state: &MetaState,
    wallet: Option<&Pubkey>,
    now: i64,
    desired: Option<AuctionViewState>,
) -> Vec<AuctionView> {
    let redemption_keys = wallet.map(|w| redemption_keys_for_wallet(state, w)).unwrap_or_default();
    let mut views: Vec<AuctionView> = state
        .auction_managers
        .keys()
        .filter_map(|manager| assemble_auction_view(state, manager, wallet, &redemption_keys, now, desired))
        .collect();
    views.sort_by(|a, b| match (a.auction.info.ended_at, b.auction.info.ended_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.auction.pubkey.cmp(&b.auction.pubkey)));
    views
}

/// Max supply of the master edition behind `metadata`
pub fn artwork_max_supply(state: &MetaState, metadata: &Pubkey) -> Option<u64> {
    state.master_edition_for(metadata).and_then(|me| me.info.max_supply())
}

/// Editions printed so far from the master behind `metadata`
pub fn artwork_supply(state: &MetaState, metadata: &Pubkey) -> Option<u64> {
    state.master_edition_for(metadata).map(|me| me.info.supply())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::metadata::edition_address;
    use crate::accounts::testing;
    use crate::accounts::vault::VaultState;
    use crate::accounts::{decode_account, AccountData};
    use crate::views::testing::{AuctionFixture, NOW};

    fn apply(state: &mut MetaState, account: &AccountData) {
        state.apply(account.pubkey, &decode_account(account).unwrap());
    }

    #[test]
    fn test_artwork_max_supply_follows_master_edition() {
        let mut state = MetaState::new();
        let mint = Pubkey::new_unique();
        let m1 = Pubkey::new_unique();
        apply(&mut state, &testing::metadata_account(m1, mint, "Art"));
        assert_eq!(artwork_max_supply(&state, &m1), None);

        apply(&mut state, &testing::master_edition_account(edition_address(&mint), 5, Some(10)));
        assert_eq!(artwork_max_supply(&state, &m1), Some(10));
        assert_eq!(artwork_supply(&state, &m1), Some(5));
    }

    #[test]
    fn test_complete_view() {
        let fixture = AuctionFixture::build(2, None);
        let view = assemble_auction_view(&fixture.state, &fixture.manager, None, &HashMap::new(), NOW, None).unwrap();

        assert_eq!(view.state, AuctionViewState::Live);
        assert_eq!(view.total_expected, 2);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].len(), 2);
        let thumbnail = view.thumbnail.as_ref().unwrap();
        assert_eq!(thumbnail.safety_deposit.info.order, 0);
        assert!(thumbnail.metadata.is_some());
        assert!(!view.is_instant_sale);
        assert_eq!(view.orders_for_winner(0), vec![0, 1]);
    }

    #[test]
    fn test_missing_joins_are_not_ready() {
        let mut fixture = AuctionFixture::build(2, None);
        let keys = HashMap::new();

        let boxes: Vec<Pubkey> = fixture.state.boxes_for_vault(&fixture.vault).iter().map(|b| b.pubkey).collect();
        fixture.state.remove(&boxes[1]);
        assert!(assemble_auction_view(&fixture.state, &fixture.manager, None, &keys, NOW, None).is_none());

        let mut fixture = AuctionFixture::build(1, None);
        fixture.state.remove(&fixture.vault);
        assert!(assemble_auction_view(&fixture.state, &fixture.manager, None, &keys, NOW, None).is_none());

        let mut fixture = AuctionFixture::build(1, None);
        let metadata: Vec<Pubkey> = fixture.state.metadata.keys().copied().collect();
        for m in metadata {
            fixture.state.remove(&m);
        }
        assert!(assemble_auction_view(&fixture.state, &fixture.manager, None, &keys, NOW, None).is_none());
    }

    #[test]
    fn test_desired_state_and_defective_filter() {
        let fixture = AuctionFixture::build(1, None);
        let keys = HashMap::new();
        let m = &fixture.manager;
        assert!(assemble_auction_view(&fixture.state, m, None, &keys, NOW, Some(AuctionViewState::Live)).is_some());
        assert!(assemble_auction_view(&fixture.state, m, None, &keys, NOW, Some(AuctionViewState::Ended)).is_none());
        assert!(assemble_auction_view(&fixture.state, m, None, &keys, NOW, Some(AuctionViewState::Defective)).is_none());

        let mut fixture = AuctionFixture::build(1, None);
        fixture.set_manager_status(AuctionManagerStatus::Initialized);
        let m = &fixture.manager;
        assert!(assemble_auction_view(&fixture.state, m, None, &keys, NOW, None).is_none());
        assert!(assemble_auction_view(&fixture.state, m, None, &keys, NOW, Some(AuctionViewState::Defective)).is_some());
    }

    #[test]
    fn test_defective_view_without_thumbnail_metadata() {
        let mut fixture = AuctionFixture::build(1, None);
        fixture.set_manager_status(AuctionManagerStatus::Initialized);
        let metadata: Vec<Pubkey> = fixture.state.metadata.keys().copied().collect();
        for m in metadata {
            fixture.state.remove(&m);
        }
        let keys = HashMap::new();
        let m = &fixture.manager;

        let view = assemble_auction_view(&fixture.state, m, None, &keys, NOW, Some(AuctionViewState::Defective)).unwrap();
        assert!(view.thumbnail.unwrap().metadata.is_none());
        assert!(assemble_auction_view(&fixture.state, m, None, &keys, NOW, None).is_none());
    }

    #[test]
    fn test_printing_and_auth_mints_resolve_to_master_metadata() {
        for use_printing_mint in [true, false] {
            let mut fixture = AuctionFixture::build(1, None);
            let master_mint = Pubkey::new_unique();
            let printing_mint = Pubkey::new_unique();
            let auth_mint = Pubkey::new_unique();
            let master_metadata = Pubkey::new_unique();
            apply(&mut fixture.state, &testing::metadata_account(master_metadata, master_mint, "Limited"));
            apply(
                &mut fixture.state,
                &testing::master_edition_v1_account(edition_address(&master_mint), printing_mint, auth_mint),
            );

            // the box holds the printing (or auth) token, not the master mint
            let box_address = fixture.state.boxes_for_vault(&fixture.vault)[0].pubkey;
            let token_mint = if use_printing_mint { printing_mint } else { auth_mint };
            apply(&mut fixture.state, &testing::safety_deposit_box_account(box_address, fixture.vault, token_mint, 0));

            let view = assemble_auction_view(&fixture.state, &fixture.manager, None, &HashMap::new(), NOW, None).unwrap();
            let item = &view.items[0][0];
            assert_eq!(item.metadata.as_ref().unwrap().pubkey, master_metadata);
            assert_eq!(item.master_edition.as_ref().unwrap().pubkey, edition_address(&master_mint));
        }
    }

    #[test]
    fn test_wallet_overlay_and_redemption_key() {
        let wallet = Pubkey::new_unique();
        let mut fixture = AuctionFixture::build(1, None);
        fixture.add_bid(wallet, 1_500, NOW - 10, false);
        let ticket = fixture.add_redemption(wallet, Some(0), &[]);

        let keys = redemption_keys_for_wallet(&fixture.state, &wallet);
        let view = assemble_auction_view(&fixture.state, &fixture.manager, Some(&wallet), &keys, NOW, None).unwrap();
        assert_eq!(view.my_bidder_metadata.unwrap().info.last_bid, 1_500);
        assert_eq!(view.my_bid_redemption.unwrap().pubkey, ticket);
        assert!(view.my_bidder_pot.is_some());

        let stranger = Pubkey::new_unique();
        let view = assemble_auction_view(&fixture.state, &fixture.manager, Some(&stranger), &keys, NOW, None).unwrap();
        assert!(view.my_bidder_metadata.is_none());
    }

    #[test]
    fn test_all_views_sorted_by_end_descending() {
        let mut fixture = AuctionFixture::build(1, None);
        let second = fixture.add_auction(1, Some(NOW - 100));
        let third = fixture.add_auction(1, Some(NOW - 10));
        let views = assemble_all_auction_views(&fixture.state, None, NOW, None);
        let managers: Vec<Pubkey> = views.iter().map(|v| v.auction_manager.pubkey).collect();
        assert_eq!(managers, vec![third, second, fixture.manager]);
        assert_eq!(views[0].state, AuctionViewState::Ended);
    }

    #[test]
    fn test_deactivated_vault_still_assembles() {
        let mut fixture = AuctionFixture::build(1, None);
        fixture.set_vault_state(VaultState::Deactivated);
        assert!(assemble_auction_view(&fixture.state, &fixture.manager, None, &HashMap::new(), NOW, None).is_some());
    }
}
