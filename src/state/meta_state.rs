//! Typed projection of the account cache
//!
//! One collection per record kind plus the secondary indices the view
//! assembler joins on. Every mutation goes through [`MetaState::apply`] or
//! [`MetaState::remove`], which un-index the previous record of an address
//! before indexing the new one, so each update costs O(1) in the size of the
//! state.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;

use crate::accounts::metadata::edition_address;
use crate::accounts::{
    AccountRecord, AuctionData, AuctionDataExtended, AuctionManagerV2, BidRedemptionTicketV2, BidderMetadata,
    BidderPot, Edition, EditionMarker, ExternalPriceAccount, MasterEdition, Metadata, ParsedAccount, RecordKind,
    SafetyDepositBox, SafetyDepositConfig, Store, Vault, WhitelistedCreator,
};

pub type Parsed<T> = Arc<ParsedAccount<T>>;

#[derive(Debug, Clone, Default)]
pub struct MetaState {
    pub metadata: HashMap<Pubkey, Parsed<Metadata>>,
    pub master_editions: HashMap<Pubkey, Parsed<MasterEdition>>,
    pub editions: HashMap<Pubkey, Parsed<Edition>>,
    pub edition_markers: HashMap<Pubkey, Parsed<EditionMarker>>,
    pub vaults: HashMap<Pubkey, Parsed<Vault>>,
    pub safety_deposit_boxes: HashMap<Pubkey, Parsed<SafetyDepositBox>>,
    pub external_price_accounts: HashMap<Pubkey, Parsed<ExternalPriceAccount>>,
    pub auctions: HashMap<Pubkey, Parsed<AuctionData>>,
    pub auctions_extended: HashMap<Pubkey, Parsed<AuctionDataExtended>>,
    pub bidder_metadata: HashMap<Pubkey, Parsed<BidderMetadata>>,
    pub bidder_pots: HashMap<Pubkey, Parsed<BidderPot>>,
    pub auction_managers: HashMap<Pubkey, Parsed<AuctionManagerV2>>,
    pub bid_redemptions: HashMap<Pubkey, Parsed<BidRedemptionTicketV2>>,
    pub safety_deposit_configs: HashMap<Pubkey, Parsed<SafetyDepositConfig>>,
    pub stores: HashMap<Pubkey, Parsed<Store>>,
    pub whitelisted_creators: HashMap<Pubkey, Parsed<WhitelistedCreator>>,

    /// mint -> metadata address
    pub metadata_by_mint: HashMap<Pubkey, Pubkey>,
    /// metadata address -> edition PDA of its mint
    pub edition_by_metadata: HashMap<Pubkey, Pubkey>,
    /// edition PDA -> metadata address
    pub metadata_by_master_edition: HashMap<Pubkey, Pubkey>,
    pub master_editions_by_printing_mint: HashMap<Pubkey, Pubkey>,
    pub master_editions_by_one_time_auth_mint: HashMap<Pubkey, Pubkey>,
    /// vault -> order -> box address
    pub safety_deposit_boxes_by_vault: HashMap<Pubkey, BTreeMap<u8, Pubkey>>,
    /// auction -> manager address
    pub auction_managers_by_auction: HashMap<Pubkey, Pubkey>,
    pub bidder_metadata_by_auction: HashMap<Pubkey, BTreeSet<Pubkey>>,
    /// (auction, bidder wallet) -> bidder metadata address
    pub bidder_metadata_by_auction_and_bidder: HashMap<(Pubkey, Pubkey), Pubkey>,
    /// (auction, bidder wallet) -> bidder pot address
    pub bidder_pots_by_auction_and_bidder: HashMap<(Pubkey, Pubkey), Pubkey>,
    /// manager -> ticket addresses
    pub bid_redemptions_by_manager: HashMap<Pubkey, BTreeSet<Pubkey>>,
    /// manager -> order -> config address
    pub safety_deposit_configs_by_manager: HashMap<Pubkey, BTreeMap<u64, Pubkey>>,

    kinds: HashMap<Pubkey, RecordKind>,
}

fn parsed<T: Clone>(address: Pubkey, info: &T) -> Parsed<T> {
    Arc::new(ParsedAccount::new(address, info.clone()))
}

impl MetaState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total typed records held
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kind_of(&self, address: &Pubkey) -> Option<RecordKind> {
        self.kinds.get(address).copied()
    }

    /// Replace whatever `address` held with `record`
    ///
    /// Raw, mint and token-account records are not projected; applying one
    /// only removes the previous typed record of that address.
    pub fn apply(&mut self, address: Pubkey, record: &AccountRecord) {
        self.remove(&address);

        match record {
            AccountRecord::Metadata(m) => {
                let edition = edition_address(&m.mint);
                self.metadata_by_mint.insert(m.mint, address);
                self.edition_by_metadata.insert(address, edition);
                self.metadata_by_master_edition.insert(edition, address);
                self.metadata.insert(address, parsed(address, m));
            }
            AccountRecord::MasterEdition(me) => {
                if let Some(mint) = me.printing_mint() {
                    self.master_editions_by_printing_mint.insert(mint, address);
                }
                if let Some(mint) = me.one_time_printing_authorization_mint() {
                    self.master_editions_by_one_time_auth_mint.insert(mint, address);
                }
                self.master_editions.insert(address, parsed(address, me));
            }
            AccountRecord::Edition(e) => {
                self.editions.insert(address, parsed(address, e));
            }
            AccountRecord::EditionMarker(e) => {
                self.edition_markers.insert(address, parsed(address, e));
            }
            AccountRecord::Vault(v) => {
                self.vaults.insert(address, parsed(address, v));
            }
            AccountRecord::SafetyDepositBox(b) => {
                self.safety_deposit_boxes_by_vault.entry(b.vault).or_default().insert(b.order, address);
                self.safety_deposit_boxes.insert(address, parsed(address, b));
            }
            AccountRecord::ExternalPriceAccount(e) => {
                self.external_price_accounts.insert(address, parsed(address, e));
            }
            AccountRecord::AuctionData(a) => {
                self.auctions.insert(address, parsed(address, a));
            }
            AccountRecord::AuctionDataExtended(e) => {
                self.auctions_extended.insert(address, parsed(address, e));
            }
            AccountRecord::BidderMetadata(b) => {
                self.bidder_metadata_by_auction.entry(b.auction_pubkey).or_default().insert(address);
                self.bidder_metadata_by_auction_and_bidder.insert((b.auction_pubkey, b.bidder_pubkey), address);
                self.bidder_metadata.insert(address, parsed(address, b));
            }
            AccountRecord::BidderPot(p) => {
                self.bidder_pots_by_auction_and_bidder.insert((p.auction_act, p.bidder_act), address);
                self.bidder_pots.insert(address, parsed(address, p));
            }
            AccountRecord::AuctionManager(m) => {
                self.auction_managers_by_auction.insert(m.auction, address);
                self.auction_managers.insert(address, parsed(address, m));
            }
            AccountRecord::BidRedemptionTicket(t) => {
                self.bid_redemptions_by_manager.entry(t.auction_manager).or_default().insert(address);
                self.bid_redemptions.insert(address, parsed(address, t));
            }
            AccountRecord::SafetyDepositConfig(c) => {
                self.safety_deposit_configs_by_manager.entry(c.auction_manager).or_default().insert(c.order, address);
                self.safety_deposit_configs.insert(address, parsed(address, c));
            }
            AccountRecord::Store(s) => {
                self.stores.insert(address, parsed(address, s));
            }
            AccountRecord::WhitelistedCreator(w) => {
                self.whitelisted_creators.insert(address, parsed(address, w));
            }
            AccountRecord::Raw(_) | AccountRecord::Mint(_) | AccountRecord::TokenAccount(_) => return,
        }
        self.kinds.insert(address, record.kind());
    }

    /// Drop the record held for `address` together with its index entries
    ///
    /// # Returns
    /// `true` when a typed record was removed
    pub fn remove(&mut self, address: &Pubkey) -> bool {
        let kind = match self.kinds.remove(address) {
            Some(kind) => kind,
            None => return false,
        };

        match kind {
            RecordKind::Metadata => {
                if let Some(old) = self.metadata.remove(address) {
                    remove_if_points_to(&mut self.metadata_by_mint, &old.info.mint, address);
                }
                if let Some(edition) = self.edition_by_metadata.remove(address) {
                    remove_if_points_to(&mut self.metadata_by_master_edition, &edition, address);
                }
            }
            RecordKind::MasterEdition => {
                if let Some(old) = self.master_editions.remove(address) {
                    if let Some(mint) = old.info.printing_mint() {
                        remove_if_points_to(&mut self.master_editions_by_printing_mint, &mint, address);
                    }
                    if let Some(mint) = old.info.one_time_printing_authorization_mint() {
                        remove_if_points_to(&mut self.master_editions_by_one_time_auth_mint, &mint, address);
                    }
                }
            }
            RecordKind::Edition => {
                self.editions.remove(address);
            }
            RecordKind::EditionMarker => {
                self.edition_markers.remove(address);
            }
            RecordKind::Vault => {
                self.vaults.remove(address);
            }
            RecordKind::SafetyDepositBox => {
                if let Some(old) = self.safety_deposit_boxes.remove(address) {
                    if let Some(boxes) = self.safety_deposit_boxes_by_vault.get_mut(&old.info.vault) {
                        if boxes.get(&old.info.order) == Some(address) {
                            boxes.remove(&old.info.order);
                        }
                        if boxes.is_empty() {
                            self.safety_deposit_boxes_by_vault.remove(&old.info.vault);
                        }
                    }
                }
            }
            RecordKind::ExternalPriceAccount => {
                self.external_price_accounts.remove(address);
            }
            RecordKind::AuctionData => {
                self.auctions.remove(address);
            }
            RecordKind::AuctionDataExtended => {
                self.auctions_extended.remove(address);
            }
            RecordKind::BidderMetadata => {
                if let Some(old) = self.bidder_metadata.remove(address) {
                    let auction = old.info.auction_pubkey;
                    remove_from_set(&mut self.bidder_metadata_by_auction, &auction, address);
                    remove_if_points_to(
                        &mut self.bidder_metadata_by_auction_and_bidder,
                        &(auction, old.info.bidder_pubkey),
                        address,
                    );
                }
            }
            RecordKind::BidderPot => {
                if let Some(old) = self.bidder_pots.remove(address) {
                    remove_if_points_to(
                        &mut self.bidder_pots_by_auction_and_bidder,
                        &(old.info.auction_act, old.info.bidder_act),
                        address,
                    );
                }
            }
            RecordKind::AuctionManager => {
                if let Some(old) = self.auction_managers.remove(address) {
                    remove_if_points_to(&mut self.auction_managers_by_auction, &old.info.auction, address);
                }
            }
            RecordKind::BidRedemptionTicket => {
                if let Some(old) = self.bid_redemptions.remove(address) {
                    remove_from_set(&mut self.bid_redemptions_by_manager, &old.info.auction_manager, address);
                }
            }
            RecordKind::SafetyDepositConfig => {
                if let Some(old) = self.safety_deposit_configs.remove(address) {
                    if let Some(configs) = self.safety_deposit_configs_by_manager.get_mut(&old.info.auction_manager) {
                        if configs.get(&old.info.order) == Some(address) {
                            configs.remove(&old.info.order);
                        }
                        if configs.is_empty() {
                            self.safety_deposit_configs_by_manager.remove(&old.info.auction_manager);
                        }
                    }
                }
            }
            RecordKind::Store => {
                self.stores.remove(address);
            }
            RecordKind::WhitelistedCreator => {
                self.whitelisted_creators.remove(address);
            }
            RecordKind::Raw | RecordKind::Mint | RecordKind::TokenAccount => {}
        }
        true
    }

    pub fn metadata_by_mint(&self, mint: &Pubkey) -> Option<&Parsed<Metadata>> {
        self.metadata_by_mint.get(mint).and_then(|a| self.metadata.get(a))
    }

    /// Master edition of the mint behind `metadata`
    pub fn master_edition_for(&self, metadata: &Pubkey) -> Option<&Parsed<MasterEdition>> {
        self.edition_by_metadata.get(metadata).and_then(|e| self.master_editions.get(e))
    }

    pub fn metadata_for_master_edition(&self, master_edition: &Pubkey) -> Option<&Parsed<Metadata>> {
        self.metadata_by_master_edition.get(master_edition).and_then(|a| self.metadata.get(a))
    }

    /// Boxes of `vault` in ascending order
    pub fn boxes_for_vault(&self, vault: &Pubkey) -> Vec<&Parsed<SafetyDepositBox>> {
        self.safety_deposit_boxes_by_vault
            .get(vault)
            .map(|boxes| boxes.values().filter_map(|a| self.safety_deposit_boxes.get(a)).collect())
            .unwrap_or_default()
    }

    pub fn box_for_vault_and_order(&self, vault: &Pubkey, order: u8) -> Option<&Parsed<SafetyDepositBox>> {
        self.safety_deposit_boxes_by_vault
            .get(vault)
            .and_then(|boxes| boxes.get(&order))
            .and_then(|a| self.safety_deposit_boxes.get(a))
    }

    /// Whether the cached boxes of `vault` carry orders exactly `0..N-1`
    pub fn vault_box_order_is_contiguous(&self, vault: &Pubkey) -> bool {
        match self.safety_deposit_boxes_by_vault.get(vault) {
            Some(boxes) => boxes.keys().enumerate().all(|(i, order)| i == *order as usize),
            None => true,
        }
    }

    pub fn manager_for_auction(&self, auction: &Pubkey) -> Option<&Parsed<AuctionManagerV2>> {
        self.auction_managers_by_auction.get(auction).and_then(|a| self.auction_managers.get(a))
    }

    /// Configs of `manager` in ascending box order
    pub fn configs_for_manager(&self, manager: &Pubkey) -> Vec<&Parsed<SafetyDepositConfig>> {
        self.safety_deposit_configs_by_manager
            .get(manager)
            .map(|configs| configs.values().filter_map(|a| self.safety_deposit_configs.get(a)).collect())
            .unwrap_or_default()
    }

    /// Every bidder record of `auction`, cancelled ones included
    pub fn bidders_for_auction(&self, auction: &Pubkey) -> Vec<Parsed<BidderMetadata>> {
        self.bidder_metadata_by_auction
            .get(auction)
            .map(|set| set.iter().filter_map(|a| self.bidder_metadata.get(a).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn bidder_metadata_for(&self, auction: &Pubkey, bidder: &Pubkey) -> Option<&Parsed<BidderMetadata>> {
        self.bidder_metadata_by_auction_and_bidder
            .get(&(*auction, *bidder))
            .and_then(|a| self.bidder_metadata.get(a))
    }

    pub fn bidder_pot_for(&self, auction: &Pubkey, bidder: &Pubkey) -> Option<&Parsed<BidderPot>> {
        self.bidder_pots_by_auction_and_bidder
            .get(&(*auction, *bidder))
            .and_then(|a| self.bidder_pots.get(a))
    }
}

fn remove_if_points_to<K: std::hash::Hash + Eq>(index: &mut HashMap<K, Pubkey>, key: &K, address: &Pubkey) {
    if index.get(key) == Some(address) {
        index.remove(key);
    }
}

fn remove_from_set(index: &mut HashMap<Pubkey, BTreeSet<Pubkey>>, key: &Pubkey, address: &Pubkey) {
    if let Some(set) = index.get_mut(key) {
        set.remove(address);
        if set.is_empty() {
            index.remove(key);
        }
    }
}
