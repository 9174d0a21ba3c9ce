//! Keeps a [`MetaState`] in step with an [`AccountCache`]
//!
//! Each cache event re-reads the record of the changed address and replays
//! it into the state; nothing else is touched. Decoding a record may reveal
//! addresses the loader should fetch (the edition PDA of a metadata mint, a
//! vault's fraction mint, the auction and vault behind a manager); those are
//! bound in the cache's parser registry.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, trace};

use super::meta_state::MetaState;
use crate::accounts::metadata::metadata_address;
use crate::accounts::AccountRecord;
use crate::core::cache::AccountCache;
use crate::core::notifier::{CacheEvent, Subscription};
use crate::core::registry::ParserId;

pub struct MetaAggregator {
    state: Arc<RwLock<MetaState>>,
    subscription: Subscription,
}

impl MetaAggregator {
    /// Project every record of `cache`, now and on each later change
    ///
    /// With `store` set, auction managers of other stores are ignored.
    /// Dropping the aggregator detaches it.
    pub fn attach(cache: &Arc<AccountCache>, store: Option<Pubkey>) -> Self {
        let state = Arc::new(RwLock::new(MetaState::new()));
        let projector = Projector { cache: Arc::downgrade(cache), state: state.clone(), store };

        let listener = projector.clone();
        let subscription = cache.notifier().on_cache_scoped(move |event| listener.on_event(event));

        for address in cache.keys() {
            projector.refresh(&address);
        }
        debug!(records = state.read().len(), "aggregator attached");

        Self { state, subscription }
    }

    /// Run `f` against the current state under a read lock
    pub fn with_state<R>(&self, f: impl FnOnce(&MetaState) -> R) -> R {
        f(&self.state.read())
    }

    /// Owned copy; records are shared, so this clones only the maps
    pub fn snapshot(&self) -> MetaState {
        self.state.read().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }

    pub fn detach(&self) {
        self.subscription.unsubscribe();
    }
}

#[derive(Clone)]
struct Projector {
    cache: Weak<AccountCache>,
    state: Arc<RwLock<MetaState>>,
    store: Option<Pubkey>,
}

impl Projector {
    fn on_event(&self, event: &CacheEvent) {
        let address = match event {
            CacheEvent::Updated { address, .. } | CacheEvent::Deleted { address } => address,
        };
        self.refresh(address);
    }

    /// Project the cache's current record for `address`
    ///
    /// The cache is read under the state write lock, so whichever refresh
    /// runs last projects the latest stored value even when writers race.
    fn refresh(&self, address: &Pubkey) {
        let cache = match self.cache.upgrade() {
            Some(cache) => cache,
            None => {
                self.state.write().remove(address);
                return;
            }
        };

        let found = {
            let mut state = self.state.write();
            match cache.get(address) {
                Some(account) => {
                    if let AccountRecord::AuctionManager(manager) = &account.info {
                        if self.store.map_or(false, |store| store != manager.store) {
                            trace!(manager = %address, store = %manager.store, "manager of another store ignored");
                            state.remove(address);
                            return;
                        }
                    }
                    state.apply(*address, &account.info);
                    Some(account)
                }
                None => {
                    state.remove(address);
                    None
                }
            }
        };

        // registration may re-emit, so it runs after the state lock is released
        if let Some(account) = found {
            for (discovered, parser) in discoveries(&account.info) {
                if let Err(e) = cache.register_parser(discovered, parser) {
                    debug!(address = %discovered, error = %e, "discovered address already bound");
                }
            }
        }
    }
}

/// Addresses a record points at that the loader should resolve
fn discoveries(record: &AccountRecord) -> Vec<(Pubkey, ParserId)> {
    match record {
        AccountRecord::Metadata(m) => vec![(m.edition_address(), ParserId::Metadata)],
        AccountRecord::Vault(v) => vec![(v.fraction_mint, ParserId::Mint)],
        AccountRecord::SafetyDepositBox(b) => vec![(metadata_address(&b.token_mint), ParserId::Metadata)],
        AccountRecord::AuctionManager(m) => vec![(m.auction, ParserId::Auction), (m.vault, ParserId::Vault)],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::metadata::edition_address;
    use crate::accounts::metaplex::AuctionManagerStatus;
    use crate::accounts::testing;
    use crate::accounts::vault::VaultState;
    use crate::accounts::{decode_account, AccountData, Metadata};

    #[test]
    fn test_replays_existing_records_on_attach() {
        let cache = Arc::new(AccountCache::new());
        let address = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        cache.add(address, testing::metadata_account(address, mint, "Early"), None, true);

        let aggregator = MetaAggregator::attach(&cache, None);
        assert!(aggregator.with_state(|s| s.metadata_by_mint(&mint).is_some()));
        assert_eq!(cache.registry().lookup(&edition_address(&mint)), Some(ParserId::Metadata));
    }

    #[test]
    fn test_out_of_order_delivery_keeps_last_arrival() {
        let cache = Arc::new(AccountCache::new());
        let aggregator = MetaAggregator::attach(&cache, None);
        let address = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let a = testing::metadata_account(address, mint, "A");
        let b = testing::metadata_account(address, mint, "B");

        for account in [&a, &b, &a] {
            cache.add(address, account.clone(), None, true);
        }
        let expected = match decode_account(&a).unwrap() {
            AccountRecord::Metadata(m) => m,
            other => panic!("unexpected record {:?}", other),
        };
        aggregator.with_state(|s| assert_eq!(s.metadata[&address].info, expected));
    }

    #[test]
    fn test_stale_event_projects_current_record() {
        let cache = Arc::new(AccountCache::new());
        let aggregator = MetaAggregator::attach(&cache, None);
        let address = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        cache.add(address, testing::metadata_account(address, mint, "Current"), None, true);

        // a delete delivered after the address was stored again
        cache.notifier().emit_cache(&CacheEvent::Deleted { address });
        aggregator.with_state(|s| assert_eq!(s.metadata[&address].info, cache_metadata(&cache, &address)));
    }

    #[test]
    fn test_racing_writers_converge_on_cache_value() {
        let cache = Arc::new(AccountCache::new());
        let aggregator = MetaAggregator::attach(&cache, None);
        let address = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for round in 0..50 {
                        let name = format!("v{}-{}", w, round);
                        cache.add(address, testing::metadata_account(address, mint, &name), None, true);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        aggregator.with_state(|s| assert_eq!(s.metadata[&address].info, cache_metadata(&cache, &address)));
    }

    fn cache_metadata(cache: &AccountCache, address: &Pubkey) -> Metadata {
        match &cache.get(address).unwrap().info {
            AccountRecord::Metadata(m) => m.clone(),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_delete_removes_from_state() {
        let cache = Arc::new(AccountCache::new());
        let aggregator = MetaAggregator::attach(&cache, None);
        let address = Pubkey::new_unique();
        let vault = testing::vault_record(0, VaultState::Inactive);
        cache.add(address, testing::vault_account(address, &vault), None, true);
        assert_eq!(aggregator.with_state(|s| s.vaults.len()), 1);
        assert_eq!(cache.registry().lookup(&vault.fraction_mint), Some(ParserId::Mint));

        cache.delete(&address);
        assert!(aggregator.snapshot().vaults.is_empty());
    }

    #[test]
    fn test_vault_boxes_arrive_as_contiguous_orders() {
        let cache = Arc::new(AccountCache::new());
        let aggregator = MetaAggregator::attach(&cache, None);
        let vault = Pubkey::new_unique();
        let n = 6u8;
        // arrival order scrambled, as with concurrent loads
        for order in [3u8, 0, 5, 1, 4, 2] {
            let address = Pubkey::new_unique();
            cache.add(address, testing::safety_deposit_box_account(address, vault, Pubkey::new_unique(), order), None, true);
        }
        aggregator.with_state(|s| {
            let orders: Vec<u8> = s.boxes_for_vault(&vault).iter().map(|b| b.info.order).collect();
            assert_eq!(orders, (0..n).collect::<Vec<_>>());
            assert!(s.vault_box_order_is_contiguous(&vault));
        });
    }

    #[test]
    fn test_store_filter_drops_foreign_managers() {
        let cache = Arc::new(AccountCache::new());
        let store = Pubkey::new_unique();
        let aggregator = MetaAggregator::attach(&cache, Some(store));

        let mut ours = testing::manager_record(Pubkey::new_unique(), Pubkey::new_unique(), AuctionManagerStatus::Running);
        ours.store = store;
        let theirs = testing::manager_record(Pubkey::new_unique(), Pubkey::new_unique(), AuctionManagerStatus::Running);
        let ours_address = Pubkey::new_unique();
        let theirs_address = Pubkey::new_unique();
        cache.add(ours_address, testing::manager_account(ours_address, &ours), None, true);
        cache.add(theirs_address, testing::manager_account(theirs_address, &theirs), None, true);

        aggregator.with_state(|s| {
            assert!(s.auction_managers.contains_key(&ours_address));
            assert!(!s.auction_managers.contains_key(&theirs_address));
            assert!(s.manager_for_auction(&ours.auction).is_some());
        });
        assert_eq!(cache.registry().lookup(&ours.vault), Some(ParserId::Vault));
        assert_eq!(cache.registry().lookup(&theirs.vault), None);
    }

    #[test]
    fn test_detach_on_drop() {
        let cache = Arc::new(AccountCache::new());
        let aggregator = MetaAggregator::attach(&cache, None);
        assert!(aggregator.is_attached());
        assert_eq!(cache.notifier().cache_listener_count(), 1);
        drop(aggregator);
        assert_eq!(cache.notifier().cache_listener_count(), 0);

        let address = Pubkey::new_unique();
        cache.add(address, AccountData::new(address, Pubkey::new_unique(), 1, vec![1]), None, true);
    }
}
