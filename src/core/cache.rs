//! # Account cache
//!
//! Keyed store of decoded accounts: address -> (parsed record, raw bytes,
//! parser, active flag).
//!
//! - `add` decodes through the resolved parser and emits a cache event only
//!   when the address is new or its decoded value changed
//! - decode failures are logged and leave the cache untouched
//! - events fire after the write lock is released, so listeners can read
//!   the cache from inside a callback
//! - a separate mint cache backs fraction-mint and printing-mint lookups
//!
//! ## Example
//!
//! ```rust
//! use metaplex_meta_sdk::core::cache::AccountCache;
//! use metaplex_meta_sdk::accounts::AccountData;
//! use solana_sdk::pubkey::Pubkey;
//!
//! let cache = AccountCache::new();
//! let _sub = cache.notifier().on_cache(|event| println!("{:?}", event));
//! let address = Pubkey::new_unique();
//! let raw = AccountData::new(address, Pubkey::new_unique(), 1, vec![1, 2, 3]);
//! assert!(cache.add(address, raw, None, true).is_some());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use super::error::{CacheError, LoadError};
use super::loader::AccountSource;
use super::notifier::{CacheEvent, Notifier};
use super::registry::{ParserId, ParserRegistry};
use crate::accounts::token::parse_mint;
use crate::accounts::utils::short_address;
use crate::accounts::{AccountData, AccountRecord, MintInfo, ParsedAccount, RecordKind};

pub type CachedAccount = Arc<ParsedAccount<AccountRecord>>;

type QueryResult = Result<Option<CachedAccount>, LoadError>;
type PendingQuery = Shared<BoxFuture<'static, QueryResult>>;

#[derive(Debug, Clone)]
struct Entry {
    account: CachedAccount,
    raw: Arc<AccountData>,
    parser: ParserId,
    is_active: bool,
}

pub struct AccountCache {
    entries: RwLock<HashMap<Pubkey, Entry>>,
    registry: ParserRegistry,
    notifier: Notifier,
    mints: DashMap<Pubkey, Arc<ParsedAccount<MintInfo>>>,
    pending: Mutex<HashMap<Pubkey, PendingQuery>>,
}

impl AccountCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            registry: ParserRegistry::new(),
            notifier: Notifier::new(),
            mints: DashMap::new(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    /// Decode `account` and store it under `address`
    ///
    /// # Arguments
    /// * `address` - Cache key; overrides `account.pubkey`
    /// * `account` - Raw account; empty data is treated as a closed account
    /// * `parser` - Explicit decoder, bound to `address` for later adds;
    ///   otherwise the registered or owner default
    /// * `is_active` - Carried through to the cache event
    ///
    /// # Returns
    /// The stored record, or `None` when decoding failed, the account is
    /// closed, or `parser` conflicts with the registered one
    pub fn add(
        &self,
        address: Pubkey,
        mut account: AccountData,
        parser: Option<ParserId>,
        is_active: bool,
    ) -> Option<CachedAccount> {
        account.pubkey = address;
        if account.is_closed() {
            self.delete(&address);
            return None;
        }

        // an explicit parser binds the address, later adds decode the same way
        let parser = match parser {
            Some(p) => match self.registry.register(address, p) {
                Ok(_) => p,
                Err(e) => {
                    debug!(address = %address, error = %e, "add refused");
                    return None;
                }
            },
            None => self.registry.resolve(&address, &account.owner),
        };

        let record = match parser.decode(&account) {
            Ok(record) => record,
            Err(e) => {
                debug!(address = %short_address(&address), parser = parser.name(), error = %e, "decode failed, account skipped");
                return None;
            }
        };

        if let AccountRecord::Mint(info) = &record {
            self.mints.insert(address, Arc::new(ParsedAccount::new(address, info.clone())));
        }
        Some(self.store(address, record, Arc::new(account), parser, is_active))
    }

    /// Same as [`add`](Self::add) keyed by `account.pubkey`
    pub fn add_account(&self, account: AccountData, parser: Option<ParserId>, is_active: bool) -> Option<CachedAccount> {
        let address = account.pubkey;
        self.add(address, account, parser, is_active)
    }

    fn store(
        &self,
        address: Pubkey,
        record: AccountRecord,
        raw: Arc<AccountData>,
        parser: ParserId,
        is_active: bool,
    ) -> CachedAccount {
        let (stored, is_new, changed) = {
            let mut entries = self.entries.write();
            match entries.get_mut(&address) {
                Some(entry) => {
                    let changed = entry.account.info != record || entry.parser != parser || entry.is_active != is_active;
                    if changed {
                        entry.account = Arc::new(ParsedAccount::new(address, record));
                        entry.parser = parser;
                        entry.is_active = is_active;
                    }
                    entry.raw = raw;
                    (entry.account.clone(), false, changed)
                }
                None => {
                    let account = Arc::new(ParsedAccount::new(address, record));
                    entries.insert(address, Entry { account: account.clone(), raw, parser, is_active });
                    (account, true, true)
                }
            }
        };

        if changed {
            self.notifier.mark_changed(address);
            self.notifier.emit_cache(&CacheEvent::Updated { address, is_new, parser, is_active });
        }
        stored
    }

    pub fn get(&self, address: &Pubkey) -> Option<CachedAccount> {
        self.entries.read().get(address).map(|e| e.account.clone())
    }

    pub fn get_raw(&self, address: &Pubkey) -> Option<Arc<AccountData>> {
        self.entries.read().get(address).map(|e| e.raw.clone())
    }

    pub fn parser_of(&self, address: &Pubkey) -> Option<ParserId> {
        self.entries.read().get(address).map(|e| e.parser)
    }

    pub fn is_active(&self, address: &Pubkey) -> Option<bool> {
        self.entries.read().get(address).map(|e| e.is_active)
    }

    pub fn contains(&self, address: &Pubkey) -> bool {
        self.entries.read().contains_key(address)
    }

    /// Remove `address`; a no-op for addresses never added
    ///
    /// # Returns
    /// `true` when an entry was removed and a delete event emitted
    pub fn delete(&self, address: &Pubkey) -> bool {
        let removed = self.entries.write().remove(address).is_some();
        self.mints.remove(address);
        if removed {
            self.notifier.mark_changed(*address);
            self.notifier.emit_cache(&CacheEvent::Deleted { address: *address });
        }
        removed
    }

    /// Every record decoded by `parser`
    pub fn by_parser(&self, parser: ParserId) -> Vec<CachedAccount> {
        self.entries
            .read()
            .values()
            .filter(|e| e.parser == parser)
            .map(|e| e.account.clone())
            .collect()
    }

    /// Every record of one kind, e.g. all metadata
    pub fn by_kind(&self, kind: RecordKind) -> Vec<CachedAccount> {
        self.entries
            .read()
            .values()
            .filter(|e| e.account.info.kind() == kind)
            .map(|e| e.account.clone())
            .collect()
    }

    /// Bind `address` to `parser`, re-decoding it at once if it is cached
    /// under a different decoder
    pub fn register_parser(&self, address: Pubkey, parser: ParserId) -> Result<bool, CacheError> {
        let created = self.registry.register(address, parser)?;
        if created && self.parser_of(&address).map_or(false, |p| p != parser) {
            self.redecode(address, parser);
        }
        Ok(created)
    }

    /// Switch `address` to `parser` and re-decode the cached bytes
    ///
    /// # Returns
    /// The re-decoded record; `Ok(None)` when nothing was cached yet
    pub fn replace_parser(&self, address: Pubkey, parser: ParserId) -> Result<Option<CachedAccount>, CacheError> {
        self.registry.rebind(address, parser);
        if !self.contains(&address) {
            return Ok(None);
        }
        Ok(self.redecode(address, parser))
    }

    fn redecode(&self, address: Pubkey, parser: ParserId) -> Option<CachedAccount> {
        let (raw, is_active) = {
            let entries = self.entries.read();
            let entry = entries.get(&address)?;
            (entry.raw.clone(), entry.is_active)
        };
        match parser.decode(&raw) {
            Ok(record) => Some(self.store(address, record, raw, parser, is_active)),
            Err(e) => {
                // the old interpretation must not linger under the new parser
                debug!(address = %address, parser = parser.name(), error = %e, "re-decode failed, entry dropped");
                self.delete(&address);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn keys(&self) -> Vec<Pubkey> {
        self.entries.read().keys().copied().collect()
    }

    /// Drop every entry, emitting a delete for each
    pub fn clear(&self) {
        let keys: Vec<Pubkey> = self.entries.write().drain().map(|(k, _)| k).collect();
        for address in keys {
            self.notifier.mark_changed(address);
            self.notifier.emit_cache(&CacheEvent::Deleted { address });
        }
        self.mints.clear();
    }

    /// Fetch-on-miss lookup
    ///
    /// Concurrent queries for the same address share a single fetch.
    pub async fn query(
        self: &Arc<Self>,
        source: Arc<dyn AccountSource>,
        address: Pubkey,
        parser: Option<ParserId>,
    ) -> Result<Option<CachedAccount>, LoadError> {
        if let Some(hit) = self.get(&address) {
            return Ok(Some(hit));
        }

        let query = {
            let mut pending = self.pending.lock();
            match pending.get(&address) {
                Some(q) => q.clone(),
                None => {
                    let cache = Arc::clone(self);
                    let q = async move {
                        let fetched = source.get_multiple_accounts(&[address]).await;
                        cache.pending.lock().remove(&address);
                        let account = fetched?
                            .into_iter()
                            .next()
                            .flatten()
                            .ok_or(LoadError::NotFound(address))?;
                        Ok(cache.add(address, account, parser, true))
                    }
                    .boxed()
                    .shared();
                    pending.insert(address, q.clone());
                    q
                }
            }
        };
        query.await
    }

    pub fn add_mint(&self, account: &AccountData) -> Option<Arc<ParsedAccount<MintInfo>>> {
        match parse_mint(&account.owner, &account.data) {
            Ok(info) => {
                let parsed = Arc::new(ParsedAccount::new(account.pubkey, info));
                self.mints.insert(account.pubkey, parsed.clone());
                Some(parsed)
            }
            Err(e) => {
                debug!(mint = %account.pubkey, error = %e, "mint decode failed");
                None
            }
        }
    }

    pub fn get_mint(&self, mint: &Pubkey) -> Option<Arc<ParsedAccount<MintInfo>>> {
        self.mints.get(mint).map(|m| m.value().clone())
    }

    /// Mint from the mint cache, fetched and cached on a miss
    pub async fn query_mint(
        &self,
        source: &dyn AccountSource,
        mint: &Pubkey,
    ) -> Result<Arc<ParsedAccount<MintInfo>>, LoadError> {
        if let Some(hit) = self.get_mint(mint) {
            return Ok(hit);
        }
        let account = source
            .get_multiple_accounts(&[*mint])
            .await?
            .into_iter()
            .next()
            .flatten()
            .ok_or(LoadError::NotFound(*mint))?;
        let info = parse_mint(&account.owner, &account.data)?;
        let parsed = Arc::new(ParsedAccount::new(*mint, info));
        self.mints.insert(*mint, parsed.clone());
        Ok(parsed)
    }

    pub fn mint_count(&self) -> usize {
        self.mints.len()
    }
}

impl Default for AccountCache {
    fn default() -> Self {
        Self::new()
    }
}
