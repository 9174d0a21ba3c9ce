//! Bulk loading
//!
//! Pulls every account of the Metaplex programs through an [`AccountSource`],
//! decodes and inserts them with bounded concurrency, then fetches addresses
//! that were registered while decoding (edition PDAs, fraction mints, the
//! auction and vault behind each manager).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info, warn};

use super::cache::AccountCache;
use super::clock;
use super::config::CacheConfig;
use super::error::LoadError;
use super::registry::ParserId;
use crate::accounts::program_ids::META_PROGRAMS;
use crate::accounts::AccountData;

/// Discovery can chain (manager -> vault -> fraction mint); bound the rounds
const MAX_RESOLVE_ROUNDS: usize = 4;

/// Where accounts come from
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn get_program_accounts(&self, program: &Pubkey) -> Result<Vec<AccountData>, LoadError>;

    /// One slot per requested address, `None` for accounts that do not exist
    async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<AccountData>>, LoadError>;
}

/// [`AccountSource`] backed by a JSON-RPC node
pub struct RpcAccountSource {
    client: Arc<RpcClient>,
}

impl RpcAccountSource {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self { client: Arc::new(RpcClient::new(rpc_url.into())) }
    }

    pub fn from_client(client: Arc<RpcClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AccountSource for RpcAccountSource {
    async fn get_program_accounts(&self, program: &Pubkey) -> Result<Vec<AccountData>, LoadError> {
        let accounts = self
            .client
            .get_program_accounts(program)
            .await
            .map_err(|e| LoadError::Rpc(e.to_string()))?;
        Ok(accounts.into_iter().map(|(pubkey, account)| AccountData::from_account(pubkey, account)).collect())
    }

    async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<AccountData>>, LoadError> {
        let accounts = self
            .client
            .get_multiple_accounts(addresses)
            .await
            .map_err(|e| LoadError::Rpc(e.to_string()))?;
        Ok(addresses
            .iter()
            .zip(accounts)
            .map(|(pubkey, account)| account.map(|a| AccountData::from_account(*pubkey, a)))
            .collect())
    }
}

/// Cancels a running load; cloneable and usable from any task
#[derive(Debug, Clone)]
pub struct LoadHandle {
    cancelled: Arc<AtomicBool>,
}

impl LoadHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Accounts decoded and stored
    pub inserted: usize,
    /// Accounts that failed to decode or were closed
    pub skipped: usize,
    /// Discovered addresses fetched after the program scans
    pub resolved: usize,
    pub cancelled: bool,
}

pub struct BulkLoader {
    cache: Arc<AccountCache>,
    source: Arc<dyn AccountSource>,
    config: CacheConfig,
    cancelled: Arc<AtomicBool>,
}

impl BulkLoader {
    pub fn new(cache: Arc<AccountCache>, source: Arc<dyn AccountSource>, config: CacheConfig) -> Self {
        Self { cache, source, config, cancelled: Arc::new(AtomicBool::new(false)) }
    }

    pub fn handle(&self) -> LoadHandle {
        LoadHandle { cancelled: self.cancelled.clone() }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Load the metadata, vault, auction and metaplex programs
    pub async fn load_all(&self) -> Result<LoadReport, LoadError> {
        self.load_programs(&META_PROGRAMS).await
    }

    /// Scan `programs`, resolve discovered addresses and flush the market signal
    ///
    /// A cancelled load stops scheduling new inserts; records already
    /// inserted stay in the cache.
    pub async fn load_programs(&self, programs: &[Pubkey]) -> Result<LoadReport, LoadError> {
        let started = clock::now_micros();
        let mut report = LoadReport::default();

        for program in programs {
            if self.is_cancelled() {
                break;
            }
            let accounts = self.source.get_program_accounts(program).await?;
            info!(program = %program, count = accounts.len(), "program accounts fetched");
            self.ingest(accounts, &mut report).await;
        }

        if self.config.resolve_discovered && !self.is_cancelled() {
            self.resolve_discovered(&mut report).await?;
        }

        report.cancelled = self.is_cancelled();
        if self.config.flush_market_after_load {
            self.cache.notifier().flush_market();
        }

        info!(
            inserted = report.inserted,
            skipped = report.skipped,
            resolved = report.resolved,
            cancelled = report.cancelled,
            elapsed_us = clock::elapsed_micros_since(started),
            "bulk load finished"
        );
        Ok(report)
    }

    async fn ingest(&self, accounts: Vec<AccountData>, report: &mut LoadReport) {
        let cancelled = &self.cancelled;
        let outcomes: Vec<bool> = stream::iter(accounts)
            .take_while(|_| futures::future::ready(!cancelled.load(Ordering::Acquire)))
            .map(|account| {
                let cache = self.cache.clone();
                async move {
                    let address = account.pubkey;
                    match tokio::spawn(async move { cache.add_account(account, None, true).is_some() }).await {
                        Ok(stored) => stored,
                        Err(e) => {
                            warn!(address = %address, error = %e, "insert task failed");
                            false
                        }
                    }
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for stored in outcomes {
            if stored {
                report.inserted += 1;
            } else {
                report.skipped += 1;
            }
        }
    }

    /// Addresses bound in the registry that are not cached yet
    fn missing(&self, attempted: &HashSet<Pubkey>) -> Vec<Pubkey> {
        let registry = self.cache.registry();
        let mut missing: Vec<Pubkey> = [ParserId::Metadata, ParserId::Mint, ParserId::Auction, ParserId::Vault]
            .into_iter()
            .flat_map(|parser| registry.addresses_for(parser))
            .filter(|address| !attempted.contains(address) && !self.cache.contains(address))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    async fn resolve_discovered(&self, report: &mut LoadReport) -> Result<(), LoadError> {
        let mut attempted = HashSet::new();
        for round in 0..MAX_RESOLVE_ROUNDS {
            let missing = self.missing(&attempted);
            if missing.is_empty() {
                break;
            }
            debug!(round, count = missing.len(), "resolving discovered addresses");
            attempted.extend(missing.iter().copied());

            for chunk in missing.chunks(self.config.multiple_accounts_chunk.max(1)) {
                if self.is_cancelled() {
                    return Ok(());
                }
                let found: Vec<AccountData> =
                    self.source.get_multiple_accounts(chunk).await?.into_iter().flatten().collect();
                report.resolved += found.len();
                self.ingest(found, report).await;
            }
        }
        Ok(())
    }
}

/// In-memory [`AccountSource`] for tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    pub struct MockSource {
        accounts: Mutex<HashMap<Pubkey, AccountData>>,
        program_calls: AtomicUsize,
        multiple_calls: AtomicUsize,
    }

    impl MockSource {
        pub fn insert(&self, account: AccountData) {
            self.accounts.lock().insert(account.pubkey, account);
        }

        pub fn program_calls(&self) -> usize {
            self.program_calls.load(Ordering::SeqCst)
        }

        pub fn multiple_calls(&self) -> usize {
            self.multiple_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AccountSource for MockSource {
        async fn get_program_accounts(&self, program: &Pubkey) -> Result<Vec<AccountData>, LoadError> {
            self.program_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            let mut accounts: Vec<AccountData> =
                self.accounts.lock().values().filter(|a| a.owner == *program).cloned().collect();
            accounts.sort_by_key(|a| a.pubkey);
            Ok(accounts)
        }

        async fn get_multiple_accounts(&self, addresses: &[Pubkey]) -> Result<Vec<Option<AccountData>>, LoadError> {
            self.multiple_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            let accounts = self.accounts.lock();
            Ok(addresses.iter().map(|a| accounts.get(a).cloned()).collect())
        }
    }
}
