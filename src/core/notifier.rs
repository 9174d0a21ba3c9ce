//! Change notification
//!
//! Two typed channels:
//! - `on_cache`: one event per cache add (new or changed) and per delete
//! - `on_market`: a batched signal carrying every address touched since the
//!   previous flush, meant to drive one recompute after a burst of updates
//!
//! Listeners run on the emitting thread. A panicking listener is logged and
//! skipped; the rest still receive the event.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, error};

use super::registry::ParserId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Updated { address: Pubkey, is_new: bool, parser: ParserId, is_active: bool },
    Deleted { address: Pubkey },
}

impl CacheEvent {
    pub fn address(&self) -> &Pubkey {
        match self {
            CacheEvent::Updated { address, .. } | CacheEvent::Deleted { address } => address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketEvent {
    /// Sorted, deduplicated
    pub addresses: Vec<Pubkey>,
}

/// Object-style cache subscriber
pub trait CacheListener: Send + Sync {
    fn on_cache_event(&self, event: &CacheEvent);
}

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Channel<E> {
    name: &'static str,
    next_id: AtomicU64,
    listeners: RwLock<Vec<(u64, Callback<E>)>>,
}

impl<E: 'static> Channel<E> {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self { name, next_id: AtomicU64::new(1), listeners: RwLock::new(Vec::new()) })
    }

    fn subscribe(self: &Arc<Self>, callback: Callback<E>) -> Subscription
    where
        E: Send + Sync,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, callback));
        let weak: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(channel) = weak.upgrade() {
                channel.listeners.write().retain(|(lid, _)| *lid != id);
            }
        })
    }

    fn emit(&self, event: &E) {
        // snapshot so listeners may (un)subscribe while being called
        let listeners: Vec<Callback<E>> = self.listeners.read().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!(channel = self.name, "listener panicked, continuing delivery");
            }
        }
    }

    fn len(&self) -> usize {
        self.listeners.read().len()
    }
}

/// Handle returned by every subscribe call
///
/// `unsubscribe` may be called any number of times. A plain handle stays
/// subscribed when dropped; one returned by a `*_scoped` method unsubscribes
/// on drop.
pub struct Subscription {
    remove: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    scoped: bool,
}

impl Subscription {
    fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self { remove: Mutex::new(Some(Box::new(remove))), scoped: false }
    }

    fn scoped(mut self) -> Self {
        self.scoped = true;
        self
    }

    pub fn unsubscribe(&self) {
        let remove = self.remove.lock().take();
        if let Some(remove) = remove {
            remove();
        }
    }

    pub fn is_active(&self) -> bool {
        self.remove.lock().is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.scoped {
            self.unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .field("scoped", &self.scoped)
            .finish()
    }
}

pub struct Notifier {
    cache: Arc<Channel<CacheEvent>>,
    market: Arc<Channel<MarketEvent>>,
    pending: Mutex<BTreeSet<Pubkey>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            cache: Channel::new("cache"),
            market: Channel::new("market"),
            pending: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn on_cache(&self, listener: impl Fn(&CacheEvent) + Send + Sync + 'static) -> Subscription {
        self.cache.subscribe(Arc::new(listener))
    }

    pub fn on_cache_scoped(&self, listener: impl Fn(&CacheEvent) + Send + Sync + 'static) -> Subscription {
        self.on_cache(listener).scoped()
    }

    pub fn subscribe_listener(&self, listener: Arc<dyn CacheListener>) -> Subscription {
        self.cache.subscribe(Arc::new(move |event: &CacheEvent| listener.on_cache_event(event)))
    }

    pub fn on_market(&self, listener: impl Fn(&MarketEvent) + Send + Sync + 'static) -> Subscription {
        self.market.subscribe(Arc::new(listener))
    }

    pub fn on_market_scoped(&self, listener: impl Fn(&MarketEvent) + Send + Sync + 'static) -> Subscription {
        self.on_market(listener).scoped()
    }

    pub fn emit_cache(&self, event: &CacheEvent) {
        self.cache.emit(event);
    }

    /// Queue an address for the next market flush
    pub fn mark_changed(&self, address: Pubkey) {
        self.pending.lock().insert(address);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Emit one market event for everything queued since the last flush
    ///
    /// # Returns
    /// Number of addresses delivered; 0 means nothing was pending and no event fired
    pub fn flush_market(&self) -> usize {
        let addresses: Vec<Pubkey> = std::mem::take(&mut *self.pending.lock()).into_iter().collect();
        if addresses.is_empty() {
            return 0;
        }
        let count = addresses.len();
        debug!(count, "market flush");
        self.market.emit(&MarketEvent { addresses });
        count
    }

    pub fn cache_listener_count(&self) -> usize {
        self.cache.len()
    }

    pub fn market_listener_count(&self) -> usize {
        self.market.len()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
