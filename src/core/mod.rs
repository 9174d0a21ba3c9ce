//! Cache core
//!
//! - account cache keyed by address, with change-only notifications
//! - parser registry with address overrides discovered at runtime
//! - change notifier (per-account events plus a batched market signal)
//! - bulk loader over an async account source

pub mod cache;     // decoded account store
pub mod clock;     // time sources
pub mod config;    // cache/loader tuning
pub mod error;     // error types
pub mod loader;    // program scans and discovered-address resolution
pub mod notifier;  // listeners
pub mod registry;  // decoder identity and address overrides

pub use cache::{AccountCache, CachedAccount};
pub use clock::{Clock, FixedClock, MonotonicClock};
pub use config::CacheConfig;
pub use error::{CacheError, DecodeError, LoadError};
pub use loader::{AccountSource, BulkLoader, LoadHandle, LoadReport, RpcAccountSource};
pub use notifier::{CacheEvent, CacheListener, MarketEvent, Notifier, Subscription};
pub use registry::{decode_with, ParserId, ParserRegistry};
