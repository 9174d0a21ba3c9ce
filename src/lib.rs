// Core modules, flat layout
pub mod accounts; // account decoders
pub mod core;     // cache, registry, notifier, loader
pub mod state;    // typed projection of the cache
pub mod views;    // derived auction views

// Re-export the main API
pub use accounts::{decode_account, AccountData, AccountRecord, ParsedAccount, RecordKind};
pub use self::core::{
    AccountCache, AccountSource, BulkLoader, CacheConfig, CacheError, CacheEvent, DecodeError, LoadError,
    LoadHandle, LoadReport, MarketEvent, ParserId, ParserRegistry, RpcAccountSource, Subscription,
};
pub use state::{MetaAggregator, MetaState};
pub use views::{
    assemble_all_auction_views, assemble_auction_view, get_auction_bids, get_highest_bid, instant_sale_state,
    time_to_auction_end, AuctionView, AuctionViewState, Countdown, InstantSaleState,
};
