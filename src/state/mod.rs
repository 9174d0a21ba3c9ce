pub mod aggregator;
pub mod meta_state;

pub use aggregator::MetaAggregator;
pub use meta_state::{MetaState, Parsed};
