//! Cache and loader configuration

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use super::error::LoadError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// In-flight decode/insert tasks during a bulk load
    pub concurrency: usize,
    /// Addresses per `getMultipleAccounts` request
    pub multiple_accounts_chunk: usize,
    /// Flush the market signal when a bulk load finishes
    pub flush_market_after_load: bool,
    /// Resolve edition PDAs and fraction mints discovered during a load
    pub resolve_discovered: bool,
    /// When set, auction managers of other stores are ignored (base58)
    pub store_id: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            concurrency: 16,
            multiple_accounts_chunk: 100,
            flush_market_after_load: true,
            resolve_discovered: true,
            store_id: None,
        }
    }
}

impl CacheConfig {
    /// Small batches, fewer in-flight tasks; keeps the host responsive
    pub fn low_latency() -> Self {
        Self {
            concurrency: 4,
            multiple_accounts_chunk: 25,
            flush_market_after_load: true,
            resolve_discovered: true,
            store_id: None,
        }
    }

    /// Initial full scans
    pub fn bulk_scan() -> Self {
        Self {
            concurrency: 64,
            multiple_accounts_chunk: 100,
            flush_market_after_load: true,
            resolve_discovered: true,
            store_id: None,
        }
    }

    pub fn with_store(mut self, store: &Pubkey) -> Self {
        self.store_id = Some(store.to_string());
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parsed store filter
    pub fn store(&self) -> Result<Option<Pubkey>, LoadError> {
        match &self.store_id {
            Some(s) => Pubkey::from_str(s)
                .map(Some)
                .map_err(|e| LoadError::Config(format!("invalid store id {}: {}", s, e))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_fills_defaults() {
        let config = CacheConfig::from_json(r#"{"concurrency": 8}"#).unwrap();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.multiple_accounts_chunk, 100);
        assert!(config.flush_market_after_load);
        assert_eq!(config.store().unwrap(), None);
    }

    #[test]
    fn test_store_filter() {
        let store = Pubkey::new_unique();
        let config = CacheConfig::low_latency().with_store(&store);
        assert_eq!(config.store().unwrap(), Some(store));

        let bad = CacheConfig { store_id: Some("not-a-key".into()), ..CacheConfig::default() };
        assert!(matches!(bad.store(), Err(LoadError::Config(_))));
    }
}
