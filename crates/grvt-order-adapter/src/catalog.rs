/*
[INPUT]:  Instrument listings (exchange response, JSON file, or in-memory map)
[OUTPUT]: Read-only symbol -> {instrument_hash, base_decimals} lookup
[POS]:    Signing layer - instrument metadata source for typed-data building
[UPDATE]: When instrument metadata fields or file format change
*/

use std::collections::BTreeMap;
use std::path::Path;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::http::{GrvtError, Result};
use crate::types::InstrumentInfo;

/// Largest exponent whose power of ten still fits a `u64`
pub const MAX_BASE_DECIMALS: u32 = 19;

/// File/wire representation of one instrument entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub instrument_hash: String,
    pub base_decimals: u32,
}

/// Parsed metadata used inside the signed struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentMetadata {
    pub symbol: String,
    /// Original hex form, kept for display
    pub instrument_hash: String,
    /// `assetID` as it is hashed
    pub asset_id: U256,
    pub base_decimals: u32,
}

impl InstrumentMetadata {
    pub fn new(symbol: &str, instrument_hash: &str, base_decimals: u32) -> Result<Self> {
        let digits = instrument_hash
            .strip_prefix("0x")
            .or_else(|| instrument_hash.strip_prefix("0X"))
            .ok_or_else(|| {
                GrvtError::Config(format!(
                    "instrument hash for {symbol} must be 0x-prefixed hex, got '{instrument_hash}'"
                ))
            })?;
        if digits.is_empty() || digits.len() > 64 {
            return Err(GrvtError::Config(format!(
                "instrument hash for {symbol} must be 1..=32 bytes, got '{instrument_hash}'"
            )));
        }
        let asset_id = U256::from_str_radix(digits, 16).map_err(|err| {
            GrvtError::Config(format!("invalid instrument hash for {symbol}: {err}"))
        })?;
        if base_decimals > MAX_BASE_DECIMALS {
            return Err(GrvtError::Config(format!(
                "base_decimals {base_decimals} for {symbol} exceeds {MAX_BASE_DECIMALS}"
            )));
        }

        Ok(Self {
            symbol: symbol.to_string(),
            instrument_hash: instrument_hash.to_string(),
            asset_id,
            base_decimals,
        })
    }
}

/// Immutable symbol -> metadata map
#[derive(Debug, Clone, Default)]
pub struct InstrumentCatalog {
    instruments: BTreeMap<String, InstrumentMetadata>,
}

impl InstrumentCatalog {
    pub fn from_records<I, K>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, InstrumentRecord)>,
        K: AsRef<str>,
    {
        let mut instruments = BTreeMap::new();
        for (symbol, record) in records {
            let symbol = symbol.as_ref();
            let metadata =
                InstrumentMetadata::new(symbol, &record.instrument_hash, record.base_decimals)?;
            instruments.insert(symbol.to_string(), metadata);
        }
        Ok(Self { instruments })
    }

    /// Build from the exchange's instrument listing
    pub fn from_listing(listing: &[InstrumentInfo]) -> Result<Self> {
        Self::from_records(listing.iter().map(|info| {
            (
                info.instrument.as_str(),
                InstrumentRecord {
                    instrument_hash: info.instrument_hash.clone(),
                    base_decimals: info.base_decimals,
                },
            )
        }))
    }

    /// Parse the `{symbol: {instrument_hash, base_decimals}}` JSON map
    pub fn from_json(raw: &str) -> Result<Self> {
        let records: BTreeMap<String, InstrumentRecord> = serde_json::from_str(raw)?;
        Self::from_records(records)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&raw)?;
        info!(path = %path.display(), count = catalog.len(), "instrument catalog loaded");
        Ok(catalog)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.records())?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), count = self.len(), "instrument catalog saved");
        Ok(())
    }

    pub fn records(&self) -> BTreeMap<String, InstrumentRecord> {
        self.instruments
            .iter()
            .map(|(symbol, metadata)| {
                (
                    symbol.clone(),
                    InstrumentRecord {
                        instrument_hash: metadata.instrument_hash.clone(),
                        base_decimals: metadata.base_decimals,
                    },
                )
            })
            .collect()
    }

    pub fn get(&self, symbol: &str) -> Option<&InstrumentMetadata> {
        self.instruments.get(symbol)
    }

    /// Lookup that fails with `UnknownInstrument`
    pub fn require(&self, symbol: &str) -> Result<&InstrumentMetadata> {
        self.get(symbol).ok_or_else(|| GrvtError::UnknownInstrument {
            symbol: symbol.to_string(),
        })
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_JSON: &str = r#"{
        "BTC_USDT_Perp": {"instrument_hash": "0x030501", "base_decimals": 9},
        "ETH_USDT_Perp": {"instrument_hash": "0x030401", "base_decimals": 9}
    }"#;

    #[test]
    fn test_from_json_parses_hash_as_uint() {
        let catalog = InstrumentCatalog::from_json(CATALOG_JSON).unwrap();
        let btc = catalog.require("BTC_USDT_Perp").unwrap();
        assert_eq!(btc.asset_id, U256::from(0x030501u64));
        assert_eq!(btc.base_decimals, 9);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_unknown_symbol() {
        let catalog = InstrumentCatalog::from_json(CATALOG_JSON).unwrap();
        let err = catalog.require("SOL_USDT_Perp").unwrap_err();
        assert!(matches!(err, GrvtError::UnknownInstrument { symbol } if symbol == "SOL_USDT_Perp"));
    }

    #[test]
    fn test_rejects_malformed_hash() {
        assert!(InstrumentMetadata::new("X", "030501", 9).is_err());
        assert!(InstrumentMetadata::new("X", "0xzz", 9).is_err());
        assert!(InstrumentMetadata::new("X", "0x", 9).is_err());
        assert!(InstrumentMetadata::new("X", "0x01", 20).is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let catalog = InstrumentCatalog::from_json(CATALOG_JSON).unwrap();
        let path = std::env::temp_dir().join(format!(
            "grvt-instruments-{}.json",
            std::process::id()
        ));

        catalog.save(&path).unwrap();
        let loaded = InstrumentCatalog::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.records(), catalog.records());
    }

    #[test]
    fn test_from_listing() {
        let listing = vec![InstrumentInfo {
            instrument: "BTC_USDT_Perp".to_string(),
            instrument_hash: "0x030501".to_string(),
            base_decimals: 9,
            base: None,
            quote: None,
            kind: None,
            tick_size: None,
            min_size: None,
        }];
        let catalog = InstrumentCatalog::from_listing(&listing).unwrap();
        assert_eq!(catalog.symbols().collect::<Vec<_>>(), vec!["BTC_USDT_Perp"]);
    }
}
