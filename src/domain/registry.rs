//! Instrument Registry
//!
//! Immutable, validated collection of [`InstrumentRecord`]s indexed by
//! symbol and by Uic. Iteration follows source order.
//!
//! The registry is built once and handed to consumers by reference (or
//! behind an `Arc`); nothing here mutates after construction, so it can be
//! read from any number of threads without locking.

use crate::domain::errors::{LookupError, SchemaError};
use crate::domain::instrument::InstrumentRecord;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstrumentRegistry {
    records: Vec<InstrumentRecord>,
    by_symbol: HashMap<String, usize>,
    by_uic: HashMap<u64, usize>,
}

impl InstrumentRegistry {
    /// Build a registry from records in source order.
    ///
    /// Every record is re-validated; duplicate symbols or Uics fail the
    /// whole build.
    pub fn from_records<I>(records: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = InstrumentRecord>,
    {
        let mut registry = Self::default();

        for record in records {
            record.validate()?;

            if registry.by_symbol.contains_key(&record.symbol) {
                return Err(SchemaError::DuplicateSymbol {
                    symbol: record.symbol,
                });
            }
            if let Some(&existing) = registry.by_uic.get(&record.uic) {
                return Err(SchemaError::DuplicateUic {
                    uic: record.uic,
                    first: registry.records[existing].symbol.clone(),
                    second: record.symbol,
                });
            }

            let idx = registry.records.len();
            registry.by_symbol.insert(record.symbol.clone(), idx);
            registry.by_uic.insert(record.uic, idx);
            registry.records.push(record);
        }

        Ok(registry)
    }

    /// Case-sensitive exact lookup
    pub fn get(&self, symbol: &str) -> Option<&InstrumentRecord> {
        self.by_symbol.get(symbol).map(|&idx| &self.records[idx])
    }

    pub fn require(&self, symbol: &str) -> Result<&InstrumentRecord, LookupError> {
        self.get(symbol).ok_or_else(|| LookupError::UnknownSymbol {
            symbol: symbol.to_string(),
        })
    }

    pub fn get_by_uic(&self, uic: u64) -> Option<&InstrumentRecord> {
        self.by_uic.get(&uic).map(|&idx| &self.records[idx])
    }

    pub fn require_uic(&self, uic: u64) -> Result<&InstrumentRecord, LookupError> {
        self.get_by_uic(uic).ok_or(LookupError::UnknownUic { uic })
    }

    pub fn symbol_for_uic(&self, uic: u64) -> Option<&str> {
        self.get_by_uic(uic).map(|record| record.symbol.as_str())
    }

    pub fn uic_for_symbol(&self, symbol: &str) -> Option<u64> {
        self.get(symbol).map(|record| record.uic)
    }

    /// Stop-loss distance for `symbol`, falling back to `default` for unknown
    /// instruments. The symbol is upper-cased before lookup since trade
    /// signals carry tickers in mixed case.
    pub fn stop_loss_or_default(&self, symbol: &str, default: Decimal) -> Decimal {
        let normalized = symbol.to_uppercase();
        match self.get(&normalized) {
            Some(record) => record.stop_loss_points,
            None => {
                warn!(
                    "Unknown symbol '{}'. Using default stop loss of {} points",
                    normalized, default
                );
                default
            }
        }
    }

    /// All records in source order
    pub fn all(&self) -> std::slice::Iter<'_, InstrumentRecord> {
        self.records.iter()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(|record| record.symbol.as_str())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a InstrumentRegistry {
    type Item = &'a InstrumentRecord;
    type IntoIter = std::slice::Iter<'a, InstrumentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::AssetType;
    use rust_decimal_macros::dec;

    fn record(symbol: &str, uic: u64, asset: &str, sl: Decimal, ma: Decimal) -> InstrumentRecord {
        InstrumentRecord::new(symbol, uic, asset, sl, ma).unwrap()
    }

    fn us_indices() -> InstrumentRegistry {
        InstrumentRegistry::from_records(vec![
            record("NDX", 4912, "CfdOnIndex", dec!(25), dec!(11946)),
            record("SPX", 4913, "CfdOnIndex", dec!(10), dec!(3946)),
            record("DJIA", 4911, "CfdOnIndex", dec!(25), dec!(35215)),
            record("RUT", 31933, "CfdOnEtf", dec!(10), dec!(170)),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_by_symbol() {
        let registry = us_indices();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get("SPX").unwrap().uic, 4913);
        assert_eq!(registry.get("RUT").unwrap().asset_type, AssetType::CfdOnEtf);
        assert!(registry.get("UNKNOWN").is_none());
        assert!(registry.get("spx").is_none());
    }

    #[test]
    fn test_iteration_keeps_source_order() {
        let registry = us_indices();
        let symbols: Vec<&str> = registry.symbols().collect();
        assert_eq!(symbols, vec!["NDX", "SPX", "DJIA", "RUT"]);

        // restartable
        assert_eq!(registry.all().count(), 4);
        assert_eq!((&registry).into_iter().next().unwrap().symbol, "NDX");
    }

    #[test]
    fn test_reverse_lookup() {
        let registry = us_indices();
        assert_eq!(registry.symbol_for_uic(4912), Some("NDX"));
        assert_eq!(registry.symbol_for_uic(0), None);
        assert_eq!(registry.uic_for_symbol("DJIA"), Some(4911));
        assert_eq!(registry.uic_for_symbol("INVALID"), None);
    }

    #[test]
    fn test_require_reports_missing() {
        let registry = us_indices();
        assert!(registry.require("NDX").is_ok());
        assert_eq!(
            registry.require("FTSE").unwrap_err(),
            LookupError::UnknownSymbol {
                symbol: "FTSE".to_string()
            }
        );
        assert_eq!(
            registry.require_uic(1).unwrap_err(),
            LookupError::UnknownUic { uic: 1 }
        );
    }

    #[test]
    fn test_stop_loss_fallback() {
        let registry = us_indices();
        assert_eq!(registry.stop_loss_or_default("ndx", dec!(9)), dec!(25));
        assert_eq!(registry.stop_loss_or_default("SPX", dec!(9)), dec!(10));
        assert_eq!(registry.stop_loss_or_default("DAX", dec!(9)), dec!(9));
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let err = InstrumentRegistry::from_records(vec![
            record("SPX", 4913, "CfdOnIndex", dec!(10), dec!(3946)),
            record("SPX", 9999, "CfdOnIndex", dec!(10), dec!(3946)),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateSymbol {
                symbol: "SPX".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_uic_rejected() {
        let err = InstrumentRegistry::from_records(vec![
            record("SPX", 4913, "CfdOnIndex", dec!(10), dec!(3946)),
            record("US500", 4913, "CfdOnIndex", dec!(10), dec!(3946)),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateUic {
                uic: 4913,
                first: "SPX".to_string(),
                second: "US500".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_record_rejected() {
        let mut bad = record("SPX", 4913, "CfdOnIndex", dec!(10), dec!(3946));
        bad.stop_loss_points = dec!(-1);
        let err = InstrumentRegistry::from_records(vec![bad]).unwrap_err();
        assert_eq!(err.field(), Some("stoploss_points"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = InstrumentRegistry::from_records(Vec::new()).unwrap();
        assert!(registry.is_empty());
        assert!(!registry.contains("NDX"));
    }
}
