//! Instrument Record Value Object
//!
//! One row of the instrument table: a ticker symbol, the broker's numeric
//! instrument id (Uic), the tradable asset type and the two per-instrument
//! risk parameters.
//!
//! # Invariants
//!
//! - `symbol` is non-empty
//! - `uic` is a positive integer
//! - `asset_type` is a non-empty tag
//! - `stop_loss_points` and `reference_moving_average` are strictly positive

use crate::domain::errors::SchemaError;
use rust_decimal::Decimal;
use std::fmt;

/// Source field holding the broker instrument id
pub const FIELD_UIC: &str = "Uic";
/// Source field holding the asset type tag
pub const FIELD_ASSET_TYPE: &str = "AssetType";
/// Source field holding the stop-loss distance in points
pub const FIELD_STOPLOSS_POINTS: &str = "stoploss_points";
/// Source field holding the 200-period moving average snapshot
pub const FIELD_REFERENCE_MA: &str = "200ma";

/// Tradable instrument category as the broker names it.
///
/// The set is open: tags other than the known ones are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetType {
    CfdOnIndex,
    CfdOnEtf,
    Other(String),
}

impl AssetType {
    pub fn as_str(&self) -> &str {
        match self {
            AssetType::CfdOnIndex => "CfdOnIndex",
            AssetType::CfdOnEtf => "CfdOnEtf",
            AssetType::Other(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, AssetType::Other(_))
    }
}

impl From<&str> for AssetType {
    fn from(tag: &str) -> Self {
        match tag {
            "CfdOnIndex" => AssetType::CfdOnIndex,
            "CfdOnEtf" => AssetType::CfdOnEtf,
            other => AssetType::Other(other.to_string()),
        }
    }
}

impl From<String> for AssetType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "CfdOnIndex" => AssetType::CfdOnIndex,
            "CfdOnEtf" => AssetType::CfdOnEtf,
            _ => AssetType::Other(tag),
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Direction of the position a stop protects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Static metadata for one tradable instrument
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentRecord {
    /// Human-readable ticker, e.g. "NDX"
    pub symbol: String,

    /// Broker-specific unique instrument identifier
    pub uic: u64,

    pub asset_type: AssetType,

    /// Stop-loss distance in instrument points (not currency)
    pub stop_loss_points: Decimal,

    /// Long-horizon (200-period) moving average snapshot
    pub reference_moving_average: Decimal,
}

impl InstrumentRecord {
    /// Create a new InstrumentRecord with validation
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if any field violates the record invariants
    pub fn new(
        symbol: impl Into<String>,
        uic: u64,
        asset_type: impl Into<AssetType>,
        stop_loss_points: Decimal,
        reference_moving_average: Decimal,
    ) -> Result<Self, SchemaError> {
        let record = Self {
            symbol: symbol.into(),
            uic,
            asset_type: asset_type.into(),
            stop_loss_points,
            reference_moving_average,
        };

        record.validate()?;
        Ok(record)
    }

    /// Validate all invariants
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.symbol.is_empty() {
            return Err(SchemaError::EmptySymbol);
        }

        if self.uic == 0 {
            return Err(SchemaError::NonPositive {
                symbol: self.symbol.clone(),
                field: FIELD_UIC,
                value: self.uic.to_string(),
            });
        }

        if self.asset_type.as_str().is_empty() {
            return Err(SchemaError::EmptyAssetType {
                symbol: self.symbol.clone(),
            });
        }

        self.validate_positive(FIELD_STOPLOSS_POINTS, self.stop_loss_points)?;
        self.validate_positive(FIELD_REFERENCE_MA, self.reference_moving_average)?;

        Ok(())
    }

    fn validate_positive(&self, field: &'static str, value: Decimal) -> Result<(), SchemaError> {
        if value <= Decimal::ZERO {
            return Err(SchemaError::NonPositive {
                symbol: self.symbol.clone(),
                field,
                value: value.to_string(),
            });
        }
        Ok(())
    }

    /// Price at which the protective stop sits for a position entered at `entry`.
    ///
    /// A buy is protected below the entry, a sell above it. Returns `None`
    /// when the stop falls outside the `Decimal` range.
    pub fn stop_loss_price(&self, entry: Decimal, side: TradeSide) -> Option<Decimal> {
        match side {
            TradeSide::Buy => entry.checked_sub(self.stop_loss_points),
            TradeSide::Sell => entry.checked_add(self.stop_loss_points),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ndx() -> InstrumentRecord {
        InstrumentRecord::new("NDX", 4912, "CfdOnIndex", dec!(25), dec!(11946)).unwrap()
    }

    #[test]
    fn test_valid_record() {
        let record = ndx();
        assert_eq!(record.symbol, "NDX");
        assert_eq!(record.uic, 4912);
        assert_eq!(record.asset_type, AssetType::CfdOnIndex);
        assert_eq!(record.stop_loss_points, dec!(25));
        assert_eq!(record.reference_moving_average, dec!(11946));
    }

    #[test]
    fn test_unknown_asset_type_is_kept() {
        let record =
            InstrumentRecord::new("GER40", 4914, "CfdOnFutures", dec!(20), dec!(15800)).unwrap();
        assert_eq!(
            record.asset_type,
            AssetType::Other("CfdOnFutures".to_string())
        );
        assert_eq!(record.asset_type.as_str(), "CfdOnFutures");
        assert!(!record.asset_type.is_known());
        assert!(AssetType::CfdOnEtf.is_known());
    }

    #[test]
    fn test_rejects_empty_fields() {
        assert_eq!(
            InstrumentRecord::new("", 1, "CfdOnIndex", dec!(1), dec!(1)),
            Err(SchemaError::EmptySymbol)
        );
        assert_eq!(
            InstrumentRecord::new("SPX", 4913, "", dec!(10), dec!(3946)),
            Err(SchemaError::EmptyAssetType {
                symbol: "SPX".to_string()
            })
        );
    }

    #[test]
    fn test_rejects_zero_uic() {
        let err = InstrumentRecord::new("SPX", 0, "CfdOnIndex", dec!(10), dec!(3946)).unwrap_err();
        assert_eq!(err.field(), Some(FIELD_UIC));
    }

    #[test]
    fn test_rejects_non_positive_risk_parameters() {
        let err = InstrumentRecord::new("SPX", 4913, "CfdOnIndex", dec!(0), dec!(3946)).unwrap_err();
        assert_eq!(
            err,
            SchemaError::NonPositive {
                symbol: "SPX".to_string(),
                field: FIELD_STOPLOSS_POINTS,
                value: "0".to_string(),
            }
        );

        let err =
            InstrumentRecord::new("SPX", 4913, "CfdOnIndex", dec!(10), dec!(-3946)).unwrap_err();
        assert_eq!(err.field(), Some(FIELD_REFERENCE_MA));
    }

    #[test]
    fn test_stop_loss_price() {
        let record = ndx();
        assert_eq!(
            record.stop_loss_price(dec!(15123.18), TradeSide::Buy),
            Some(dec!(15098.18))
        );
        assert_eq!(
            record.stop_loss_price(dec!(15123.18), TradeSide::Sell),
            Some(dec!(15148.18))
        );
    }

    #[test]
    fn test_stop_loss_price_out_of_range() {
        let record = ndx();
        assert_eq!(record.stop_loss_price(Decimal::MAX, TradeSide::Sell), None);
        assert_eq!(record.stop_loss_price(Decimal::MIN, TradeSide::Buy), None);
        assert_eq!(
            record.stop_loss_price(Decimal::MAX, TradeSide::Buy),
            Some(Decimal::MAX - dec!(25))
        );
    }
}
