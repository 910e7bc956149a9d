//! Input validation
//!
//! Pure checks applied before anything is sent to the broker. Rejections
//! are logged at warn level and returned as [`ValidationError`].

use crate::broker::Side;
use rust_decimal::Decimal;
use thiserror::Error;

/// Caller-supplied values that fail a precondition
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid trading symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Order side must be BUY or SELL, got {0:?}")]
    InvalidSide(String),

    #[error("Quantity must be greater than 0, got {0}")]
    NonPositiveQuantity(Decimal),

    #[error("Price must be greater than 0, got {0}")]
    NonPositivePrice(Decimal),

    #[error("Stop price must be greater than 0, got {0}")]
    NonPositiveStopPrice(Decimal),

    #[error("For BUY orders, stop price ({stop_price}) must be >= price ({price})")]
    BuyStopBelowPrice { stop_price: Decimal, price: Decimal },

    #[error("For SELL orders, stop price ({stop_price}) must be <= price ({price})")]
    SellStopAbovePrice { stop_price: Decimal, price: Decimal },

    #[error("For BUY OCO, take-profit price ({take_profit}) must be lower than stop-loss price ({stop_loss})")]
    BuyOcoPriceOrder {
        take_profit: Decimal,
        stop_loss: Decimal,
    },

    #[error("For SELL OCO, take-profit price ({take_profit}) must be higher than stop-loss price ({stop_loss})")]
    SellOcoPriceOrder {
        take_profit: Decimal,
        stop_loss: Decimal,
    },

    #[error("Number of slices must be greater than 0, got {0}")]
    NonPositiveSlices(i64),

    #[error("Number of slices must be at most {max}, got {got}")]
    TooManySlices { got: i64, max: u32 },

    #[error("Interval seconds must be greater than 0")]
    ZeroInterval,

    #[error("Max polls must be greater than 0")]
    ZeroMaxPolls,

    #[error("Slice quantity rounds to zero ({total} over {slices} slices)")]
    SliceTooSmall { total: Decimal, slices: u32 },
}

fn reject(err: ValidationError) -> ValidationError {
    tracing::warn!(error = %err, "Validation failed");
    err
}

/// Symbols are non-empty and ASCII alphanumeric ("BTCUSDT")
pub fn validate_symbol(symbol: &str) -> Result<(), ValidationError> {
    if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(reject(ValidationError::InvalidSymbol(symbol.to_string())));
    }
    Ok(())
}

/// Parse an order side. Only the exact strings "BUY" and "SELL" pass.
pub fn validate_side(side: &str) -> Result<Side, ValidationError> {
    side.parse()
        .map_err(|s: String| reject(ValidationError::InvalidSide(s)))
}

pub fn validate_quantity(quantity: Decimal) -> Result<(), ValidationError> {
    if quantity <= Decimal::ZERO {
        return Err(reject(ValidationError::NonPositiveQuantity(quantity)));
    }
    Ok(())
}

pub fn validate_price(price: Decimal) -> Result<(), ValidationError> {
    if price <= Decimal::ZERO {
        return Err(reject(ValidationError::NonPositivePrice(price)));
    }
    Ok(())
}

/// A stop price must be positive, and on the far side of the reference
/// price: at or above it for BUY, at or below it for SELL.
pub fn validate_stop_price(
    stop_price: Decimal,
    price: Decimal,
    side: Side,
) -> Result<(), ValidationError> {
    if stop_price <= Decimal::ZERO {
        return Err(reject(ValidationError::NonPositiveStopPrice(stop_price)));
    }

    match side {
        Side::Buy if stop_price < price => Err(reject(ValidationError::BuyStopBelowPrice {
            stop_price,
            price,
        })),
        Side::Sell if stop_price > price => Err(reject(ValidationError::SellStopAbovePrice {
            stop_price,
            price,
        })),
        _ => Ok(()),
    }
}

/// OCO price ordering: a SELL exit takes profit above the stop-loss, a BUY
/// exit takes profit below it.
pub fn validate_oco_prices(
    side: Side,
    take_profit: Decimal,
    stop_loss: Decimal,
) -> Result<(), ValidationError> {
    match side {
        Side::Sell if take_profit <= stop_loss => {
            Err(reject(ValidationError::SellOcoPriceOrder {
                take_profit,
                stop_loss,
            }))
        }
        Side::Buy if take_profit >= stop_loss => Err(reject(ValidationError::BuyOcoPriceOrder {
            take_profit,
            stop_loss,
        })),
        _ => Ok(()),
    }
}

/// Upper bound on TWAP slices
pub const MAX_SLICES: u32 = 100_000;

/// Slice counts arrive signed so negative values get a typed rejection
pub fn validate_slices(num_slices: i64) -> Result<u32, ValidationError> {
    if num_slices <= 0 {
        return Err(reject(ValidationError::NonPositiveSlices(num_slices)));
    }
    match u32::try_from(num_slices) {
        Ok(count) if count <= MAX_SLICES => Ok(count),
        _ => Err(reject(ValidationError::TooManySlices {
            got: num_slices,
            max: MAX_SLICES,
        })),
    }
}

pub fn validate_interval(interval_secs: u64) -> Result<(), ValidationError> {
    if interval_secs == 0 {
        return Err(reject(ValidationError::ZeroInterval));
    }
    Ok(())
}

pub fn validate_max_polls(max_polls: Option<u32>) -> Result<(), ValidationError> {
    if max_polls == Some(0) {
        return Err(reject(ValidationError::ZeroMaxPolls));
    }
    Ok(())
}

/// A per-slice quantity must survive rounding to the exchange step
pub(crate) fn validate_slice_quantity(
    slice_quantity: Decimal,
    total: Decimal,
    slices: u32,
) -> Result<(), ValidationError> {
    if slice_quantity <= Decimal::ZERO {
        return Err(reject(ValidationError::SliceTooSmall { total, slices }));
    }
    Ok(())
}
