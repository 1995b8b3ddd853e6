//! Fixed-point money arithmetic.
//!
//! All prices, costs and totals are `rust_decimal::Decimal` — never floating
//! point. Values entering the system (catalog prices, price snapshots) are
//! normalized to [`MONEY_SCALE`] fractional digits; everything downstream is
//! exact decimal arithmetic.

pub use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Number of fractional digits carried by monetary values.
pub const MONEY_SCALE: u32 = 2;

/// Normalize a monetary value to [`MONEY_SCALE`] digits.
///
/// Midpoint-away-from-zero is the one rounding rule in the system: 5.005
/// normalizes to 5.01, -5.005 to -5.01.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
