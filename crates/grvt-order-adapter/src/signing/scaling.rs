/*
[INPUT]:  Decimal amounts and a power-of-ten exponent
[OUTPUT]: Exact u64 fixed-point integers, or an InvalidOrder error
[POS]:    Signing layer - decimal to contract-unit conversion
[UPDATE]: When contract unit conventions change
*/

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::http::{GrvtError, Result};

/// Contract prices are fixed-point with nine decimals
pub const PRICE_DECIMALS: u32 = 9;

/// Scale `value` by `10^decimals`, requiring an exact non-negative integer that fits `u64`.
///
/// No rounding is applied: any remainder below the minimum unit is rejected.
pub fn to_fixed_point(value: Decimal, decimals: u32, field: &str) -> Result<u64> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(GrvtError::InvalidOrder(format!(
            "{field} must not be negative, got {value}"
        )));
    }

    let multiplier = 10u64
        .checked_pow(decimals)
        .map(Decimal::from)
        .ok_or_else(|| GrvtError::InvalidOrder(format!("10^{decimals} overflows for {field}")))?;

    let scaled = value.checked_mul(multiplier).ok_or_else(|| {
        GrvtError::InvalidOrder(format!("{field} {value} overflows at {decimals} decimals"))
    })?;

    if !scaled.fract().is_zero() {
        return Err(GrvtError::InvalidOrder(format!(
            "{field} {value} has more precision than {decimals} decimals allow"
        )));
    }

    scaled.to_u64().ok_or_else(|| {
        GrvtError::InvalidOrder(format!("{field} {value} does not fit in uint64"))
    })
}
