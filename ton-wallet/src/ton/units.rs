//! Toncoin and jetton amount conversions

use crate::error::{Error, Result};

/// Decimals of Toncoin
pub const TON_DECIMALS: u32 = 9;
/// Decimals of the USDT jetton on TON
pub const USDT_DECIMALS: u32 = 6;

/// Parse a decimal amount such as `"1.5"` into its smallest unit
pub fn parse_units(amount: &str, decimals: u32) -> Result<u128> {
    let amount = amount.trim();
    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(Error::InvalidInput(format!("invalid amount: {:?}", amount)));
    }
    if fraction.len() > decimals as usize {
        return Err(Error::InvalidInput(format!(
            "amount {} has more than {} decimals",
            amount, decimals
        )));
    }

    let scale = 10u128.pow(decimals);
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|e| Error::InvalidInput(format!("invalid amount {}: {}", amount, e)))?
    };
    let fraction: u128 = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = decimals as usize);
        padded
            .parse()
            .map_err(|e| Error::InvalidInput(format!("invalid amount {}: {}", amount, e)))?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| Error::InvalidInput(format!("amount too large: {}", amount)))
}

/// Toncoin amount to nanotons
pub fn to_nano(amount: &str) -> Result<u128> {
    parse_units(amount, TON_DECIMALS)
}

/// Smallest units to a floating point amount
pub fn from_units(units: u128, decimals: u32) -> f64 {
    units as f64 / 10f64.powi(decimals as i32)
}

/// Nanotons to Toncoin
pub fn from_nano(nano: u128) -> f64 {
    from_units(nano, TON_DECIMALS)
}
