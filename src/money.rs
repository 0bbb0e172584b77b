//! Fixed-point currency arithmetic.
//!
//! All amounts are integer cents (1 unit = 0.01). Binary floating point
//! never touches the financial path, so fee splits always conserve the
//! pool to the cent.

use crate::error::{CoreError, CoreResult};

/// Currency amount in cents (1 dollar = 100 cents)
pub type Cents = u64;

pub const CENTS_PER_UNIT: u64 = 100;

/// Basis-point denominator for fee arithmetic (100 bps = 1%)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Format cents as a 2-decimal string: 297 -> "2.97"
pub fn format_cents(amount: Cents) -> String {
    format!("{}.{:02}", amount / CENTS_PER_UNIT, amount % CENTS_PER_UNIT)
}

/// Parse a decimal string into cents: "2.97" -> 297, "10" -> 1000.
///
/// At most two fractional digits are accepted; anything else is rejected
/// rather than rounded.
pub fn parse_amount(s: &str) -> CoreResult<Cents> {
    let s = s.trim();
    if s.is_empty() {
        return Err(CoreError::InvalidAmount("empty amount".to_string()));
    }

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };

    if frac.len() > 2 {
        return Err(CoreError::InvalidAmount(format!(
            "more than two fractional digits: {}",
            s
        )));
    }

    let whole: u64 = whole
        .parse()
        .map_err(|_| CoreError::InvalidAmount(s.to_string()))?;

    let frac_cents: u64 = if frac.is_empty() {
        0
    } else {
        let parsed: u64 = frac
            .parse()
            .map_err(|_| CoreError::InvalidAmount(s.to_string()))?;
        // "5" means 50 cents, "05" means 5 cents
        if frac.len() == 1 {
            parsed * 10
        } else {
            parsed
        }
    };

    whole
        .checked_mul(CENTS_PER_UNIT)
        .and_then(|c| c.checked_add(frac_cents))
        .ok_or_else(|| CoreError::InvalidAmount(format!("amount overflow: {}", s)))
}

/// Fee on a pool in basis points, floored to the cent.
///
/// `pool - fee_amount(pool, bps)` is the winner's share; the two always
/// sum back to the original pool.
pub fn fee_amount(pool: Cents, fee_bps: u64) -> Cents {
    pool * fee_bps / BPS_DENOMINATOR
}
