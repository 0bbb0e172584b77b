//! Engine configuration.
//!
//! The admin wallet and the ticket seal secret are explicit injected
//! values, resolved once at engine construction rather than magic constants
//! compared at settlement time, so both can be rotated and tested
//! without touching call sites.

use crate::error::{CoreError, CoreResult};
use crate::money::{self, Cents};

/// Default ticket price: one unit ($1.00)
pub const DEFAULT_TICKET_PRICE: Cents = 100;

/// Default operator cut: 100 bps = 1% of the pool, taken at settlement
pub const DEFAULT_ADMIN_FEE_BPS: u64 = 100;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wallet credited with the settlement fee
    pub admin_wallet: String,
    /// Server-only key for ticket seals; never exposed to clients
    pub ticket_seal_secret: String,
    /// Price of one draw entry in cents
    pub ticket_price: Cents,
    /// Operator fee in basis points
    pub admin_fee_bps: u64,
}

impl EngineConfig {
    pub fn new(admin_wallet: impl Into<String>, ticket_seal_secret: impl Into<String>) -> Self {
        Self {
            admin_wallet: admin_wallet.into(),
            ticket_seal_secret: ticket_seal_secret.into(),
            ticket_price: DEFAULT_TICKET_PRICE,
            admin_fee_bps: DEFAULT_ADMIN_FEE_BPS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `FAIRDRAW_ADMIN_WALLET` and `FAIRDRAW_SEAL_SECRET` are required;
    /// `FAIRDRAW_TICKET_PRICE` (decimal, e.g. "1.00") and
    /// `FAIRDRAW_ADMIN_FEE_BPS` fall back to the defaults.
    pub fn from_env() -> CoreResult<Self> {
        let admin_wallet = std::env::var("FAIRDRAW_ADMIN_WALLET")
            .map_err(|_| CoreError::Config("FAIRDRAW_ADMIN_WALLET not set".to_string()))?;

        let ticket_seal_secret = std::env::var("FAIRDRAW_SEAL_SECRET")
            .map_err(|_| CoreError::Config("FAIRDRAW_SEAL_SECRET not set".to_string()))?;

        let ticket_price = match std::env::var("FAIRDRAW_TICKET_PRICE") {
            Ok(raw) => money::parse_amount(&raw)?,
            Err(_) => DEFAULT_TICKET_PRICE,
        };

        let admin_fee_bps = match std::env::var("FAIRDRAW_ADMIN_FEE_BPS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| CoreError::Config(format!("invalid FAIRDRAW_ADMIN_FEE_BPS: {}", raw)))?,
            Err(_) => DEFAULT_ADMIN_FEE_BPS,
        };

        Ok(Self {
            admin_wallet,
            ticket_seal_secret,
            ticket_price,
            admin_fee_bps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::new("admin", "secret");
        assert_eq!(config.ticket_price, 100);
        assert_eq!(config.admin_fee_bps, 100);
    }
}
