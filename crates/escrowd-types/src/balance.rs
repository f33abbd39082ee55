//! Wallet balance types.
//!
//! Every user has one wallet with an `available` fiat balance, an
//! `available_crypto` balance, and an `escrow` balance holding funds locked
//! by in-flight trades. The escrow balance is a cache: at any instant it
//! must equal the sum of escrow amounts over the owner's unreleased
//! escrow-holding buy-side transactions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balances for a single wallet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletBalance {
    /// Spendable fiat balance.
    pub available: Decimal,
    /// Spendable crypto balance. Not touched by the release path; carried
    /// because the wallet is one record.
    pub available_crypto: Decimal,
    /// Fiat locked by escrow-holding transactions where this wallet's
    /// owner is the buyer.
    pub escrow: Decimal,
}

impl WalletBalance {
    /// Create a zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: Decimal::ZERO,
            available_crypto: Decimal::ZERO,
            escrow: Decimal::ZERO,
        }
    }

    /// Total fiat (available + escrow).
    #[must_use]
    pub fn total_fiat(&self) -> Decimal {
        self.available + self.escrow
    }

    /// Whether this wallet holds nothing at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available.is_zero() && self.available_crypto.is_zero() && self.escrow.is_zero()
    }
}

impl Default for WalletBalance {
    fn default() -> Self {
        Self::new()
    }
}
