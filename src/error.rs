// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Error types for till operations and settlement.

use crate::denomination::Denomination;
use thiserror::Error;

/// Till and settlement errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TillError {
    /// Inserted value is below the amount owed. Nothing was deposited.
    #[error("insufficient funds inserted: owed {owed}, inserted {inserted}")]
    InsufficientFunds { owed: i64, inserted: i64 },

    /// Payment was sufficient but the till cannot make exact change.
    /// The inserted units were handed back as `refunded`.
    #[error("register does not have adequate denominations")]
    RegisterEmpty { refunded: Vec<Denomination> },

    /// No greedy decomposition of `amount` exists in the current stock.
    #[error("no exact change for {amount} with current stock")]
    NoExactChange { amount: i64 },

    /// Amount is negative or overflows.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// Value is not a known denomination, or not one this till handles.
    #[error("invalid denomination: {0}")]
    InvalidDenomination(u32),

    /// Till order lists the same denomination twice.
    #[error("denomination {0} appears more than once in the till order")]
    DuplicateDenomination(Denomination),

    /// Till order is not strictly largest first.
    #[error("till order must be largest first, but {0} follows a smaller denomination")]
    InvalidOrder(Denomination),

    /// The compensating refund could not return every inserted unit.
    /// The till was mutated concurrently between deposit and refund.
    #[error("refund failed: {} unit(s) could not be returned", unreturned.len())]
    RefundFailed {
        refunded: Vec<Denomination>,
        unreturned: Vec<Denomination>,
    },
}

impl TillError {
    /// Whether the caller can correct this by changing what they insert.
    ///
    /// Transport layers map these to a client-error status and
    /// everything else to a server-error status.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TillError::InsufficientFunds { .. } | TillError::RegisterEmpty { .. }
        )
    }

    /// Stable machine-readable name for reports and responses.
    pub fn code(&self) -> &'static str {
        match self {
            TillError::InsufficientFunds { .. } => "insufficient_funds",
            TillError::RegisterEmpty { .. } => "register_empty",
            TillError::NoExactChange { .. } => "no_exact_change",
            TillError::InvalidAmount(_) => "invalid_amount",
            TillError::InvalidDenomination(_) => "invalid_denomination",
            TillError::DuplicateDenomination(_) => "duplicate_denomination",
            TillError::InvalidOrder(_) => "invalid_order",
            TillError::RefundFailed { .. } => "refund_failed",
        }
    }
}

/// Errors loading a till configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid till stock: {0}")]
    Till(#[from] TillError),
}
