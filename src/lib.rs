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

//! # Till Demo
//!
//! This library settles point-of-sale payments: a customer inserts currency units
//! toward a price, and the change is made from a till shared by every sale.
//!
//! ## Core Components
//!
//! - [`Denomination`]: A currency unit, valued in minor units (cents)
//! - [`Till`]: Concurrency-safe inventory of denominations with greedy change-making
//! - [`settle`]: Validates a payment, deposits it and withdraws the change
//! - [`TillError`]: Error types for till and settlement failures
//!
//! ## Example
//!
//! ```
//! use till_demo_rs::denomination::{FIVE, TEN, TWENTY};
//! use till_demo_rs::{Till, TillError, settle};
//!
//! let till = Till::stocked(10);
//!
//! // Pay 10.00 with a 20 note
//! let change = settle(&till, 1000, &[TWENTY]).unwrap();
//! assert_eq!(change, vec![TEN]);
//!
//! // Pay 10.00 with a 5 note
//! let err = settle(&till, 1000, &[FIVE]).unwrap_err();
//! assert!(matches!(err, TillError::InsufficientFunds { .. }));
//! ```
//!
//! ## Thread Safety
//!
//! Every till operation takes one exclusive lock for its whole duration, so any
//! number of threads may settle against the same [`Till`].

pub mod config;
pub mod denomination;
pub mod error;
pub mod logging;
mod settlement;
pub mod till;

pub use config::TillConfig;
pub use denomination::Denomination;
pub use error::{ConfigError, TillError};
pub use settlement::{change_breakdown, settle, settle_atomic};
pub use till::{Register, Till};
