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

//! Currency units accepted and dispensed by the till.
//!
//! Values are in minor units (cents). The set of valid denominations is fixed;
//! [`CANONICAL_ORDER`] lists them largest first and drives change-making preference.
//!
//! # Example
//!
//! ```
//! use till_demo_rs::denomination::{Denomination, FIFTY_CENTS, TWENTY};
//!
//! assert_eq!(FIFTY_CENTS.to_string(), "0.50");
//! assert_eq!(TWENTY.to_string(), "20");
//! assert_eq!(Denomination::try_from(2000).unwrap(), TWENTY);
//! assert!(Denomination::try_from(3).is_err());
//! ```

use crate::TillError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minor units per major unit.
const MINOR_PER_MAJOR: u32 = 100;

/// A single currency unit, valued in minor units.
///
/// Only the values in [`CANONICAL_ORDER`] can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Denomination(u32);

pub const CENT: Denomination = Denomination(1);
pub const TWENTY_CENTS: Denomination = Denomination(20);
pub const FIFTY_CENTS: Denomination = Denomination(50);
pub const ONE: Denomination = Denomination(100);
pub const TWO: Denomination = Denomination(200);
pub const FIVE: Denomination = Denomination(500);
pub const TEN: Denomination = Denomination(1000);
pub const TWENTY: Denomination = Denomination(2000);
pub const FIFTY: Denomination = Denomination(5000);

/// Every valid denomination, largest face value first.
pub const CANONICAL_ORDER: [Denomination; 9] = [
    FIFTY,
    TWENTY,
    TEN,
    FIVE,
    TWO,
    ONE,
    FIFTY_CENTS,
    TWENTY_CENTS,
    CENT,
];

impl Denomination {
    /// Face value in minor units.
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Face value in major units.
    pub fn major(self) -> Decimal {
        Decimal::new(i64::from(self.0), 2)
    }
}

/// Sums the face value of a sequence of units, in minor units.
pub fn total(units: &[Denomination]) -> i64 {
    units.iter().map(|d| i64::from(d.value())).sum()
}

/// Converts raw minor-unit values, failing on the first unknown one.
pub fn from_minor_units(values: &[u32]) -> Result<Vec<Denomination>, TillError> {
    values.iter().map(|&v| Denomination::try_from(v)).collect()
}

impl TryFrom<u32> for Denomination {
    type Error = TillError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        CANONICAL_ORDER
            .iter()
            .copied()
            .find(|d| d.0 == value)
            .ok_or(TillError::InvalidDenomination(value))
    }
}

impl From<Denomination> for u32 {
    fn from(d: Denomination) -> Self {
        d.0
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < MINOR_PER_MAJOR {
            // Scale 2 keeps the trailing zero: 20 -> "0.20".
            write!(f, "{}", self.major())
        } else {
            write!(f, "{}", self.0 / MINOR_PER_MAJOR)
        }
    }
}
