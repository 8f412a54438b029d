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

//! Till stock configuration.
//!
//! ```toml
//! # Optional, defaults to every denomination largest first.
//! order = [5000, 2000, 1000, 500, 200, 100, 50, 20, 1]
//! # Optional, defaults to 0.
//! default_count = 10
//!
//! [[stock]]
//! denomination = 1000
//! count = 0
//! ```

use crate::denomination::{CANONICAL_ORDER, Denomination};
use crate::error::ConfigError;
use crate::till::Till;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Initial stock of the till, loaded at process start.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TillConfig {
    /// Change-making order, largest first.
    #[serde(default = "canonical_order")]
    pub order: Vec<Denomination>,

    /// Count given to every denomination in `order` without a `stock` entry.
    #[serde(default)]
    pub default_count: u32,

    /// Per-denomination overrides.
    #[serde(default)]
    pub stock: Vec<StockEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StockEntry {
    pub denomination: Denomination,
    pub count: u32,
}

fn canonical_order() -> Vec<Denomination> {
    CANONICAL_ORDER.to_vec()
}

impl TillConfig {
    /// Reads a TOML config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        contents.parse()
    }

    /// Builds a till stocked as configured.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Till`] if the order repeats a denomination, is not
    /// largest first, or a stock entry names a denomination outside the order.
    pub fn build_till(&self) -> Result<Till, ConfigError> {
        let mut stock: HashMap<Denomination, u32> = self
            .order
            .iter()
            .map(|&d| (d, self.default_count))
            .collect();
        for entry in &self.stock {
            stock.insert(entry.denomination, entry.count);
        }
        Ok(Till::new(stock, self.order.clone())?)
    }
}

impl FromStr for TillConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

impl Default for TillConfig {
    /// Ten of every denomination.
    fn default() -> Self {
        Self {
            order: canonical_order(),
            default_count: 10,
            stock: Vec::new(),
        }
    }
}
