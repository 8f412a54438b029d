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

//! Till inventory.
//!
//! A [`Till`] owns a count per denomination and hands out change with a greedy
//! descending policy. Every mutation runs under one exclusive lock, so concurrent
//! callers never interleave their reads and writes of the inventory.
//!
//! # Example
//!
//! ```
//! use till_demo_rs::Till;
//! use till_demo_rs::denomination::{TEN, TWENTY};
//!
//! let till = Till::stocked(10);
//! till.deposit(&[TWENTY]).unwrap();
//! assert_eq!(till.count(TWENTY), 11);
//!
//! let change = till.withdraw(1000).unwrap();
//! assert_eq!(change, vec![TEN]);
//! assert_eq!(till.count(TEN), 9);
//! ```

use crate::TillError;
use crate::denomination::{CANONICAL_ORDER, Denomination};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Operations a settlement needs from a till.
///
/// Each call is atomic on its own; nothing is promised about the state
/// between two calls.
pub trait Register: Send + Sync {
    /// Adds one unit to the stock for each element of `units`.
    fn deposit(&self, units: &[Denomination]) -> Result<(), TillError>;

    /// Removes units summing exactly to `amount`, or nothing at all.
    fn withdraw(&self, amount: i64) -> Result<Vec<Denomination>, TillError>;

    /// Change-making preference, largest first.
    fn ordered_denominations(&self) -> &[Denomination];
}

#[derive(Debug, Clone)]
struct Inventory {
    /// One entry per denomination in the till order, zero included.
    counts: HashMap<Denomination, u32>,
}

impl Inventory {
    fn new(order: &[Denomination]) -> Self {
        Self {
            counts: order.iter().map(|&d| (d, 0)).collect(),
        }
    }

    fn count(&self, denomination: Denomination) -> u32 {
        self.counts.get(&denomination).copied().unwrap_or(0)
    }

    fn total_value(&self) -> i64 {
        self.counts
            .iter()
            .map(|(d, &n)| i64::from(d.value()) * i64::from(n))
            .sum()
    }

    fn assert_invariants(&self, order: &[Denomination]) {
        debug_assert_eq!(
            self.counts.len(),
            order.len(),
            "Invariant violated: inventory tracks denominations outside the till order"
        );
    }

    /// Checks every unit before touching the counts.
    fn deposit(&mut self, units: &[Denomination]) -> Result<(), TillError> {
        if let Some(unknown) = units.iter().find(|d| !self.counts.contains_key(*d)) {
            return Err(TillError::InvalidDenomination(unknown.value()));
        }
        for unit in units {
            if let Some(count) = self.counts.get_mut(unit) {
                *count += 1;
            }
        }
        Ok(())
    }

    /// Greedy descending selection over `order`.
    ///
    /// The selection is planned first and only committed once it sums to
    /// `amount`, so a failed withdrawal leaves the counts untouched.
    fn withdraw(
        &mut self,
        order: &[Denomination],
        amount: i64,
    ) -> Result<Vec<Denomination>, TillError> {
        if amount < 0 {
            return Err(TillError::InvalidAmount(amount));
        }

        let mut remaining = amount;
        let mut plan: Vec<(Denomination, u32)> = Vec::new();
        for &denomination in order {
            if remaining == 0 {
                break;
            }
            let value = i64::from(denomination.value());
            let available = i64::from(self.count(denomination));
            let take = (remaining / value).min(available);
            if take > 0 {
                remaining -= take * value;
                // take <= available, which came from a u32
                plan.push((denomination, take as u32));
            }
        }

        if remaining != 0 {
            return Err(TillError::NoExactChange { amount });
        }

        let mut change = Vec::new();
        for (denomination, take) in plan {
            self.remove(denomination, take);
            change.extend(std::iter::repeat_n(denomination, take as usize));
        }
        Ok(change)
    }

    /// Decrements a count. Going below zero is a programming defect.
    fn remove(&mut self, denomination: Denomination, n: u32) {
        let count = self.counts.entry(denomination).or_insert(0);
        *count = count
            .checked_sub(n)
            .expect("Invariant violated: till count would go negative");
    }
}

/// A shared till of denominations.
#[derive(Debug)]
pub struct Till {
    order: Vec<Denomination>,
    inventory: Mutex<Inventory>,
}

impl Till {
    /// Creates a till with `stock` and a change-making `order`.
    ///
    /// `order` must be strictly largest first. Denominations in `order`
    /// without stock start at zero.
    ///
    /// # Errors
    ///
    /// - [`TillError::DuplicateDenomination`] - `order` repeats a denomination.
    /// - [`TillError::InvalidOrder`] - `order` is not largest first.
    /// - [`TillError::InvalidDenomination`] - `stock` holds a denomination missing from `order`.
    pub fn new(
        stock: impl IntoIterator<Item = (Denomination, u32)>,
        order: Vec<Denomination>,
    ) -> Result<Self, TillError> {
        let mut inventory = Inventory::new(&order);
        if inventory.counts.len() != order.len() {
            let duplicate = order
                .iter()
                .enumerate()
                .find(|(i, d)| order[..*i].contains(d))
                .map(|(_, &d)| d);
            if let Some(d) = duplicate {
                return Err(TillError::DuplicateDenomination(d));
            }
        }
        if let Some(pair) = order.windows(2).find(|pair| pair[0] < pair[1]) {
            return Err(TillError::InvalidOrder(pair[1]));
        }

        for (denomination, count) in stock {
            match inventory.counts.get_mut(&denomination) {
                Some(slot) => *slot = count,
                None => return Err(TillError::InvalidDenomination(denomination.value())),
            }
        }
        inventory.assert_invariants(&order);

        Ok(Self {
            order,
            inventory: Mutex::new(inventory),
        })
    }

    /// Creates a till using [`CANONICAL_ORDER`].
    pub fn with_canonical_order(
        stock: impl IntoIterator<Item = (Denomination, u32)>,
    ) -> Result<Self, TillError> {
        Self::new(stock, CANONICAL_ORDER.to_vec())
    }

    /// Creates a till holding `count` of every canonical denomination.
    pub fn stocked(count: u32) -> Self {
        let inventory = Inventory {
            counts: CANONICAL_ORDER.iter().map(|&d| (d, count)).collect(),
        };
        Self {
            order: CANONICAL_ORDER.to_vec(),
            inventory: Mutex::new(inventory),
        }
    }

    /// Adds `units` to the stock.
    ///
    /// # Errors
    ///
    /// [`TillError::InvalidDenomination`] if any unit is not in the till order.
    /// Nothing is deposited in that case.
    pub fn deposit(&self, units: &[Denomination]) -> Result<(), TillError> {
        let mut inventory = self.inventory.lock();
        inventory.deposit(units)?;
        inventory.assert_invariants(&self.order);
        debug!(units = units.len(), "deposited into till");
        Ok(())
    }

    /// Withdraws units summing exactly to `amount`, largest denominations first.
    ///
    /// A zero amount yields no units. The withdrawal is all-or-nothing.
    ///
    /// # Errors
    ///
    /// - [`TillError::InvalidAmount`] - `amount` is negative.
    /// - [`TillError::NoExactChange`] - greedy selection cannot reach `amount` with current stock.
    pub fn withdraw(&self, amount: i64) -> Result<Vec<Denomination>, TillError> {
        let mut inventory = self.inventory.lock();
        let change = inventory.withdraw(&self.order, amount)?;
        inventory.assert_invariants(&self.order);
        debug!(amount, units = change.len(), "withdrew from till");
        Ok(change)
    }

    /// Deposits `inserted` and withdraws `change` under a single lock.
    ///
    /// If the withdrawal fails the deposit is reversed before the lock is
    /// released, so no other caller sees the inserted units.
    pub fn exchange(
        &self,
        inserted: &[Denomination],
        change: i64,
    ) -> Result<Vec<Denomination>, TillError> {
        let mut inventory = self.inventory.lock();
        inventory.deposit(inserted)?;
        match inventory.withdraw(&self.order, change) {
            Ok(units) => {
                inventory.assert_invariants(&self.order);
                debug!(
                    inserted = inserted.len(),
                    change,
                    units = units.len(),
                    "exchanged at till"
                );
                Ok(units)
            }
            Err(e) => {
                for &unit in inserted {
                    inventory.remove(unit, 1);
                }
                inventory.assert_invariants(&self.order);
                Err(e)
            }
        }
    }

    /// Change-making order, largest first.
    pub fn ordered_denominations(&self) -> &[Denomination] {
        &self.order
    }

    /// Units of `denomination` currently held.
    pub fn count(&self, denomination: Denomination) -> u32 {
        self.inventory.lock().count(denomination)
    }

    /// Snapshot of every count.
    pub fn inventory(&self) -> BTreeMap<Denomination, u32> {
        self.inventory
            .lock()
            .counts
            .iter()
            .map(|(&d, &n)| (d, n))
            .collect()
    }

    /// Total value held, in minor units.
    pub fn total_value(&self) -> i64 {
        self.inventory.lock().total_value()
    }
}

impl Register for Till {
    fn deposit(&self, units: &[Denomination]) -> Result<(), TillError> {
        Till::deposit(self, units)
    }

    fn withdraw(&self, amount: i64) -> Result<Vec<Denomination>, TillError> {
        Till::withdraw(self, amount)
    }

    fn ordered_denominations(&self) -> &[Denomination] {
        Till::ordered_denominations(self)
    }
}

impl Serialize for Till {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let inventory = self.inventory.lock();
        let mut state = serializer.serialize_map(Some(self.order.len() + 1))?;
        for denomination in &self.order {
            state.serialize_entry(&denomination.to_string(), &inventory.count(*denomination))?;
        }
        state.serialize_entry("total", &Decimal::new(inventory.total_value(), 2))?;
        state.end()
    }
}
