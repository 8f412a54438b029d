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

//! Settlement of a single sale against a till.
//!
//! A settlement checks that the inserted units cover the amount owed, moves them
//! into the till and takes the change back out.
//!
//! # Outcomes
//!
//! | Result | Till afterwards |
//! |--------|-----------------|
//! | change returned | inserted units kept, change removed |
//! | [`TillError::InsufficientFunds`] | untouched |
//! | [`TillError::RegisterEmpty`] | inserted units handed back |
//! | [`TillError::RefundFailed`] | some inserted units could not be handed back |
//!
//! # Concurrency
//!
//! [`settle`] issues separate deposit and withdraw calls, each atomic on its own.
//! A concurrent settlement may draw on this sale's deposit before the change is
//! taken; the till is one fungible pool, so only per-denomination counts are
//! guaranteed. [`settle_atomic`] closes that window with [`Till::exchange`].

use crate::TillError;
use crate::denomination::{self, Denomination};
use crate::till::{Register, Till};
use std::collections::BTreeMap;
use tracing::{error, info, info_span, warn};

/// Settles a sale of `owed` minor units paid with `inserted`.
///
/// Returns the change, largest denominations first.
///
/// # Errors
///
/// - [`TillError::InvalidAmount`] - `owed` is negative.
/// - [`TillError::InsufficientFunds`] - `inserted` is worth less than `owed`.
/// - [`TillError::InvalidDenomination`] - the till does not take one of the inserted units.
/// - [`TillError::RegisterEmpty`] - the till cannot make the change; inserted units were refunded.
/// - [`TillError::RefundFailed`] - the till cannot make the change and the refund came up short.
pub fn settle<R>(
    register: &R,
    owed: i64,
    inserted: &[Denomination],
) -> Result<Vec<Denomination>, TillError>
where
    R: Register + ?Sized,
{
    let inserted_total = check_payment(owed, inserted)?;
    let span = info_span!("settle", owed, inserted = inserted_total);
    let _guard = span.enter();

    register.deposit(inserted)?;

    let change = inserted_total - owed;
    match register.withdraw(change) {
        Ok(units) => {
            info!(change, units = units.len(), "settled");
            Ok(units)
        }
        Err(TillError::NoExactChange { .. }) => Err(refund(register, inserted)),
        Err(e) => Err(e),
    }
}

/// Same contract as [`settle`], but the deposit and the change come out of one
/// [`Till::exchange`] call. Never fails with [`TillError::RefundFailed`].
pub fn settle_atomic(
    till: &Till,
    owed: i64,
    inserted: &[Denomination],
) -> Result<Vec<Denomination>, TillError> {
    let inserted_total = check_payment(owed, inserted)?;
    let span = info_span!("settle_atomic", owed, inserted = inserted_total);
    let _guard = span.enter();

    let change = inserted_total - owed;
    match till.exchange(inserted, change) {
        Ok(units) => {
            info!(change, units = units.len(), "settled");
            Ok(units)
        }
        Err(TillError::NoExactChange { .. }) => {
            warn!(change, "register cannot make change, returning inserted units");
            Err(TillError::RegisterEmpty {
                refunded: inserted.to_vec(),
            })
        }
        Err(e) => Err(e),
    }
}

/// Groups change into a count per denomination.
pub fn change_breakdown(units: &[Denomination]) -> BTreeMap<Denomination, u32> {
    let mut breakdown = BTreeMap::new();
    for &unit in units {
        *breakdown.entry(unit).or_insert(0) += 1;
    }
    breakdown
}

/// Validates the amounts and returns the inserted total. Touches no till.
fn check_payment(owed: i64, inserted: &[Denomination]) -> Result<i64, TillError> {
    if owed < 0 {
        return Err(TillError::InvalidAmount(owed));
    }
    let inserted_total = inserted
        .iter()
        .try_fold(0i64, |acc, d| acc.checked_add(i64::from(d.value())))
        .ok_or(TillError::InvalidAmount(i64::MAX))?;
    debug_assert_eq!(inserted_total, denomination::total(inserted));

    if inserted_total < owed {
        return Err(TillError::InsufficientFunds {
            owed,
            inserted: inserted_total,
        });
    }
    Ok(inserted_total)
}

/// Withdraws each inserted unit back out, one call per unit.
///
/// Till orders are largest first, so each call takes back the unit itself
/// unless another caller has drawn it down.
fn refund<R>(register: &R, inserted: &[Denomination]) -> TillError
where
    R: Register + ?Sized,
{
    let mut refunded = Vec::with_capacity(inserted.len());
    let mut unreturned = Vec::new();

    for &unit in inserted {
        match register.withdraw(i64::from(unit.value())) {
            Ok(units) => refunded.extend(units),
            Err(_) => unreturned.push(unit),
        }
    }

    if unreturned.is_empty() {
        warn!(
            refunded = refunded.len(),
            "register cannot make change, inserted units refunded"
        );
        TillError::RegisterEmpty { refunded }
    } else {
        error!(
            refunded = refunded.len(),
            unreturned = unreturned.len(),
            "refund came up short, till changed during settlement"
        );
        TillError::RefundFailed {
            refunded,
            unreturned,
        }
    }
}
