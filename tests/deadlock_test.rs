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


//! Deadlock detection tests using parking_lot's built-in deadlock detector.
//!
//! These tests hammer a shared till from many threads and verify that the
//! locking in deposit, withdraw, exchange and the settlement refund path
//! never forms a cycle.
//!
//! parking_lot's `deadlock_detection` feature is enabled for dev builds.

use parking_lot::deadlock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use till_demo_rs::denomination::*;
use till_demo_rs::{Till, TillError, settle, settle_atomic};

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150)); // Let detector thread exit
}

// === Tests ===

/// High contention on one till with raw deposits and withdrawals.
#[test]
fn no_deadlock_high_contention_deposit_withdraw() {
    let detector = start_deadlock_detector();
    let till = Arc::new(Till::stocked(100));

    const NUM_THREADS: usize = 50;
    const OPS_PER_THREAD: usize = 100;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for _ in 0..NUM_THREADS {
        let till = till.clone();

        let handle = thread::spawn(move || {
            let mut net = 0i64;
            for i in 0..OPS_PER_THREAD {
                match i % 3 {
                    0 => {
                        till.deposit(&[ONE]).unwrap();
                        net += 100;
                    }
                    1 => {
                        if let Ok(units) = till.withdraw(100) {
                            net -= total(&units);
                        }
                    }
                    _ => {
                        // Read operations
                        let _ = till.count(ONE);
                        let _ = till.total_value();
                        let _ = till.inventory();
                    }
                }
            }
            net
        });

        handles.push(handle);
    }

    let net: i64 = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .sum();

    stop_deadlock_detector(detector);

    assert_eq!(till.total_value(), Till::stocked(100).total_value() + net);
    println!(
        "High contention test passed: {} threads × {} ops",
        NUM_THREADS, OPS_PER_THREAD
    );
}

/// Settlements that frequently hit the refund path under contention.
#[test]
fn no_deadlock_refund_path() {
    let detector = start_deadlock_detector();
    // No small units: most change cannot be made and gets refunded.
    let till = Arc::new(Till::with_canonical_order([(TWENTY, 50), (TEN, 50)]).unwrap());
    let start_value = till.total_value();

    const NUM_THREADS: usize = 20;
    const SALES_PER_THREAD: usize = 100;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for thread_id in 0..NUM_THREADS {
        let till = till.clone();

        let handle = thread::spawn(move || {
            let mut kept = 0i64;
            for i in 0..SALES_PER_THREAD {
                let owed = if (thread_id + i) % 2 == 0 { 1000 } else { 1 };
                let inserted = [TWENTY];
                let returned = match settle(till.as_ref(), owed, &inserted) {
                    Ok(change) => change,
                    Err(TillError::RegisterEmpty { refunded }) => refunded,
                    Err(TillError::RefundFailed { refunded, .. }) => refunded,
                    Err(e) => panic!("unexpected error: {e}"),
                };
                kept += total(&inserted) - total(&returned);
            }
            kept
        });

        handles.push(handle);
    }

    let kept: i64 = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .sum();

    stop_deadlock_detector(detector);

    assert_eq!(till.total_value(), start_value + kept);
}

/// Two-phase and atomic settlements mixed with readers and serialization.
#[test]
fn no_deadlock_mixed_operations() {
    let detector = start_deadlock_detector();
    let till = Arc::new(Till::stocked(200));

    const NUM_THREADS: usize = 100;
    const OPS_PER_THREAD: usize = 50;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for thread_id in 0..NUM_THREADS {
        let till = till.clone();

        let handle = thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                match (thread_id + i) % 5 {
                    0 => {
                        let _ = settle(till.as_ref(), 1250, &[TWENTY]);
                    }
                    1 => {
                        let _ = settle_atomic(&till, 30, &[FIFTY_CENTS]);
                    }
                    2 => {
                        let _ = till.exchange(&[FIVE], 300);
                    }
                    3 => {
                        let _ = serde_json::to_string(till.as_ref()).unwrap();
                    }
                    _ => {
                        let _ = till.ordered_denominations();
                        let _ = till.inventory();
                    }
                }
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    println!(
        "Mixed operations test passed: {} threads, till total {}",
        NUM_THREADS,
        till.total_value()
    );
}

/// Concurrent settlements while a thread keeps emptying and restocking the till.
#[test]
fn no_deadlock_restock_during_settlement() {
    let detector = start_deadlock_detector();
    let till = Arc::new(Till::stocked(10));
    let running = Arc::new(AtomicBool::new(true));

    let mut handles = Vec::new();

    // Restocker
    {
        let till = till.clone();
        let running = running.clone();
        handles.push(thread::spawn(move || {
            let mut rounds = 0;
            while running.load(Ordering::SeqCst) && rounds < 200 {
                let _ = till.withdraw(till.total_value() / 2);
                till.deposit(&CANONICAL_ORDER).unwrap();
                rounds += 1;
                thread::yield_now();
            }
        }));
    }

    for _ in 0..8 {
        let till = till.clone();
        let running = running.clone();
        handles.push(thread::spawn(move || {
            let mut sales = 0;
            while running.load(Ordering::SeqCst) && sales < 200 {
                let _ = settle(till.as_ref(), 880, &[TEN]);
                sales += 1;
                thread::yield_now();
            }
        }));
    }

    thread::sleep(Duration::from_millis(500));
    running.store(false, Ordering::SeqCst);

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    println!("Restock test passed: till total {}", till.total_value());
}
