//! Stress helpers for concurrent store access.
//!
//! These check that readers never observe a half-applied transaction while
//! writers hammer the store from other threads.

use fedisync_store::{EntitiesTransaction, Entity, EntityKind, Position, Store};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Transactions committed.
    pub transactions: usize,
    /// Consistent reads performed.
    pub reads: usize,
    /// Reads that saw a torn transaction.
    pub torn_reads: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Returns true if no reader saw a torn transaction.
    pub fn is_consistent(&self) -> bool {
        self.torn_reads == 0
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Transactions: {}", self.transactions);
        println!("Reads: {}", self.reads);
        println!("Torn reads: {}", self.torn_reads);
        println!("Duration: {:?}", self.duration);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Transactions per writer thread.
    pub transactions: usize,
    /// Number of writer threads.
    pub writers: usize,
    /// Number of reader threads.
    pub readers: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            transactions: 2_000,
            writers: 2,
            readers: 4,
        }
    }
}

impl StressConfig {
    /// A configuration small enough for unit tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            transactions: 200,
            writers: 2,
            readers: 2,
        }
    }
}

/// Runs writers that bump a relationship and an account counter in one
/// transaction, while readers check that both always move together.
pub fn stress_transaction_atomicity(config: &StressConfig) -> StressTestResult {
    let store = Store::new();
    store.import_entities(
        [Entity::from_value(json!({"id": "1", "rev": 0})).expect("seed has an id")],
        EntityKind::RELATIONSHIPS,
        None,
        Position::End,
    );
    store.import_entities(
        [Entity::from_value(json!({"id": "1", "rev": 0})).expect("seed has an id")],
        EntityKind::ACCOUNTS,
        None,
        Position::End,
    );

    let done = Arc::new(AtomicBool::new(false));
    let reads = Arc::new(AtomicUsize::new(0));
    let torn = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let readers: Vec<_> = (0..config.readers)
        .map(|_| {
            let store = store.clone();
            let done = Arc::clone(&done);
            let reads = Arc::clone(&reads);
            let torn = Arc::clone(&torn);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    let (rel, account) = store.read(|view| {
                        let rev = |kind: &EntityKind| {
                            view.select_entity(kind, "1").and_then(|e| e.get_u64("rev"))
                        };
                        (rev(&EntityKind::RELATIONSHIPS), rev(&EntityKind::ACCOUNTS))
                    });
                    if rel != account {
                        torn.fetch_add(1, Ordering::Relaxed);
                    }
                    reads.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    let writers: Vec<_> = (0..config.writers)
        .map(|_| {
            let store = store.clone();
            let transactions = config.transactions;
            thread::spawn(move || {
                for _ in 0..transactions {
                    let rev = store
                        .select_entity(&EntityKind::ACCOUNTS, "1")
                        .and_then(|e| e.get_u64("rev"))
                        .unwrap_or(0);
                    let bump = move |e: &Entity| {
                        e.patched(|body| {
                            body.insert("rev".into(), json!(rev + 1));
                        })
                    };
                    let txn = EntitiesTransaction::new()
                        .update(EntityKind::RELATIONSHIPS, "1", bump)
                        .update(EntityKind::ACCOUNTS, "1", bump);
                    store.entities_transaction(txn);
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().expect("writer panicked");
    }
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().expect("reader panicked");
    }

    StressTestResult {
        transactions: config.transactions * config.writers,
        reads: reads.load(Ordering::Relaxed),
        torn_reads: torn.load(Ordering::Relaxed),
        duration: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transactions_are_never_torn() {
        let result = stress_transaction_atomicity(&StressConfig::quick());
        assert_eq!(result.transactions, 400);
        assert!(result.is_consistent(), "{result:?}");
    }
}
