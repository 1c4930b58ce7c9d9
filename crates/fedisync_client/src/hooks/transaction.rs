//! Multi-kind transactions.

use fedisync_store::{EntitiesTransaction, Store};

/// Applies [`EntitiesTransaction`]s to the store.
///
/// A transaction touches several kinds as one state change: readers see
/// either none of it or all of it.
#[derive(Debug, Clone)]
pub struct TransactionHook {
    store: Store,
}

impl TransactionHook {
    pub(crate) fn new(store: Store) -> Self {
        Self { store }
    }

    /// Applies `txn`. Returns how many entities were updated; ids missing
    /// from the store are skipped.
    pub fn entities_transaction(&self, txn: EntitiesTransaction) -> usize {
        self.store.entities_transaction(txn)
    }
}
