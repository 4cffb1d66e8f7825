use serde::{Deserialize, Serialize};

use super::{Cents, Transaction};

/// Balance implied by a transaction history, starting from zero.
pub fn balance_from_history(transactions: &[Transaction]) -> Cents {
    transactions.iter().map(Transaction::signed_amount).sum()
}

/// Outcome of replaying an account's journal against its stored balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconciliation {
    pub account_number: String,
    pub stored_balance: Cents,
    pub replayed_balance: Cents,
    pub transaction_count: usize,
    /// Sequence numbers whose `balance_after` does not follow from the entries before them.
    pub broken_links: Vec<i64>,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.stored_balance == self.replayed_balance && self.broken_links.is_empty()
    }
}

/// Replay a journal and compare it with the stored balance.
///
/// `transactions` may come in any order; they are replayed by sequence.
pub fn reconcile(
    account_number: &str,
    stored_balance: Cents,
    transactions: &[Transaction],
) -> Reconciliation {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|t| t.sequence);

    let mut running: Cents = 0;
    let mut broken_links = Vec::new();
    for entry in ordered {
        running += entry.signed_amount();
        if entry.balance_after != running {
            broken_links.push(entry.sequence);
            // Resync so a single bad entry is reported once.
            running = entry.balance_after;
        }
    }

    Reconciliation {
        account_number: account_number.to_string(),
        stored_balance,
        replayed_balance: balance_from_history(transactions),
        transaction_count: transactions.len(),
        broken_links,
    }
}
