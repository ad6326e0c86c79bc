//! Wallet ledger.
//!
//! Keeps every wallet transaction and the per-user balance derived from the
//! approved ones. User requests always start `pending`; system entries
//! (tournament payments, winnings) are recorded already settled through
//! [`Ledger::record_settled_transaction`], which needs a [`SettlementToken`].

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};

use crate::Amount;
use crate::model::{TournamentId, TransactionStatus, TransactionType, TxId, UserId, WalletTransaction};

mod state;
pub use state::WalletBalance;

mod error;
pub use error::LedgerError;

/// Capability for writing already-approved ledger entries.
///
/// Only code inside this crate can mint one, so callers outside it can only
/// create pending requests.
#[derive(Debug, Clone, Copy)]
pub struct SettlementToken(());

impl SettlementToken {
    pub(crate) fn issue() -> Self {
        SettlementToken(())
    }
}

/// Fields supplied when writing a new ledger entry.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub transaction_type: TransactionType,
    pub amount: Amount,
    pub payment_method: String,
    pub transaction_reference: Option<String>,
    pub admin_notes: Option<String>,
}

/// Where a withdrawal is paid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub upi_id: String,
    pub name: String,
    pub mobile: String,
}

impl Payout {
    /// Notes stored on the withdrawal for the operator who pays it out.
    pub fn notes(&self) -> Result<String, LedgerError> {
        let field = |value: &str, name: &'static str| {
            let value = value.trim();
            if value.is_empty() {
                Err(LedgerError::MissingDetail(name))
            } else {
                Ok(value.to_string())
            }
        };
        let upi_id = field(&self.upi_id, "upi id")?;
        let name = field(&self.name, "name")?;
        let mobile = field(&self.mobile, "mobile")?;
        Ok(format!("UPI ID: {upi_id}, Name: {name}, Mobile: {mobile}"))
    }
}

/// Outcome chosen by an operator for a pending transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn status(self) -> TransactionStatus {
        match self {
            Decision::Approve => TransactionStatus::Approved,
            Decision::Reject => TransactionStatus::Rejected,
        }
    }
}

#[derive(Debug, Default)]
pub struct Ledger {
    balances: HashMap<UserId, WalletBalance>,
    transactions: BTreeMap<TxId, WalletTransaction>,
    next_tx: TxId,
}

/// Public API
impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance for `user`; `None` until the user's first transaction.
    pub fn get_balance(&self, user: UserId) -> Option<&WalletBalance> {
        self.balances.get(&user)
    }

    pub fn balances(&self) -> impl Iterator<Item = &WalletBalance> + '_ {
        self.balances.values()
    }

    pub fn get_transaction(&self, id: TxId) -> Option<&WalletTransaction> {
        self.transactions.get(&id)
    }

    /// Transactions of one user, newest first.
    pub fn list_transactions(&self, user: UserId) -> Vec<&WalletTransaction> {
        self.transactions
            .values()
            .rev()
            .filter(|tx| tx.user_id == user)
            .collect()
    }

    /// Every transaction, newest first.
    pub fn all_transactions(&self) -> impl Iterator<Item = &WalletTransaction> + '_ {
        self.transactions.values().rev()
    }

    /// Record a user's deposit or withdrawal request in the `pending` state.
    ///
    /// A withdrawal request may not exceed the current available balance.
    pub fn request_transaction(
        &mut self,
        new: NewTransaction,
    ) -> Result<&WalletTransaction, LedgerError> {
        Self::ensure_positive(new.amount)?;

        if new.transaction_type == TransactionType::Withdrawal {
            self.ensure_can_spend(new.user_id, new.amount)?;
        }

        let now = Utc::now();
        let balance = self
            .balances
            .entry(new.user_id)
            .or_insert_with(|| WalletBalance::new(new.user_id, now));
        if new.transaction_type == TransactionType::Withdrawal {
            balance.hold_pending(new.amount, now)?;
        }

        Ok(self.insert(new, TransactionStatus::Pending))
    }

    /// Record a system entry directly as `approved` and apply it to the balance.
    pub fn record_settled_transaction(
        &mut self,
        _token: SettlementToken,
        new: NewTransaction,
    ) -> Result<&WalletTransaction, LedgerError> {
        Self::ensure_positive(new.amount)?;

        if new.transaction_type == TransactionType::Withdrawal {
            self.ensure_can_spend(new.user_id, new.amount)?;
        }

        let now = Utc::now();
        let balance = self
            .balances
            .entry(new.user_id)
            .or_insert_with(|| WalletBalance::new(new.user_id, now));
        match new.transaction_type {
            TransactionType::Deposit => balance.credit(new.amount, now)?,
            TransactionType::Withdrawal => balance.debit(new.amount, now)?,
        }

        Ok(self.insert(new, TransactionStatus::Approved))
    }

    /// Move a pending transaction to `approved` or `rejected`:
    /// - Ensure the transaction exists and is still pending
    /// - On an approved withdrawal, ensure the balance still covers it
    /// - Apply the balance change (approval only) and release any pending hold
    /// - Store the operator and notes
    pub fn resolve_transaction(
        &mut self,
        id: TxId,
        decision: Decision,
        notes: Option<String>,
        resolved_by: UserId,
    ) -> Result<&WalletTransaction, LedgerError> {
        let tx = self
            .transactions
            .get(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;

        if tx.status.is_final() {
            return Err(LedgerError::NotPending(id, tx.status));
        }

        let (user, kind, amount) = (tx.user_id, tx.transaction_type, tx.amount);
        if decision == Decision::Approve && kind == TransactionType::Withdrawal {
            self.ensure_can_spend(user, amount)?;
        }

        let now = Utc::now();
        let balance = self
            .balances
            .entry(user)
            .or_insert_with(|| WalletBalance::new(user, now));
        // applied to a copy so a failed step leaves the balance unchanged
        let mut next = balance.clone();
        if kind == TransactionType::Withdrawal {
            next.release_pending(amount, now)?;
        }
        if decision == Decision::Approve {
            match kind {
                TransactionType::Deposit => next.credit(amount, now)?,
                TransactionType::Withdrawal => next.debit(amount, now)?,
            }
        }
        *balance = next;

        let tx = self
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        tx.status = decision.status();
        if notes.is_some() {
            tx.admin_notes = notes;
        }
        tx.approved_by = Some(resolved_by);
        tx.approved_at = (decision == Decision::Approve).then_some(now);
        tx.updated_at = now;

        Ok(&*tx)
    }

    /// Pay a tournament entry fee from the wallet.
    ///
    /// The balance check and the debit happen under the same `&mut self`, so two
    /// payments can never both pass the check against the same funds.
    pub fn pay_with_wallet(
        &mut self,
        user: UserId,
        amount: Amount,
        tournament: TournamentId,
        tournament_name: &str,
    ) -> Result<&WalletTransaction, LedgerError> {
        self.record_settled_transaction(
            SettlementToken::issue(),
            NewTransaction {
                user_id: user,
                transaction_type: TransactionType::Withdrawal,
                amount,
                payment_method: "wallet".to_string(),
                transaction_reference: Some(format!("tournament_{tournament}")),
                admin_notes: Some(format!("Tournament: {tournament_name}")),
            },
        )
    }
}

/// Private API
impl Ledger {
    fn ensure_positive(amount: Amount) -> Result<(), LedgerError> {
        if amount.is_positive() {
            Ok(())
        } else {
            Err(LedgerError::InvalidAmount(amount))
        }
    }

    fn ensure_can_spend(&self, user: UserId, amount: Amount) -> Result<(), LedgerError> {
        let available = self
            .balances
            .get(&user)
            .map(|b| b.available_balance)
            .unwrap_or_default();
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                user,
                available,
                required: amount,
            });
        }
        Ok(())
    }

    fn insert(&mut self, new: NewTransaction, status: TransactionStatus) -> &WalletTransaction {
        self.next_tx += 1;
        let id = self.next_tx;
        let now = Utc::now();
        let tx = WalletTransaction {
            id,
            user_id: new.user_id,
            transaction_type: new.transaction_type,
            amount: new.amount,
            status,
            payment_method: new.payment_method,
            transaction_reference: new.transaction_reference,
            admin_notes: new.admin_notes,
            approved_by: None,
            approved_at: (status == TransactionStatus::Approved).then_some(now),
            created_at: now,
            updated_at: now,
        };
        self.transactions.entry(id).or_insert(tx)
    }
}
