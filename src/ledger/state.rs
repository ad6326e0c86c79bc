use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LedgerError;
use crate::Amount;
use crate::model::UserId;

/// Per-user wallet summary.
///
/// Only approved transactions move `available_balance` and the totals, so
/// `available_balance == total_deposited - total_withdrawn` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub user_id: UserId,
    pub available_balance: Amount,
    /// Sum of withdrawal requests still awaiting a decision.
    pub pending_balance: Amount,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletBalance {
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            available_balance: Amount::ZERO,
            pending_balance: Amount::ZERO,
            total_deposited: Amount::ZERO,
            total_withdrawn: Amount::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_spend(&self, amount: Amount) -> bool {
        self.available_balance >= amount
    }

    pub(super) fn credit(
        &mut self,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let available = self.checked(self.available_balance.checked_add(amount))?;
        let deposited = self.checked(self.total_deposited.checked_add(amount))?;
        self.available_balance = available;
        self.total_deposited = deposited;
        self.updated_at = now;
        Ok(())
    }

    /// Callers check [`can_spend`](Self::can_spend) first.
    pub(super) fn debit(
        &mut self,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let available = self.checked(self.available_balance.checked_sub(amount))?;
        let withdrawn = self.checked(self.total_withdrawn.checked_add(amount))?;
        self.available_balance = available;
        self.total_withdrawn = withdrawn;
        self.updated_at = now;
        Ok(())
    }

    pub(super) fn hold_pending(
        &mut self,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.pending_balance = self.checked(self.pending_balance.checked_add(amount))?;
        self.updated_at = now;
        Ok(())
    }

    pub(super) fn release_pending(
        &mut self,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.pending_balance = self.checked(self.pending_balance.checked_sub(amount))?;
        self.updated_at = now;
        Ok(())
    }

    fn checked(&self, value: Option<Amount>) -> Result<Amount, LedgerError> {
        value.ok_or(LedgerError::BalanceOverflow(self.user_id))
    }
}
