use crate::error::ActionError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free token balances of a holder, keyed by token symbol.
///
/// Every mutation goes through [`credit`](Self::credit) or
/// [`debit`](Self::debit); a debit that would drive a balance below zero is
/// rejected and leaves the snapshot untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BalanceSnapshot(BTreeMap<String, Decimal>);

impl BalanceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from `(symbol, amount)` pairs.
    ///
    /// # Errors
    /// Returns `InvalidAmount` if any amount is negative.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, ActionError>
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        let mut snapshot = Self::new();
        for (symbol, amount) in entries {
            snapshot.credit(symbol, amount)?;
        }
        Ok(snapshot)
    }

    /// Balance for `symbol`, zero if the holder never held it.
    pub fn get(&self, symbol: &str) -> Decimal {
        self.0.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    /// Checks that `amount` of `symbol` can be spent.
    ///
    /// # Errors
    /// `InvalidAmount` for non-positive amounts, `InsufficientBalance` when
    /// the balance is lower than `amount`.
    pub fn ensure_available(&self, symbol: &str, amount: Decimal) -> Result<(), ActionError> {
        if amount <= Decimal::ZERO {
            return Err(ActionError::InvalidAmount { amount });
        }
        let available = self.get(symbol);
        if amount > available {
            return Err(ActionError::InsufficientBalance {
                token: symbol.to_string(),
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    /// Adds `amount` and returns the new balance.
    ///
    /// # Errors
    /// `InvalidAmount` if `amount` is negative or the sum overflows.
    pub fn credit(&mut self, symbol: impl Into<String>, amount: Decimal) -> Result<Decimal, ActionError> {
        if amount < Decimal::ZERO {
            return Err(ActionError::InvalidAmount { amount });
        }
        let entry = self.0.entry(symbol.into()).or_insert(Decimal::ZERO);
        *entry = entry
            .checked_add(amount)
            .ok_or(ActionError::InvalidAmount { amount })?;
        Ok(*entry)
    }

    /// Removes `amount` and returns the new balance.
    ///
    /// # Errors
    /// See [`ensure_available`](Self::ensure_available).
    pub fn debit(&mut self, symbol: &str, amount: Decimal) -> Result<Decimal, ActionError> {
        self.ensure_available(symbol, amount)?;
        let entry = self.0.entry(symbol.to_string()).or_insert(Decimal::ZERO);
        *entry = entry
            .checked_sub(amount)
            .ok_or(ActionError::InvalidAmount { amount })?;
        Ok(*entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(symbol, amount)| (symbol.as_str(), *amount))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|amount| amount.is_zero())
    }
}
