//! Nullable token bank: in-memory fungible balances for testing.

use multirewards_store::{TokenBank, TokenError, Transfer};
use multirewards_types::Address;
use std::collections::HashMap;

/// An in-memory [`TokenBank`] holding balances per (token, holder).
///
/// Batches are staged and applied only if every transfer succeeds. A failure
/// can be injected with [`NullTokenBank::fail_next`].
#[derive(Debug, Default)]
pub struct NullTokenBank {
    balances: HashMap<(Address, Address), u128>,
    history: Vec<Transfer>,
    injected: Option<TokenError>,
}

impl NullTokenBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create tokens out of thin air.
    pub fn mint(&mut self, token: Address, holder: Address, amount: u128) {
        let balance = self.balances.entry((token, holder)).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Destroy tokens, saturating at zero.
    pub fn burn(&mut self, token: Address, holder: Address, amount: u128) {
        let balance = self.balances.entry((token, holder)).or_insert(0);
        *balance = balance.saturating_sub(amount);
    }

    pub fn balance(&self, token: &Address, holder: &Address) -> u128 {
        self.balances.get(&(*token, *holder)).copied().unwrap_or(0)
    }

    /// Sum of every holder's balance in `token`.
    pub fn supply(&self, token: &Address) -> u128 {
        self.balances
            .iter()
            .filter(|((t, _), _)| t == token)
            .map(|(_, b)| *b)
            .sum()
    }

    /// Every transfer applied so far, in order.
    pub fn history(&self) -> &[Transfer] {
        &self.history
    }

    /// Make the next [`TokenBank::execute`] call fail with `error`.
    pub fn fail_next(&mut self, error: TokenError) {
        self.injected = Some(error);
    }
}

impl TokenBank for NullTokenBank {
    fn balance_of(&self, token: &Address, holder: &Address) -> Result<u128, TokenError> {
        Ok(self.balance(token, holder))
    }

    fn execute(&mut self, transfers: &[Transfer]) -> Result<(), TokenError> {
        if let Some(error) = self.injected.take() {
            return Err(error);
        }

        let mut staged: HashMap<(Address, Address), u128> = HashMap::new();
        for t in transfers {
            let from_key = (t.token, t.from);
            let available = staged
                .get(&from_key)
                .copied()
                .unwrap_or_else(|| self.balance(&t.token, &t.from));
            let remaining = available
                .checked_sub(t.amount)
                .ok_or(TokenError::InsufficientFunds {
                    token: t.token,
                    holder: t.from,
                    needed: t.amount,
                    available,
                })?;
            staged.insert(from_key, remaining);

            let to_key = (t.token, t.to);
            let current = staged
                .get(&to_key)
                .copied()
                .unwrap_or_else(|| self.balance(&t.token, &t.to));
            let credited = current
                .checked_add(t.amount)
                .ok_or(TokenError::Overflow { holder: t.to })?;
            staged.insert(to_key, credited);
        }

        self.balances.extend(staged);
        self.history.extend_from_slice(transfers);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    #[test]
    fn test_batch_moves_funds() {
        let mut bank = NullTokenBank::new();
        bank.mint(addr(1), addr(10), 100);
        bank.execute(&[
            Transfer::new(addr(1), addr(10), addr(11), 60),
            Transfer::new(addr(1), addr(11), addr(12), 25),
        ])
        .unwrap();
        assert_eq!(bank.balance(&addr(1), &addr(10)), 40);
        assert_eq!(bank.balance(&addr(1), &addr(11)), 35);
        assert_eq!(bank.balance(&addr(1), &addr(12)), 25);
        assert_eq!(bank.supply(&addr(1)), 100);
        assert_eq!(bank.history().len(), 2);
    }

    #[test]
    fn test_failed_batch_changes_nothing() {
        let mut bank = NullTokenBank::new();
        bank.mint(addr(1), addr(10), 100);
        let result = bank.execute(&[
            Transfer::new(addr(1), addr(10), addr(11), 60),
            Transfer::new(addr(1), addr(10), addr(11), 60),
        ]);
        match result {
            Err(TokenError::InsufficientFunds { needed, available, .. }) => {
                assert_eq!(needed, 60);
                assert_eq!(available, 40);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
        assert_eq!(bank.balance(&addr(1), &addr(10)), 100);
        assert_eq!(bank.balance(&addr(1), &addr(11)), 0);
        assert!(bank.history().is_empty());
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let mut bank = NullTokenBank::new();
        bank.mint(addr(1), addr(10), 5);
        bank.fail_next(TokenError::Rejected("paused token".into()));
        let transfer = [Transfer::new(addr(1), addr(10), addr(11), 5)];
        assert!(matches!(
            bank.execute(&transfer),
            Err(TokenError::Rejected(_))
        ));
        bank.execute(&transfer).unwrap();
        assert_eq!(bank.balance(&addr(1), &addr(11)), 5);
    }

    #[test]
    fn test_zero_transfer_is_allowed() {
        let mut bank = NullTokenBank::new();
        bank.execute(&[Transfer::new(addr(1), addr(10), addr(11), 0)])
            .unwrap();
        assert_eq!(bank.balance(&addr(1), &addr(11)), 0);
    }
}
