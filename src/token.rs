//! Token capabilities the engine consumes.
//!
//! The engine never keeps its own supply counter; it reads
//! [`PricedAsset::total_supply`] before every computation and instructs mints
//! and burns as a side effect of a trade.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use parking_lot::Mutex;

use crate::error::TokenError;

pub trait Token: Send + Sync {
    fn address(&self) -> Address;
    fn balance_of(&self, account: Address) -> U256;
}

/// The asset escrowed to back curve supply.
pub trait ReserveAsset: Token {
    fn transfer_from(&self, from: Address, to: Address, amount: U256) -> Result<(), TokenError>;

    /// Pays `amount` out of the engine's custody account.
    fn transfer(&self, to: Address, amount: U256) -> Result<(), TokenError>;
}

/// The asset whose supply the curve prices.
pub trait PricedAsset: Token {
    fn mint(&self, to: Address, amount: U256) -> Result<(), TokenError>;
    fn burn_from(&self, from: Address, amount: U256) -> Result<(), TokenError>;
    fn total_supply(&self) -> U256;
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<Address, U256>,
    total_supply: U256,
}

impl LedgerState {
    fn balance(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    fn debit(&mut self, account: Address, amount: U256) -> Result<(), TokenError> {
        let available = self.balance(account);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                account,
                needed: amount,
                available,
            });
        }
        self.balances.insert(account, available - amount);
        Ok(())
    }

    fn credit(&mut self, account: Address, amount: U256) -> Result<(), TokenError> {
        let balance = self
            .balance(account)
            .checked_add(amount)
            .ok_or_else(|| TokenError::Rejected("balance overflow".into()))?;
        self.balances.insert(account, balance);
        Ok(())
    }
}

/// In-process fungible ledger implementing both token capabilities.
///
/// `custodian` is the account [`ReserveAsset::transfer`] pays out of, i.e.
/// the engine's custody address when the token is used as the reserve.
#[derive(Debug)]
pub struct MemoryToken {
    address: Address,
    custodian: Address,
    state: Mutex<LedgerState>,
}

impl MemoryToken {
    pub fn new(address: Address, custodian: Address) -> Self {
        Self {
            address,
            custodian,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Creates `amount` new units for `account` (funding test and demo accounts).
    pub fn fund(&self, account: Address, amount: U256) -> Result<(), TokenError> {
        PricedAsset::mint(self, account, amount)
    }
}

impl Token for MemoryToken {
    fn address(&self) -> Address {
        self.address
    }

    fn balance_of(&self, account: Address) -> U256 {
        self.state.lock().balance(account)
    }
}

impl ReserveAsset for MemoryToken {
    fn transfer_from(&self, from: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        let mut state = self.state.lock();
        state.debit(from, amount)?;
        state.credit(to, amount)
    }

    fn transfer(&self, to: Address, amount: U256) -> Result<(), TokenError> {
        let mut state = self.state.lock();
        state.debit(self.custodian, amount)?;
        state.credit(to, amount)
    }
}

impl PricedAsset for MemoryToken {
    fn mint(&self, to: Address, amount: U256) -> Result<(), TokenError> {
        let mut state = self.state.lock();
        let total_supply = state
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| TokenError::Rejected("supply overflow".into()))?;
        state.credit(to, amount)?;
        state.total_supply = total_supply;
        Ok(())
    }

    fn burn_from(&self, from: Address, amount: U256) -> Result<(), TokenError> {
        let mut state = self.state.lock();
        state.debit(from, amount)?;
        state.total_supply -= amount;
        Ok(())
    }

    fn total_supply(&self) -> U256 {
        self.state.lock().total_supply
    }
}
