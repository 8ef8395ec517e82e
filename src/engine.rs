//! Trade executor.
//!
//! [`CurveEngine`] owns the registry, the reserve custody and the audit sink.
//! Every mutating call resolves the asset to its slot, enters the slot's
//! critical section, validates and prices the trade, updates the reserve
//! ledger and only then calls out to the token collaborators. A collaborator
//! failure undoes the ledger update before the lock is released.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use alloy_primitives::{Address, U256};
use parking_lot::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::curve::CurveParams;
use crate::error::{CurveError, CurveResult, MathError, TokenError};
use crate::events::{
    CurveEvent, CurveInitialized, EmergencyWithdrawal, EventSink, OwnershipTransferred,
    TokensPurchased, TokensSold,
};
use crate::registry::{CurveHandle, CurveRegistry, CurveSlot};
use crate::solver::solve_buy;
use crate::token::{PricedAsset, ReserveAsset};

/// Marks the current thread as inside a trade until dropped.
struct TradeGuard<'a> {
    active: &'a Mutex<HashSet<ThreadId>>,
    thread: ThreadId,
}

impl<'a> TradeGuard<'a> {
    fn enter(active: &'a Mutex<HashSet<ThreadId>>) -> CurveResult<Self> {
        let thread = thread::current().id();
        if !active.lock().insert(thread) {
            warn!(?thread, "reentrant trade rejected");
            return Err(CurveError::ReentrantCall);
        }
        Ok(Self { active, thread })
    }
}

impl Drop for TradeGuard<'_> {
    fn drop(&mut self) {
        self.active.lock().remove(&self.thread);
    }
}

pub struct CurveEngine {
    owner: RwLock<Address>,
    custody: Address,
    search_ceiling: U256,
    reserve: Arc<dyn ReserveAsset>,
    registry: RwLock<CurveRegistry>,
    events: Arc<dyn EventSink>,
    active: Mutex<HashSet<ThreadId>>,
}

impl CurveEngine {
    /// Builds an engine around a reserve asset.
    ///
    /// `reserve` must pay [`ReserveAsset::transfer`] out of `config.custody`,
    /// the account buys are pulled into.
    pub fn new(
        config: EngineConfig,
        reserve: Arc<dyn ReserveAsset>,
        events: Arc<dyn EventSink>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        info!(
            owner = %config.owner,
            custody = %config.custody,
            reserve = %reserve.address(),
            search_ceiling = config.search_ceiling,
            "curve engine created"
        );

        Ok(Self {
            owner: RwLock::new(config.owner),
            custody: config.custody,
            search_ceiling: config.search_ceiling_units(),
            reserve,
            registry: RwLock::new(CurveRegistry::new()),
            events,
            active: Mutex::new(HashSet::new()),
        })
    }

    pub fn owner(&self) -> Address {
        *self.owner.read()
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn reserve_asset(&self) -> Address {
        self.reserve.address()
    }

    /// Search ceiling in supply units
    pub fn search_ceiling(&self) -> U256 {
        self.search_ceiling
    }

    /// Registers `asset` with the curve `price(s) = coefficient * s^exponent`.
    ///
    /// Owner only, once per asset. Parameters are validated before the
    /// registry is touched.
    pub fn initialize_curve(
        &self,
        caller: Address,
        asset: Arc<dyn PricedAsset>,
        coefficient: U256,
        exponent: U256,
    ) -> CurveResult<CurveHandle> {
        self.only_owner(caller)?;

        let address = asset.address();
        if self.registry.read().is_initialized(&address) {
            return Err(CurveError::CurveAlreadyInitialized(address));
        }
        let params = CurveParams::new(coefficient, exponent)?;
        let handle = self.registry.write().register(asset, params)?;

        info!(asset = %address, %coefficient, %exponent, handle = handle.index(), "curve initialized");
        self.events.emit(&CurveEvent::Initialized(CurveInitialized {
            asset: address,
            coefficient,
            exponent,
        }));

        Ok(handle)
    }

    /// Pays `reserve_amount` into the curve for `asset` and mints the
    /// resulting supply to `caller`. Returns the amount minted.
    pub fn buy(
        &self,
        caller: Address,
        asset: Address,
        reserve_amount: U256,
        min_asset_out: U256,
    ) -> CurveResult<U256> {
        let _guard = TradeGuard::enter(&self.active)?;
        if reserve_amount.is_zero() {
            return Err(CurveError::ZeroAmount);
        }

        let slot = self.slot(&asset)?;
        let reserve = slot.lock();

        let supply = slot.asset().total_supply();
        let solution = solve_buy(slot.params(), supply, reserve_amount, self.search_ceiling)?;
        let asset_out = solution.supply_delta;
        if asset_out < min_asset_out {
            return Err(CurveError::SlippageExceeded {
                minimum: min_asset_out,
                actual: asset_out,
            });
        }
        if asset_out.is_zero() {
            return Err(CurveError::ZeroOutput);
        }

        let previous = reserve.get();
        let updated = previous
            .checked_add(reserve_amount)
            .ok_or(MathError::Overflow)?;
        let new_supply = supply.checked_add(asset_out).ok_or(MathError::Overflow)?;

        reserve.set(updated);

        if let Err(err) = self.reserve.transfer_from(caller, self.custody, reserve_amount) {
            reserve.set(previous);
            warn!(%caller, %asset, %reserve_amount, %err, "reserve pull failed, buy rolled back");
            return Err(err.into());
        }
        if let Err(err) = slot.asset().mint(caller, asset_out) {
            reserve.set(previous);
            self.refund(caller, reserve_amount);
            warn!(%caller, %asset, %asset_out, %err, "mint failed, buy rolled back");
            return Err(err.into());
        }

        info!(
            %caller,
            %asset,
            %reserve_amount,
            %asset_out,
            %new_supply,
            iterations = solution.iterations,
            "tokens purchased"
        );
        self.events.emit(&CurveEvent::Purchased(TokensPurchased {
            buyer: caller,
            asset,
            reserve_amount,
            asset_amount: asset_out,
            new_supply,
        }));

        Ok(asset_out)
    }

    /// Burns `asset_amount` from `caller` and pays out the reserve it backed.
    /// Returns the reserve paid.
    pub fn sell(
        &self,
        caller: Address,
        asset: Address,
        asset_amount: U256,
        min_reserve_out: U256,
    ) -> CurveResult<U256> {
        let _guard = TradeGuard::enter(&self.active)?;
        if asset_amount.is_zero() {
            return Err(CurveError::ZeroAmount);
        }

        let slot = self.slot(&asset)?;
        let reserve = slot.lock();

        let supply = slot.asset().total_supply();
        let reserve_out = slot.params().sell_return(supply, asset_amount)?;

        let held = slot.asset().balance_of(caller);
        if held < asset_amount {
            return Err(TokenError::InsufficientBalance {
                account: caller,
                needed: asset_amount,
                available: held,
            }
            .into());
        }
        if reserve_out < min_reserve_out {
            return Err(CurveError::SlippageExceeded {
                minimum: min_reserve_out,
                actual: reserve_out,
            });
        }
        if reserve_out.is_zero() {
            return Err(CurveError::ZeroOutput);
        }

        let previous = reserve.get();
        if previous < reserve_out {
            error!(%asset, %previous, %reserve_out, "reserve ledger below curve integral");
            return Err(CurveError::InsufficientReserves {
                required: reserve_out,
                available: previous,
            });
        }
        let new_supply = supply - asset_amount;

        reserve.set(previous - reserve_out);

        if let Err(err) = slot.asset().burn_from(caller, asset_amount) {
            reserve.set(previous);
            warn!(%caller, %asset, %asset_amount, %err, "burn failed, sell rolled back");
            return Err(err.into());
        }
        if let Err(err) = self.reserve.transfer(caller, reserve_out) {
            reserve.set(previous);
            if let Err(remint) = slot.asset().mint(caller, asset_amount) {
                error!(%caller, %asset, %asset_amount, %remint, "failed to restore burned supply");
            }
            warn!(%caller, %asset, %reserve_out, %err, "payout failed, sell rolled back");
            return Err(err.into());
        }

        info!(%caller, %asset, %asset_amount, %reserve_out, %new_supply, "tokens sold");
        self.events.emit(&CurveEvent::Sold(TokensSold {
            seller: caller,
            asset,
            asset_amount,
            reserve_amount: reserve_out,
            new_supply,
        }));

        Ok(reserve_out)
    }

    /// Supply a buy of `reserve_amount` would mint right now.
    pub fn get_buy_quote(&self, asset: Address, reserve_amount: U256) -> CurveResult<U256> {
        if reserve_amount.is_zero() {
            return Err(CurveError::ZeroAmount);
        }
        let slot = self.slot(&asset)?;
        let _reserve = slot.lock();

        let supply = slot.asset().total_supply();
        let solution = solve_buy(slot.params(), supply, reserve_amount, self.search_ceiling)?;
        Ok(solution.supply_delta)
    }

    /// Reserve a sell of `asset_amount` would pay right now.
    pub fn get_sell_quote(&self, asset: Address, asset_amount: U256) -> CurveResult<U256> {
        if asset_amount.is_zero() {
            return Err(CurveError::ZeroAmount);
        }
        let slot = self.slot(&asset)?;
        let _reserve = slot.lock();

        slot.params().sell_return(slot.asset().total_supply(), asset_amount)
    }

    /// Reserve needed to mint exactly `asset_amount`, rounded up.
    pub fn get_buy_cost(&self, asset: Address, asset_amount: U256) -> CurveResult<U256> {
        if asset_amount.is_zero() {
            return Err(CurveError::ZeroAmount);
        }
        let slot = self.slot(&asset)?;
        let _reserve = slot.lock();

        slot.params().buy_cost(slot.asset().total_supply(), asset_amount)
    }

    /// Marginal price at the current supply.
    pub fn get_current_price(&self, asset: Address) -> CurveResult<U256> {
        let slot = self.slot(&asset)?;
        let _reserve = slot.lock();

        Ok(slot.params().marginal_price(slot.asset().total_supply())?)
    }

    pub fn is_curve_initialized(&self, asset: Address) -> bool {
        self.registry.read().is_initialized(&asset)
    }

    pub fn reserve_balance(&self, asset: Address) -> CurveResult<U256> {
        Ok(self.slot(&asset)?.reserve_balance())
    }

    pub fn curve_params(&self, asset: Address) -> CurveResult<CurveParams> {
        Ok(*self.slot(&asset)?.params())
    }

    pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> CurveResult<()> {
        let mut owner = self.owner.write();
        if caller != *owner {
            warn!(%caller, "ownership transfer rejected");
            return Err(CurveError::Unauthorized(caller));
        }
        if new_owner.is_zero() {
            return Err(CurveError::ZeroOwner);
        }

        let previous_owner = *owner;
        *owner = new_owner;
        drop(owner);

        info!(%previous_owner, %new_owner, "ownership transferred");
        self.events.emit(&CurveEvent::OwnershipTransferred(OwnershipTransferred {
            previous_owner,
            new_owner,
        }));
        Ok(())
    }

    /// Pays `amount` of the reserve asset from custody to the owner.
    ///
    /// Per-asset reserve balances are left as they are, so after a withdrawal
    /// custody may hold less than the ledger says.
    pub fn emergency_withdraw(&self, caller: Address, token: Address, amount: U256) -> CurveResult<()> {
        let _guard = TradeGuard::enter(&self.active)?;
        self.only_owner(caller)?;
        if amount.is_zero() {
            return Err(CurveError::ZeroAmount);
        }
        if token != self.reserve.address() {
            return Err(CurveError::UnsupportedToken(token));
        }

        self.reserve.transfer(caller, amount)?;

        warn!(%token, to = %caller, %amount, "emergency withdrawal");
        self.events.emit(&CurveEvent::EmergencyWithdrawal(EmergencyWithdrawal {
            token,
            to: caller,
            amount,
        }));
        Ok(())
    }

    fn slot(&self, asset: &Address) -> CurveResult<Arc<CurveSlot>> {
        self.registry.read().lookup(asset)
    }

    fn only_owner(&self, caller: Address) -> CurveResult<()> {
        if caller != *self.owner.read() {
            warn!(%caller, "caller is not the owner");
            return Err(CurveError::Unauthorized(caller));
        }
        Ok(())
    }

    // Returns reserve pulled for a buy whose mint failed
    fn refund(&self, caller: Address, amount: U256) {
        if let Err(err) = self.reserve.transfer(caller, amount) {
            error!(%caller, %amount, %err, "refund after failed mint did not go through");
        }
    }
}
