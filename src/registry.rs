//! Curve Parameter Registry
//!
//! Arena of per-asset curve slots. Slots are appended once and never removed
//! or updated; an asset address resolves to a stable [`CurveHandle`].

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::curve::CurveParams;
use crate::error::{CurveError, CurveResult};
use crate::token::PricedAsset;

/// Index of a slot in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurveHandle(usize);

impl CurveHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One priced asset: its immutable parameters, its ledger and its reserve.
///
/// The reserve balance sits behind the asset's critical-section lock. The
/// lock is reentrant so that a collaborator hook running on the trading
/// thread can still quote; reentrant *trades* are stopped by the engine.
pub struct CurveSlot {
    params: CurveParams,
    asset: Arc<dyn PricedAsset>,
    reserve: ReentrantMutex<Cell<U256>>,
}

impl CurveSlot {
    fn new(asset: Arc<dyn PricedAsset>, params: CurveParams) -> Self {
        Self {
            params,
            asset,
            reserve: ReentrantMutex::new(Cell::new(U256::ZERO)),
        }
    }

    pub fn params(&self) -> &CurveParams {
        &self.params
    }

    pub fn asset(&self) -> &dyn PricedAsset {
        self.asset.as_ref()
    }

    /// Enters the asset's critical section.
    pub(crate) fn lock(&self) -> ReentrantMutexGuard<'_, Cell<U256>> {
        self.reserve.lock()
    }

    pub fn reserve_balance(&self) -> U256 {
        self.reserve.lock().get()
    }
}

impl fmt::Debug for CurveSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurveSlot")
            .field("asset", &self.asset.address())
            .field("params", &self.params)
            .field("reserve", &self.reserve_balance())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct CurveRegistry {
    slots: Vec<Arc<CurveSlot>>,
    index: HashMap<Address, CurveHandle>,
}

impl CurveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a curve for `asset`. Each asset can be registered exactly once.
    pub fn register(
        &mut self,
        asset: Arc<dyn PricedAsset>,
        params: CurveParams,
    ) -> CurveResult<CurveHandle> {
        let address = asset.address();
        if self.index.contains_key(&address) {
            return Err(CurveError::CurveAlreadyInitialized(address));
        }

        let handle = CurveHandle(self.slots.len());
        self.slots.push(Arc::new(CurveSlot::new(asset, params)));
        self.index.insert(address, handle);
        Ok(handle)
    }

    pub fn handle(&self, asset: &Address) -> Option<CurveHandle> {
        self.index.get(asset).copied()
    }

    pub fn slot(&self, handle: CurveHandle) -> Option<&Arc<CurveSlot>> {
        self.slots.get(handle.0)
    }

    pub fn lookup(&self, asset: &Address) -> CurveResult<Arc<CurveSlot>> {
        self.handle(asset)
            .and_then(|handle| self.slot(handle))
            .cloned()
            .ok_or(CurveError::CurveNotInitialized(*asset))
    }

    pub fn is_initialized(&self, asset: &Address) -> bool {
        self.index.contains_key(asset)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
