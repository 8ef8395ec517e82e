//! Audit events.
//!
//! Every successful initialize, trade and administrative withdrawal produces
//! one event carrying its full parameters, enough to rebuild curve state off
//! line. Events are declared as Solidity events so they encode to the log
//! layout an on-chain indexer already understands.

use alloy_primitives::LogData;
use alloy_sol_types::{sol, SolEvent};
use parking_lot::Mutex;
use tracing::debug;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    event CurveInitialized(address indexed asset, uint256 coefficient, uint256 exponent);

    #[derive(Debug, PartialEq, Eq)]
    event TokensPurchased(
        address indexed buyer,
        address indexed asset,
        uint256 reserve_amount,
        uint256 asset_amount,
        uint256 new_supply
    );

    #[derive(Debug, PartialEq, Eq)]
    event TokensSold(
        address indexed seller,
        address indexed asset,
        uint256 asset_amount,
        uint256 reserve_amount,
        uint256 new_supply
    );

    #[derive(Debug, PartialEq, Eq)]
    event EmergencyWithdrawal(address indexed token, address indexed to, uint256 amount);

    #[derive(Debug, PartialEq, Eq)]
    event OwnershipTransferred(address indexed previous_owner, address indexed new_owner);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurveEvent {
    Initialized(CurveInitialized),
    Purchased(TokensPurchased),
    Sold(TokensSold),
    EmergencyWithdrawal(EmergencyWithdrawal),
    OwnershipTransferred(OwnershipTransferred),
}

impl CurveEvent {
    /// Solidity signature, e.g. `TokensSold(address,address,uint256,uint256,uint256)`.
    pub fn signature(&self) -> &'static str {
        match self {
            Self::Initialized(_) => CurveInitialized::SIGNATURE,
            Self::Purchased(_) => TokensPurchased::SIGNATURE,
            Self::Sold(_) => TokensSold::SIGNATURE,
            Self::EmergencyWithdrawal(_) => EmergencyWithdrawal::SIGNATURE,
            Self::OwnershipTransferred(_) => OwnershipTransferred::SIGNATURE,
        }
    }

    /// ABI-encoded topics and data.
    pub fn log_data(&self) -> LogData {
        match self {
            Self::Initialized(event) => encode_log(event),
            Self::Purchased(event) => encode_log(event),
            Self::Sold(event) => encode_log(event),
            Self::EmergencyWithdrawal(event) => encode_log(event),
            Self::OwnershipTransferred(event) => encode_log(event),
        }
    }
}

fn encode_log<E: SolEvent>(event: &E) -> LogData {
    let topics = event.encode_topics().into_iter().map(|topic| topic.0).collect();
    LogData::new_unchecked(topics, event.encode_data().into())
}

/// Destination for audit events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &CurveEvent);
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<CurveEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CurveEvent> {
        self.events.lock().clone()
    }

    pub fn logs(&self) -> Vec<LogData> {
        self.events.lock().iter().map(CurveEvent::log_data).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for EventRecorder {
    fn emit(&self, event: &CurveEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Writes each encoded log to `tracing` and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &CurveEvent) {
        let log = event.log_data();
        debug!(
            event = event.signature(),
            topics = log.topics().len(),
            data = %hex::encode(&log.data),
            "audit log"
        );
    }
}
