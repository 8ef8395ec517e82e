//!
//! Power-Law Bonding Curve
//!
//! Prices a fungible asset by its circulating supply, `price(s) = c * s^k`, and
//! settles buys and sells against a reserve held in custody. The reserve held
//! for an asset always equals the area under its curve up to the current
//! supply, with every rounding step resolved in the reserve's favour.
//!

pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod events;
pub mod math;
pub mod registry;
pub mod solver;
pub mod token;

pub use config::EngineConfig;
pub use curve::{CurveParams, MAX_EXPONENT, MIN_COEFFICIENT};
pub use engine::CurveEngine;
pub use error::{CurveError, CurveResult, MathError, TokenError};
pub use events::{CurveEvent, EventRecorder, EventSink, TracingSink};
pub use math::SCALE;
pub use registry::{CurveHandle, CurveRegistry, CurveSlot};
pub use solver::{solve_buy, BuySolution, DEFAULT_SEARCH_CEILING_TOKENS};
pub use token::{MemoryToken, PricedAsset, ReserveAsset, Token};
