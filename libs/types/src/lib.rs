//! Types library for the exchange simulation engine
//!
//! This library provides the core type definitions shared by the engine,
//! ensuring type safety and deterministic behavior.
//!
//! # Modules
//! - `ids`: Unique identifiers (OrderId, TradeId, PairId, OwnerId)
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `pair`: Trading pair configuration
//! - `order`: Order lifecycle types
//! - `trade`: Trade execution types
//! - `errors`: Error taxonomy

// Public modules
pub mod errors;
pub mod ids;
pub mod numeric;
pub mod order;
pub mod pair;
pub mod trade;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::pair::*;
    pub use crate::trade::*;
}
