//! On-chain state of a YieldSpace pool

pub mod parameters;
pub mod pool;

pub use parameters::*;
pub use pool::*;
