//! # Integer Math
//!
//! Everything the curve needs is built from unsigned integers: a 256-bit
//! word for intermediates and a base-2 log/exp kernel for fractional powers.
//! No floating point is used anywhere in the program, so two machines that
//! run the same instruction always agree on every bit of the result.

pub mod fixed_point;
pub mod u256;

pub use fixed_point::*;
pub use u256::U256;
