//! # Domain Services
//!
//! Domain services encapsulate business logic that doesn't naturally
//! belong to a single entity.
//!
//! ## Services
//!
//! - **RateCalculator**: Volumetric weight, weight slabs and courier charges

mod rate_calculator;

pub use rate_calculator::*;
