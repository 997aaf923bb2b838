//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **Address**: Indian postal address with validation and normalization
//! - **PaymentMode**: Prepaid or cash on delivery
//! - **Parcel**: Weight and box dimensions of a consignment

mod address;
mod parcel;
mod payment_mode;

pub use address::*;
pub use parcel::*;
pub use payment_mode::*;
