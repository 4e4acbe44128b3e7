//! Data models for checkout-swift.
//!
//! These models match the original JSON documents exactly, so exports, share
//! links and remote rows stay interoperable.

mod member;
mod session;
mod snapshot;
mod voucher;

pub use member::*;
pub use session::*;
pub use snapshot::*;
pub use voucher::*;
