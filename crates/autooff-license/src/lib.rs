//! Licensing for Auto-OFF: subscription plans, the local license check, and a
//! demo payment server that issues license keys from in-memory state.

pub mod error;
pub mod ledger;
pub mod license;
pub mod plan;
pub mod server;

pub use error::{Error, Result};
pub use ledger::{Ledger, PaymentIntent, Subscription};
pub use license::{LicenseStatus, PRODUCT_KEY, validate_license};
pub use plan::Plan;
pub use server::{DEFAULT_PORT, LicenseServer, route};
