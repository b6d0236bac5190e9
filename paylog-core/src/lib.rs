//! Shared domain primitives for the paylog workspace.

mod ids;
pub mod money;
mod page;
mod period;
mod profile;

pub use ids::{EmployeeId, LedgerId};
pub use money::MoneyError;
pub use page::{Page, Paged};
pub use period::PayPeriod;
pub use profile::EmployeeProfile;
