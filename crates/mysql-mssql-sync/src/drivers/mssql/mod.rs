//! Microsoft SQL Server driver.
//!
//! - [`MssqlDialect`]: T-SQL for the secondary records table
//! - [`MssqlSecondary`]: `SecondaryStore` over a Tiberius/bb8 pool

mod dialect;
mod secondary;

pub use dialect::MssqlDialect;
pub use secondary::MssqlSecondary;
