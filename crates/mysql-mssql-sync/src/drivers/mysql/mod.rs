//! MySQL/MariaDB primary store driver.
//!
//! - [`MysqlDialect`]: SQL for the records table
//! - [`MysqlPrimary`]: `PrimaryStore` implementation over an SQLx pool
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod dialect;
mod primary;

pub use dialect::MysqlDialect;
pub use primary::MysqlPrimary;
