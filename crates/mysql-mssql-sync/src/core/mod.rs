//! Core types shared by every store and the replication pipeline.
//!
//! - [`record`]: the `Record` moved between stores and its boundary validation
//! - [`page`]: page requests, pages and the search filter
//! - [`traits`]: the `PrimaryStore` and `SecondaryStore` seams
//!
//! Drivers (`drivers/mysql`, `drivers/mssql`, `drivers/memory`) implement the
//! traits; the pipeline and HTTP layer only see `Arc<dyn PrimaryStore>` and
//! `Arc<dyn SecondaryStore>`.

pub mod page;
pub mod record;
pub mod traits;

pub use page::{Page, PageRequest, SearchFilter, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
pub use record::{validate_all, Record, MAX_PAYLOAD_LEN};
pub use traits::{PrimaryStore, SecondaryStore, DEFAULT_READ_BATCH_SIZE};
