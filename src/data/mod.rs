//! Data layer
//!
//! Row records, the data source contract, the gateway that normalizes every
//! call into it, and the position-keyed window cache.

pub mod data_source;
pub mod fetch_gateway;
pub mod memory_source;
pub mod row;
pub mod window_cache;

pub use data_source::{DataSource, FetchRequest, FnDataSource, SortDirection, SortKey};
pub use fetch_gateway::FetchGateway;
pub use memory_source::MemoryDataSource;
pub use row::RowRecord;
pub use window_cache::{BatchOutcome, BatchTicket, WindowCache};
