pub mod connection;
pub mod memory_store;
pub mod migrations;
pub mod price_store;

pub use connection::*;
pub use memory_store::MemoryPriceStore;
pub use migrations::*;
pub use price_store::{PgPriceStore, PriceStore, StoreError};
