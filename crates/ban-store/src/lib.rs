#![doc = include_str!("../README.md")]

mod config;
mod error;
mod gateway;
#[cfg(feature = "test-util")]
mod memory;
mod pool;

pub use config::{ConnectOptions, ConnectOptionsBuilder, DbKind};
pub use error::{StoreError, StoreResult};
pub use gateway::{FieldUpdate, JobSetUpdate, SqlStoreGateway, StoreGateway};
#[cfg(feature = "test-util")]
pub use memory::MemoryStoreGateway;
pub use pool::ConnectionPool;
