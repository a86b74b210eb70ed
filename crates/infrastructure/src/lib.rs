//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod connection;
mod in_memory_access_control_store;
mod postgres_access_control_store;
mod store_error;

pub use connection::{
    DEFAULT_PORT, PostgresConnectionSettings, TlsFiles, connect, run_migrations,
};
pub use in_memory_access_control_store::InMemoryAccessControlStore;
pub use postgres_access_control_store::{AceUpsertStrategy, PostgresAccessControlStore};
