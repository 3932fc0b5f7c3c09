//! Concrete implementations of the port traits.

pub mod file_config_adapter;
pub mod memory_quote_adapter;
pub mod csv_adapter;

#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
