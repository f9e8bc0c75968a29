//! Metadata storage layer.
//!
//! The metadata store keeps the durable record for every registered
//! object.  The [`store::MetadataStore`] trait defines the interface;
//! [`sqlite::SqliteMetadataStore`] is the default implementation and
//! [`memory::MemoryMetadataStore`] backs tests and ephemeral runs.

pub mod memory;
pub mod sqlite;
pub mod store;
