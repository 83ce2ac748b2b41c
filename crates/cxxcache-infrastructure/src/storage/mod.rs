//! SQLite storage adapter: schema management plus the concrete
//! [`StorageEngine`](cxxcache_domain::ports::StorageEngine) implementation.

pub mod schema;
pub mod sqlite;

pub use sqlite::{connect_and_init, SqliteStorageEngine};
