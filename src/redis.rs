//! Redis 模組
//!
//! 儀表化的 Redis 客戶端與連接，以及內嵌 `redis-server` 的生命週期管理。

pub mod client;
pub mod connection;
pub mod embedded;

#[cfg(test)]
pub mod test_config;

pub use client::{InstrumentedClient, RedisClientError};
pub use connection::{InstrumentedConnection, DATASTORE_PRODUCT};
pub use embedded::{EmbeddedRedisServer, EmbeddedServerError};
