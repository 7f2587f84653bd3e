//! Key-value persistence used for the session token and presence flags.

use anyhow::Result;
use async_trait::async_trait;

mod memory;
mod migrations;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const SESSION_TOKEN_KEY: &str = "session_token";
pub const IS_ONLINE_KEY: &str = "is_online";
pub const LAST_ACTIVITY_KEY: &str = "last_activity_time";

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}
