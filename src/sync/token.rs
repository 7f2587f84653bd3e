use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::store::{KeyValueStore, SESSION_TOKEN_KEY};

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn bearer_token(&self) -> Result<Option<String>>;
}

/// Session token persisted in the key-value store by the auth flow.
#[derive(Clone)]
pub struct SessionTokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionTokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// `None` logs the session out by removing the stored token.
    pub async fn set_token(&self, token: Option<&str>) -> Result<()> {
        match token {
            Some(token) => self.store.set(SESSION_TOKEN_KEY, token).await,
            None => self.store.remove(SESSION_TOKEN_KEY).await,
        }
    }
}

#[async_trait]
impl TokenSource for SessionTokenStore {
    async fn bearer_token(&self) -> Result<Option<String>> {
        let token = self.store.get(SESSION_TOKEN_KEY).await?;
        Ok(token.filter(|t| !t.is_empty()))
    }
}
