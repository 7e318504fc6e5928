//! Persistence of the token pair

use super::token::TokenPair;
use bloomkart_core::{CoreResult, KeyValueStore, keys};
use std::sync::Arc;

/// Tokens as currently persisted; either half may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Reads and writes the `accessToken`/`refreshToken` entries
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The underlying key-value store
    pub fn backing(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn load(&self) -> CoreResult<StoredTokens> {
        Ok(StoredTokens {
            access_token: self.store.get(keys::ACCESS_TOKEN)?,
            refresh_token: self.store.get(keys::REFRESH_TOKEN)?,
        })
    }

    /// Replace both tokens in one write
    pub fn save(&self, pair: &TokenPair) -> CoreResult<()> {
        self.store.set_many(&[
            (keys::ACCESS_TOKEN, pair.access_token.as_str()),
            (keys::REFRESH_TOKEN, pair.refresh_token.as_str()),
        ])
    }

    /// Store a lone access token, dropping any refresh token from an older session
    pub fn save_access_only(&self, access_token: &str) -> CoreResult<()> {
        self.store.remove(keys::REFRESH_TOKEN)?;
        self.store.set(keys::ACCESS_TOKEN, access_token)
    }

    /// Delete both tokens
    pub fn clear(&self) -> CoreResult<()> {
        self.store
            .remove_many(&[keys::ACCESS_TOKEN, keys::REFRESH_TOKEN])
    }

    /// Delete both tokens and the cart snapshot
    pub fn clear_session_data(&self) -> CoreResult<()> {
        self.store
            .remove_many(&[keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::CART])
    }
}
