//! BloomKart core types and client-local state

pub mod cart;
pub mod config;
pub mod error;
pub mod identity;
pub mod storage;
pub mod theme;
pub mod validation;

pub use cart::{CartItem, CartStore, DEFAULT_DELIVERY_FEE};
pub use config::{ApiConfig, CartConfig, ClientConfig, SessionConfig};
pub use error::{CoreError, CoreResult};
pub use identity::{Role, UserIdentity};
pub use storage::{FileStore, KeyValueStore, MemoryStore, keys};
pub use theme::{Theme, ThemePreference};
