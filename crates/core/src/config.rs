//! Client configuration
//!
//! Values are layered: built-in defaults, then an optional TOML/YAML file,
//! then `BLOOMKART_*` environment variables (`__` separates sections, e.g.
//! `BLOOMKART_API__BASE_URL`).

use crate::error::{CoreError, CoreResult};
use crate::validation::{ValidateConfig, validators};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// REST backend settings
    pub api: ApiConfig,

    /// Token lifecycle settings
    pub session: SessionConfig,

    /// Cart pricing settings
    pub cart: CartConfig,

    /// Directory holding the persisted key-value store and logs
    pub data_dir: PathBuf,
}

/// REST backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

/// Token lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Refresh the access token when fewer than this many seconds remain
    pub refresh_threshold_secs: u64,

    /// Where a forced logout sends the user
    pub login_path: String,
}

/// Cart configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartConfig {
    /// Flat delivery charge added to non-empty carts
    pub delivery_fee: Decimal,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            session: SessionConfig::default(),
            cart: CartConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_secs: 30,
            user_agent: concat!("bloomkart-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_threshold_secs: 300,
            login_path: "/login".to_string(),
        }
    }
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            delivery_fee: crate::cart::DEFAULT_DELIVERY_FEE,
        }
    }
}

impl ApiConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SessionConfig {
    pub const fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_secs)
    }
}

/// Platform data directory, falling back to `./.bloomkart`
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("in", "BloomKart", "bloomkart").map_or_else(
        || {
            warn!("Failed to determine platform-specific directories, using ./.bloomkart");
            PathBuf::from(".bloomkart")
        },
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

impl ClientConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration fails validation
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`ClientConfig::load`], reading variables from `env` instead of
    /// the process environment when given
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> CoreResult<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.timeout_secs", defaults.api.timeout_secs)?
            .set_default("api.user_agent", defaults.api.user_agent)?
            .set_default(
                "session.refresh_threshold_secs",
                defaults.session.refresh_threshold_secs,
            )?
            .set_default("session.login_path", defaults.session.login_path)?
            .set_default("cart.delivery_fee", defaults.cart.delivery_fee.to_string())?
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?;

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("BLOOMKART")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Path of the persisted key-value store
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }
}

impl ValidateConfig for ClientConfig {
    fn validate(&self) -> CoreResult<()> {
        validators::validate_url(&self.api.base_url, "api.base_url")?;
        validators::validate_range(self.api.timeout_secs, 1, 600, "api.timeout_secs")?;
        validators::validate_not_empty(&self.api.user_agent, "api.user_agent")?;
        validators::validate_range(
            self.session.refresh_threshold_secs,
            0,
            86_400,
            "session.refresh_threshold_secs",
        )?;
        validators::validate_not_empty(&self.session.login_path, "session.login_path")?;
        if self.cart.delivery_fee.is_sign_negative() {
            return Err(CoreError::validation(
                "cart.delivery_fee",
                "cannot be negative",
            ));
        }
        Ok(())
    }
}
