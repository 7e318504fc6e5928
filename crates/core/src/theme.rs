//! Theme preference persisted alongside the session

use crate::error::CoreResult;
use crate::storage::{KeyValueStore, keys};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

/// Reads and writes the `theme` key
#[derive(Clone)]
pub struct ThemePreference {
    store: Arc<dyn KeyValueStore>,
}

impl ThemePreference {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Saved theme, or light when nothing usable is stored
    pub fn current(&self) -> CoreResult<Theme> {
        Ok(self
            .store
            .get(keys::THEME)?
            .and_then(|saved| saved.parse().ok())
            .unwrap_or_default())
    }

    pub fn set(&self, theme: Theme) -> CoreResult<Theme> {
        self.store.set(keys::THEME, theme.as_str())?;
        Ok(theme)
    }

    pub fn toggle(&self) -> CoreResult<Theme> {
        let next = self.current()?.toggle();
        self.set(next)
    }
}
