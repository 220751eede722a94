use std::{
  fs,
  io,
  path::Path,
  time::Duration,
};

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

use crate::render::DEFAULT_SEPARATOR;

/// Quiescence window after the last edit before a refresh is issued.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read overlay config: {0}")]
  Io(#[from] io::Error),
  #[error("failed to parse overlay config: {0}")]
  Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct OverlayConfig {
  /// Process-wide default, documents can override it.
  pub enable:            bool,
  pub debounce_ms:       u64,
  /// Placed between the lenses of one line.
  pub separator:         String,
  pub refresh_on_attach: bool,
  /// Drop annotations and overlay of edited lines right away instead of
  /// waiting for the debounced refresh.
  pub clear_on_edit:     bool,
}

impl Default for OverlayConfig {
  fn default() -> Self {
    Self {
      enable:            true,
      debounce_ms:       DEFAULT_DEBOUNCE_MS,
      separator:         DEFAULT_SEPARATOR.to_string(),
      refresh_on_attach: true,
      clear_on_edit:     true,
    }
  }
}

impl OverlayConfig {
  pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(source)?)
  }

  /// Missing files yield the defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    match fs::read_to_string(path) {
      Ok(source) => Self::from_toml(&source),
      Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
      Err(err) => Err(err.into()),
    }
  }

  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }
}
