//! Persisted user settings
//!
//! The only user-editable setting is the listening port. Settings are stored
//! as YAML; a missing file yields the defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::constants::DEFAULT_PORT;

/// User-facing server settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl Settings {
    /// Parse a port typed by the user; accepts 1..=65535
    pub fn parse_port(text: &str) -> Result<u16> {
        match text.trim().parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(Error::InvalidPort(text.to_string())),
        }
    }

    /// Reject port 0; a viewer could never be told which port was picked
    pub fn check_port(port: u16) -> Result<u16> {
        if port == 0 {
            return Err(Error::InvalidPort(port.to_string()));
        }
        Ok(port)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let settings: Settings = serde_yaml_ng::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Load from `path`, falling back to defaults if the file does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_yaml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.validate()?;
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        Self::check_port(self.port).map(|_| ())
    }
}
