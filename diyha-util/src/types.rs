use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Deref;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostnameError {
    #[error("failed to read hostname: {0}")]
    Io(#[from] std::io::Error),

    #[error("hostname is not valid UTF-8: {0:?}")]
    NotUnicode(std::ffi::OsString),

    #[error("hostname is empty")]
    Empty,
}

/// Network name of this device.
///
/// The inventory server lists one record per device and category, keyed by
/// this name, so comparisons are exact and case-sensitive.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hostname(String);

impl Hostname {
    /// Read the machine hostname from the operating system.
    pub fn local() -> Result<Self, HostnameError> {
        let name = hostname::get()?
            .into_string()
            .map_err(HostnameError::NotUnicode)?;

        if name.is_empty() {
            return Err(HostnameError::Empty);
        }

        Ok(Self(name))
    }
}

impl Deref for Hostname {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Hostname {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Hostname {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Hostname {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
