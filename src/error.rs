//! Error types for the accessory service.
//!
//! Hardware failures in this service are soft by design: a missing
//! notifier capability degrades the classification instead of erroring,
//! and register-level failures are logged where they occur. What remains
//! here is the configuration, D-Bus and attribute-surface errors.

use thiserror::Error;

/// Main error type for the accessory service.
#[derive(Error, Debug)]
pub enum HeadsetError {
   #[error("I/O error: {0}")]
   Io(#[from] std::io::Error),

   #[error("D-Bus error: {0}")]
   DBus(#[from] zbus::Error),

   #[error("D-Bus connection error: {0}")]
   DBusConnection(#[from] zbus::fdo::Error),

   #[error("Could not determine config directory")]
   ConfigDirNotFound,

   #[error("TOML parsing error: {0}")]
   TomlParse(#[from] toml::de::Error),

   #[error("TOML serialization error: {0}")]
   TomlSerialize(#[from] toml::ser::Error),

   #[error("Unknown attribute: {0}")]
   UnknownAttribute(String),

   #[error("Invalid {attr} command: {value:?}")]
   InvalidCommand { attr: &'static str, value: String },
}

/// Convenience type alias for Results with `HeadsetError`.
pub type Result<T> = std::result::Result<T, HeadsetError>;
