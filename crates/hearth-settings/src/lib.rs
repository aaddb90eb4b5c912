//! # hearth-settings
//!
//! Layered configuration for the hearth client runtime: compiled defaults,
//! then `~/.hearth/settings.json`, then `HEARTH_*` environment variables.
//!
//! ```no_run
//! let settings = hearth_settings::load_settings()?;
//! println!("channel capacity: {}", settings.transport.channel_capacity);
//! # Ok::<(), hearth_settings::SettingsError>(())
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
