//! Configuration for unattended server installs.
//!
//! A [`Config`] is resolved in layers: compiled defaults, then a YAML file,
//! then environment variables. It is validated as a whole before anything
//! destructive happens, and persisted without its credentials.
//!
//! ```no_run
//! use instconfig::Config;
//!
//! # fn main() -> miette::Result<()> {
//! let cfg = Config::load(Some("/etc/instconfig/config.yaml".as_ref()))?;
//! cfg.validate()?;
//! println!("installing {}", cfg.fqdn());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod file;
pub mod timezone;
pub mod types;
pub mod validate;

use std::path::Path;

pub use config::{Config, NetworkSettings, StorageSettings, SystemIdentity, TailscaleSettings};
pub use error::{ConfigError, Result};
pub use timezone::{SystemZones, ZoneLookup};
pub use types::{BridgeMode, ClosedSet, ParseEnumError, RaidLevel};
pub use validate::{ErrorKind, Field, FieldError, ValidationError};

impl Config {
    /// Resolves the file and environment layers.
    ///
    /// With `None` the defaults stand in for the file. The result is not
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }
}
