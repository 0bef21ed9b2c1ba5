use std::path::PathBuf;

use config::{Config, Environment, File};
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use instconfig::file::{CONFIG_DIR_NAME, SYSTEM_CONFIG_PATH};

/// Settings of the command line tool itself, not of the machine being
/// installed.
#[derive(Debug, Clone, Deserialize)]
pub struct CliSettings {
    pub config_path: PathBuf,
    #[serde(default)]
    pub log_filter: Option<String>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum SettingsError {
    #[error("failed to load cli settings: {0}")]
    #[diagnostic(code(instconfig_cli::settings))]
    Load(#[from] config::ConfigError),
}

impl CliSettings {
    pub fn load() -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .set_default("config_path", SYSTEM_CONFIG_PATH)?
            .add_source(File::with_name("/etc/instconfig/cli").required(false));

        if let Some(dir) = dirs::config_dir() {
            let user = dir.join(CONFIG_DIR_NAME).join("cli");
            builder = builder.add_source(File::from(user).required(false));
        }

        // INSTCONFIG_CLI_CONFIG_PATH, INSTCONFIG_CLI_LOG_FILTER
        builder = builder.add_source(Environment::with_prefix("INSTCONFIG_CLI"));

        Ok(builder.build()?.try_deserialize()?)
    }
}
