//! Reading and writing the YAML configuration document.

use std::fs::{self, DirBuilder};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ConfigError, Result};

pub const CONFIG_DIR_NAME: &str = "instconfig";
pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const SYSTEM_CONFIG_PATH: &str = "/etc/instconfig/config.yaml";

const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o600;

/// Per-user location, `$XDG_CONFIG_HOME/instconfig/config.yaml` on Linux.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl Config {
    /// Loads `path` on top of the defaults. Keys missing from the file keep
    /// their default value.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                    source,
                }
            } else {
                ConfigError::ReadFailed {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let cfg = Self::from_yaml_slice(&content).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("loaded configuration from {}", path.display());
        Ok(cfg)
    }

    /// Parses a YAML document on top of the defaults. An empty document
    /// yields the defaults unchanged.
    pub fn from_yaml_str(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        Self::from_yaml_slice(content.as_bytes())
    }

    /// Like [`Config::from_yaml_str`], for raw file content. Bytes that are
    /// not UTF-8 fail as a parse error.
    pub fn from_yaml_slice(content: &[u8]) -> std::result::Result<Self, serde_yaml::Error> {
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let parsed: Option<Self> = serde_yaml::from_slice(content)?;
        Ok(parsed.unwrap_or_default())
    }

    /// The document that `save_to_file` would write, with credentials blanked.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.redacted()).map_err(ConfigError::Serialize)
    }

    /// Writes a redacted snapshot to `path`, replacing any existing file.
    ///
    /// Missing parent directories are created with mode 0700 and the file
    /// itself ends up with mode 0600. The content goes to a temporary file in
    /// the same directory first and is renamed into place.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let document = self.to_yaml()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if !dir.exists() {
            create_private_dir(dir).map_err(|source| ConfigError::CreateDirFailed {
                path: dir.to_path_buf(),
                source,
            })?;
            debug!("created configuration directory {}", dir.display());
        }

        write_private_file(dir, path, document.as_bytes()).map_err(|source| {
            ConfigError::WriteFailed {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!("saved configuration to {}", path.display());
        Ok(())
    }
}

fn create_private_dir(dir: &Path) -> io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(dir)
}

fn write_private_file(dir: &Path, path: &Path, content: &[u8]) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    set_private_mode(tmp.path())?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn set_private_mode(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(FILE_MODE))
}

#[cfg(not(unix))]
fn set_private_mode(_path: &Path) -> io::Result<()> {
    Ok(())
}
