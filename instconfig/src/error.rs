use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("configuration file {} not found", .path.display())]
    #[diagnostic(
        code(instconfig::not_found),
        help("create the file or point --config at an existing one")
    )]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read configuration file {}", .path.display())]
    #[diagnostic(code(instconfig::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {}", .path.display())]
    #[diagnostic(code(instconfig::parse_failed))]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize configuration")]
    #[diagnostic(code(instconfig::serialize_failed))]
    Serialize(#[source] serde_yaml::Error),

    #[error("failed to create configuration directory {}", .path.display())]
    #[diagnostic(code(instconfig::create_dir_failed))]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write configuration file {}", .path.display())]
    #[diagnostic(code(instconfig::write_failed))]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
