use std::net::SocketAddr;

use clap::{Args, Parser};
use thiserror::Error;

use crate::session_code::DEFAULT_MAX_ATTEMPTS;

pub const DEFAULT_BIND: &str = "0.0.0.0:5390";
pub const DEFAULT_SUBPROTOCOL: &str = "mercury-multi-mapper";
pub const DEFAULT_SUPPORTED_VERSIONS: [&str; 2] = ["v3.0.0", "v3.0.0 DEV"];
pub const DEFAULT_FILE_EXTENSIONS: [&str; 4] = [".wav", ".flac", ".ogg", ".mp3"];
pub const DEFAULT_MAX_FRAME_SIZE: usize = 100 * 1024 * 1024;

/// Session relay for collaborative chart editing.
#[derive(Parser, Debug, Clone)]
#[command(name = "server", version, about, long_about = None)]
pub struct Config {
    /// Address to accept websocket and status requests on
    #[arg(long, env = "RELAY_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Websocket subprotocol clients must request
    #[arg(long, env = "RELAY_SUBPROTOCOL", default_value = DEFAULT_SUBPROTOCOL)]
    pub subprotocol: String,

    /// Client versions accepted by the InitConnection handshake
    #[arg(
        long = "supported-version",
        env = "RELAY_SUPPORTED_VERSIONS",
        value_delimiter = ',',
        default_values_t = DEFAULT_SUPPORTED_VERSIONS.map(String::from)
    )]
    pub supported_versions: Vec<String>,

    /// File name extensions that may be relayed with File messages
    #[arg(
        long = "file-extension",
        env = "RELAY_FILE_EXTENSIONS",
        value_delimiter = ',',
        default_values_t = DEFAULT_FILE_EXTENSIONS.map(String::from)
    )]
    pub file_extensions: Vec<String>,

    /// Largest websocket message accepted, in bytes
    #[arg(long, env = "RELAY_MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,

    /// Attempts at drawing an unused session code before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_code_attempts: usize,

    #[command(flatten)]
    pub close_codes: CloseCodes,
}

/// Websocket close codes sent for each class of fatal client error. The
/// defaults are what the existing editor builds expect.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseCodes {
    /// Close code for binary frames
    #[arg(long = "close-code-bad-frame", default_value_t = 1003)]
    pub bad_frame_type: u16,

    /// Close code for empty text frames
    #[arg(long = "close-code-empty", default_value_t = 1002)]
    pub empty_payload: u16,

    /// Close code for frames that are not a JSON envelope
    #[arg(long = "close-code-malformed", default_value_t = 1002)]
    pub malformed: u16,

    /// Close code for envelopes without an integer MessageType
    #[arg(long = "close-code-missing-type", default_value_t = 1003)]
    pub missing_type: u16,

    /// Close code for failed or outdated handshakes
    #[arg(long = "close-code-handshake", default_value_t = 3003)]
    pub handshake: u16,

    /// Close code for relays outside the sender's session or of disallowed files
    #[arg(long = "close-code-unauthorized", default_value_t = 1000)]
    pub unauthorized: u16,

    /// Close code for server-side failures
    #[arg(long = "close-code-internal", default_value_t = 1011)]
    pub internal: u16,
}

impl Default for CloseCodes {
    fn default() -> Self {
        Self {
            bad_frame_type: 1003,
            empty_payload: 1002,
            malformed: 1002,
            missing_type: 1003,
            handshake: 3003,
            unauthorized: 1000,
            internal: 1011,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("subprotocol name must not be empty")]
    EmptySubprotocol,
    #[error("at least one supported client version is required")]
    NoSupportedVersions,
    #[error("file extension {0:?} must start with a dot")]
    BadExtension(String),
    #[error("max code attempts must be at least 1")]
    NoCodeAttempts,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subprotocol.trim().is_empty() {
            return Err(ConfigError::EmptySubprotocol);
        }
        if self.supported_versions.is_empty() {
            return Err(ConfigError::NoSupportedVersions);
        }
        if let Some(ext) = self
            .file_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(ConfigError::BadExtension(ext.clone()));
        }
        if self.max_code_attempts == 0 {
            return Err(ConfigError::NoCodeAttempts);
        }
        Ok(())
    }

    pub fn is_supported_version(&self, version: &str) -> bool {
        self.supported_versions.iter().any(|v| v == version)
    }

    pub fn is_allowed_file(&self, file_name: &str) -> bool {
        let file_name = file_name.to_ascii_lowercase();
        self.file_extensions
            .iter()
            .any(|ext| file_name.ends_with(&ext.to_ascii_lowercase()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5390)),
            subprotocol: DEFAULT_SUBPROTOCOL.to_owned(),
            supported_versions: DEFAULT_SUPPORTED_VERSIONS.map(String::from).to_vec(),
            file_extensions: DEFAULT_FILE_EXTENSIONS.map(String::from).to_vec(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_code_attempts: DEFAULT_MAX_ATTEMPTS,
            close_codes: CloseCodes::default(),
        }
    }
}
