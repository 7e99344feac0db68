//! Crate-wide error type.
//!
//! Every failure carries a numeric code (grouped by subsystem) that maps to
//! a stable CLI exit code, and user-facing errors can attach a hint telling
//! the operator what to try next.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes, grouped by subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // Filesystem (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Persona store (3xx)
    StoreParse = 300,
    StoreWrite = 301,

    // Bridge (4xx)
    BridgeUnavailable = 400,
    BridgeClosed = 401,
    ConnectionFailed = 402,

    // Wire protocol (5xx)
    ProtocolMalformed = 500,
    ProtocolUnexpected = 501,

    // Host environment (6xx)
    HostCommandFailed = 600,
    TabGone = 601,

    // Personas (7xx)
    PersonaNotFound = 700,
    PersonaInvalid = 701,
    ImportInvalid = 702,

    // Internal (9xx)
    InternalError = 900,
}

impl ErrorCode {
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// CLI exit code: the subsystem group's hundreds digit times ten.
    pub fn exit_code(&self) -> i32 {
        ((*self as u16 / 100) * 10) as i32
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to parse persona store {path}: {message}")]
    StoreParse { path: PathBuf, message: String },

    #[error("No browser bridge connected")]
    BridgeUnavailable,

    #[error("Bridge connection closed: {0}")]
    BridgeClosed(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Malformed protocol message: {0}")]
    ProtocolMalformed(String),

    #[error("Unexpected host reply: {0}")]
    ProtocolUnexpected(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Host command failed: {message}")]
    HostCommandFailed { message: String },

    #[error("Tab {tab_id} no longer exists")]
    TabGone { tab_id: i64 },

    #[error("Persona not found: {name}")]
    PersonaNotFound { name: String },

    #[error("Invalid persona '{name}': {reason}")]
    PersonaInvalid { name: String, reason: String },

    #[error("Invalid import payload: {reason}")]
    ImportInvalid { reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::Config(_) => ErrorCode::ConfigValidation,
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },

            Error::StoreParse { .. } => ErrorCode::StoreParse,

            Error::BridgeUnavailable => ErrorCode::BridgeUnavailable,
            Error::BridgeClosed(_) => ErrorCode::BridgeClosed,
            Error::Connection(_) | Error::WebSocket(_) => ErrorCode::ConnectionFailed,

            Error::ProtocolMalformed(_) | Error::Json(_) => ErrorCode::ProtocolMalformed,
            Error::ProtocolUnexpected(_) => ErrorCode::ProtocolUnexpected,

            Error::HostCommandFailed { .. } => ErrorCode::HostCommandFailed,
            Error::TabGone { .. } => ErrorCode::TabGone,

            Error::PersonaNotFound { .. } => ErrorCode::PersonaNotFound,
            Error::PersonaInvalid { .. } => ErrorCode::PersonaInvalid,
            Error::ImportInvalid { .. } => ErrorCode::ImportInvalid,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    /// Hint shown under the error message on the terminal.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'persona-switchboard config init' to create a default configuration file.",
            ),
            Error::Config(_) => Some(
                "Run 'persona-switchboard config validate' to see what the configuration rejects.",
            ),
            Error::StoreParse { .. } => Some(
                "The persona store file is corrupted. Fix the JSON by hand or delete the file to start fresh.",
            ),
            Error::BridgeUnavailable => Some(
                "Make sure the browser extension shim is running and pointed at this daemon's listen address.",
            ),
            Error::BridgeClosed(_) => Some(
                "The browser disconnected. The shim will be picked up again the next time it connects.",
            ),
            Error::PersonaNotFound { .. } => {
                Some("Run 'persona-switchboard persona list' to see available personas.")
            }
            Error::ImportInvalid { .. } => Some(
                "Import files must be a JSON array of objects with string 'name' and 'prompt' fields.",
            ),
            _ => None,
        }
    }

    /// Render for stderr, with ANSI colors and the hint when one exists.
    pub fn format_for_terminal(&self) -> String {
        let mut out = format!("\x1b[31mError [{}]\x1b[0m: {}\n", self.code(), self);
        if let Some(hint) = self.suggestion() {
            out.push_str("\n\x1b[33mHint\x1b[0m: ");
            out.push_str(hint);
            out.push('\n');
        }
        out
    }

    /// Render for log output: code prefix, no colors, no hint.
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code(), self)
    }
}
