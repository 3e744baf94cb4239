//! Driver-level error type (SPEC_FULL §11: the only fallible-with-payload
//! error type in the whole workspace, since the core follows spec §7's
//! "the core never throws").

use std::fmt;

#[derive(Debug)]
pub enum DriverError {
    Io { path: String, source: std::io::Error },
    MalformedSearchPathOptions(serde_json::Error),
    ModuleFileFormat(String),
    UnsupportedAction { action: crate::action::FrontendAction, reason: &'static str },
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Io { path, source } => write!(f, "{path}: {source}"),
            DriverError::MalformedSearchPathOptions(e) => write!(f, "malformed search path options: {e}"),
            DriverError::ModuleFileFormat(msg) => write!(f, "malformed module file: {msg}"),
            DriverError::UnsupportedAction { action, reason } => write!(f, "action {action:?} unsupported here: {reason}"),
        }
    }
}

impl std::error::Error for DriverError {}
