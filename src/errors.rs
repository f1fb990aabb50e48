use std::path::PathBuf;

use serde::Deserialize;

use crate::capability::Capability;

/// All error types that can occur when talking to a Hue bridge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// A UDP socket operation failed during discovery.
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: std::io::Error },

    /// The HTTP request could not be completed (connection refused, timeout, ...).
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The bridge answered with a non-success HTTP status.
    #[error("http status {status} for {path}")]
    HttpStatus { status: u16, path: String },

    /// The bridge answered with a payload of an unexpected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The bridge rejected the call with its own error object.
    #[error("bridge rejected request: {0}")]
    Remote(RemoteError),

    /// No device on the network identified itself as a Hue bridge.
    #[error("bridge not found")]
    BridgeNotFound,

    /// No credential was issued before the pairing window elapsed.
    #[error("pairing timed out; the link button was not pressed in time")]
    PairingTimeout,

    /// Reading or writing the persisted session record failed.
    #[error("session file {path:?}: {err}")]
    Session { path: PathBuf, err: std::io::Error },

    /// The persisted session record is malformed.
    #[error("invalid session record: {0}")]
    InvalidSession(String),

    /// No light with the given name or id is known.
    #[error("light not found {0}")]
    LightNotFound(String),

    /// No group with the given name or id is known.
    #[error("group not found {0}")]
    GroupNotFound(String),

    /// An RGB color was requested on a light with no known gamut.
    #[error("light {light} has model id {model_id} with no known gamut")]
    NoGamut { light: String, model_id: String },

    /// The light does not support the requested operation.
    #[error("light {light} does not support {capability}")]
    Unsupported {
        light: String,
        capability: Capability,
    },

    /// Failed to parse a [`crate::Color`] from a string.
    #[error("invalid color string: {0}")]
    InvalidColorString(String),
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new session file error
    pub fn session(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Error::Session {
            path: path.into(),
            err,
        }
    }

    /// Create a new unsupported capability error
    pub fn unsupported(light: &str, capability: Capability) -> Self {
        Error::Unsupported {
            light: light.to_string(),
            capability,
        }
    }

    /// Returns the bridge's own error object if this is a remote rejection.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Error::Remote(err) => Some(err),
            _ => None,
        }
    }
}

/// The `{"error": {...}}` object the bridge returns for a rejected call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteError {
    /// Numeric error type code.
    #[serde(rename = "type")]
    pub kind: u16,
    /// Resource the error refers to.
    #[serde(default)]
    pub address: String,
    /// Human readable description.
    #[serde(default)]
    pub description: String,
}

impl RemoteError {
    /// Error type the bridge reports while the link button has not been pressed.
    pub const LINK_BUTTON_NOT_PRESSED: u16 = 101;

    /// Unauthorized user.
    pub const UNAUTHORIZED_USER: u16 = 1;

    pub fn is_link_button_not_pressed(&self) -> bool {
        self.kind == Self::LINK_BUTTON_NOT_PRESSED || self.description == "link button not pressed"
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error {} : {}", self.kind, self.description)
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
