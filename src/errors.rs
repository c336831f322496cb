use std::string::FromUtf8Error;

/// All error types that can occur when talking to Govee devices.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to serialize a command to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// A network socket operation failed.
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: std::io::Error },

    /// An inbound datagram contained invalid UTF-8.
    #[error("utf8 decoding error: {0:?}")]
    Utf8Decode(FromUtf8Error),

    /// A color input could not be turned into an RGB color.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// No device with the given identity is known.
    #[error("device {0} not found")]
    DeviceNotFound(String),

    /// The registry has no transport yet; call `start` first.
    #[error("registry is not started")]
    NotReady,

    /// The registry or device was destroyed while the operation was pending.
    #[error("registry was destroyed")]
    Destroyed,
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new invalid color error
    pub fn invalid_color(input: impl std::fmt::Debug) -> Self {
        Error::InvalidColor(format!("{input:?}"))
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
