use std::{error::Error as StdError, fmt};

/// Library result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for engine setup, configuration, and request signing.
///
/// Failures of an individual request are never reported through this type;
/// they reach the caller as a [`Status`](crate::Status) through the
/// completion callback.
#[non_exhaustive]
pub enum Error {
    /// Invalid configuration or parameters.
    InvalidConfig { message: String },

    /// Process-wide transport state could not be set up.
    Initialization { message: String },

    /// Request signing failed.
    Signing { message: String },
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { message } => f
                .debug_struct("InvalidConfig")
                .field("message", message)
                .finish(),
            Self::Initialization { message } => f
                .debug_struct("Initialization")
                .field("message", message)
                .finish(),
            Self::Signing { message } => {
                f.debug_struct("Signing").field("message", message).finish()
            }
        }
    }
}

impl Error {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an initialization error.
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization {
            message: message.into(),
        }
    }

    /// Creates a signing error.
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { message } => write!(f, "invalid config: {message}"),
            Self::Initialization { message } => write!(f, "initialization failed: {message}"),
            Self::Signing { message } => write!(f, "signing error: {message}"),
        }
    }
}

impl StdError for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_family_prefix() {
        assert_eq!(
            Error::invalid_config("host must not be empty").to_string(),
            "invalid config: host must not be empty"
        );
        assert_eq!(
            Error::initialization("no crypto provider").to_string(),
            "initialization failed: no crypto provider"
        );
        assert_eq!(Error::signing("bad key").to_string(), "signing error: bad key");
    }
}
