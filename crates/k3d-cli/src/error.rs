//! Error types for the CLI

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] k3d::Error),

    #[error("command failed: {message}")]
    CommandFailed { message: String },

    #[error("{operation} failed for: {}", failed.join(", "))]
    BatchFailed {
        operation: String,
        failed: Vec<String>,
    },
}

impl Error {
    pub fn command_failed(message: impl Into<String>) -> Self {
        Error::CommandFailed {
            message: message.into(),
        }
    }

    /// Process exit status for this error.
    ///
    /// Bad input exits with 2 like clap's own usage errors; everything else
    /// exits with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Core(k3d::Error::Validation(_)) => 2,
            _ => 1,
        }
    }
}
