use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RsbackError {
    #[error("Source and destination cannot both be remote")]
    BothEndpointsRemote,

    #[error("Remote endpoint configured without server settings")]
    MissingServer,

    #[error("Log files must all be unique, got {path} twice")]
    DuplicateLogPath { path: String },

    #[error("Invalid date directive in path template: {template}")]
    InvalidTemplate { template: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to launch {tool}: {source}")]
    Spawn { tool: String, source: io::Error },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RsbackError {
    /// Create a configuration error with a custom message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RsbackError::BothEndpointsRemote
            | RsbackError::MissingServer
            | RsbackError::DuplicateLogPath { .. }
            | RsbackError::InvalidTemplate { .. }
            | RsbackError::Config { .. } => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let duplicate = RsbackError::DuplicateLogPath {
            path: "/var/log/run.log".to_string(),
        };
        assert!(format!("{duplicate}").contains("/var/log/run.log"));

        let template = RsbackError::InvalidTemplate {
            template: "/backup/%q".to_string(),
        };
        assert!(format!("{template}").contains("/backup/%q"));

        let config = RsbackError::config("missing source.path");
        assert!(format!("{config}").contains("missing source.path"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RsbackError::BothEndpointsRemote.exit_code(), 2);
        assert_eq!(RsbackError::MissingServer.exit_code(), 2);
        assert_eq!(RsbackError::config("bad").exit_code(), 2);

        let io = RsbackError::Io(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(io.exit_code(), 1);

        let spawn = RsbackError::Spawn {
            tool: "rsync".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(spawn.exit_code(), 1);
    }
}
