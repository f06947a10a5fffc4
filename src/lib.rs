pub mod command;
pub mod config;
pub mod error;
pub mod job;
pub mod logger;
pub mod paths;
pub mod runner;

pub use command::{compose_command, render_command};
pub use config::load_job;
pub use error::RsbackError;
pub use job::{BackupJob, Destination, JobConfig, LogPaths, Server, Source};
pub use logger::LoggingSession;
pub use runner::run_job;

/// Main library result type
pub type Result<T> = std::result::Result<T, RsbackError>;
