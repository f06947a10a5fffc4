use crate::error::RsbackError;
use crate::paths;
use crate::Result;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::Path;

/// Where a transfer reads from.
#[derive(Debug, Clone, Default)]
pub struct Source {
    /// Path template, possibly containing strftime directives.
    pub path: String,
    pub remote: bool,
}

/// Where a transfer writes to, with optional versioning and resume areas.
#[derive(Debug, Clone, Default)]
pub struct Destination {
    pub path: String,
    pub remote: bool,
    /// Directory template receiving pre-overwrite copies of changed files.
    pub history: Option<String>,
    /// Directory template staging partially transferred files for resume.
    pub partial: Option<String>,
}

/// Remote server access settings, required whenever an endpoint is remote.
#[derive(Debug, Clone, Default)]
pub struct Server {
    pub host: String,
    /// ssh binary to use instead of plain `ssh`.
    pub ssh_path: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    /// Identity file template passed to ssh with `-i`.
    pub keyfile: Option<String>,
    /// rsync binary location on the remote side.
    pub rsync_path: Option<String>,
    /// I/O timeout in seconds, passed through to rsync.
    pub timeout: Option<u64>,
}

/// Path templates for the three log channels of a run.
#[derive(Debug, Clone, Default)]
pub struct LogPaths {
    pub actions: Option<String>,
    pub progress: Option<String>,
    pub errors: Option<String>,
}

/// Raw job description as ingested from a job file and command-line flags.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub source: Source,
    pub destination: Destination,
    pub dry_run: bool,
    pub logging: LogPaths,
    pub server: Option<Server>,
    pub exclude: Vec<String>,
    /// Local rsync binary, overridable for non-standard installs.
    pub rsync_binary: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            source: Source::default(),
            destination: Destination::default(),
            dry_run: false,
            logging: LogPaths::default(),
            server: None,
            exclude: Vec::new(),
            rsync_binary: "rsync".to_string(),
        }
    }
}

/// Every path of a job resolved against the shared run timestamp.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedPaths {
    pub source_dir: String,
    pub destination_dir: String,
    pub partial_dir: Option<String>,
    pub history_dir: Option<String>,
    pub keyfile: Option<String>,
    pub actions_file: Option<String>,
    pub progress_file: Option<String>,
    pub errors_file: Option<String>,
}

/// A validated backup job, ready to be compiled into an rsync invocation.
///
/// All invariant checks and path resolution happen in the constructor; an
/// instance that exists is guaranteed consistent and is immutable afterwards.
#[derive(Debug)]
pub struct BackupJob {
    pub(crate) config: JobConfig,
    pub(crate) timestamp: DateTime<Local>,
    pub(crate) resolved: ResolvedPaths,
}

impl BackupJob {
    /// Validate a job configuration, capturing the run timestamp now.
    pub fn new(config: JobConfig, cwd: &Path) -> Result<Self> {
        Self::new_at(config, cwd, Local::now())
    }

    /// Validate a job configuration against an explicit timestamp.
    ///
    /// The timestamp is substituted into every path template of the job, so
    /// date-based fragments stay consistent across the whole run.
    pub fn new_at(config: JobConfig, cwd: &Path, timestamp: DateTime<Local>) -> Result<Self> {
        if config.source.remote && config.destination.remote {
            return Err(RsbackError::BothEndpointsRemote);
        }
        if (config.source.remote || config.destination.remote) && config.server.is_none() {
            return Err(RsbackError::MissingServer);
        }

        let keyfile = config.server.as_ref().and_then(|s| s.keyfile.as_deref());
        let resolved = ResolvedPaths {
            source_dir: paths::resolve(&config.source.path, cwd, &timestamp, true)?,
            destination_dir: paths::resolve(&config.destination.path, cwd, &timestamp, true)?,
            partial_dir: paths::resolve_opt(
                config.destination.partial.as_deref(),
                cwd,
                &timestamp,
                true,
            )?,
            history_dir: paths::resolve_opt(
                config.destination.history.as_deref(),
                cwd,
                &timestamp,
                true,
            )?,
            keyfile: paths::resolve_opt(keyfile, cwd, &timestamp, false)?,
            actions_file: paths::resolve_opt(
                config.logging.actions.as_deref(),
                cwd,
                &timestamp,
                false,
            )?,
            progress_file: paths::resolve_opt(
                config.logging.progress.as_deref(),
                cwd,
                &timestamp,
                false,
            )?,
            errors_file: paths::resolve_opt(
                config.logging.errors.as_deref(),
                cwd,
                &timestamp,
                false,
            )?,
        };

        check_distinct_log_paths(&resolved)?;

        Ok(BackupJob {
            config,
            timestamp,
            resolved,
        })
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn timestamp(&self) -> &DateTime<Local> {
        &self.timestamp
    }

    /// Resolved log file paths in channel order: actions, progress, errors.
    pub fn log_paths(&self) -> (Option<&str>, Option<&str>, Option<&str>) {
        (
            self.resolved.actions_file.as_deref(),
            self.resolved.progress_file.as_deref(),
            self.resolved.errors_file.as_deref(),
        )
    }
}

fn check_distinct_log_paths(resolved: &ResolvedPaths) -> Result<()> {
    let mut seen = HashSet::new();
    let bound = [
        resolved.actions_file.as_deref(),
        resolved.progress_file.as_deref(),
        resolved.errors_file.as_deref(),
    ];
    for path in bound.into_iter().flatten() {
        if !seen.insert(path) {
            return Err(RsbackError::DuplicateLogPath {
                path: path.to_string(),
            });
        }
    }
    Ok(())
}
