use crate::error::RsbackError;
use crate::Result;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Stdio;

/// One named log output, backed by a file when a path was configured.
#[derive(Debug)]
struct Channel {
    path: PathBuf,
    file: File,
}

impl Channel {
    fn open(path: Option<&str>) -> Result<Option<Self>> {
        let Some(path) = path else {
            return Ok(None);
        };
        let path = PathBuf::from(path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Some(Channel { path, file }))
    }
}

/// Scoped owner of the three log outputs for one run.
///
/// Channels without a configured path fall back to the parent process's
/// stdout (actions, progress) or stderr (errors). Release runs on every exit
/// path: the transient progress file is always removed, the errors file is
/// removed when it stayed empty, the actions file is always kept.
#[derive(Debug)]
pub struct LoggingSession {
    actions: Option<Channel>,
    progress: Option<Channel>,
    errors: Option<Channel>,
    released: bool,
}

impl LoggingSession {
    /// Open the configured channels, creating parent directories as needed.
    ///
    /// Files are opened in append mode so repeated runs accumulate in the
    /// same actions log. Two channels pointing at the same file would clobber
    /// each other, so identical paths are rejected up front.
    pub fn open(
        actions: Option<&str>,
        progress: Option<&str>,
        errors: Option<&str>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for path in [actions, progress, errors].into_iter().flatten() {
            if !seen.insert(path) {
                return Err(RsbackError::DuplicateLogPath {
                    path: path.to_string(),
                });
            }
        }

        Ok(LoggingSession {
            actions: Channel::open(actions)?,
            progress: Channel::open(progress)?,
            errors: Channel::open(errors)?,
            released: false,
        })
    }

    /// Write to the actions channel, falling back to stdout when unbound.
    pub fn write_actions(&mut self, text: &str) -> io::Result<()> {
        match &mut self.actions {
            Some(channel) => {
                channel.file.write_all(text.as_bytes())?;
                channel.file.flush()
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(text.as_bytes())?;
                stdout.flush()
            }
        }
    }

    /// Stdio for a child's stdout; inherits ours when the channel is unbound.
    pub fn progress_stdio(&self) -> io::Result<Stdio> {
        match &self.progress {
            Some(channel) => Ok(channel.file.try_clone()?.into()),
            None => Ok(Stdio::inherit()),
        }
    }

    /// Stdio for a child's stderr; inherits ours when the channel is unbound.
    pub fn errors_stdio(&self) -> io::Result<Stdio> {
        match &self.errors {
            Some(channel) => Ok(channel.file.try_clone()?.into()),
            None => Ok(Stdio::inherit()),
        }
    }

    /// Close the channels and apply the retention policy.
    ///
    /// Dropping the session does the same; calling `close` explicitly
    /// surfaces removal errors instead of swallowing them.
    pub fn close(mut self) -> Result<()> {
        self.release()?;
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        // close all handles before touching the files
        drop(self.actions.take());
        let progress = self.progress.take();
        let errors = self.errors.take();

        if let Some(Channel { path, file }) = progress {
            drop(file);
            fs::remove_file(&path)?;
        }
        if let Some(Channel { path, file }) = errors {
            drop(file);
            if fs::metadata(&path)?.len() == 0 {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

impl Drop for LoggingSession {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
