use crate::command;
use crate::error::RsbackError;
use crate::job::BackupJob;
use crate::logger::LoggingSession;
use crate::Result;
use std::path::Path;
use std::process::Command;

/// Execute a job's rsync invocation under a fresh logging session.
///
/// Writes a framed header (the rendered command) and footer (the exit code)
/// to the actions channel and attaches the child's stdout/stderr to the
/// progress/errors channels. The child's exit code is returned as data; a
/// nonzero code is a normal outcome for the caller to act on.
pub fn run_job(job: &BackupJob) -> Result<i32> {
    let (actions, progress, errors) = job.log_paths();
    let mut session = LoggingSession::open(actions, progress, errors)?;
    let code = run_with_session(job, &mut session)?;
    session.close()?;
    Ok(code)
}

fn run_with_session(job: &BackupJob, session: &mut LoggingSession) -> Result<i32> {
    let argv = command::compose_command(job);
    let frame = "-".repeat(80);

    session.write_actions(&format!(
        "{frame}\n{}\n{frame}\n",
        command::render_command(job)
    ))?;

    let mut child = Command::new(&argv[0])
        .args(&argv[1..])
        .stdout(session.progress_stdio()?)
        .stderr(session.errors_stdio()?)
        .spawn()
        .map_err(|source| RsbackError::Spawn {
            tool: argv[0].clone(),
            source,
        })?;
    let status = child.wait()?;
    // a signal-terminated child carries no code
    let code = status.code().unwrap_or(-1);

    session.write_actions(&format!(
        "{frame}\n{} finished with code {code}.\n",
        tool_name(&argv[0])
    ))?;
    Ok(code)
}

fn tool_name(binary: &str) -> String {
    Path::new(binary)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| binary.to_string())
}
