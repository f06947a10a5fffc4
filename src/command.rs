use crate::job::BackupJob;
use std::collections::BTreeSet;

/// Transfer-behavior flags present in every invocation.
const BASELINE_OPTIONS: [&str; 11] = [
    "--update",
    "--recursive",
    "--compress",
    "--links",
    "--times",
    "--checksum",
    "--delete",
    "--delete-excluded",
    "--one-file-system",
    "--verbose",
    "--progress",
];

/// Width of the framed, line-wrapped command rendering.
const RENDER_WIDTH: usize = 80;

/// Build the deduplicated option set for a validated job.
///
/// A `BTreeSet` gives both properties the command needs: repeated inserts
/// collapse, and iteration order is lexicographic, so the emitted command is
/// reproducible regardless of how options were accumulated.
pub fn option_set(job: &BackupJob) -> BTreeSet<String> {
    let config = &job.config;
    let resolved = &job.resolved;

    let mut options: BTreeSet<String> =
        BASELINE_OPTIONS.iter().map(|opt| opt.to_string()).collect();

    if let Some(partial_dir) = &resolved.partial_dir {
        options.insert("--partial".to_string());
        options.insert(format!("--partial-dir={partial_dir}"));
    }

    for pattern in &config.exclude {
        options.insert(format!("--exclude={pattern}"));
    }

    if let Some(history_dir) = &resolved.history_dir {
        options.insert("--backup".to_string());
        options.insert(format!("--backup-dir={history_dir}"));
    }

    if config.dry_run {
        options.insert("--dry-run".to_string());
        options.insert("--itemize-changes".to_string());
    }

    if let Some(actions_file) = &resolved.actions_file {
        options.insert(format!("--log-file={actions_file}"));
    }

    if let Some(server) = &config.server {
        if let Some(timeout) = server.timeout {
            options.insert(format!("--timeout={timeout}"));
        }

        if server.ssh_path.is_some()
            || server.port.is_some()
            || server.keyfile.is_some()
            || server.rsync_path.is_some()
        {
            let mut ssh = vec![server
                .ssh_path
                .clone()
                .unwrap_or_else(|| "ssh".to_string())];
            if let Some(port) = server.port {
                ssh.push(format!("-p {port}"));
            }
            if let Some(keyfile) = &resolved.keyfile {
                ssh.push(format!("-i \"{keyfile}\""));
            }
            if let Some(rsync_path) = &server.rsync_path {
                ssh.push(format!("--rsync-path=\"{rsync_path}\""));
            }
            options.insert(format!("--rsh={}", ssh.join(" ")));
        }
    }

    options
}

/// Assemble the full invocation vector: binary, sorted options, then the
/// resolved source and destination, remote one prefixed with `[user@]host:`.
pub fn compose_command(job: &BackupJob) -> Vec<String> {
    let config = &job.config;

    let mut source = job.resolved.source_dir.clone();
    let mut destination = job.resolved.destination_dir.clone();
    if let Some(server) = &config.server {
        let prefix = match &server.username {
            Some(username) => format!("{username}@{}:", server.host),
            None => format!("{}:", server.host),
        };
        if config.source.remote {
            source = format!("{prefix}{source}");
        }
        if config.destination.remote {
            destination = format!("{prefix}{destination}");
        }
    }

    let mut command = Vec::with_capacity(BASELINE_OPTIONS.len() + 8);
    command.push(config.rsync_binary.clone());
    command.extend(option_set(job));
    command.push(source);
    command.push(destination);
    command
}

/// Render the command as a wrapped, copy-pasteable shell string.
///
/// The binary goes on the first line, every option on its own indented line,
/// source and destination on their own lines, followed by the stdout/stderr
/// redirections when progress or errors channels write to files. Lines are
/// padded and joined with backslash continuations. Presentational only; the
/// process is launched from [`compose_command`].
pub fn render_command(job: &BackupJob) -> String {
    let command = compose_command(job);

    // quote option values that would otherwise split in a shell
    let quoted: Vec<String> = command
        .iter()
        .map(|part| {
            if part.contains('=') && part.contains(' ') {
                match part.split_once('=') {
                    Some((key, value)) => format!("{key}='{value}'"),
                    None => part.clone(),
                }
            } else {
                part.clone()
            }
        })
        .collect();

    let paths_at = quoted.len() - 2;
    let mut lines = vec![quoted[0].clone()];
    for option in &quoted[1..paths_at] {
        lines.push(format!("        {option}"));
    }
    lines.push(format!("    {}", quoted[paths_at]));
    lines.push(format!("    {}", quoted[paths_at + 1]));

    if let Some(progress_file) = &job.resolved.progress_file {
        lines.push(format!("1> {progress_file}"));
    }
    if let Some(errors_file) = &job.resolved.errors_file {
        lines.push(format!("2> {errors_file}"));
    }

    lines
        .iter()
        .map(|line| format!("{line:<RENDER_WIDTH$}"))
        .collect::<Vec<_>>()
        .join("\\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Destination, JobConfig, Server, Source};
    use chrono::{DateTime, Local, TimeZone};
    use std::path::Path;

    fn timestamp() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 31, 12, 30, 5).unwrap()
    }

    fn minimal() -> JobConfig {
        JobConfig {
            source: Source {
                path: "/source".to_string(),
                ..Source::default()
            },
            destination: Destination {
                path: "/destination".to_string(),
                ..Destination::default()
            },
            ..JobConfig::default()
        }
    }

    fn server(host: &str) -> Server {
        Server {
            host: host.to_string(),
            ..Server::default()
        }
    }

    fn command(config: JobConfig) -> Vec<String> {
        let job = BackupJob::new_at(config, Path::new("/root/path"), timestamp()).unwrap();
        compose_command(&job)
    }

    #[test]
    fn test_minimal() {
        let mut cmd = command(minimal());

        assert_eq!(cmd.remove(0), "rsync");
        assert_eq!(cmd.pop().unwrap(), "/destination/");
        assert_eq!(cmd.pop().unwrap(), "/source/");

        let mut expected: Vec<String> =
            BASELINE_OPTIONS.iter().map(|opt| opt.to_string()).collect();
        expected.sort();
        assert_eq!(cmd, expected);
    }

    #[test]
    fn test_options_sorted() {
        let mut config = minimal();
        config.exclude = vec!["zzz".to_string(), "aaa".to_string()];
        config.dry_run = true;
        let cmd = command(config);
        let options = &cmd[1..cmd.len() - 2];
        assert!(options.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_partial() {
        let mut config = minimal();
        config.destination.partial = Some("/partial".to_string());
        let cmd = command(config);
        assert!(cmd.contains(&"--partial".to_string()));
        assert!(cmd.contains(&"--partial-dir=/partial/".to_string()));
    }

    #[test]
    fn test_history() {
        let mut config = minimal();
        config.destination.history = Some("/history".to_string());
        let cmd = command(config);
        assert!(cmd.contains(&"--backup".to_string()));
        assert!(cmd.contains(&"--backup-dir=/history/".to_string()));
    }

    #[test]
    fn test_exclude_single() {
        let mut config = minimal();
        config.exclude = vec!["single".to_string()];
        let cmd = command(config);
        assert!(cmd.contains(&"--exclude=single".to_string()));
    }

    #[test]
    fn test_exclude_with_space() {
        let mut config = minimal();
        config.exclude = vec!["single space".to_string()];
        let cmd = command(config);
        assert!(cmd.contains(&"--exclude=single space".to_string()));
    }

    #[test]
    fn test_exclude_list() {
        let mut config = minimal();
        config.exclude = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let cmd = command(config);
        assert!(cmd.contains(&"--exclude=one".to_string()));
        assert!(cmd.contains(&"--exclude=two".to_string()));
        assert!(cmd.contains(&"--exclude=three".to_string()));
        let count = cmd.iter().filter(|opt| opt.starts_with("--exclude=")).count();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_exclude_duplicates_collapse() {
        let mut config = minimal();
        config.exclude = vec!["same".to_string(), "same".to_string()];
        let cmd = command(config);
        let count = cmd.iter().filter(|opt| opt.starts_with("--exclude=")).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_dry_run() {
        let mut config = minimal();
        config.dry_run = true;
        let cmd = command(config);
        assert!(cmd.contains(&"--dry-run".to_string()));
        assert!(cmd.contains(&"--itemize-changes".to_string()));
    }

    #[test]
    fn test_actions_log_file() {
        let mut config = minimal();
        config.logging.actions = Some("/actions".to_string());
        let cmd = command(config);
        assert!(cmd.contains(&"--log-file=/actions".to_string()));
    }

    #[test]
    fn test_actions_log_file_with_space() {
        let mut config = minimal();
        config.logging.actions = Some("/actions with space".to_string());
        let cmd = command(config);
        assert!(cmd.contains(&"--log-file=/actions with space".to_string()));
    }

    #[test]
    fn test_custom_rsync_binary() {
        let mut config = minimal();
        config.rsync_binary = "/sbin/rsync".to_string();
        let cmd = command(config);
        assert_eq!(cmd[0], "/sbin/rsync");
    }

    #[test]
    fn test_remote_source() {
        let mut config = minimal();
        config.source.remote = true;
        config.server = Some(server("host"));
        let mut cmd = command(config);
        assert_eq!(cmd.pop().unwrap(), "/destination/");
        assert_eq!(cmd.pop().unwrap(), "host:/source/");
    }

    #[test]
    fn test_remote_destination() {
        let mut config = minimal();
        config.destination.remote = true;
        config.server = Some(server("host"));
        let mut cmd = command(config);
        assert_eq!(cmd.pop().unwrap(), "host:/destination/");
        assert_eq!(cmd.pop().unwrap(), "/source/");
    }

    #[test]
    fn test_remote_with_username() {
        let mut config = minimal();
        config.destination.remote = true;
        let mut srv = server("host");
        srv.username = Some("user".to_string());
        config.server = Some(srv);
        let mut cmd = command(config);
        assert_eq!(cmd.pop().unwrap(), "user@host:/destination/");
    }

    #[test]
    fn test_remote_timeout() {
        let mut config = minimal();
        config.destination.remote = true;
        let mut srv = server("host");
        srv.timeout = Some(60);
        config.server = Some(srv);
        let cmd = command(config);
        assert!(cmd.contains(&"--timeout=60".to_string()));
    }

    #[test]
    fn test_remote_port() {
        let mut config = minimal();
        config.destination.remote = true;
        let mut srv = server("host");
        srv.port = Some(60);
        config.server = Some(srv);
        let cmd = command(config);
        assert!(cmd.contains(&"--rsh=ssh -p 60".to_string()));
    }

    #[test]
    fn test_remote_keyfile() {
        let mut config = minimal();
        config.destination.remote = true;
        let mut srv = server("host");
        srv.keyfile = Some("/keyfile".to_string());
        config.server = Some(srv);
        let cmd = command(config);
        assert!(cmd.contains(&"--rsh=ssh -i \"/keyfile\"".to_string()));
    }

    #[test]
    fn test_remote_rsync_path() {
        let mut config = minimal();
        config.destination.remote = true;
        let mut srv = server("host");
        srv.rsync_path = Some("/usr/local/bin/rsync".to_string());
        config.server = Some(srv);
        let cmd = command(config);
        assert!(cmd.contains(&"--rsh=ssh --rsync-path=\"/usr/local/bin/rsync\"".to_string()));
    }

    #[test]
    fn test_custom_ssh_binary_alone_builds_rsh() {
        let mut config = minimal();
        config.destination.remote = true;
        let mut srv = server("host");
        srv.ssh_path = Some("/usr/bin/ssh".to_string());
        config.server = Some(srv);
        let cmd = command(config);
        assert!(cmd.contains(&"--rsh=/usr/bin/ssh".to_string()));
    }

    #[test]
    fn test_server_without_transport_settings_has_no_rsh() {
        let mut config = minimal();
        config.destination.remote = true;
        config.server = Some(server("host"));
        let cmd = command(config);
        assert!(!cmd.iter().any(|opt| opt.starts_with("--rsh=")));
    }

    #[test]
    fn test_relative_paths() {
        let mut config = minimal();
        config.source.path = "source".to_string();
        config.destination = Destination {
            path: "destination".to_string(),
            remote: false,
            history: Some("history".to_string()),
            partial: Some("partial".to_string()),
        };
        config.logging.actions = Some("actions".to_string());
        let mut srv = server("host");
        srv.keyfile = Some("keyfile".to_string());
        config.server = Some(srv);

        let mut cmd = command(config);
        assert_eq!(cmd.pop().unwrap(), "/root/path/destination/");
        assert_eq!(cmd.pop().unwrap(), "/root/path/source/");
        assert!(cmd.contains(&"--partial-dir=/root/path/partial/".to_string()));
        assert!(cmd.contains(&"--backup-dir=/root/path/history/".to_string()));
        assert!(cmd.contains(&"--log-file=/root/path/actions".to_string()));
        assert!(cmd.contains(&"--rsh=ssh -i \"/root/path/keyfile\"".to_string()));
    }

    #[test]
    fn test_absolute_paths_ignore_cwd() {
        let mut config = minimal();
        config.destination.partial = Some("/partial".to_string());
        config.destination.history = Some("/history".to_string());
        config.logging.actions = Some("/actions".to_string());
        let mut srv = server("host");
        srv.keyfile = Some("/keyfile".to_string());
        config.server = Some(srv);

        let mut cmd = command(config);
        assert_eq!(cmd.pop().unwrap(), "/destination/");
        assert_eq!(cmd.pop().unwrap(), "/source/");
        assert!(cmd.contains(&"--partial-dir=/partial/".to_string()));
        assert!(cmd.contains(&"--backup-dir=/history/".to_string()));
        assert!(cmd.contains(&"--log-file=/actions".to_string()));
        assert!(cmd.contains(&"--rsh=ssh -i \"/keyfile\"".to_string()));
    }

    #[test]
    fn test_render_quotes_values_with_spaces() {
        let mut config = minimal();
        config.exclude = vec!["a b".to_string()];
        let job = BackupJob::new_at(config, Path::new("/root/path"), timestamp()).unwrap();
        let rendered = render_command(&job);
        assert!(rendered.contains("--exclude='a b'"));
    }

    #[test]
    fn test_render_layout() {
        let mut config = minimal();
        config.logging.progress = Some("/progress".to_string());
        config.logging.errors = Some("/errors".to_string());
        let job = BackupJob::new_at(config, Path::new("/root/path"), timestamp()).unwrap();
        let rendered = render_command(&job);

        let lines: Vec<&str> = rendered.split("\\\n").collect();
        assert!(lines[0].starts_with("rsync"));
        assert!(lines.iter().all(|line| line.len() == RENDER_WIDTH));
        assert!(lines.iter().any(|line| line.starts_with("1> /progress")));
        assert!(lines.iter().any(|line| line.starts_with("2> /errors")));
        // one option per line, each indented
        assert!(lines[1].starts_with("        --"));
        // source and destination on their own lines before the redirections
        assert!(lines
            .iter()
            .any(|line| line.starts_with("    /source/")));
        assert!(lines
            .iter()
            .any(|line| line.starts_with("    /destination/")));
    }
}
