//! Job-file ingestion.
//!
//! A backup job is described by an INI file with `[source]` and
//! `[destination]` sections, optional `[server]` and `[logging]` sections,
//! and a `[job]` section for run-level settings:
//!
//! ```ini
//! [job]
//! exclude = *.tmp, .cache
//!
//! [source]
//! path = /home/me/data
//!
//! [destination]
//! path = /mnt/backup/data
//! history = /mnt/backup/history/%Y-%m-%d
//! partial = /mnt/backup/partial
//!
//! [logging]
//! actions = /var/log/rsback/%Y%m%d.log
//! ```

use crate::error::RsbackError;
use crate::job::{Destination, JobConfig, LogPaths, Server, Source};
use crate::Result;
use configparser::ini::Ini;
use std::path::Path;

/// Load a job configuration from an INI job file.
pub fn load_job(path: &Path) -> Result<JobConfig> {
    let mut ini = Ini::new();
    ini.load(path)
        .map_err(|e| RsbackError::config(format!("Failed to parse job file: {e}")))?;

    let mut config = JobConfig::default();

    config.source = Source {
        path: require(&ini, "source", "path")?,
        remote: get_bool(&ini, "source", "remote")?.unwrap_or(false),
    };
    config.destination = Destination {
        path: require(&ini, "destination", "path")?,
        remote: get_bool(&ini, "destination", "remote")?.unwrap_or(false),
        history: ini.get("destination", "history"),
        partial: ini.get("destination", "partial"),
    };

    if let Some(value) = get_bool(&ini, "job", "dry_run")? {
        config.dry_run = value;
    }
    if let Some(value) = ini.get("job", "rsync_binary") {
        config.rsync_binary = value;
    }
    // a bare pattern becomes a one-element list
    if let Some(value) = ini.get("job", "exclude") {
        config.exclude = value
            .split(',')
            .map(|pattern| pattern.trim().to_string())
            .filter(|pattern| !pattern.is_empty())
            .collect();
    }

    config.logging = LogPaths {
        actions: ini.get("logging", "actions"),
        progress: ini.get("logging", "progress"),
        errors: ini.get("logging", "errors"),
    };

    if ini.sections().iter().any(|section| section == "server") {
        config.server = Some(Server {
            host: require(&ini, "server", "host")?,
            ssh_path: ini.get("server", "ssh_path"),
            port: get_number(&ini, "server", "port")?,
            username: ini.get("server", "username"),
            keyfile: ini.get("server", "keyfile"),
            rsync_path: ini.get("server", "rsync_path"),
            timeout: get_number(&ini, "server", "timeout")?,
        });
    }

    Ok(config)
}

fn require(ini: &Ini, section: &str, key: &str) -> Result<String> {
    ini.get(section, key)
        .ok_or_else(|| RsbackError::config(format!("Missing {section}.{key} in job file")))
}

fn get_bool(ini: &Ini, section: &str, key: &str) -> Result<Option<bool>> {
    match ini.get(section, key) {
        Some(value) => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| RsbackError::config(format!("Invalid boolean for {section}.{key}: {value}"))),
        None => Ok(None),
    }
}

fn get_number<T: std::str::FromStr>(ini: &Ini, section: &str, key: &str) -> Result<Option<T>> {
    match ini.get(section, key) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| RsbackError::config(format!("Invalid number for {section}.{key}: {value}"))),
        None => Ok(None),
    }
}

/// Parse a boolean value from INI string
fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}
