use crate::error::RsbackError;
use crate::Result;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use std::path::Path;

/// Expand strftime-style directives in a template against a fixed timestamp.
///
/// Resolution is a pure function of (template, timestamp) so that every path
/// of one job can share the timestamp captured at job construction.
pub fn expand_template(template: &str, timestamp: &DateTime<Local>) -> Result<String> {
    let items: Vec<Item> = StrftimeItems::new(template).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(RsbackError::InvalidTemplate {
            template: template.to_string(),
        });
    }
    Ok(timestamp.format_with_items(items.into_iter()).to_string())
}

/// Resolve a path template into the final string handed to rsync.
///
/// Absolute templates are used as-is, relative ones are joined under `cwd`.
/// Directory paths always get a trailing slash so rsync treats them as
/// directory contents rather than the directory itself.
pub fn resolve(
    template: &str,
    cwd: &Path,
    timestamp: &DateTime<Local>,
    is_dir: bool,
) -> Result<String> {
    let joined = if Path::new(template).is_absolute() {
        template.to_string()
    } else {
        cwd.join(template).to_string_lossy().into_owned()
    };

    let mut resolved = expand_template(&joined, timestamp)?;
    if is_dir && !resolved.ends_with('/') {
        resolved.push('/');
    }
    Ok(resolved)
}

/// Resolve an optional template, passing `None` through untouched.
pub fn resolve_opt(
    template: Option<&str>,
    cwd: &Path,
    timestamp: &DateTime<Local>,
    is_dir: bool,
) -> Result<Option<String>> {
    match template {
        Some(template) => resolve(template, cwd, timestamp, is_dir).map(Some),
        None => Ok(None),
    }
}
