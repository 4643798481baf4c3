use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use models::WorkspaceId;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static pattern"));
static UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("static pattern"));

const MAX_NAME_LEN: usize = 64;

/// Eight hex characters of a random v4 uuid.
pub fn new_backup_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Reduce a user supplied name to `[A-Za-z0-9_.-]`, whitespace becoming `_`.
/// Returns `None` when nothing usable is left.
pub fn sanitize_name(name: &str) -> Option<String> {
    let underscored = WHITESPACE.replace_all(name.trim(), "_");
    let cleaned = UNSAFE.replace_all(&underscored, "");
    let trimmed: String = cleaned
        .trim_matches(|c| c == '.' || c == '_')
        .chars()
        .take(MAX_NAME_LEN)
        .collect();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// `<name>_<ts>.zip` for named backups, otherwise
/// `backup_workspace_<id>_<ts>_<backup_id>.zip` or
/// `backup_all_workspaces_<ts>_<backup_id>.zip`.
pub fn archive_filename(
    name: Option<&str>,
    workspace_id: Option<WorkspaceId>,
    timestamp: &str,
    backup_id: &str,
) -> String {
    if let Some(prefix) = name.and_then(sanitize_name) {
        return format!("{prefix}_{timestamp}.zip");
    }
    match workspace_id {
        Some(id) => format!("backup_workspace_{id}_{timestamp}_{backup_id}.zip"),
        None => format!("backup_all_workspaces_{timestamp}_{backup_id}.zip"),
    }
}

/// A bare `.zip` file name with no directory components.
pub fn is_archive_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename.ends_with(".zip")
        && !filename.starts_with('.')
        && !filename.contains(['/', '\\'])
}
