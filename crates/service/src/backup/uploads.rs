//! Staging tenant upload files into an archive and copying them back.
//!
//! A tenant backup stores `<uploads_root>/<id>/...` as `uploads/<id>/...`;
//! an all-workspace backup stores the whole root as `uploads/...`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use models::WorkspaceId;

use super::archive::UPLOADS_DIR;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    pub source: PathBuf,
    pub archive_name: String,
}

/// Every regular file below the upload directory of `workspace_id` (or the
/// whole root), sorted by archive name. A missing directory yields nothing.
pub fn collect(uploads_root: &Path, workspace_id: Option<WorkspaceId>) -> io::Result<Vec<StagedUpload>> {
    let (base, prefix) = match workspace_id {
        Some(id) => (uploads_root.join(id.to_string()), format!("{UPLOADS_DIR}/{id}")),
        None => (uploads_root.to_path_buf(), UPLOADS_DIR.to_string()),
    };
    if !base.is_dir() {
        debug!(dir = %base.display(), "no upload directory to back up");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    walk_files(&base, &mut files)?;
    let mut staged: Vec<StagedUpload> = files
        .into_iter()
        .filter_map(|source| {
            let rel = relative_segments(&base, &source)?;
            Some(StagedUpload { archive_name: format!("{prefix}/{}", rel.join("/")), source })
        })
        .collect();
    staged.sort_by(|a, b| a.archive_name.cmp(&b.archive_name));
    Ok(staged)
}

/// Where an extracted upload lands. A leading segment naming the original
/// workspace is swapped for the target; anything else goes below the
/// target's directory, or the root when there is no target.
pub fn destination(
    uploads_root: &Path,
    rel: &[String],
    original: Option<WorkspaceId>,
    target: Option<WorkspaceId>,
) -> PathBuf {
    let mut dest = uploads_root.to_path_buf();
    let leading_is_original = match (original, rel.first()) {
        (Some(orig), Some(first)) => *first == orig.to_string(),
        _ => false,
    };
    let rest = if leading_is_original {
        let owner = target.or(original).map(|id| id.to_string()).unwrap_or_default();
        dest.push(owner);
        &rel[1..]
    } else {
        if let Some(t) = target {
            dest.push(t.to_string());
        }
        rel
    };
    for segment in rest {
        dest.push(segment);
    }
    dest
}

/// Copy an extracted `uploads/` tree into place. Individual failures are
/// logged and skipped; returns the number of files copied.
pub fn restore(
    extracted: &Path,
    uploads_root: &Path,
    original: Option<WorkspaceId>,
    target: Option<WorkspaceId>,
) -> io::Result<usize> {
    let mut files = Vec::new();
    walk_files(extracted, &mut files)?;
    let mut copied = 0;
    for source in files {
        let Some(rel) = relative_segments(extracted, &source) else { continue };
        let dest = destination(uploads_root, &rel, original, target);
        let result = dest
            .parent()
            .map(fs::create_dir_all)
            .transpose()
            .and_then(|_| fs::copy(&source, &dest));
        match result {
            Ok(_) => copied += 1,
            Err(e) => warn!(file = %dest.display(), error = %e, "failed to restore upload"),
        }
    }
    Ok(copied)
}

fn walk_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let kind = entry.file_type()?;
        if kind.is_dir() {
            walk_files(&entry.path(), out)?;
        } else if kind.is_file() {
            out.push(entry.path());
        }
    }
    Ok(())
}

fn relative_segments(base: &Path, path: &Path) -> Option<Vec<String>> {
    let rel = path.strip_prefix(base).ok()?;
    Some(rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect())
}
