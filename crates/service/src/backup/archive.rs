//! On-disk archive format: a deflate zip holding `database_backup.json`,
//! `backup_metadata.json` and an optional `uploads/` tree.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Seek, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use models::WorkspaceId;

use super::errors::BackupError;
use super::uploads::StagedUpload;

pub const DUMP_MEMBER: &str = "database_backup.json";
pub const METADATA_MEMBER: &str = "backup_metadata.json";
pub const UPLOADS_DIR: &str = "uploads";
pub const FORMAT_VERSION: &str = "1.0";
/// Local wall-clock time of creation, e.g. `20240315_142501`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub type Row = serde_json::Map<String, serde_json::Value>;
/// Table name to rows, each row a column-name to scalar mapping.
pub type TableDump = BTreeMap<String, Vec<Row>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub backup_id: String,
    pub timestamp: String,
    pub workspace_id: Option<WorkspaceId>,
    pub include_uploads: bool,
    pub tables: Option<Vec<String>>,
    pub version: String,
}

impl BackupMetadata {
    /// `None` when the stored timestamp does not follow [`TIMESTAMP_FORMAT`].
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT).ok()
    }
}

/// One archive in the backup directory, as reported by create and list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupInfo {
    pub backup_id: String,
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
    pub timestamp: String,
    pub created_at: Option<NaiveDateTime>,
    pub workspace_id: Option<WorkspaceId>,
    pub include_uploads: bool,
    pub tables: Option<Vec<String>>,
    pub version: String,
}

impl BackupInfo {
    pub fn from_metadata(metadata: BackupMetadata, filename: String, path: PathBuf, size: u64) -> Self {
        let created_at = metadata.created_at();
        Self {
            backup_id: metadata.backup_id,
            filename,
            path,
            size,
            timestamp: metadata.timestamp,
            created_at,
            workspace_id: metadata.workspace_id,
            include_uploads: metadata.include_uploads,
            tables: metadata.tables,
            version: metadata.version,
        }
    }
}

fn deflated() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
}

/// Write the whole archive into `out`. Upload sources are streamed from disk.
pub fn write_archive<W: Write + Seek>(
    out: W,
    dump: &TableDump,
    metadata: &BackupMetadata,
    uploads: &[StagedUpload],
) -> Result<W, BackupError> {
    let mut zip = ZipWriter::new(out);

    zip.start_file(DUMP_MEMBER, deflated())?;
    serde_json::to_writer_pretty(&mut zip, dump)?;

    for upload in uploads {
        zip.start_file(upload.archive_name.as_str(), deflated())?;
        let mut src = File::open(&upload.source)?;
        io::copy(&mut src, &mut zip)?;
    }

    zip.start_file(METADATA_MEMBER, deflated())?;
    serde_json::to_writer_pretty(&mut zip, metadata)?;

    Ok(zip.finish()?)
}

/// Read only the metadata member. Any defect is reported as `InvalidArchive`
/// so listings can skip the file.
pub fn read_metadata(path: &Path) -> Result<BackupMetadata, BackupError> {
    let file = File::open(path)?;
    let mut zip = ZipArchive::new(BufReader::new(file))
        .map_err(|e| BackupError::invalid_archive(path, e.to_string()))?;
    let member = match zip.by_name(METADATA_MEMBER) {
        Ok(member) => member,
        Err(ZipError::FileNotFound) => {
            return Err(BackupError::invalid_archive(path, format!("missing {METADATA_MEMBER}")))
        }
        Err(e) => return Err(BackupError::invalid_archive(path, e.to_string())),
    };
    serde_json::from_reader(member)
        .map_err(|e| BackupError::invalid_archive(path, format!("unreadable {METADATA_MEMBER}: {e}")))
}

/// Extract `path` into `dest` and parse its metadata and table dump.
pub fn unpack(path: &Path, dest: &Path) -> Result<(BackupMetadata, TableDump), BackupError> {
    let file = File::open(path)?;
    let mut zip = ZipArchive::new(BufReader::new(file))
        .map_err(|e| BackupError::invalid_archive(path, e.to_string()))?;
    zip.extract(dest).map_err(|e| match e {
        ZipError::Io(io) => BackupError::Io(io),
        other => BackupError::invalid_archive(path, other.to_string()),
    })?;

    let metadata: BackupMetadata = read_member(path, &dest.join(METADATA_MEMBER))?;
    let dump: TableDump = read_member(path, &dest.join(DUMP_MEMBER))?;
    Ok((metadata, dump))
}

fn read_member<T: serde::de::DeserializeOwned>(archive: &Path, member: &Path) -> Result<T, BackupError> {
    let name = member.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let bytes = match fs::read(member) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(BackupError::invalid_archive(archive, format!("missing {name}")))
        }
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes).map_err(|e| BackupError::invalid_archive(archive, format!("unreadable {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata() -> BackupMetadata {
        BackupMetadata {
            backup_id: "a1b2c3d4".into(),
            timestamp: "20240315_142501".into(),
            workspace_id: Some(3),
            include_uploads: true,
            tables: Some(vec!["invoices".into()]),
            version: FORMAT_VERSION.into(),
        }
    }

    #[test]
    fn writes_and_unpacks() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("logo.png");
        fs::write(&upload, b"png").unwrap();

        let mut row = Row::new();
        row.insert("id".into(), json!(1));
        let mut dump = TableDump::new();
        dump.insert("invoices".into(), vec![row]);

        let path = dir.path().join("a.zip");
        let file = File::create(&path).unwrap();
        let staged = vec![StagedUpload { source: upload, archive_name: "uploads/3/logo.png".into() }];
        write_archive(file, &dump, &metadata(), &staged).unwrap();

        assert_eq!(read_metadata(&path).unwrap(), metadata());

        let out = dir.path().join("out");
        let (meta, restored) = unpack(&path, &out).unwrap();
        assert_eq!(meta.created_at().map(|t| t.to_string()), Some("2024-03-15 14:25:01".to_string()));
        assert_eq!(restored, dump);
        assert_eq!(fs::read(out.join("uploads/3/logo.png")).unwrap(), b"png");
    }

    #[test]
    fn metadata_member_is_required() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.zip");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        zip.start_file(DUMP_MEMBER, deflated()).unwrap();
        zip.write_all(b"{}").unwrap();
        zip.finish().unwrap();

        assert!(matches!(read_metadata(&path), Err(BackupError::InvalidArchive { .. })));
        assert!(matches!(unpack(&path, &dir.path().join("x")), Err(BackupError::InvalidArchive { .. })));
    }

    #[test]
    fn garbage_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.zip");
        fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(read_metadata(&path), Err(BackupError::InvalidArchive { .. })));
    }
}
