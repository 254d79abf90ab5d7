//! Idempotent fetch-and-archive loop.
//!
//! Every record owns two archive files, `<prefix>_<filenum>.psd` and
//! `<prefix>_<filenum>.meta.xml`. A file that already exists is never
//! fetched again and never re-validated. New files are written to a
//! `.part` sibling and renamed into place, so an interrupted write cannot
//! leave a truncated file under the final name.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::client::ResourceFetcher;
use super::constants::{DEFAULT_ARCHIVE_PREFIX, PART_SUFFIX};
use super::error::DownloadError;
use super::filename::archive_file_name;
use crate::extract::{FileNum, RecordDescriptor};

/// The two resources archived per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The primary scan, linked from column 3.
    Primary,
    /// The metadata document, linked from column 4.
    Metadata,
}

impl ResourceKind {
    /// Both kinds, in processing order.
    pub const ALL: [Self; 2] = [Self::Primary, Self::Metadata];

    /// File extension of the archived file.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Primary => "psd",
            Self::Metadata => "meta.xml",
        }
    }

    /// The record URL this kind is fetched from.
    #[must_use]
    pub fn url(self, record: &RecordDescriptor) -> &str {
        match self {
            Self::Primary => record.mrg_url(),
            Self::Metadata => record.meta_url(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "PSD"),
            Self::Metadata => write!(f, "metadata"),
        }
    }
}

/// Outcome of archiving one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveStatus {
    /// The target already existed; nothing was fetched.
    Skipped,
    /// The resource was fetched and stored.
    Downloaded {
        /// Bytes written.
        bytes: u64,
    },
    /// Fetching or storing failed; no file was created.
    Failed {
        /// Status code or error message.
        detail: String,
    },
}

impl ArchiveStatus {
    /// True for [`Skipped`](Self::Skipped) and [`Downloaded`](Self::Downloaded).
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// One failed resource in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFailure {
    /// Sheet row of the record.
    pub line: u32,
    /// Record file number.
    pub filenum: FileNum,
    /// Which resource failed.
    pub kind: ResourceKind,
    /// The URL that was fetched.
    pub url: String,
    /// Status code or error message.
    pub detail: String,
}

/// Totals of one archive run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Resources fetched and stored.
    pub downloaded: usize,
    /// Resources already present.
    pub skipped: usize,
    /// Resources that failed, in processing order.
    pub failures: Vec<ArchiveFailure>,
}

impl ArchiveReport {
    /// Number of failed resources.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Number of resources present after the run.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.downloaded + self.skipped
    }

    fn record(&mut self, record: &RecordDescriptor, kind: ResourceKind, status: &ArchiveStatus) {
        match status {
            ArchiveStatus::Skipped => self.skipped += 1,
            ArchiveStatus::Downloaded { .. } => self.downloaded += 1,
            ArchiveStatus::Failed { detail } => self.failures.push(ArchiveFailure {
                line: record.line(),
                filenum: record.filenum().clone(),
                kind,
                url: kind.url(record).to_string(),
                detail: detail.clone(),
            }),
        }
    }
}

/// Archives record resources into one directory.
pub struct ArchiveFetcher<'a> {
    fetcher: &'a dyn ResourceFetcher,
    target_dir: PathBuf,
    prefix: String,
}

impl fmt::Debug for ArchiveFetcher<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveFetcher")
            .field("target_dir", &self.target_dir)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl<'a> ArchiveFetcher<'a> {
    /// Creates a fetcher writing into `target_dir` with the default prefix.
    pub fn new(fetcher: &'a dyn ResourceFetcher, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            target_dir: target_dir.into(),
            prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
        }
    }

    /// Replaces the file name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// The archive directory.
    #[must_use]
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Deterministic archive path for one resource of a record.
    #[must_use]
    pub fn target_path(&self, kind: ResourceKind, filenum: &FileNum) -> PathBuf {
        self.target_dir.join(archive_file_name(
            &self.prefix,
            &filenum.to_string(),
            kind.extension(),
        ))
    }

    /// Makes sure one resource of a record is archived.
    ///
    /// Existing targets are reported as [`ArchiveStatus::Skipped`] without
    /// any network access. Failures are returned as
    /// [`ArchiveStatus::Failed`] and leave no file behind.
    pub async fn ensure_archived(
        &self,
        record: &RecordDescriptor,
        kind: ResourceKind,
    ) -> ArchiveStatus {
        let path = self.target_path(kind, record.filenum());
        match tokio::fs::try_exists(&path).await {
            Ok(true) => {
                debug!(path = %path.display(), "skipping existing file");
                return ArchiveStatus::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                return ArchiveStatus::Failed {
                    detail: DownloadError::io(&path, e).to_string(),
                };
            }
        }

        let url = kind.url(record);
        info!(filenum = %record.filenum(), %kind, url, "downloading");
        let result = match self.fetcher.fetch_text(url).await {
            Ok(body) => write_atomic(&path, body.as_bytes()).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(bytes) => ArchiveStatus::Downloaded { bytes },
            Err(e) => {
                warn!(filenum = %record.filenum(), %kind, error = %e, "could not read {kind}");
                ArchiveStatus::Failed {
                    detail: e.to_string(),
                }
            }
        }
    }

    /// Archives both resources of every record, strictly in order.
    ///
    /// A failure never stops the batch. `on_resource` is called after each
    /// resource with its status.
    pub async fn archive_all<F>(
        &self,
        records: &[RecordDescriptor],
        mut on_resource: F,
    ) -> ArchiveReport
    where
        F: FnMut(&RecordDescriptor, ResourceKind, &ArchiveStatus),
    {
        let mut report = ArchiveReport::default();
        for record in records {
            for kind in ResourceKind::ALL {
                let status = self.ensure_archived(record, kind).await;
                report.record(record, kind, &status);
                on_resource(record, kind, &status);
            }
        }
        info!(
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed(),
            "archive run finished"
        );
        report
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

/// Writes `bytes` to a `.part` sibling, then renames it onto `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<u64, DownloadError> {
    let part = part_path(path);
    if let Err(e) = tokio::fs::write(&part, bytes).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(DownloadError::io(&part, e));
    }
    if let Err(e) = tokio::fs::rename(&part, path).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(DownloadError::io(path, e));
    }
    Ok(bytes.len() as u64)
}
