//! Resource transport and the archive loop.
//!
//! This module provides:
//! - [`HttpClient`] - reqwest-backed [`ResourceFetcher`]
//! - [`ArchiveFetcher`] - idempotent per-record archival
//! - [`DownloadError`] - transport and storage errors

mod archive;
mod client;
mod constants;
mod error;
mod filename;

pub use archive::{ArchiveFailure, ArchiveFetcher, ArchiveReport, ArchiveStatus, ResourceKind};
pub use client::{HttpClient, ResourceFetcher};
pub use constants::{CONNECT_TIMEOUT_SECS, DEFAULT_ARCHIVE_PREFIX, READ_TIMEOUT_SECS};
pub use error::DownloadError;
