//! Constants for the download module.

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large scans).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default archive file name prefix.
pub const DEFAULT_ARCHIVE_PREFIX: &str = "crmm";

/// Suffix of the temporary sibling a resource is written to before rename.
pub const PART_SUFFIX: &str = ".part";
