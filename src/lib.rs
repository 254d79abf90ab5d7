//! Sheetbridge Core Library
//!
//! Two batch tools share this library:
//! - `json2xlsx` turns a JSON document of named column lists into a
//!   workbook laid out by a [`Schema`], either one sheet per group
//!   ([`OutputMethod::Full`]) or a single wide sheet
//!   ([`OutputMethod::Compact`]).
//! - `xlsx-harvest` reads record rows from a workbook, writes an info JSON,
//!   and archives two linked resources per record, skipping files that are
//!   already on disk.
//!
//! # Architecture
//!
//! - [`sheet`] - in-memory workbook model with xlsx read/write
//! - [`schema`] - sheet and column layout for conversion
//! - [`convert`] - JSON to workbook conversion
//! - [`extract`] - workbook rows to record descriptors
//! - [`download`] - HTTP transport and the idempotent archive loop
//! - [`harvest`] - extraction plus archiving entry point
//! - [`config`], [`terminal`], [`exit`] - shared CLI plumbing

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod convert;
pub mod download;
pub mod exit;
pub mod extract;
pub mod harvest;
pub mod paths;
pub mod schema;
pub mod sheet;
pub mod terminal;
mod user_agent;

// Re-export commonly used types
pub use convert::{ConversionOutcome, ConversionRequest, ConvertError, OutputMethod, convert_file};
pub use download::{
    ArchiveFetcher, ArchiveReport, ArchiveStatus, DownloadError, HttpClient, ResourceFetcher,
    ResourceKind,
};
pub use extract::{ExtractError, FileNum, Location, RecordDescriptor, extract};
pub use harvest::{HarvestError, HarvestOutcome, HarvestPlan, HarvestRequest, harvest};
pub use schema::{Schema, SchemaError, SheetSpec};
pub use sheet::{CellValue, SheetError, Workbook, Worksheet};
