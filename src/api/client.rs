//! Purpose: Define the public API client surface for local table resolution.
//! Exports: `TableRef`, `LocalClient`, and read-only table operations.
//! Role: Stable boundary for embedders; mirrors CLI resolution rules.
//! Invariants: Table resolution is `<data_root>/<name>` or an explicit path.
//! Invariants: The client never creates, modifies, or deletes table files.
#![allow(clippy::result_large_err)]

use super::validation::validate_table_report;
use super::{ValidationIssue, ValidationReport};
use crate::core::error::{Error, ErrorKind, io_error_kind};
use crate::core::format::META_FILE;
use crate::core::meta::ReaderOptions;
use crate::core::table::Table;
use crate::table_paths::{TableNameResolveError, default_data_root, resolve_named_table_path};
use std::path::{Path, PathBuf};

pub type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TableRef {
    Name(String),
    Path(PathBuf),
}

impl TableRef {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Bare names resolve under the data root; anything with a separator is a path.
    pub fn parse(input: &str) -> Self {
        if input.chars().any(std::path::is_separator) {
            Self::Path(PathBuf::from(input))
        } else {
            Self::Name(input.to_string())
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TableRef::Name(name) => name.clone(),
            TableRef::Path(path) => path.to_string_lossy().to_string(),
        }
    }

    fn resolve_local_path(&self, data_root: &Path) -> ApiResult<PathBuf> {
        match self {
            TableRef::Name(name) => resolve_name(name, data_root),
            TableRef::Path(path) => Ok(path.clone()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LocalClient {
    data_root: PathBuf,
    options: ReaderOptions,
}

impl LocalClient {
    pub fn new() -> Self {
        Self {
            data_root: default_data_root(),
            options: ReaderOptions::default(),
        }
    }

    pub fn with_data_root(mut self, data_root: impl Into<PathBuf>) -> Self {
        self.data_root = data_root.into();
        self
    }

    pub fn with_options(mut self, options: ReaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn options(&self) -> ReaderOptions {
        self.options
    }

    pub fn table_path(&self, table_ref: &TableRef) -> ApiResult<PathBuf> {
        table_ref.resolve_local_path(&self.data_root)
    }

    pub fn open_table(&self, table_ref: &TableRef) -> ApiResult<Table> {
        let path = self.table_path(table_ref)?;
        Table::open(&path, self.options)
    }

    /// Names of directories under the data root that carry a `_meta` file, sorted.
    pub fn list_tables(&self) -> ApiResult<Vec<String>> {
        let entries = match std::fs::read_dir(&self.data_root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(Error::new(io_error_kind(&err))
                    .with_message("failed to read data root")
                    .with_path(&self.data_root)
                    .with_source(err));
            }
        };

        let mut tables = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read data root entry")
                    .with_path(&self.data_root)
                    .with_source(err)
            })?;
            let path = entry.path();
            if !path.join(META_FILE).is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                tables.push(name.to_string());
            }
        }
        tables.sort();
        Ok(tables)
    }

    pub fn validate_table(&self, table_ref: &TableRef) -> ApiResult<ValidationReport> {
        let path = self.table_path(table_ref)?;
        let report = match Table::open(&path, self.options) {
            Ok(table) => validate_table_report(&table),
            Err(err) if err.kind() == ErrorKind::Corrupt => {
                ValidationReport::corrupt(path, ValidationIssue::from_error(&err))
            }
            Err(err) => return Err(err),
        };
        Ok(report.with_table_ref(table_ref.describe()))
    }
}

impl Default for LocalClient {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_name(name: &str, data_root: &Path) -> ApiResult<PathBuf> {
    resolve_named_table_path(name, data_root).map_err(map_table_name_resolve_error)
}

fn map_table_name_resolve_error(err: TableNameResolveError) -> Error {
    let message = match err {
        TableNameResolveError::Empty => "table name must not be empty",
        TableNameResolveError::ContainsPathSeparator => {
            "table name must not contain path separators"
        }
        TableNameResolveError::Relative => "table name must not be '.' or '..'",
    };
    Error::new(ErrorKind::Usage).with_message(message)
}
