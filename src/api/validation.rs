//! Purpose: Provide a stable, serializable validation report model.
//! Exports: `ValidationReport`, `ValidationStatus`, `ValidationIssue`.
//! Role: Shared contract for CLI diagnostics and API users.
//! Invariants: `issue_count == issues.len()`; status is `Corrupt` iff issues exist.
//! Invariants: Reports describe on-disk state only; no column data is embedded.

use crate::core::error::Error;
use crate::core::table::Table;
use crate::core::validate::{TableIssue, check_table};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Ok,
    Corrupt,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
    pub path: Option<PathBuf>,
    pub column: Option<String>,
    pub offset: Option<u64>,
}

impl From<TableIssue> for ValidationIssue {
    fn from(issue: TableIssue) -> Self {
        Self {
            code: issue.code.to_string(),
            message: issue.message,
            path: issue.path,
            column: issue.column,
            offset: None,
        }
    }
}

impl ValidationIssue {
    /// Issue for a table that could not be decoded at all.
    pub fn from_error(err: &Error) -> Self {
        Self {
            code: "decode".to_string(),
            message: err.message().unwrap_or("table files could not be decoded").to_string(),
            path: err.path().map(PathBuf::from),
            column: err.column().map(str::to_string),
            offset: err.offset(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValidationReport {
    pub table_ref: Option<String>,
    pub path: PathBuf,
    pub status: ValidationStatus,
    pub row_count: Option<usize>,
    pub partition_count: Option<usize>,
    pub issues: Vec<ValidationIssue>,
    pub issue_count: usize,
    pub remediation_hints: Vec<String>,
}

impl ValidationReport {
    pub fn ok(path: PathBuf) -> Self {
        Self {
            table_ref: None,
            path,
            status: ValidationStatus::Ok,
            row_count: None,
            partition_count: None,
            issues: Vec::new(),
            issue_count: 0,
            remediation_hints: Vec::new(),
        }
    }

    pub fn corrupt(path: PathBuf, issue: ValidationIssue) -> Self {
        Self::ok(path).set_issues(vec![issue])
    }

    pub fn with_table_ref(mut self, table_ref: impl Into<String>) -> Self {
        self.table_ref = Some(table_ref.into());
        self
    }

    pub fn set_issues(mut self, issues: Vec<ValidationIssue>) -> Self {
        self.issue_count = issues.len();
        self.issues = issues;
        if self.issue_count == 0 {
            self.status = ValidationStatus::Ok;
            self.remediation_hints.clear();
        } else {
            self.status = ValidationStatus::Corrupt;
            self.remediation_hints = vec![
                "Table files disagree with the commit log. Re-copy the table directory or let the engine finish its commit.".to_string(),
            ];
        }
        self
    }
}

pub(crate) fn validate_table_report(table: &Table) -> ValidationReport {
    let issues = check_table(table)
        .into_iter()
        .map(ValidationIssue::from)
        .collect();
    let mut report = ValidationReport::ok(table.root().to_path_buf()).set_issues(issues);
    report.row_count = Some(table.row_count());
    report.partition_count = Some(table.partitions().len());
    report
}
