//! Purpose: Data-root and table-name path resolution helpers.
//! Exports: `default_data_root` and `resolve_named_table_path`.
//! Role: Keep CLI and API-client path semantics aligned from one source.
//! Invariants: Default data root is `$COLMAP_DATA_ROOT`, else `~/.questdb/ROOT/db`.
//! Invariants: Named table refs are single path components.

use std::path::{Path, PathBuf};

pub(crate) const DATA_ROOT_ENV: &str = "COLMAP_DATA_ROOT";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum TableNameResolveError {
    Empty,
    ContainsPathSeparator,
    Relative,
}

pub(crate) fn default_data_root() -> PathBuf {
    if let Some(root) = std::env::var_os(DATA_ROOT_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(root);
    }
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".questdb").join("ROOT").join("db")
}

pub(crate) fn resolve_named_table_path(
    name: &str,
    data_root: &Path,
) -> Result<PathBuf, TableNameResolveError> {
    if name.is_empty() {
        return Err(TableNameResolveError::Empty);
    }
    if name.chars().any(std::path::is_separator) {
        return Err(TableNameResolveError::ContainsPathSeparator);
    }
    if name == "." || name == ".." {
        return Err(TableNameResolveError::Relative);
    }
    Ok(data_root.join(name))
}

#[cfg(test)]
mod tests {
    use super::{TableNameResolveError, resolve_named_table_path};
    use std::path::PathBuf;

    #[test]
    fn names_join_the_data_root() {
        let root = PathBuf::from("/var/db");
        assert_eq!(
            resolve_named_table_path("trades", &root),
            Ok(PathBuf::from("/var/db/trades"))
        );
    }

    #[test]
    fn names_must_be_one_component() {
        let root = PathBuf::from("/var/db");
        assert_eq!(
            resolve_named_table_path("a/b", &root),
            Err(TableNameResolveError::ContainsPathSeparator)
        );
        assert_eq!(resolve_named_table_path("..", &root), Err(TableNameResolveError::Relative));
        assert_eq!(resolve_named_table_path("", &root), Err(TableNameResolveError::Empty));
    }
}
