//! Pre-flight checks run before any data is read.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use ukbpq_core::dictionary::DataDictionary;
use ukbpq_core::dtype::{DtypeTable, TableSide};

use crate::error::{Error, Result};

/// Reason an output directory cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirProblem {
    NoWriteAccess(PathBuf),
    NotEmpty(PathBuf),
    ParentNotWritable { path: PathBuf, parent: PathBuf },
}

impl fmt::Display for DirProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirProblem::NoWriteAccess(p) => {
                write!(f, "given directory ({}) has no write access", p.display())
            }
            DirProblem::NotEmpty(p) => write!(
                f,
                "directory not empty, but force flag not set to force overwriting content of directory: {}",
                p.display()
            ),
            DirProblem::ParentNotWritable { path, parent } => write!(
                f,
                "directory {} can not be created due to no write access in parent directory '{}'",
                path.display(),
                parent.display()
            ),
        }
    }
}

fn is_writable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

fn is_dir_empty(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

/// First ancestor of `path` that exists; the working directory when none does.
pub fn first_existing_parent(path: &Path) -> PathBuf {
    let mut cur = path;
    loop {
        if cur.exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) if !p.as_os_str().is_empty() => cur = p,
            _ => return std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// Every reason `path` cannot receive output. Empty means usable.
pub fn check_output_dir(path: &Path, force: bool) -> Vec<DirProblem> {
    let mut problems = Vec::new();

    if path.exists() {
        if !is_writable(path) {
            problems.push(DirProblem::NoWriteAccess(path.to_path_buf()));
        }
        if !(force || is_dir_empty(path)) {
            problems.push(DirProblem::NotEmpty(path.to_path_buf()));
        }
    } else {
        let parent = first_existing_parent(path);
        if !is_writable(&parent) {
            problems.push(DirProblem::ParentNotWritable {
                path: path.to_path_buf(),
                parent,
            });
        }
    }
    problems
}

/// Dictionary types with no entry in the dtype table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingTypes {
    pub type_keys: BTreeSet<String>,
    pub encoding_keys: BTreeSet<String>,
}

impl MissingTypes {
    pub fn is_empty(&self) -> bool {
        self.type_keys.is_empty() && self.encoding_keys.is_empty()
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingTypes(self.to_string()))
        }
    }
}

impl fmt::Display for MissingTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:?}, {}: {:?}",
            TableSide::Type,
            self.type_keys,
            TableSide::EncodingType,
            self.encoding_keys
        )
    }
}

/// Types the dtype table must cover for `dict`.
///
/// Non-categorical entries need their `Type`; categorical entries need their
/// `Encoding_type` (used when the category limit is exceeded).
pub fn missing_types(
    table: &DtypeTable,
    dict: &DataDictionary,
    categorical_types: &[String],
) -> MissingTypes {
    let mut missing = MissingTypes::default();
    for entry in dict.entries() {
        if categorical_types.contains(&entry.type_name) {
            if let Some(enc) = &entry.encoding_type {
                if !table.encoding_map.contains_key(enc) {
                    missing.encoding_keys.insert(enc.clone());
                }
            }
        } else if !table.type_map.contains_key(&entry.type_name) {
            missing.type_keys.insert(entry.type_name.clone());
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use ukbpq_core::dictionary::DictEntry;
    use ukbpq_core::dtype::default_categorical_types;

    #[test]
    fn empty_existing_dir_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_output_dir(dir.path(), false).is_empty());
    }

    #[test]
    fn non_empty_dir_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("part.0.parquet"), b"x").unwrap();
        let problems = check_output_dir(dir.path(), false);
        assert_eq!(problems, vec![DirProblem::NotEmpty(dir.path().to_path_buf())]);
        assert!(check_output_dir(dir.path(), true).is_empty());
    }

    #[test]
    fn missing_dir_checks_first_existing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b");
        assert_eq!(first_existing_parent(&target), dir.path());
        assert!(check_output_dir(&target, false).is_empty());
    }

    #[test]
    fn finds_missing_types_on_both_sides() {
        let dict = DataDictionary::new(vec![
            DictEntry::new(None, "eid", None, "Sequence", "id"),
            DictEntry::new(None, "1-0.0", None, "Binary object", "blob"),
            DictEntry::new(
                None,
                "2-0.0",
                None,
                "Categorical (single)",
                "x Uses data-coding 3 comprises 4 Float-valued members in a simple list.",
            ),
        ]);
        let missing = missing_types(&DtypeTable::default(), &dict, &default_categorical_types());
        assert!(missing.type_keys.contains("Binary object"));
        assert!(missing.encoding_keys.contains("Float"));
        assert!(!missing.type_keys.contains("Sequence"));
        let err = missing.into_result().unwrap_err();
        assert!(err.to_string().contains("Encoding_type"));
    }
}
