//! Data dictionary model.
//!
//! One entry per dataset column (UDI such as `31-0.0`). Encoding metadata is
//! not stored in separate columns of the dictionary; it is recovered from the
//! free-text description, e.g.
//! `Sex Uses data-coding 9 comprises 2 Integer-valued members in a simple list.`

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DESCRIPTION_SPLIT: &str = " Uses data-coding";

fn encoding_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Uses data-coding (\d+)").expect("static regex"))
}

fn num_members_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Uses data-coding \d+ comprises (\d+)").expect("static regex"))
}

fn encoding_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Uses data-coding \d+ comprises \d+ (\w+)-valued").expect("static regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictEntry {
    /// Position of the column in the export.
    pub column: Option<u64>,
    pub udi: String,
    /// Number of participants with data.
    pub count: Option<u64>,
    pub type_name: String,
    pub description: String,
    pub encoding_id: Option<String>,
    pub encoding_num_members: Option<u64>,
    pub encoding_type: Option<String>,
    pub is_hierarchical: bool,
}

impl DictEntry {
    /// Build an entry and derive the encoding fields from `description`.
    pub fn new(
        column: Option<u64>,
        udi: impl Into<String>,
        count: Option<u64>,
        type_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let description = description.into();
        let capture = |re: &Regex| {
            re.captures(&description)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        };
        let encoding_id = capture(encoding_id_re());
        let encoding_num_members = capture(num_members_re()).and_then(|n| n.parse().ok());
        let encoding_type = capture(encoding_type_re());
        let is_hierarchical = description.contains("hierarchical");

        Self {
            column,
            udi: udi.into(),
            count,
            type_name: type_name.into(),
            description,
            encoding_id,
            encoding_num_members,
            encoding_type,
            is_hierarchical,
        }
    }

    /// Every `Categorical ...` type counts, whatever the configured list says.
    pub fn is_categorical(&self) -> bool {
        self.type_name.starts_with("Categorical")
    }

    pub fn has_encoding(&self) -> bool {
        self.encoding_id.is_some()
    }

    /// Field id: the UDI part before the first `-`.
    pub fn field_id(&self) -> &str {
        self.udi.split('-').next().unwrap_or(&self.udi)
    }

    /// Description without the data-coding suffix.
    pub fn human_readable_name(&self) -> &str {
        self.description
            .split_once(DESCRIPTION_SPLIT)
            .map(|(name, _)| name)
            .unwrap_or(&self.description)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataDictionary {
    entries: Vec<DictEntry>,
    by_udi: HashMap<String, Vec<usize>>,
}

impl DataDictionary {
    pub fn new(entries: Vec<DictEntry>) -> Self {
        let mut by_udi: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, e) in entries.iter().enumerate() {
            by_udi.entry(e.udi.clone()).or_default().push(i);
        }
        Self { entries, by_udi }
    }

    pub fn entries(&self) -> &[DictEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The single entry for `udi`.
    pub fn lookup(&self, udi: &str) -> Result<&DictEntry> {
        match self.by_udi.get(udi).map(Vec::as_slice) {
            None | Some([]) => Err(Error::Dictionary(format!(
                "UDI '{udi}' not found in the data dictionary"
            ))),
            Some([i]) => Ok(&self.entries[*i]),
            Some(many) => Err(Error::Dictionary(format!(
                "UDI '{udi}' found {} times in the data dictionary, expected exactly once",
                many.len()
            ))),
        }
    }

    fn by_field_id(&self, field_id: &str) -> Vec<&DictEntry> {
        self.entries
            .iter()
            .filter(|e| e.field_id() == field_id)
            .collect()
    }

    /// Human readable name of a UDI, or of a field id when `is_udi` is false.
    ///
    /// A field id matching several UDIs is only accepted when all their names agree.
    pub fn human_readable_name(&self, field: &str, is_udi: bool) -> Result<String> {
        if is_udi {
            return Ok(self.lookup(field)?.human_readable_name().to_string());
        }
        let matches = self.by_field_id(field);
        let first = matches.first().ok_or_else(|| {
            Error::Dictionary(format!(
                "Field ID ({field}) not found as part of a UDI in the data dictionary"
            ))
        })?;
        if matches.iter().any(|e| e.description != first.description) {
            return Err(Error::Dictionary(format!(
                "Ambiguous field_id: {field}. Multiple non-identical human-readable names found"
            )));
        }
        Ok(first.human_readable_name().to_string())
    }

    /// Encoding id of a UDI, or of the first UDI of a field id.
    pub fn encoding_id_for(&self, field: &str, is_udi: bool) -> Result<Option<&str>> {
        let entry = if is_udi {
            self.lookup(field)?
        } else {
            *self.by_field_id(field).first().ok_or_else(|| {
                Error::Dictionary(format!(
                    "Field ID ({field}) not found as part of a UDI in the data dictionary"
                ))
            })?
        };
        Ok(entry.encoding_id.as_deref())
    }
}
