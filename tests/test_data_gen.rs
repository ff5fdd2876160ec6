//! Small UK Biobank style fixtures shared by the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use arrow_array::RecordBatch;
use ukbpq_core::types::RowBatch;
use ukbpq_io::{list_parts, ParquetReader};

pub const DICTIONARY: &str = "Column\tUDI\tCount\tType\tDescription\n\
0\teid\t6\tSequence\tEncoded anonymised participant ID\n\
1\t31-0.0\t6\tCategorical (single)\tSex Uses data-coding 9 comprises 2 Integer-valued members in a simple list.\n\
2\t50-0.0\t5\tContinuous\tStanding height\n\
3\t53-0.0\t6\tDate\tDate of attending assessment centre\n\
4\t20002-0.0\t4\tCategorical (multiple)\tNon-cancer illness code, self-reported Uses data-coding 6 comprises 3 Integer-valued members in a hierarchical tree.\n\
5\t20001-0.0\t3\tText\tFree text note\n\
6\t40005-0.0\t2\tTime\tDate of cancer diagnosis\n";

/// Six participants; `20002-0.0` holds one non-selectable (-1) and one unknown (9999) code.
pub const EXPORT: &str = "eid\t31-0.0\t50-0.0\t53-0.0\t20002-0.0\t20001-0.0\t40005-0.0\n\
1000011\t0\t160.5\t2008-01-15\t1065\tnone\t\n\
1000022\t1\t181\t2009-03-02\t-1\t\t2001-05-04 00:00:00\n\
1000033\t1\t\t2010-11-30\t\t\t\n\
1000044\t0\t170.25\t2008-07-07\t1066\tcafé\t1999-12-31 23:59:59\n\
1000055\t1\t175\t2007-02-28\t9999\t\t\n\
1000066\t0\t158\t2010-06-01\t\t\t\n";

pub const CODING_9: &str = "coding\tmeaning\n0\tFemale\n1\tMale\n";

pub const CODING_6: &str = "Data-Coding 6\nNon-cancer illness codes\n\n\
coding\tmeaning\tnode_id\tparent_id\tselectable\n\
-1\tcardiovascular\t1071\t0\tN\n\
1065\thypertension\t1081\t1071\tY\n\
1066\theart/cardiac problem\t1082\t1071\tY\n";

pub struct Fixture {
    pub root: tempfile::TempDir,
    pub tsv: PathBuf,
    pub dictionary: PathBuf,
    pub encoding_dir: PathBuf,
}

impl Fixture {
    pub fn out(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }
}

/// Write the export (UTF-8), dictionary and encoding tables into a temp dir.
pub fn write_fixture() -> Fixture {
    write_fixture_with(EXPORT.as_bytes())
}

pub fn write_fixture_with(export: &[u8]) -> Fixture {
    let root = tempfile::tempdir().expect("temp dir");
    let tsv = root.path().join("ukb12345.tsv");
    let dictionary = root.path().join("ukb12345_dictionary.tsv");
    let encoding_dir = root.path().join("encodings");
    fs::write(&tsv, export).expect("write export");
    fs::write(&dictionary, DICTIONARY).expect("write dictionary");
    fs::create_dir_all(&encoding_dir).expect("encoding dir");
    fs::write(encoding_dir.join("encoding_table_9.txt"), CODING_9).expect("coding 9");
    fs::write(encoding_dir.join("encoding_table_6.txt"), CODING_6).expect("coding 6");
    Fixture {
        root,
        tsv,
        dictionary,
        encoding_dir,
    }
}

/// Every record batch of a dataset directory, parts in order.
pub fn read_dataset(dir: &Path) -> Vec<RecordBatch> {
    let mut out = Vec::new();
    for part in list_parts(dir).expect("list parts") {
        let reader = ParquetReader::from_path(&part, None, 1024).expect("open part");
        out.extend(reader.read_all().expect("read part"));
    }
    out
}

/// Every value of one column as text, across all parts.
pub fn column_text(dir: &Path, column: &str) -> Vec<Option<String>> {
    let mut out = Vec::new();
    for part in list_parts(dir).expect("list parts") {
        let mut reader =
            ParquetReader::from_path(&part, Some(vec![column.to_string()]), 1024).expect("open part");
        while let Some(batch) = reader.next_batch().expect("read batch") {
            out.extend(text_values(&batch, column));
        }
    }
    out
}

fn text_values(batch: &RowBatch, column: &str) -> Vec<Option<String>> {
    batch
        .column(column)
        .map(|c| c.values.iter().map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}
