//! Lowering: header columns + data dictionary + dtype table → `ColumnPlan`s.

use tracing::debug;

use ukbpq_core::dictionary::{DataDictionary, DictEntry};
use ukbpq_core::dtype::{DtypeTable, TableSide};
use ukbpq_core::plan::{ColumnPlan, EncodingRef};
use ukbpq_core::schema::{DataType, DictKey};

use crate::error::{Error, Result};

/// Resolve a plan for every column, in header order.
pub fn resolve_columns(
    columns: &[String],
    dict: &DataDictionary,
    table: &DtypeTable,
    categorical_types: &[String],
    max_categories: u64,
) -> Result<Vec<ColumnPlan>> {
    columns
        .iter()
        .map(|col| -> Result<ColumnPlan> {
            let entry = dict.lookup(col)?;
            let plan = if categorical_types.contains(&entry.type_name) {
                categorical_plan(entry, table, max_categories)?
            } else {
                plain_plan(entry, table)?
            };
            debug!(column = %plan.name, data_type = ?plan.data_type, "resolved column");
            Ok(plan)
        })
        .collect()
}

fn plain_plan(entry: &DictEntry, table: &DtypeTable) -> Result<ColumnPlan> {
    let spec = table
        .lookup(TableSide::Type, &entry.type_name)
        .map_err(|e| e.with_context(format!("column '{}'", entry.udi)))?;
    let data_type = spec.to_data_type()?;
    Ok(ColumnPlan::new(entry.udi.clone(), data_type)
        .with_date_format(spec.date_format().map(str::to_string)))
}

/// Categoricals become dictionaries while their encoding fits in
/// `max_categories`; larger ones fall back to the `Encoding_type` dtype.
fn categorical_plan(
    entry: &DictEntry,
    table: &DtypeTable,
    max_categories: u64,
) -> Result<ColumnPlan> {
    let (Some(members), Some(encoding_type)) = (entry.encoding_num_members, &entry.encoding_type)
    else {
        return Err(Error::Unresolvable(format!(
            "trying to parse {} as categorical, but no encoding member count or encoding type was found (encoding id: {:?}, encoding type: {:?}, encoding num members: {:?})",
            entry.udi, entry.encoding_id, entry.encoding_type, entry.encoding_num_members
        )));
    };

    let spec = table
        .lookup(TableSide::EncodingType, encoding_type)
        .map_err(|e| e.with_context(format!("column '{}'", entry.udi)))?;
    let value_type = spec.to_data_type()?.value_type().clone();
    let date_format = spec.date_format().map(str::to_string);

    if members > max_categories {
        debug!(
            column = %entry.udi,
            members,
            max_categories,
            "category count exceeds limit, using encoding type"
        );
        return Ok(ColumnPlan::new(entry.udi.clone(), value_type).with_date_format(date_format));
    }

    let data_type = DataType::dictionary(DictKey::for_members(members), value_type);
    let mut plan = ColumnPlan::new(entry.udi.clone(), data_type).with_date_format(date_format);
    if let Some(id) = &entry.encoding_id {
        plan = plan.with_categories(EncodingRef {
            id: id.clone(),
            hierarchical: entry.is_hierarchical,
        });
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ukbpq_core::dtype::{default_categorical_types, DtypeSpec};

    fn dict() -> DataDictionary {
        DataDictionary::new(vec![
            DictEntry::new(Some(0), "eid", None, "Sequence", "Encoded anonymised participant ID"),
            DictEntry::new(
                Some(1),
                "31-0.0",
                None,
                "Categorical (single)",
                "Sex Uses data-coding 9 comprises 2 Integer-valued members in a simple list.",
            ),
            DictEntry::new(
                Some(2),
                "41270-0.0",
                None,
                "Categorical (multiple)",
                "Diagnoses - ICD10 Uses data-coding 19 comprises 19155 String-valued members in a hierarchical tree.",
            ),
            DictEntry::new(Some(3), "53-0.0", None, "Date", "Date of attending assessment centre"),
            DictEntry::new(Some(4), "40000-0.0", None, "Categorical (single)", "Broken categorical"),
        ])
    }

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn resolves_plain_dictionary_and_date_columns() {
        let plans = resolve_columns(
            &names(&["eid", "31-0.0", "53-0.0"]),
            &dict(),
            &DtypeTable::default(),
            &default_categorical_types(),
            256,
        )
        .unwrap();

        assert_eq!(plans[0].data_type, DataType::Int64);
        assert_eq!(
            plans[1].data_type,
            DataType::dictionary(DictKey::UInt8, DataType::Float64)
        );
        assert_eq!(
            plans[1].categories_from,
            Some(EncodingRef {
                id: "9".into(),
                hierarchical: false
            })
        );
        assert_eq!(plans[2].data_type, DataType::Date32);
        assert_eq!(plans[2].date_format.as_deref(), Some("%Y-%m-%d"));
    }

    #[test]
    fn large_categoricals_fall_back_to_encoding_type() {
        let plans = resolve_columns(
            &names(&["41270-0.0"]),
            &dict(),
            &DtypeTable::default(),
            &default_categorical_types(),
            256,
        )
        .unwrap();
        assert_eq!(plans[0].data_type, DataType::Utf8);
        assert_eq!(plans[0].categories_from, None);

        let plans = resolve_columns(
            &names(&["41270-0.0"]),
            &dict(),
            &DtypeTable::default(),
            &default_categorical_types(),
            20_000,
        )
        .unwrap();
        assert_eq!(
            plans[0].data_type,
            DataType::dictionary(DictKey::UInt16, DataType::Utf8)
        );
    }

    #[test]
    fn categorical_types_are_configurable() {
        let plans = resolve_columns(
            &names(&["31-0.0"]),
            &dict(),
            &DtypeTable::default(),
            &["Categorical (multiple)".to_string()],
            256,
        );
        // "Categorical (single)" is now looked up in the Type map, which lacks it.
        assert!(plans.is_err());

        let mut table = DtypeTable::default();
        table
            .type_map
            .insert("Categorical (single)".into(), DtypeSpec::plain("string"));
        let plans = resolve_columns(
            &names(&["31-0.0"]),
            &dict(),
            &table,
            &["Categorical (multiple)".to_string()],
            256,
        )
        .unwrap();
        assert_eq!(plans[0].data_type, DataType::Utf8);
    }

    #[test]
    fn categorical_without_encoding_info_is_an_error() {
        let err = resolve_columns(
            &names(&["40000-0.0"]),
            &dict(),
            &DtypeTable::default(),
            &default_categorical_types(),
            256,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Unresolvable(_)));
        assert!(err.to_string().contains("40000-0.0"));
    }

    #[test]
    fn unknown_column_is_an_error() {
        let err = resolve_columns(
            &names(&["999-0.0"]),
            &dict(),
            &DtypeTable::default(),
            &default_categorical_types(),
            256,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
