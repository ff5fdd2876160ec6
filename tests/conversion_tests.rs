//! End-to-end conversions: TSV export + dictionary → Parquet parts → read back.

mod test_data_gen;

use arrow_array::cast::AsArray;
use arrow_array::types::{Date32Type, Float64Type, Int64Type, TimestampSecondType, UInt8Type};
use arrow_array::Array;
use arrow_schema::{DataType as ArrowDataType, TimeUnit};

use ukbpq_core::config::ConversionConfig;
use ukbpq_exec::{ConversionJob, Converter, ExecError};
use ukbpq_io::{list_parts, ParquetReader};

use test_data_gen::{column_text, read_dataset, write_fixture, write_fixture_with, EXPORT};

fn run(fixture: &test_data_gen::Fixture, config: ConversionConfig) -> Result<ukbpq_core::manifest::RunManifest, ExecError> {
    let job = ConversionJob::new("test", &fixture.tsv, &fixture.dictionary, config);
    Converter::new().with_batch_rows(2).run(&job)
}

#[test]
fn test_schema_follows_dictionary() {
    let fx = write_fixture();
    let out = fx.out("p1");
    let manifest = run(&fx, ConversionConfig::new(&out)).unwrap();
    assert_eq!(manifest.rows_written, 6);

    let batches = read_dataset(&out);
    let schema = batches[0].schema();
    let dt = |name: &str| schema.field_with_name(name).unwrap().data_type().clone();

    assert_eq!(dt("eid"), ArrowDataType::Int64);
    assert_eq!(
        dt("31-0.0"),
        ArrowDataType::Dictionary(Box::new(ArrowDataType::UInt8), Box::new(ArrowDataType::Float64))
    );
    assert_eq!(dt("50-0.0"), ArrowDataType::Float64);
    assert_eq!(dt("53-0.0"), ArrowDataType::Date32);
    assert_eq!(dt("20001-0.0"), ArrowDataType::Utf8);
    assert_eq!(dt("40005-0.0"), ArrowDataType::Timestamp(TimeUnit::Second, None));
}

#[test]
fn test_values_are_typed() {
    let fx = write_fixture();
    let out = fx.out("p1");
    run(&fx, ConversionConfig::new(&out)).unwrap();

    let batches = read_dataset(&out);
    let first = &batches[0];
    let col = |name: &str| first.column(first.schema().index_of(name).unwrap()).clone();

    assert_eq!(col("eid").as_primitive::<Int64Type>().value(0), 1_000_011);
    assert_eq!(col("50-0.0").as_primitive::<Float64Type>().value(0), 160.5);
    // 2008-01-15 is 13893 days after 1970-01-01.
    assert_eq!(col("53-0.0").as_primitive::<Date32Type>().value(0), 13_893);
    assert!(col("40005-0.0").is_null(0));
    assert_eq!(
        col("40005-0.0").as_primitive::<TimestampSecondType>().value(1),
        988_934_400
    );

    let sex = col("31-0.0");
    let sex = sex.as_dictionary::<UInt8Type>();
    let values = sex.values().as_primitive::<Float64Type>();
    assert_eq!(values.value(sex.keys().value(0) as usize), 0.0);
    assert_eq!(values.value(sex.keys().value(1) as usize), 1.0);
}

#[test]
fn test_encoding_tables_null_unknown_codes() {
    let fx = write_fixture();
    let out = fx.out("p1");
    let config = ConversionConfig {
        encoding_dir: Some(fx.encoding_dir.clone()),
        ..ConversionConfig::new(&out)
    };
    run(&fx, config).unwrap();

    let illness: Vec<bool> = column_text(&out, "20002-0.0")
        .iter()
        .map(Option::is_some)
        .collect();
    // -1 is not selectable and 9999 is not part of coding 6.
    assert_eq!(illness, vec![true, false, false, true, false, false]);

    let sex = column_text(&out, "31-0.0");
    assert!(sex.iter().all(Option::is_some));
}

#[test]
fn test_without_encoding_tables_every_code_is_kept() {
    let fx = write_fixture();
    let out = fx.out("p1");
    run(&fx, ConversionConfig::new(&out)).unwrap();
    let present = column_text(&out, "20002-0.0")
        .iter()
        .filter(|v| v.is_some())
        .count();
    assert_eq!(present, 4);
}

#[test]
fn test_nrows_and_npartitions() {
    let fx = write_fixture();
    let out = fx.out("p1");
    let config = ConversionConfig {
        nrows: 5,
        npartitions: 2,
        ..ConversionConfig::new(&out)
    };
    let manifest = run(&fx, config).unwrap();
    assert_eq!(manifest.rows_written, 5);

    let parts = list_parts(&out).unwrap();
    assert_eq!(parts.len(), 2);
    let rows: Vec<usize> = read_dataset(&out).iter().map(|b| b.num_rows()).collect();
    assert_eq!(rows.iter().sum::<usize>(), 5);
    assert_eq!(
        column_text(&out, "eid").last().cloned().flatten().as_deref(),
        Some("1000055")
    );
}

#[test]
fn test_blocksize_splits_parts() {
    let fx = write_fixture();
    let out = fx.out("p1");
    let mut config = ConversionConfig::new(&out);
    config
        .settings
        .insert("blocksize".into(), serde_yaml::Value::from(1u64));
    let manifest = Converter::new()
        .with_batch_rows(1)
        .run(&ConversionJob::new("blocks", &fx.tsv, &fx.dictionary, config))
        .unwrap();
    // Every one-row batch exceeds a one-byte block.
    assert_eq!(manifest.parts.len(), 6);
    assert_eq!(manifest.rows_written, 6);
}

#[test]
fn test_tab_offset_realigns_rows() {
    let shifted: String = EXPORT
        .lines()
        .enumerate()
        .map(|(i, line)| if i == 0 { format!("{line}\n") } else { format!("\t{line}\n") })
        .collect();
    let fx = write_fixture_with(shifted.as_bytes());
    let out = fx.out("p1");
    let config = ConversionConfig {
        tab_offset: 1,
        ..ConversionConfig::new(&out)
    };
    run(&fx, config).unwrap();
    assert_eq!(column_text(&out, "eid")[0].as_deref(), Some("1000011"));
}

#[test]
fn test_negative_tab_offset_drops_trailing_fields() {
    let padded: String = EXPORT
        .lines()
        .enumerate()
        .map(|(i, line)| if i == 0 { format!("{line}\n") } else { format!("{line}\tjunk\n") })
        .collect();
    let fx = write_fixture_with(padded.as_bytes());
    let out = fx.out("p1");
    let config = ConversionConfig {
        tab_offset: -1,
        ..ConversionConfig::new(&out)
    };
    let manifest = run(&fx, config).unwrap();
    assert_eq!(manifest.rows_written, 6);

    let diagnosed = column_text(&out, "40005-0.0");
    assert!(diagnosed[0].is_none());
    assert!(diagnosed[1].is_some());
    assert_eq!(column_text(&out, "eid")[5].as_deref(), Some("1000066"));
}

#[test]
fn test_header_only_export_writes_empty_part() {
    let header = EXPORT.lines().next().unwrap();
    let fx = write_fixture_with(format!("{header}\n").as_bytes());
    let out = fx.out("p1");
    let manifest = run(&fx, ConversionConfig::new(&out)).unwrap();
    assert_eq!(manifest.rows_written, 0);

    let parts = list_parts(&out).unwrap();
    assert_eq!(parts.len(), 1);
    let reader = ParquetReader::from_path(&parts[0], None, 16).unwrap();
    let schema = reader.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, header.split('\t').collect::<Vec<_>>());
    assert_eq!(
        schema.field_with_name("31-0.0").unwrap().data_type(),
        &ArrowDataType::Dictionary(Box::new(ArrowDataType::UInt8), Box::new(ArrowDataType::Float64))
    );
    let rows: usize = reader.read_all().unwrap().iter().map(|b| b.num_rows()).sum();
    assert_eq!(rows, 0);
}

#[test]
fn test_windows_1252_export() {
    let encoded: Vec<u8> = EXPORT
        .chars()
        .map(|c| if c == 'é' { 0xE9 } else { c as u8 })
        .collect();
    let fx = write_fixture_with(&encoded);
    let out = fx.out("p1");
    run(&fx, ConversionConfig::new(&out)).unwrap();
    assert_eq!(column_text(&out, "20001-0.0")[3].as_deref(), Some("café"));
}

#[test]
fn test_readme_written_with_configuration() {
    let fx = write_fixture();
    let out = fx.out("p1");
    let job = ConversionJob::new("documented", &fx.tsv, &fx.dictionary, ConversionConfig::new(&out))
        .with_description("cohort extract");
    Converter::new().run(&job).unwrap();

    let readme = std::fs::read_to_string(out.join("README.txt")).unwrap();
    assert!(readme.contains("Description:\ncohort extract"));
    assert!(readme.contains("name: documented"));
    assert!(readme.contains("max_categories: 256"));
}

#[test]
fn test_bad_date_format_names_the_cell() {
    let fx = write_fixture();
    let out = fx.out("p1");
    let mut config = ConversionConfig::new(&out);
    config
        .dtype_dict
        .type_map
        .insert("Date".into(), ukbpq_core::dtype::DtypeSpec::date("%d/%m/%Y"));
    let err = run(&fx, config).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("53-0.0"), "{msg}");
    assert!(msg.contains("2008-01-15"), "{msg}");
}
