//! Failures carry the offending column, value or path plus a hint.

mod test_data_gen;

use ukbpq_core::config::ConversionConfig;
use ukbpq_exec::{ConversionJob, Converter, ExecError};

use test_data_gen::{write_fixture, write_fixture_with, DICTIONARY};

fn convert(fx: &test_data_gen::Fixture, config: ConversionConfig) -> Result<(), ExecError> {
    Converter::new()
        .run(&ConversionJob::new("err", &fx.tsv, &fx.dictionary, config))
        .map(|_| ())
}

#[test]
fn test_unparseable_number_names_row_and_column() {
    let export = "eid\t50-0.0\n1\t160\n2\ttall\n";
    let fx = write_fixture_with(export.as_bytes());
    let out = fx.out("p1");
    let err = convert(&fx, ConversionConfig::new(&out)).unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("'50-0.0'"), "{msg}");
    assert!(msg.contains("\"tall\""), "{msg}");
    assert!(msg.contains("row 2"), "{msg}");
    assert!(!err.suggestions().is_empty());
}

#[test]
fn test_column_missing_from_dictionary() {
    let export = "eid\t999-0.0\n1\t2\n";
    let fx = write_fixture_with(export.as_bytes());
    let err = convert(&fx, ConversionConfig::new(fx.out("p1"))).unwrap_err();
    assert!(err.to_string().contains("999-0.0"));
}

#[test]
fn test_duplicate_dictionary_rows() {
    let fx = write_fixture();
    let duplicated = format!("{DICTIONARY}7\t50-0.0\t5\tContinuous\tStanding height\n");
    std::fs::write(&fx.dictionary, duplicated).unwrap();
    let err = convert(&fx, ConversionConfig::new(fx.out("p1"))).unwrap_err();
    assert!(err.to_string().contains("50-0.0"));
}

#[test]
fn test_unknown_text_encoding() {
    let fx = write_fixture();
    let config = ConversionConfig {
        encoding: "klingon-8".into(),
        ..ConversionConfig::new(fx.out("p1"))
    };
    let err = convert(&fx, config).unwrap_err();
    assert!(err.to_string().contains("klingon-8"));
    assert!(err
        .suggestions()
        .iter()
        .any(|s| s.contains("windows-1252")));
}

#[test]
fn test_unknown_setting_is_rejected_before_writing() {
    let fx = write_fixture();
    let out = fx.out("p1");
    let mut config = ConversionConfig::new(&out);
    config
        .settings
        .insert("page_colour".into(), serde_yaml::Value::from("blue"));
    let err = convert(&fx, config).unwrap_err();
    assert!(err.to_string().contains("page_colour"));
    assert!(!out.exists());
}

#[test]
fn test_missing_dtype_is_reported_with_hint() {
    let fx = write_fixture();
    let mut config = ConversionConfig::new(fx.out("p1"));
    config.dtype_dict.type_map.remove("Date");
    let err = convert(&fx, config).unwrap_err();
    assert!(matches!(err, ExecError::Planner(_)));
    assert!(err.to_string().contains("Date"));
    assert!(err
        .suggestions()
        .iter()
        .any(|s| s.contains("dtype_dict")));
}

#[test]
fn test_non_empty_output_dir_without_force() {
    let fx = write_fixture();
    let out = fx.out("p1");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("notes.txt"), "keep me").unwrap();

    let err = convert(&fx, ConversionConfig::new(&out)).unwrap_err();
    assert!(matches!(err, ExecError::OutputDir(_)));
    assert_eq!(std::fs::read_to_string(out.join("notes.txt")).unwrap(), "keep me");
}

#[test]
fn test_missing_encoding_table_keeps_values() {
    let fx = write_fixture();
    std::fs::remove_file(fx.encoding_dir.join("encoding_table_6.txt")).unwrap();
    let out = fx.out("p1");
    let config = ConversionConfig {
        encoding_dir: Some(fx.encoding_dir.clone()),
        ..ConversionConfig::new(&out)
    };
    convert(&fx, config).unwrap();
    let present = test_data_gen::column_text(&out, "20002-0.0")
        .into_iter()
        .flatten()
        .count();
    assert_eq!(present, 4);
}

#[test]
fn test_too_many_categories_for_key_names_column() {
    // Coding 9 declares 2 members, so the column gets a UInt8 key.
    let mut export = String::from("eid\t31-0.0\n");
    for i in 0..300 {
        export.push_str(&format!("{}\t{i}\n", 1_000_000 + i));
    }
    let fx = write_fixture_with(export.as_bytes());
    let err = convert(&fx, ConversionConfig::new(fx.out("p1"))).unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("'31-0.0'"), "{msg}");
    assert!(msg.contains("row 257"), "{msg}");
    assert!(err
        .suggestions()
        .iter()
        .any(|s| s.contains("encoding_dir")));
}
