pub mod dictionary;
pub mod encoding;
pub mod parquet;
pub mod tsv;
