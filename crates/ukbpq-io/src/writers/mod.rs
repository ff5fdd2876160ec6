pub mod parquet;
pub mod readme;
