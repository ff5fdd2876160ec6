//! ukbpq CLI: convert UK Biobank TSV exports to partitioned Parquet.

mod logging;
mod template;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use ukbpq_core::config::ConversionConfig;
use ukbpq_core::dtype::{
    default_categorical_types, DtypeTable, TableSide, DEFAULT_ENCODING, DEFAULT_MAX_CATEGORIES,
};
use ukbpq_exec::runtime::load_dictionary;
use ukbpq_exec::{ConversionJob, Converter, ExecError};
use ukbpq_planner::{
    parse_dtype_overrides, parse_settings_args, read_config_file, valid_configs,
};

use crate::logging::LogArgs;

#[derive(Parser)]
#[command(name = "ukbpq", version)]
#[command(about = "Convert UK Biobank TSV exports to partitioned Parquet guided by the data dictionary", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a template configuration file for `from-config`
    Template {
        /// Path to store the template YAML file
        dest: PathBuf,
    },

    /// Convert with every configuration in a YAML file
    FromConfig {
        /// UK Biobank TSV export
        ukb_file: PathBuf,
        /// Data dictionary table (tab separated, or comma separated for .csv)
        data_dict: PathBuf,
        /// YAML file with one or more named configurations
        config_file: PathBuf,
        #[command(flatten)]
        log: LogArgs,
    },

    /// Convert with options given on the command line
    Convert(ConvertArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// UK Biobank TSV export
    ukb_file: PathBuf,
    /// Directory to store the Parquet part files
    out_dir: PathBuf,
    /// Data dictionary table (tab separated, or comma separated for .csv)
    data_dict: PathBuf,

    /// Text encoding of the TSV export
    #[arg(short, long, default_value = DEFAULT_ENCODING)]
    encoding: String,

    /// Keep only the first NROWS data rows
    #[arg(short, long)]
    nrows: Option<u64>,

    /// Number of part files to write (after the nrows cut)
    #[arg(short = 'r', long)]
    repartition: Option<u64>,

    /// Largest encoding still stored as a dictionary column
    #[arg(short, long, default_value_t = DEFAULT_MAX_CATEGORIES)]
    max_categories: u64,

    /// Dictionary Type values treated as categorical
    #[arg(short = 'c', long = "categorical-type", num_args = 1.., default_values_t = default_categorical_types())]
    categorical_types: Vec<String>,

    /// Type dtype overrides as key=value (value may be ["Date","<fmt>"])
    #[arg(long = "dtype-type", num_args = 0..)]
    dtype_type: Vec<String>,

    /// Encoding_type dtype overrides as key=value
    #[arg(long = "dtype-encoding", num_args = 0..)]
    dtype_encoding: Vec<String>,

    /// Parquet writer settings as key=value
    #[arg(short, long, num_args = 0..)]
    settings: Vec<String>,

    /// Extra fields per data row: positive at the start, negative at the end
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    tab_offset: i64,

    /// Write into a non-empty output directory
    #[arg(short, long)]
    force: bool,

    /// Directory with encoding_table_<id>.txt files
    #[arg(long)]
    encoding_dir: Option<PathBuf>,

    /// Text added to the README of the output directory
    #[arg(short, long)]
    description: Option<String>,

    #[command(flatten)]
    log: LogArgs,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Template { dest } => {
            if let Err(e) = template::write_template(&dest) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
            println!("✓ Template written to {}", dest.display());
        }
        Commands::FromConfig {
            ukb_file,
            data_dict,
            config_file,
            log,
        } => {
            let default_name = logging::default_log_name("from-config", &ukb_file, &config_file);
            let log_file = start_logging(&log, "from-config", default_name);
            let result = run_from_config(&ukb_file, &data_dict, &config_file);
            finish(result, &log_file, &format!("converting from config {}", config_file.display()));
        }
        Commands::Convert(args) => {
            let default_name = logging::default_log_name("convert", &args.ukb_file, &args.out_dir);
            let log_file = start_logging(&args.log, "convert", default_name);
            let context = format!("converting {}", args.ukb_file.display());
            let result = run_convert(args);
            finish(result, &log_file, &context);
        }
    }
}

fn start_logging(args: &LogArgs, command: &str, default_name: String) -> PathBuf {
    let path = logging::log_path(args, command, default_name);
    if let Err(e) = logging::init(&path, args.log_level) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    path
}

fn finish(result: Result<(), Box<dyn std::error::Error>>, log_file: &Path, context: &str) {
    match result {
        Ok(()) => info!("done, exiting"),
        Err(e) => {
            error!(error = %e, "an error occurred while {context}");
            for hint in suggestions(e.as_ref()) {
                error!(suggestion = %hint);
            }
            eprintln!("Error: {e} (see {})", log_file.display());
            std::process::exit(1);
        }
    }
}

fn suggestions(e: &(dyn std::error::Error + 'static)) -> Vec<String> {
    if let Some(e) = e.downcast_ref::<ExecError>() {
        e.suggestions()
    } else if let Some(e) = e.downcast_ref::<ukbpq_planner::Error>() {
        e.suggestions()
    } else {
        vec![]
    }
}

fn run_from_config(
    ukb_file: &Path,
    data_dict: &Path,
    config_file: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let configs = valid_configs(read_config_file(config_file)?)?;
    let dict = load_dictionary(data_dict)?;
    let converter = Converter::new();

    for (name, config) in configs {
        info!(config = %name, "converting with configuration");
        let job = ConversionJob::new(name, ukb_file, data_dict, config)
            .with_description(format!("Configuration file: {}", config_file.display()));
        let manifest = converter.run_with_dictionary(&job, &dict)?;
        println!(
            "✓ {}: {} rows in {} part(s) ({}ms)",
            job.name,
            manifest.rows_written,
            manifest.parts.len(),
            manifest.duration_ms()
        );
    }
    Ok(())
}

fn run_convert(args: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut table = DtypeTable::default();
    parse_dtype_overrides(&args.dtype_type, &mut table, TableSide::Type);
    parse_dtype_overrides(&args.dtype_encoding, &mut table, TableSide::EncodingType);

    let config = ConversionConfig {
        nrows: args.nrows.unwrap_or(0),
        npartitions: args.repartition.unwrap_or(0),
        tab_offset: args.tab_offset,
        force: args.force,
        dtype_dict: table,
        max_categories: args.max_categories,
        categorical_type: args.categorical_types,
        encoding: args.encoding,
        encoding_dir: args.encoding_dir,
        settings: parse_settings_args(&args.settings)?,
        ..ConversionConfig::new(&args.out_dir)
    };

    let mut job = ConversionJob::new("convert", &args.ukb_file, &args.data_dict, config);
    if let Some(d) = args.description {
        job = job.with_description(d);
    }
    let manifest = Converter::new().run(&job)?;
    println!("✓ Conversion finished");
    println!("  Rows: {}", manifest.rows_written);
    println!("  Parts: {}", manifest.parts.len());
    println!("  Duration: {}ms", manifest.duration_ms());
    println!("  Config hash: {}", manifest.config_hash);
    Ok(())
}
