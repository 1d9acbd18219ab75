use std::fs;
use std::path::Path;
use std::process;
use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use gm_upgrade::{
    genetic_modification, InMemoryResolver, Record, RecordReport, ReportFormat, SchemaVersion,
    SystemContext, UpgradeReporter, Upgrader,
};

#[derive(Parser, Debug)]
#[command(name = "gm-upgrade")]
#[command(about = "Upgrade stored metadata records to the current schema version")]
struct Args {
    /// JSON or YAML file holding one record or a list of records
    records_file: String,

    /// Referenced records (file path or http(s) URL), keyed by UUID or listed with a `uuid` field
    #[arg(long, value_name = "PATH_OR_URL")]
    references: Option<String>,

    /// Record type the input records belong to
    #[arg(long = "type", value_name = "TYPE", default_value = genetic_modification::TYPE_NAME)]
    type_name: String,

    /// Stop upgrading once this schema version is reached
    #[arg(long, value_name = "VERSION")]
    target_version: Option<SchemaVersion>,

    /// Report format printed after the run
    #[arg(long, value_enum, default_value = "console")]
    format: ReportFormat,

    /// Where to write the upgraded records (defaults to a fresh upgraded-records.json)
    #[arg(long, short, value_name = "FILE")]
    output: Option<String>,

    /// Log every applied step
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let registry = match gm_upgrade::default_registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("\n❌ Upgrade registry error: {}", e);
            process::exit(1);
        }
    };

    let records = match load_records(&args.records_file) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("\n❌ Error: {}", e);
            process::exit(1);
        }
    };

    let resolver = match &args.references {
        Some(location) => match load_references(location).await {
            Ok(resolver) => resolver,
            Err(e) => {
                eprintln!("\n❌ Error: {}", e);
                eprintln!("\nUsage: gm-upgrade <records-file> --references <PATH_OR_URL>");
                process::exit(1);
            }
        },
        None => InMemoryResolver::new(),
    };

    println!("\n=== Upgrading {} records ===", args.type_name);
    println!("  ℹ {} records, {} referenced records loaded", records.len(), resolver.len());

    let system = SystemContext::new(&resolver);
    let upgrader = Upgrader::new(&registry);
    let mut upgraded = Vec::with_capacity(records.len());
    let mut reports = Vec::with_capacity(records.len());

    for (index, original) in records.into_iter().enumerate() {
        let mut record = match Record::from_value(original.clone()) {
            Ok(record) => record,
            Err(e) => {
                println!("  ✗ Record {}: {}", index, e);
                reports.push(RecordReport::failed(index, None, e.to_string()));
                upgraded.push(original);
                continue;
            }
        };
        let source_version = record.version();

        match upgrader.upgrade_to(&args.type_name, &mut record, &system, args.target_version) {
            Ok(outcome) => {
                if outcome.is_upgraded() {
                    println!(
                        "  ✓ Record {}: {} → {}",
                        index, outcome.source_version, outcome.final_version
                    );
                }
                reports.push(RecordReport::from_outcome(index, &outcome));
                upgraded.push(record.into_value());
            }
            Err(e) => {
                // keep the stored form so the record can be retried from its original snapshot
                println!("  ✗ Record {}: {}", index, e);
                reports.push(RecordReport::failed(index, source_version, e.to_string()));
                upgraded.push(original);
            }
        }
    }

    let output_file = args.output.clone().unwrap_or_else(|| get_unique_filename("upgraded-records.json"));
    if let Err(e) = write_records(&output_file, upgraded) {
        eprintln!("\n❌ Error: {}", e);
        process::exit(1);
    }

    let reporter = UpgradeReporter::new().with_format(args.format);
    let report = reporter.generate_report(
        &args.type_name,
        registry.current_version(&args.type_name),
        reports,
    );
    match reporter.format_report(&report) {
        Ok(formatted) => println!("\n{}", formatted),
        Err(e) => eprintln!("\n❌ Report error: {}", e),
    }

    println!("\n=== Upgrade Complete ===");
    println!("  ✓ Output file: {}", output_file);

    if report.summary.failed > 0 {
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse a JSON or YAML document into a list of raw records
fn parse_records(content: &str) -> Result<Vec<Value>, String> {
    let document: Value = serde_yaml::from_str(content)
        .map_err(|e| format!("Failed to parse records: {}", e))?;

    match document {
        Value::Array(items) => Ok(items),
        Value::Object(_) => Ok(vec![document]),
        Value::Null => Ok(Vec::new()),
        _ => Err("Records file must hold a record or a list of records".to_string()),
    }
}

fn load_records(path: &str) -> Result<Vec<Value>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read records file {}: {}", path, e))?;
    parse_records(&content)
}

/// Fetch the referenced records up front so upgrades never wait on the store
async fn load_references(location: &str) -> Result<InMemoryResolver, String> {
    let content = if location.starts_with("http://") || location.starts_with("https://") {
        reqwest::get(location)
            .await
            .map_err(|e| format!("Failed to fetch references: {}", e))?
            .error_for_status()
            .map_err(|e| format!("Failed to fetch references: {}", e))?
            .text()
            .await
            .map_err(|e| format!("Failed to read references: {}", e))?
    } else {
        fs::read_to_string(location)
            .map_err(|e| format!("Failed to read references file {}: {}", location, e))?
    };

    let document: Value = serde_yaml::from_str(&content)
        .map_err(|e| format!("Failed to parse references: {}", e))?;
    InMemoryResolver::from_value(document).map_err(|e| e.to_string())
}

fn write_records(path: &str, records: Vec<Value>) -> Result<(), String> {
    let serialized = serde_json::to_string_pretty(&Value::Array(records))
        .map_err(|e| format!("Failed to serialize upgraded records: {}", e))?;
    fs::write(path, serialized).map_err(|e| format!("Failed to write {}: {}", path, e))
}

// Function to check for file existence and create a unique filename
fn get_unique_filename(base_name: &str) -> String {
    let mut count = 0;
    let mut file_name = base_name.to_string();

    while Path::new(&file_name).exists() {
        count += 1;
        file_name = format!("upgraded-records-{}.json", count);
    }

    file_name
}
