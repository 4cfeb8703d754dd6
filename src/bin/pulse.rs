//! Pulse CLI - Command-line interface for ADX Pulse
//!
//! Commands:
//! - analyze: Classify a report and project the next day
//! - validate: Check a report loads and types cleanly
//! - doctor: Diagnose configuration and input files
//! - schema: Print the expected input columns or the output payload shape

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use adx_pulse::adapters::{load_report, CsvAdapter, ReportFormat, XlsxAdapter};
use adx_pulse::config::PipelineConfig;
use adx_pulse::encoder::{ReportTableKind, REPORT_VERSION};
use adx_pulse::normalizer::Normalizer;
use adx_pulse::pipeline::ReportProcessor;
use adx_pulse::schema::{ReportTable, REPORT_SCHEMA};
use adx_pulse::types::{DataQuality, ReportPayload};
use adx_pulse::{logging, ReportError, PRODUCER_NAME, PULSE_VERSION};

/// Pulse - Hourly monetization recommendations for Ad Exchange reports
#[derive(Parser)]
#[command(name = "pulse")]
#[command(version = PULSE_VERSION)]
#[command(about = "Turn Ad Exchange hourly reports into pricing recommendations", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a report and print recommendations
    Analyze {
        /// Report file path, CSV or XLSX (use - for CSV on stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,

        /// Table written by the ndjson and csv formats
        #[arg(long, default_value = "hourly")]
        table: TableChoice,

        /// Pipeline configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Worksheet to read from XLSX reports
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Validate that a report loads and types cleanly
    Validate {
        /// Report file path (use - for CSV on stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Pipeline configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Worksheet to read from XLSX reports
        #[arg(long)]
        sheet: Option<String>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and input files
    Doctor {
        /// Pipeline configuration file to check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Report file to check
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Column names come from this configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Full report payload as compact JSON
    Json,
    /// Full report payload as pretty-printed JSON
    JsonPretty,
    /// One display row per line
    Ndjson,
    /// Display table as CSV
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
enum TableChoice {
    /// Historical hourly recommendations
    Hourly,
    /// Next-day projected recommendations
    NextDay,
}

impl From<TableChoice> for ReportTableKind {
    fn from(choice: TableChoice) -> Self {
        match choice {
            TableChoice::Hourly => ReportTableKind::Hourly,
            TableChoice::NextDay => ReportTableKind::NextDay,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input report columns
    Input,
    /// Output report payload
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), PulseCliError> {
    match command {
        Commands::Analyze {
            input,
            output,
            format,
            table,
            config,
            sheet,
        } => {
            let config = load_config(config.as_deref(), sheet)?;
            cmd_analyze(&input, &output, format, table, config)
        }

        Commands::Validate {
            input,
            config,
            sheet,
            json,
        } => {
            let config = load_config(config.as_deref(), sheet)?;
            cmd_validate(&input, &config, json)
        }

        Commands::Doctor { config, input, json } => cmd_doctor(config.as_deref(), input.as_deref(), json),

        Commands::Schema {
            schema_type,
            config,
            json_schema,
        } => {
            let config = load_config(config.as_deref(), None)?;
            cmd_schema(schema_type, &config, json_schema)
        }
    }
}

fn load_config(path: Option<&Path>, sheet: Option<String>) -> Result<PipelineConfig, PulseCliError> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(sheet) = sheet {
        config.excel_sheet = sheet;
        config.validate()?;
    }
    Ok(config)
}

fn is_stdin(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_table(input: &Path, config: &PipelineConfig) -> Result<ReportTable, PulseCliError> {
    if is_stdin(input) {
        Ok(CsvAdapter::from_reader(io::stdin().lock())?)
    } else {
        Ok(load_report(input, config)?)
    }
}

fn source_name(input: &Path) -> String {
    if is_stdin(input) {
        "<stdin>".to_string()
    } else {
        input.display().to_string()
    }
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    format: OutputFormat,
    table: TableChoice,
    config: PipelineConfig,
) -> Result<(), PulseCliError> {
    let report = read_table(input, &config)?;
    let processor = ReportProcessor::with_config(config);
    let payload = processor.process_table(&report, &source_name(input))?;

    if payload.hourly.is_empty() {
        return Err(PulseCliError::NoData);
    }

    let output_data = format_output(&processor, &payload, &format, table)?;

    if is_stdin(output) {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn format_output(
    processor: &ReportProcessor,
    payload: &ReportPayload,
    format: &OutputFormat,
    table: TableChoice,
) -> Result<String, PulseCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(payload)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(payload)? + "\n"),
        OutputFormat::Ndjson => {
            let rows = match table {
                TableChoice::Hourly => &payload.hourly,
                TableChoice::NextDay => &payload.next_day,
            };
            let mut lines: Vec<String> = Vec::new();
            for row in rows {
                lines.push(serde_json::to_string(row)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Csv => Ok(processor.encoder().table_to_csv(
            payload,
            table.into(),
            &processor.config().columns,
        )?),
    }
}

fn cmd_validate(input: &Path, config: &PipelineConfig, json: bool) -> Result<(), PulseCliError> {
    let table = read_table(input, config)?;
    let normalized = Normalizer::normalize(&table, &config.columns)?;

    let report = ValidationReport {
        source: source_name(input),
        records: normalized.records.len(),
        quality: normalized.quality,
    };
    let quality = &report.quality;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Source:          {}", report.source);
        println!("Rows read:       {}", quality.rows_read);
        println!("Totals removed:  {}", quality.totals_row_removed);
        println!("Rows dropped:    {}", quality.rows_dropped);
        println!("Usable records:  {}", report.records);
        println!("Metric coverage: {:.1}%", quality.coverage * 100.0);

        let invalid = &quality.invalid_metrics;
        if invalid.total() > 0 {
            println!("\nInvalid metric cells:");
            println!("  revenue:     {}", invalid.revenue);
            println!("  ecpm:        {}", invalid.ecpm);
            println!("  ad_requests: {}", invalid.ad_requests);
            println!("  impressions: {}", invalid.impressions);
            println!("  match_rate:  {}", invalid.match_rate);
        }
    }

    if report.quality.rows_dropped > 0 {
        Err(PulseCliError::ValidationFailed(report.quality.rows_dropped))
    } else if report.records == 0 {
        Err(PulseCliError::NoData)
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, input: Option<&Path>, json: bool) -> Result<(), PulseCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "pulse_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Pulse version {}", PULSE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", REPORT_SCHEMA),
    });

    let pipeline_config = match config {
        Some(path) => match PipelineConfig::from_file(path) {
            Ok(parsed) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Config file valid ({})", path.display()),
                });
                parsed
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid config: {}", e),
                });
                PipelineConfig::default()
            }
        },
        None => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: "Using default Ad Exchange columns".to_string(),
            });
            PipelineConfig::default()
        }
    };

    if let Some(path) = input {
        checks.extend(check_input(path, &pipeline_config));
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (use --input - to read CSV)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: PULSE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Pulse Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PulseCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

/// Format, sheet and column checks for one report file
fn check_input(path: &Path, config: &PipelineConfig) -> Vec<DoctorCheck> {
    let mut checks = Vec::new();

    if !path.exists() {
        checks.push(DoctorCheck {
            name: "input".to_string(),
            status: CheckStatus::Error,
            message: format!("Report file does not exist: {}", path.display()),
        });
        return checks;
    }

    let format = match ReportFormat::from_path(path) {
        Ok(format) => format,
        Err(e) => {
            checks.push(DoctorCheck {
                name: "input".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            });
            return checks;
        }
    };
    checks.push(DoctorCheck {
        name: "input".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} report: {}", format.as_str(), path.display()),
    });

    if format == ReportFormat::Xlsx {
        let sheet_check = match XlsxAdapter::sheet_names(path) {
            Ok(names) if names.iter().any(|n| *n == config.excel_sheet) => DoctorCheck {
                name: "sheet".to_string(),
                status: CheckStatus::Ok,
                message: format!("Sheet '{}' found", config.excel_sheet),
            },
            Ok(names) => DoctorCheck {
                name: "sheet".to_string(),
                status: CheckStatus::Warning,
                message: format!(
                    "Sheet '{}' not found, first sheet will be read (sheets: {})",
                    config.excel_sheet,
                    names.join(", ")
                ),
            },
            Err(e) => DoctorCheck {
                name: "sheet".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        };
        checks.push(sheet_check);
    }

    let columns_check = match load_report(path, config)
        .and_then(|table| Normalizer::normalize(&table, &config.columns))
    {
        Ok(normalized) if normalized.records.is_empty() => DoctorCheck {
            name: "columns".to_string(),
            status: CheckStatus::Warning,
            message: "All columns present but no usable rows".to_string(),
        },
        Ok(normalized) => DoctorCheck {
            name: "columns".to_string(),
            status: CheckStatus::Ok,
            message: format!("All columns present ({} records)", normalized.records.len()),
        },
        Err(e) => DoctorCheck {
            name: "columns".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    };
    checks.push(columns_check);

    checks
}

fn cmd_schema(schema_type: SchemaType, config: &PipelineConfig, json_schema: bool) -> Result<(), PulseCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema(config));
            } else {
                println!("Input Schema: {}", REPORT_SCHEMA);
                println!();
                println!("One row per (date, hour) slice of an Ad Manager report, CSV or XLSX.");
                println!("A trailing 'Total' row is ignored.");
                println!();
                for spec in config.columns.describe() {
                    println!("- {:<12} \"{}\"", spec.field, spec.header);
                    println!("  {}", spec.description);
                }
                println!();
                println!("XLSX reports are read from sheet '{}'.", config.excel_sheet);
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: report payload {}", REPORT_VERSION);
                println!();
                println!("- report_version: Payload version");
                println!("- producer: {{ name, version, instance_id }}");
                println!("- provenance: {{ source, computed_at_utc, latest_date, projected_date }}");
                println!("- quality: {{ rows_read, rows_dropped, invalid_metrics, coverage, flags, ... }}");
                println!("- hourly: Rows of {{ timestamp, ecpm_mean, match_rate_mean, revenue_sum,");
                println!("          ad_requests_sum, recommendation, recommendation_label }}");
                println!("- next_day: Same rows for the projected day");
                println!("- trends: Chart series {{ name, caption, points: [{{ timestamp, value }}] }}");
                println!();
                println!("Recommendations: floor_pricing, target_cpm, google_optimized, no_change");
            }
        }
    }

    Ok(())
}

fn get_input_json_schema(config: &PipelineConfig) -> String {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for spec in config.columns.describe() {
        let kind = if spec.field == "date" { "string" } else { "number" };
        properties.insert(
            spec.header.clone(),
            serde_json::json!({ "type": kind, "description": spec.description }),
        );
        required.push(spec.header);
    }

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": REPORT_SCHEMA,
        "description": "One row of an Ad Exchange hourly report",
        "type": "object",
        "required": required,
        "properties": properties
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    let row = serde_json::json!({
        "type": "object",
        "required": ["timestamp", "revenue_sum", "ad_requests_sum", "recommendation"],
        "properties": {
            "timestamp": { "type": "string" },
            "ecpm_mean": { "type": ["number", "null"] },
            "match_rate_mean": { "type": ["number", "null"] },
            "revenue_sum": { "type": "number" },
            "ad_requests_sum": { "type": "integer" },
            "recommendation": {
                "type": "string",
                "enum": ["floor_pricing", "target_cpm", "google_optimized", "no_change"]
            },
            "recommendation_label": { "type": "string" }
        }
    });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "adx.report_payload",
        "description": "ADX Pulse report payload",
        "type": "object",
        "required": ["report_version", "producer", "provenance", "quality", "hourly", "next_day", "trends"],
        "properties": {
            "report_version": { "type": "string", "const": REPORT_VERSION },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "provenance": {
                "type": "object",
                "properties": {
                    "source": { "type": "string" },
                    "computed_at_utc": { "type": "string" },
                    "latest_date": { "type": ["string", "null"] },
                    "projected_date": { "type": ["string", "null"] }
                }
            },
            "quality": { "type": "object" },
            "hourly": { "type": "array", "items": row },
            "next_day": { "type": "array", "items": row },
            "trends": { "type": "array", "items": { "type": "object" } }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum PulseCliError {
    Io(io::Error),
    Report(ReportError),
    Json(serde_json::Error),
    NoData,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for PulseCliError {
    fn from(e: io::Error) -> Self {
        PulseCliError::Io(e)
    }
}

impl From<ReportError> for PulseCliError {
    fn from(e: ReportError) -> Self {
        PulseCliError::Report(e)
    }
}

impl From<serde_json::Error> for PulseCliError {
    fn from(e: serde_json::Error) -> Self {
        PulseCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PulseCliError> for CliError {
    fn from(e: PulseCliError) -> Self {
        match e {
            PulseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PulseCliError::Report(e) => report_error(e),
            PulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PulseCliError::NoData => CliError {
                code: "NO_DATA".to_string(),
                message: "No usable report rows found in input".to_string(),
                hint: Some("Ensure the report has Date and Hour values".to_string()),
            },
            PulseCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} rows could not be keyed by date and hour", count),
                hint: Some("Fix the Date and Hour cells and retry".to_string()),
            },
            PulseCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

fn report_error(e: ReportError) -> CliError {
    let (code, hint) = match &e {
        ReportError::FileNotFound(_) => ("FILE_NOT_FOUND", Some("Check the --input path")),
        ReportError::UnsupportedFormat(_) => ("UNSUPPORTED_FORMAT", Some("Export the report as CSV or XLSX")),
        ReportError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
        ReportError::Csv(_) => ("CSV_ERROR", Some("Check the CSV export is well formed")),
        ReportError::Excel(_) => ("EXCEL_ERROR", Some("Check the workbook opens and try --sheet")),
        ReportError::Json(_) => ("JSON_ERROR", Some("Check JSON syntax")),
        ReportError::MissingColumn(_) => ("MISSING_COLUMN", Some("Run 'pulse schema input' for expected headers")),
        ReportError::Config(_) => ("CONFIG_ERROR", Some("Run 'pulse doctor --config <file>' for details")),
        ReportError::Encoding(_) => ("ENCODING_ERROR", None),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: hint.map(str::to_string),
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    source: String,
    records: usize,
    quality: DataQuality,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
