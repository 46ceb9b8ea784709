//! Mood CLI - Command-line interface for Synheart Mood
//!
//! Commands:
//! - analyze: Run the full analysis over a roster and a record table
//! - validate: Check input tables and report what normalization keeps
//! - doctor: Diagnose version and configuration
//! - schema: Print input and output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use synheart_mood::normalizer::{NormalizationStats, Normalizer};
use synheart_mood::report::REPORT_VERSION;
use synheart_mood::schema::{
    RawRecordRow, RawUserRow, RowAdapter, RowFormat, REQUIRED_RECORD_COLUMNS, SCHEMA_VERSION,
};
use synheart_mood::{AnalysisConfig, ComputeError, ForecastScope, MoodAnalyzer, ReportAssembler};
use synheart_mood::{MOOD_VERSION, PRODUCER_NAME};

/// Mood - Batch analytics engine for self-reported wellbeing records
#[derive(Parser)]
#[command(name = "mood")]
#[command(author = "Synheart AI Inc")]
#[command(version = MOOD_VERSION)]
#[command(about = "Analyze mood, stress, energy and sleep records", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and write the report
    Analyze {
        /// Roster file path (use - for stdin)
        #[arg(short, long)]
        users: PathBuf,

        /// Record file path (use - for stdin)
        #[arg(short, long)]
        records: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Analysis configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// RNG seed for clustering and the forecast model
        #[arg(long)]
        seed: Option<u64>,

        /// Requested number of user clusters
        #[arg(long)]
        clusters: Option<usize>,

        /// Forecast scope
        #[arg(long)]
        forecast_scope: Option<ScopeArg>,
    },

    /// Validate input tables
    Validate {
        /// Roster file path (use - for stdin)
        #[arg(short, long)]
        users: PathBuf,

        /// Record file path (use - for stdin)
        #[arg(short, long)]
        records: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose version and configuration
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one row per line)
    Ndjson,
    /// JSON array of rows
    Json,
}

impl From<InputFormat> for RowFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Ndjson => RowFormat::Ndjson,
            InputFormat::Json => RowFormat::Json,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum ScopeArg {
    /// One model over all subjects
    Pooled,
    /// Pooled model plus one model per subject
    PerUser,
}

impl From<ScopeArg> for ForecastScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Pooled => ForecastScope::Pooled,
            ScopeArg::PerUser => ForecastScope::PerUser,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (mood.raw_rows.v1)
    Input,
    /// Output schema (analysis report)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false).compact())
        .init();

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

fn run(command: Commands) -> Result<(), MoodCliError> {
    match command {
        Commands::Analyze {
            users,
            records,
            output,
            input_format,
            output_format,
            config,
            seed,
            clusters,
            forecast_scope,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(clusters) = clusters {
                config.clustering.n_clusters = clusters;
            }
            if let Some(scope) = forecast_scope {
                config.forecast.scope = scope.into();
            }
            cmd_analyze(&users, &records, &output, input_format.into(), output_format, config)
        }

        Commands::Validate {
            users,
            records,
            input_format,
            json,
        } => cmd_validate(&users, &records, input_format.into(), json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_analyze(
    users_path: &Path,
    records_path: &Path,
    output: &Path,
    format: RowFormat,
    output_format: OutputFormat,
    config: AnalysisConfig,
) -> Result<(), MoodCliError> {
    let (users, records) = read_tables(users_path, records_path, format)?;

    let analyzer = MoodAnalyzer::with_config(config)?;
    let report = analyzer.run(&users, &records)?;

    let output_data = match output_format {
        OutputFormat::Json => ReportAssembler::to_json(&report)?,
        OutputFormat::JsonPretty => ReportAssembler::to_json_pretty(&report)?,
    };

    if is_stdio(output) {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data + "\n")?;
        debug!(path = %output.display(), "report written");
    }

    Ok(())
}

fn cmd_validate(
    users_path: &Path,
    records_path: &Path,
    format: RowFormat,
    json: bool,
) -> Result<(), MoodCliError> {
    let (users, records) = read_tables(users_path, records_path, format)?;
    let outcome = Normalizer::normalize(&users, &records)?;

    let report = ValidationReport {
        schema: SCHEMA_VERSION.to_string(),
        analyzable: !outcome.dataset.is_insufficient(),
        stats: outcome.stats,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let s = &report.stats;
        println!("Validation Report");
        println!("=================");
        println!("Schema:              {}", report.schema);
        println!("User rows:           {}", s.user_rows);
        println!("Subjects:            {}", s.subjects);
        println!("Record rows:         {}", s.record_rows);
        println!("Records kept:        {}", s.records_kept);
        println!("Unknown user:        {}", s.dropped_unknown_user);
        println!("Missing date:        {}", s.dropped_missing_date);
        println!("Tag fallbacks:       {}", s.tag_fallbacks);
        println!("Clamped scores:      {}", s.clamped_scores);
        if !report.analyzable {
            println!("\nNothing left to analyze; `mood analyze` would report insufficient data.");
        }
    }

    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), MoodCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "mood_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Mood version {}", MOOD_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}, report version {}", SCHEMA_VERSION, REPORT_VERSION),
    });

    // Check configuration file if provided
    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Configuration file does not exist; defaults would be used".to_string(),
            }
        } else {
            match fs::read_to_string(config_path) {
                Ok(content) => match AnalysisConfig::from_json(&content) {
                    Ok(cfg) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Configuration valid (seed {}, {} clusters, {} trees)",
                            cfg.seed, cfg.clustering.n_clusters, cfg.forecast.n_trees
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read configuration file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    // Check stdin is available (for piped tables)
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
            message: "stdin is a pipe (one table can be read from -)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: MOOD_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Mood Doctor Report");
        println!("==================");
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
        Err(MoodCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), MoodCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("Two tables, each a JSON array or NDJSON document:");
                println!();
                println!("1. users - roster rows");
                println!("   - id (string or number), role (alias rol), profession (alias profesion)");
                println!("   - only role \"subject\" (alias \"paciente\") is analyzed");
                println!();
                println!("2. records - one wellbeing measurement per row");
                println!("   - required columns: {}", REQUIRED_RECORD_COLUMNS.join(", "));
                println!("   - date (alias fecha): YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339");
                println!("   - mood, stress, energy, sleep: scores in [1, 10]");
                println!("   - tags (alias emociones): array, JSON list string or {{a,b}} literal");
                println!("   - note (alias notas): free text");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: analysis report {}", REPORT_VERSION);
                println!();
                println!("- report_version, generated_at (RFC 3339 UTC)");
                println!("- producer: {{ name, version, instance_id }}");
                println!("- status: complete | insufficient_data, reason");
                println!("- summary (null on insufficient data):");
                println!("  - total_users, total_records");
                println!("  - mood_patterns: {{ by_weekday, by_week, correlations, emotion_frequencies }}");
                println!("  - user_clusters: Cluster_<n> -> {{ size, avg_mood, avg_stress, description }}");
                println!("  - user_segments: per-user metric vector, streak, weekly trend and cluster");
                println!("  - predictions: {{ scope, basis, points[7], per_user }}");
                println!("  - insights: [{{ type, title, description, priority }}]");
                println!("- recommendations: static list");
            }
        }
    }
    Ok(())
}

// Helper functions

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_input(path: &Path) -> Result<String, MoodCliError> {
    if is_stdio(path) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn read_tables(
    users_path: &Path,
    records_path: &Path,
    format: RowFormat,
) -> Result<(Vec<RawUserRow>, Vec<RawRecordRow>), MoodCliError> {
    if is_stdio(users_path) && is_stdio(records_path) {
        return Err(MoodCliError::BothStdin);
    }

    let users: Vec<RawUserRow> = RowAdapter::parse(&read_input(users_path)?, format)?;
    let records: Vec<RawRecordRow> = RowAdapter::parse(&read_input(records_path)?, format)?;
    debug!(users = users.len(), records = records.len(), "input tables read");
    Ok((users, records))
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, MoodCliError> {
    match path {
        Some(path) => Ok(AnalysisConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(AnalysisConfig::default()),
    }
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": "https://synheart.ai/schemas/mood.raw_rows.v1.json",
        "title": "Mood raw rows",
        "definitions": {
            "score": {
                "oneOf": [
                    { "type": "number", "minimum": 1, "maximum": 10 },
                    { "type": "string" },
                    { "type": "null" }
                ]
            },
            "id": { "type": ["string", "integer", "null"] }
        },
        "type": "object",
        "properties": {
            "users": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["id", "role"],
                    "properties": {
                        "id": { "$ref": "#/definitions/id" },
                        "role": { "type": "string" },
                        "profession": { "type": ["string", "null"] }
                    }
                }
            },
            "records": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": REQUIRED_RECORD_COLUMNS,
                    "properties": {
                        "id": { "$ref": "#/definitions/id" },
                        "user_id": { "$ref": "#/definitions/id" },
                        "date": { "type": ["string", "null"] },
                        "mood": { "$ref": "#/definitions/score" },
                        "stress": { "$ref": "#/definitions/score" },
                        "energy": { "$ref": "#/definitions/score" },
                        "sleep": { "$ref": "#/definitions/score" },
                        "tags": { "type": ["array", "string", "null"] },
                        "note": { "type": ["string", "null"] }
                    }
                }
            }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": "https://synheart.ai/schemas/mood.report.v1.json",
        "title": "Mood analysis report",
        "type": "object",
        "required": ["report_version", "generated_at", "producer", "status", "summary", "recommendations"],
        "properties": {
            "report_version": { "type": "string" },
            "generated_at": { "type": "string", "format": "date-time" },
            "producer": {
                "type": "object",
                "required": ["name", "version", "instance_id"],
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string", "format": "uuid" }
                }
            },
            "status": { "enum": ["complete", "insufficient_data"] },
            "reason": { "type": "string" },
            "summary": {
                "type": ["object", "null"],
                "properties": {
                    "total_users": { "type": "integer" },
                    "total_records": { "type": "integer" },
                    "mood_patterns": { "type": "object" },
                    "user_clusters": { "type": "object" },
                    "user_segments": { "type": "array" },
                    "predictions": {
                        "type": "object",
                        "properties": {
                            "scope": { "enum": ["pooled", "per_user"] },
                            "basis": { "enum": ["model", "historical_mean"] },
                            "points": { "type": "array", "items": { "type": "object" } }
                        }
                    },
                    "insights": { "type": "array" }
                }
            },
            "recommendations": { "type": "array", "items": { "type": "string" } }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum MoodCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    BothStdin,
    DoctorFailed,
}

impl From<io::Error> for MoodCliError {
    fn from(e: io::Error) -> Self {
        MoodCliError::Io(e)
    }
}

impl From<ComputeError> for MoodCliError {
    fn from(e: ComputeError) -> Self {
        MoodCliError::Compute(e)
    }
}

impl From<serde_json::Error> for MoodCliError {
    fn from(e: serde_json::Error) -> Self {
        MoodCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MoodCliError> for CliError {
    fn from(e: MoodCliError) -> Self {
        match e {
            MoodCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MoodCliError::Compute(e) if e.is_schema_error() => CliError {
                code: "SCHEMA_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input matches mood.raw_rows.v1; run 'mood schema input'".to_string()),
            },
            MoodCliError::Compute(ComputeError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'mood doctor --config <path>' for details".to_string()),
            },
            MoodCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            MoodCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MoodCliError::BothStdin => CliError {
                code: "USAGE_ERROR".to_string(),
                message: "Only one of --users and --records can be read from stdin".to_string(),
                hint: Some("Pass a file path for the other table".to_string()),
            },
            MoodCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    schema: String,
    analyzable: bool,
    stats: NormalizationStats,
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
