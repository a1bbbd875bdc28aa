#![forbid(unsafe_code)]

//! callflow CLI - convert exported IVR diagrams into traversal structures.
//!
//! # Commands
//!
//! - `convert`: Emit the flat traversal array and the language prompt map
//! - `flat`: Emit the flat traversal array only
//! - `prompts`: Emit the language prompt map only
//! - `validate`: Parse the input and report recovery/diagnostics

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use cf_core::{
    Diagnostic, FlatNode, FlowMetadata, LanguageNodes, LanguageSelection, PolicyConfig,
    default_languages,
};
use cf_parser::{ParseOutcome, parse};
use cf_project::{SubstringSelection, project_flat, project_languages};
use cf_stt::{SpeechConfig, SpeechHttpClient, TranscriptionSummary, transcribe_projection};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

/// callflow CLI - convert exported IVR diagrams into traversal structures.
#[derive(Debug, Parser)]
#[command(
    name = "cf-cli",
    version,
    about = "callflow CLI - convert exported IVR diagrams into traversal structures",
    long_about = "Converts exported call-flow diagrams into the structures an IVR\n\
        runtime traverses: a sorted flat node array and a per-language map of\n\
        voice/touch-tone prompts."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging (can be repeated for more detail: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full conversion: flat array, language map, and metadata.
    Convert {
        /// Input file path or "-" for stdin. If omitted, reads from stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Source identifier recorded in metadata (defaults to the input path)
        #[arg(long)]
        source_id: Option<String>,

        /// Comma-separated language codes for the prompt map
        #[arg(long)]
        languages: Option<String>,

        /// Path to a JSON annotation-policy file
        #[arg(long)]
        policy: Option<String>,

        /// Transcribe prompt audio via the configured speech service
        #[arg(long)]
        transcribe: bool,
    },

    /// Emit the flat traversal array only.
    Flat {
        /// Input file path or "-" for stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Source identifier recorded in metadata (defaults to the input path)
        #[arg(long)]
        source_id: Option<String>,

        /// Path to a JSON annotation-policy file
        #[arg(long)]
        policy: Option<String>,
    },

    /// Emit the language prompt map only.
    Prompts {
        /// Input file path or "-" for stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Comma-separated language codes for the prompt map
        #[arg(long)]
        languages: Option<String>,
    },

    /// Parse the input and report diagnostics.
    Validate {
        /// Input file path or "-" for stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Exit with non-zero status on warnings (not just errors)
        #[arg(long)]
        strict: bool,
    },
}

/// Full conversion output: both projections plus shared metadata.
#[derive(Debug, Serialize)]
struct ConvertResult {
    generated_at: String,
    metadata: FlowMetadata,
    nodes: Vec<FlatNode>,
    language_mappings: BTreeMap<String, LanguageNodes>,
    language_selection: LanguageSelection,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcription: Option<TranscriptionSummary>,
}

#[derive(Debug, Serialize)]
struct PromptsResult {
    generated_at: String,
    language_mappings: BTreeMap<String, LanguageNodes>,
    language_selection: LanguageSelection,
}

#[derive(Debug, Serialize)]
struct ValidateResult {
    valid: bool,
    recovery: String,
    node_count: usize,
    edge_count: usize,
    warnings: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ValidateError>,
}

#[derive(Debug, Serialize)]
struct ValidateError {
    code: String,
    message: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Convert {
            input,
            output,
            pretty,
            source_id,
            languages,
            policy,
            transcribe,
        } => cmd_convert(
            &input,
            output.as_deref(),
            pretty,
            source_id.as_deref(),
            languages.as_deref(),
            policy.as_deref(),
            transcribe,
        ),

        Command::Flat {
            input,
            output,
            pretty,
            source_id,
            policy,
        } => cmd_flat(
            &input,
            output.as_deref(),
            pretty,
            source_id.as_deref(),
            policy.as_deref(),
        ),

        Command::Prompts {
            input,
            output,
            pretty,
            languages,
        } => cmd_prompts(&input, output.as_deref(), pretty, languages.as_deref()),

        Command::Validate {
            input,
            json,
            strict,
        } => cmd_validate(&input, json, strict),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .try_init();
}

fn load_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else if Path::new(input).exists() {
        std::fs::read_to_string(input).context(format!("Failed to read file: {input}"))
    } else {
        // Treat as inline markup text
        Ok(input.to_string())
    }
}

fn write_output(output: Option<&str>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).context(format!("Failed to write to: {path}"))?;
            info!("Wrote output to: {path}");
        }
        None => {
            io::stdout()
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

fn write_json<T: Serialize>(output: Option<&str>, value: &T, pretty: bool) -> Result<()> {
    let mut rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    rendered.push('\n');
    write_output(output, &rendered)
}

fn parse_input(input: &str) -> Result<ParseOutcome> {
    let source = load_input(input)?;
    let outcome = parse(&source).context("Failed to parse call-flow markup")?;
    for diagnostic in &outcome.diagnostics {
        warn!(
            code = diagnostic.category.as_str(),
            "{}", diagnostic.message
        );
    }
    Ok(outcome)
}

fn source_label(input: &str, source_id: Option<&str>) -> String {
    match source_id {
        Some(id) => id.to_string(),
        None if input == "-" => "stdin".to_string(),
        None => input.to_string(),
    }
}

fn resolve_policy(path: Option<&str>) -> Result<PolicyConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .context(format!("Failed to read policy file: {path}"))?;
            PolicyConfig::from_json(&text).context(format!("Invalid policy file: {path}"))
        }
        None => Ok(PolicyConfig::default()),
    }
}

fn resolve_languages(arg: Option<&str>) -> Vec<String> {
    match arg {
        Some(list) => {
            let languages: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(ToString::to_string)
                .collect();
            if languages.is_empty() {
                default_languages()
            } else {
                languages
            }
        }
        None => default_languages(),
    }
}

fn generated_at() -> Result<String> {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .context("Failed to format timestamp")
}

// =============================================================================
// Command: convert
// =============================================================================

fn cmd_convert(
    input: &str,
    output: Option<&str>,
    pretty: bool,
    source_id: Option<&str>,
    languages: Option<&str>,
    policy: Option<&str>,
    transcribe: bool,
) -> Result<()> {
    let outcome = parse_input(input)?;
    let policy = resolve_policy(policy)?;
    let languages = resolve_languages(languages);
    let source = source_label(input, source_id);

    let flat = project_flat(&outcome.graph, &policy, &source);
    let mut prompts = project_languages(&outcome.graph, &languages, &SubstringSelection);

    let transcription = if transcribe {
        let config = SpeechConfig::from_env().context("Speech service is not configured")?;
        let client = SpeechHttpClient::new(config)?;
        let summary = transcribe_projection(&mut prompts, &client);
        info!(
            successful = summary.successful,
            failed = summary.failed,
            "transcription finished"
        );
        Some(summary)
    } else {
        None
    };

    let map = prompts.render();
    let result = ConvertResult {
        generated_at: generated_at()?,
        metadata: flat.metadata,
        nodes: flat.nodes,
        language_mappings: map.language_mappings,
        language_selection: map.language_selection,
        transcription,
    };

    info!(
        nodes = result.metadata.total_nodes,
        connections = result.metadata.total_connections,
        recovery = outcome.recovery.as_str(),
        "conversion complete"
    );
    write_json(output, &result, pretty)
}

// =============================================================================
// Command: flat
// =============================================================================

fn cmd_flat(
    input: &str,
    output: Option<&str>,
    pretty: bool,
    source_id: Option<&str>,
    policy: Option<&str>,
) -> Result<()> {
    let outcome = parse_input(input)?;
    let policy = resolve_policy(policy)?;
    let source = source_label(input, source_id);
    let projection = project_flat(&outcome.graph, &policy, &source);
    write_json(output, &projection, pretty)
}

// =============================================================================
// Command: prompts
// =============================================================================

fn cmd_prompts(
    input: &str,
    output: Option<&str>,
    pretty: bool,
    languages: Option<&str>,
) -> Result<()> {
    let outcome = parse_input(input)?;
    let languages = resolve_languages(languages);
    let projection = project_languages(&outcome.graph, &languages, &SubstringSelection);
    let map = projection.render();
    let result = PromptsResult {
        generated_at: generated_at()?,
        language_mappings: map.language_mappings,
        language_selection: map.language_selection,
    };
    write_json(output, &result, pretty)
}

// =============================================================================
// Command: validate
// =============================================================================

fn cmd_validate(input: &str, json: bool, strict: bool) -> Result<()> {
    let source = load_input(input)?;

    let result = match parse(&source) {
        Ok(outcome) => ValidateResult {
            valid: true,
            recovery: outcome.recovery.as_str().to_string(),
            node_count: outcome.graph.nodes.len(),
            edge_count: outcome.graph.edges.len(),
            warnings: outcome.diagnostics,
            error: None,
        },
        Err(error) => ValidateResult {
            valid: false,
            recovery: String::new(),
            node_count: 0,
            edge_count: 0,
            warnings: Vec::new(),
            error: Some(ValidateError {
                code: error.code().to_string(),
                message: error.to_string(),
            }),
        },
    };

    if json {
        write_json(None, &result, true)?;
    } else if result.valid {
        println!(
            "valid: {} nodes, {} connections (recovery: {})",
            result.node_count, result.edge_count, result.recovery
        );
        for warning in &result.warnings {
            println!("  warning [{}]: {}", warning.category.as_str(), warning.message);
        }
    } else if let Some(error) = &result.error {
        println!("invalid [{}]: {}", error.code, error.message);
    }

    if !result.valid {
        anyhow::bail!("input is not a parseable call-flow document");
    }
    if strict && !result.warnings.is_empty() {
        anyhow::bail!("validation produced {} warning(s)", result.warnings.len());
    }
    Ok(())
}
