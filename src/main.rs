//! Speech Cognitive Assessment CLI Application

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use speech_assess::config::OutputFormat;
use speech_assess::{
    Assessor, Config, ExternalEvaluation, OutputWriter, ParticipantInfo, TextAnalyzer,
    WaveformSource,
};

/// Speech Cognitive Assessment
#[derive(Parser)]
#[command(name = "speech-assess")]
#[command(about = "Heuristic cognitive-risk indicator from speech audio and transcript", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a recording and its transcript
    Assess {
        /// Audio file path
        audio: PathBuf,

        /// Transcript text
        #[arg(short, long, conflicts_with = "transcript_file")]
        transcript: Option<String>,

        /// Read the transcript from a file
        #[arg(long)]
        transcript_file: Option<PathBuf>,

        /// Participant metadata as KEY=VALUE (repeatable)
        #[arg(short, long = "participant", value_parser = parse_participant)]
        participant: Vec<(String, Value)>,

        /// External evaluation JSON file applied to the text analysis
        #[arg(short, long)]
        evaluation: Option<PathBuf>,

        /// Output format (json, text)
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Append results to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Upper bound of every score
        #[arg(long)]
        max_score: Option<f64>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Extract audio features only
    Features {
        /// Audio file path
        audio: PathBuf,
    },

    /// Analyze a transcript only
    Text {
        /// Transcript text
        #[arg(conflicts_with = "file")]
        text: Option<String>,

        /// Read the transcript from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Write the default configuration as TOML
    InitConfig {
        /// Destination (prints to stdout if not specified)
        path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging - quiet by default, use -v for more
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    // Load configuration
    let mut config = if let Some(ref config_path) = cli.config {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        Config::default()
    };

    match cli.command {
        Commands::Assess {
            audio,
            transcript,
            transcript_file,
            participant,
            evaluation,
            format,
            output,
            max_score,
            pretty,
        } => {
            // Apply CLI overrides
            if let Some(format) = format {
                config.output.format = format;
            }
            if let Some(output) = output {
                config.output.output_path = Some(output);
            }
            if let Some(max_score) = max_score {
                config.scoring.max_score = max_score;
            }
            if pretty {
                config.output.pretty = true;
            }
            config.validate().context("Invalid configuration")?;

            let transcript = read_text(transcript, transcript_file.as_deref())?;
            let participant: ParticipantInfo = participant.into_iter().collect();
            let evaluation = evaluation
                .map(|path| {
                    ExternalEvaluation::from_file(&path)
                        .with_context(|| format!("Failed to read evaluation {}", path.display()))
                })
                .transpose()?;

            assess(config, audio, &transcript, participant, evaluation)
        }
        Commands::Features { audio } => {
            let assessor = Assessor::new(config);
            let features = assessor.extract_audio(&WaveformSource::from_path(&audio));
            print_json(&features, assessor.config().output.pretty)
        }
        Commands::Text { text, file } => {
            let transcript = read_text(text, file.as_deref())?;
            let features = TextAnalyzer::new().analyze(&transcript);
            print_json(&features, config.output.pretty)
        }
        Commands::InitConfig { path } => init_config(&config, path.as_deref()),
    }
}

/// Run the full pipeline on one recording
fn assess(
    config: Config,
    audio: PathBuf,
    transcript: &str,
    participant: ParticipantInfo,
    evaluation: Option<ExternalEvaluation>,
) -> Result<()> {
    let mut output =
        OutputWriter::new(config.output.clone()).context("Failed to create output writer")?;
    let assessor = Assessor::new(config);

    let mut result = assessor.assess(&WaveformSource::from_path(&audio), transcript, participant);
    if let Some(evaluation) = evaluation {
        info!("Applying external evaluation");
        result = assessor.apply_evaluation(&result, &evaluation);
    }

    output.write(&result).context("Failed to write result")?;
    output.flush()?;

    info!(
        "{}: {} ({:.1}/{})",
        audio.display(),
        result.combined_assessment.risk_level,
        result.combined_assessment.combined_score,
        result.combined_assessment.max_score
    );
    Ok(())
}

/// Transcript from the argument, a file, or empty
fn read_text(text: Option<String>, file: Option<&Path>) -> Result<String> {
    match (text, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read transcript {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

fn init_config(config: &Config, path: Option<&Path>) -> Result<()> {
    let toml = config.to_toml()?;
    match path {
        Some(path) => {
            std::fs::write(path, toml)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Configuration written to: {}", path.display());
        }
        None => print!("{}", toml),
    }
    Ok(())
}

/// Parse `KEY=VALUE`; scalar JSON values keep their type, anything else is a string
fn parse_participant(s: &str) -> std::result::Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => v,
        _ => Value::String(raw.to_string()),
    };
    Ok((key.to_string(), value))
}
