use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use derma_core::presenter::format_confidence;
use derma_core::{ChatCompletion, DecodeOutcome, PredictionCompletion};
use derma_native::{NativeSession, default_config_path, init_tracing, load_config};

/// Submit a skin image for diagnosis and ask follow-up questions.
#[derive(Debug, Parser)]
#[command(name = "derma", version, about = "Skin-condition diagnosis client")]
struct Cli {
    /// Image file to diagnose
    image: PathBuf,

    /// Follow-up question for the assistant (repeatable)
    #[arg(short, long)]
    ask: Vec<String>,

    /// Client config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend origin, overriding config and environment
    #[arg(long)]
    base_url: Option<String>,

    /// Verbose mode (debug logging)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("derma error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = load_config(&path)?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    let session = NativeSession::connect(config)?;
    if let DecodeOutcome::Failed(error) = session.load_image(&cli.image).await {
        eprintln!("Could not read {}: {error}", cli.image.display());
        return Ok(ExitCode::FAILURE);
    }

    let result = match session.submit().await {
        Ok(PredictionCompletion::Resulted(result)) => result,
        _ => {
            for alert in session.take_alerts() {
                eprintln!("{}", alert.message);
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("Diagnosis: {}", result.diagnosis);
    println!("Confidence: {}", format_confidence(result.confidence));
    if let Some(recommendation) = session.recommendation() {
        println!("Recommendation: {recommendation}");
    }

    if cli.ask.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }

    session.open_chat().map_err(|rejection| format!("chat unavailable: {rejection:?}"))?;
    for question in &cli.ask {
        if let Ok(ChatCompletion::Stale) | Err(_) = session.ask(question).await {
            tracing::warn!(%question, "question was not answered");
        }
    }

    println!();
    for message in session.transcript() {
        println!("{}: {}", message.sender.display_name(), message.text);
    }
    Ok(ExitCode::SUCCESS)
}
