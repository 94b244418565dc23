//! P(Doom) - Development Tools

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use pdoom_core::prelude::*;
use pdoom_tools::content::load_content;
use pdoom_tools::play::{play_script, PlayOptions, PlayScript};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pdoom-tools")]
#[command(about = "Development tools for the P(Doom) simulation kernel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        path: String,
    },
    /// Play a scripted session headlessly and print a JSON summary
    Play {
        /// Session seed
        #[arg(long, default_value = "pdoom")]
        seed: String,
        /// Maximum turns to play
        #[arg(long, default_value_t = 52)]
        turns: u32,
        /// RON play script (fundraises every turn when omitted)
        #[arg(long)]
        script: Option<PathBuf>,
        /// RON scenario overrides
        #[arg(long)]
        overrides: Option<PathBuf>,
        /// Path to data directory
        #[arg(long, default_value = "assets/data")]
        data: String,
        /// Include the verification trail in the summary
        #[arg(long)]
        trail: bool,
        /// Write the session's replay to this file
        #[arg(long)]
        replay_out: Option<PathBuf>,
    },
    /// Re-run a recorded replay and check its final hash
    VerifyReplay {
        /// RON replay file
        replay: PathBuf,
        /// Path to data directory
        #[arg(long, default_value = "assets/data")]
        data: String,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { path } => validate(&path),
        Commands::Play {
            seed,
            turns,
            script,
            overrides,
            data,
            trail,
            replay_out,
        } => play(
            &data,
            script.as_deref(),
            overrides.as_deref(),
            PlayOptions {
                seed,
                turns,
                trail,
                ..PlayOptions::default()
            },
            replay_out.as_deref(),
        ),
        Commands::VerifyReplay { replay, data } => verify_replay(&replay, &data),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

type CliResult = std::result::Result<(), Box<dyn std::error::Error>>;

fn validate(path: &str) -> CliResult {
    tracing::info!("Validating data files in: {path}");
    let report = pdoom_tools::validate::validate_data_directory(Path::new(path))?;
    tracing::info!(
        files = report.files,
        events = report.events,
        actions = report.actions,
        rivals = report.rivals,
        warnings = report.warnings.len(),
        "Validation passed"
    );
    Ok(())
}

fn play(
    data: &str,
    script: Option<&Path>,
    overrides: Option<&Path>,
    mut options: PlayOptions,
    replay_out: Option<&Path>,
) -> CliResult {
    let content = load_content(Path::new(data))?;
    let script = match script {
        Some(path) => PlayScript::load(path)?,
        None => PlayScript::default(),
    };
    if let Some(path) = overrides {
        options.overrides = ScenarioOverrides::from_ron_str(&std::fs::read_to_string(path)?)?;
    }

    let (summary, session) = play_script(&content, &script, &options)?;
    if let Some(path) = replay_out {
        let replay = Replay::from_session(&session);
        let text = ron::ser::to_string_pretty(&replay, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, text)?;
        tracing::info!(path = %path.display(), inputs = replay.input_count(), "Replay written");
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn verify_replay(path: &Path, data: &str) -> CliResult {
    let content = load_content(Path::new(data))?;
    let replay: Replay = ron::from_str(&std::fs::read_to_string(path)?)?;
    if replay.verify(content)? {
        tracing::info!(turn = replay.final_turn, "Replay verified");
        Ok(())
    } else {
        Err(format!("replay {} does not reproduce its final hash", path.display()).into())
    }
}
