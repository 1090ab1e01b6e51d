use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pollguard_booth::{spawn_engine, Config, EnrollmentWorkflow, SessionError, VerificationSession};
use pollguard_core::BiometricMatcher;
use pollguard_registry::VoterRegistry;
use std::path::PathBuf;
use std::sync::Arc;

mod scanfile;

use scanfile::ScanFileProvider;

#[derive(Parser)]
#[command(name = "pollguard", about = "Voter enrollment and admission control")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a voter from a document scan file
    Enroll {
        /// Scan file: JSON with the recognized text and the captured embedding
        scan: PathBuf,
    },
    /// Verify a voter's identity and issue an admission pass
    Verify {
        /// Voter id printed on the ID card
        id: String,
        /// Live capture file: JSON with the captured embedding
        capture: PathBuf,
    },
    /// List enrolled voters
    List,
    /// Show registry status
    Status,
    /// Clear every voter record (administrative)
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create data directory {}", parent.display()))?;
    }
    let registry = Arc::new(VoterRegistry::open(&config.db_path, config.embedding_dim)?);

    match cli.command {
        Commands::Enroll { scan } => enroll(&config, registry, &scan).await,
        Commands::Verify { id, capture } => verify(&config, registry, &id, &capture).await,
        Commands::List => list(&registry),
        Commands::Status => status(&config, &registry),
        Commands::Reset { yes } => reset(&registry, yes),
    }
}

fn engine(config: &Config) -> pollguard_booth::EngineHandle {
    spawn_engine(
        Box::new(ScanFileProvider),
        Box::new(ScanFileProvider),
        BiometricMatcher::new(config.match_threshold),
    )
}

async fn enroll(config: &Config, registry: Arc<VoterRegistry>, scan: &PathBuf) -> Result<()> {
    let workflow = EnrollmentWorkflow::new(engine(config), registry, config.capture_timeout());
    let frame = scanfile::read_frame(scan)?;

    let outcome = workflow.enroll(frame).await?;
    println!(
        "Registered voter {} ({}), DOB {}",
        outcome.record.name, outcome.record.id, outcome.record.date_of_birth
    );
    if !outcome.incomplete_fields.is_empty() {
        println!(
            "warning: could not extract: {}",
            outcome.incomplete_fields.join(", ")
        );
    }
    Ok(())
}

async fn verify(
    config: &Config,
    registry: Arc<VoterRegistry>,
    id: &str,
    capture: &PathBuf,
) -> Result<()> {
    let mut session =
        VerificationSession::new(engine(config), registry, config.capture_timeout());

    match session.lookup(id) {
        Ok(record) => println!("Voter found: {} ({})", record.name, record.id),
        Err(err @ (SessionError::NotFound(_) | SessionError::AlreadyVoted(_))) => {
            println!("ACCESS DENIED: {err}");
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    }

    let frame = scanfile::read_frame(capture)?;
    match session.capture(frame).await {
        Ok(pass) => {
            println!("ACCESS GRANTED — match score {}%", pass.score);
            println!("{}", serde_json::to_string_pretty(&pass)?);
            Ok(())
        }
        Err(
            err @ (SessionError::NoFaceDetected
            | SessionError::NoMatch { .. }
            | SessionError::AlreadyVoted(_)),
        ) => {
            println!("ACCESS DENIED: {err}");
            std::process::exit(1);
        }
        Err(err) => bail!("verification failed: {err}"),
    }
}

fn list(registry: &VoterRegistry) -> Result<()> {
    let voters = registry.list()?;
    if voters.is_empty() {
        println!("no voters enrolled");
        return Ok(());
    }
    for v in voters {
        println!(
            "{}\t{}\t{}\t{}",
            v.id,
            v.name,
            if v.has_voted { "VOTED" } else { "ELIGIBLE" },
            v.registered_at.format("%Y-%m-%d %H:%M UTC"),
        );
    }
    Ok(())
}

fn status(config: &Config, registry: &VoterRegistry) -> Result<()> {
    let total = registry.count()?;
    let voted = registry.voted_count()?;
    println!("database:     {}", config.db_path.display());
    println!("threshold:    {}", config.match_threshold);
    println!("template dim: {}", registry.template_dim());
    println!("registered:   {total}");
    println!("voted:        {voted}");
    println!("eligible:     {}", total - voted);
    Ok(())
}

fn reset(registry: &VoterRegistry, yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to clear the registry without --yes");
    }
    let removed = registry.reset()?;
    println!("removed {removed} voter records");
    Ok(())
}
