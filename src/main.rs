use anyhow::Context;
use clap::{Parser, Subcommand};
use foodvec::{
    AnswerSnapshot, ArtifactStore, LiveIndex, Query, QuestionId, ResolverConfig, VectorSpace,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Match food items by question-answer vectors
#[derive(Parser, Debug)]
#[command(name = "foodvec")]
#[command(about = "Match food items by question-answer vectors", long_about = None)]
struct Args {
    /// Artifact root directory
    #[arg(short = 'd', long, default_value = "./artifacts", global = true)]
    artifacts: PathBuf,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the vector space from a JSON answer snapshot and publish it
    Build {
        /// Snapshot file: {"questions": [...], "foods": [{"food_id", "answers"}]}
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Prune down to this many generations after publishing
        #[arg(long)]
        keep: Option<usize>,
    },
    /// Find the food items closest to a partial answer set
    Query {
        /// Answer as QUESTION_ID=VALUE, repeatable
        #[arg(short = 'a', long = "answer", value_parser = parse_answer)]
        answers: Vec<(QuestionId, f32)>,

        /// Number of matches
        #[arg(short, long, default_value_t = 5)]
        k: usize,

        /// Print matches as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the live generation's manifest
    Inspect,
    /// Remove superseded generations and leftover staging directories
    Prune {
        #[arg(long, default_value_t = 2)]
        keep: usize,
    },
}

fn parse_answer(s: &str) -> Result<(QuestionId, f32), String> {
    let (qid, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected QUESTION_ID=VALUE, got {:?}", s))?;
    let qid = qid
        .trim()
        .parse::<QuestionId>()
        .map_err(|e| format!("bad question id {:?}: {}", qid, e))?;
    let value = value
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("bad value {:?}: {}", value, e))?;
    Ok((qid, value))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("foodvec v{}", env!("CARGO_PKG_VERSION"));
    info!("Artifact directory: {:?}", args.artifacts);

    match args.command {
        Command::Build { snapshot, keep } => {
            let data = std::fs::read(&snapshot)
                .with_context(|| format!("cannot read snapshot {:?}", snapshot))?;
            let snapshot: AnswerSnapshot =
                serde_json::from_slice(&data).context("snapshot is not valid JSON")?;
            snapshot.validate()?;

            let bundle = VectorSpace::build(&snapshot)?.into_bundle()?;
            let store = ArtifactStore::new(&args.artifacts)
                .with_context(|| format!("cannot create artifact directory {:?}", args.artifacts))?;
            let manifest = store.publish(&bundle)?;
            println!(
                "Published {} ({} questions, {} food items)",
                manifest.generation, manifest.dimension, manifest.rows
            );

            if let Some(keep) = keep {
                store.prune(keep)?;
            }
        }
        Command::Query { answers, k, json } => {
            let live = LiveIndex::open_dir(&args.artifacts, ResolverConfig::default())?;
            let query = answers.into_iter().collect::<Query>().limit(k);
            let matches = live.resolve(&query)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else {
                println!("Top {} Matches:", k);
                for m in &matches {
                    println!("{}", m);
                }
            }
        }
        Command::Inspect => {
            let store = ArtifactStore::open(&args.artifacts)?;
            let generation = store.load_current()?;
            println!("{}", serde_json::to_string_pretty(&generation.manifest)?);
        }
        Command::Prune { keep } => {
            let store = ArtifactStore::open(&args.artifacts)?;
            let removed = store.prune(keep)?;
            for name in &removed {
                println!("Removed {}", name);
            }
            println!("{} removed", removed.len());
        }
    }

    Ok(())
}
