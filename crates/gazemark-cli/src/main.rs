use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gazemark_core::{process_batch, stats, FlagMode, IngestRequest, IngestSummary, Sample};
use gazemark_store::{DatasetStore, JsonFileStore};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gazemark", about = "gazemark landmark dataset tool")]
struct Cli {
    /// Dataset file (default: $GAZEMARK_DATASET_PATH, then the daemon's default file name)
    #[arg(short, long, global = true)]
    dataset: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print dataset statistics
    Stats,
    /// Append a client export to the dataset, adding pupil points
    Import {
        /// JSON file: an exported array of samples or a full receive_landmarks body
        file: PathBuf,
        /// Only flag a pupil as added when its point was actually appended
        #[arg(long)]
        strict_pupil_flags: bool,
    },
}

/// Accepted shapes for `import`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Request(IngestRequest),
    Samples(Vec<Sample>),
}

impl ImportFile {
    fn into_parts(self) -> (Vec<Sample>, Value) {
        match self {
            ImportFile::Request(req) => (req.landmarks_data, req.metadata),
            ImportFile::Samples(samples) => (samples, Value::Object(Default::default())),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dataset = cli
        .dataset
        .or_else(|| std::env::var_os("GAZEMARK_DATASET_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(gazemark_core::DEFAULT_DATASET_FILE));
    let mut store = JsonFileStore::new(dataset);

    let output = match cli.command {
        Commands::Stats => {
            let dataset = store.read_all()?;
            serde_json::to_value(stats::compute(dataset.as_deref()))?
        }
        Commands::Import {
            file,
            strict_pupil_flags,
        } => {
            let mode = if strict_pupil_flags {
                FlagMode::Appended
            } else {
                FlagMode::Supplied
            };
            serde_json::to_value(import(&mut store, &file, mode)?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn import(store: &mut impl DatasetStore, file: &Path, mode: FlagMode) -> Result<IngestSummary> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let parsed: ImportFile = serde_json::from_str(&text).with_context(|| {
        format!(
            "{} is neither a sample array nor a landmarks_data payload",
            file.display()
        )
    })?;

    let (samples, metadata) = parsed.into_parts();
    let samples_received = samples.len();
    let batch = process_batch(samples, mode);
    let total_samples = store.append(batch.samples)?;

    tracing::info!(
        file = %file.display(),
        received = samples_received,
        total = total_samples,
        "import complete"
    );

    Ok(IngestSummary {
        status: "success",
        samples_received,
        total_samples,
        metadata,
        pupil_info: batch.pupil_info,
    })
}
