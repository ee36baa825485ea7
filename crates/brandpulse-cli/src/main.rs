use std::path::PathBuf;

use brandpulse_core::BucketWidth;
use brandpulse_sentiment::CorpusFormat;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod analyze;
mod brands;
mod train;

#[derive(Debug, Parser)]
#[command(name = "brandpulse")]
#[command(about = "Brand sentiment and health metrics from social posts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Train the sentiment model on a labeled JSON Lines corpus
    Train {
        /// Labeled corpus: JSON Lines, or CSV rows of `id,brand,sentiment,text`
        #[arg(long)]
        corpus: PathBuf,

        /// Corpus format: jsonl or csv (defaults to the file extension)
        #[arg(long)]
        format: Option<CorpusFormat>,

        /// Where to write the model (defaults to `BRANDPULSE_MODEL_PATH`)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Additive smoothing for unseen terms
        #[arg(long, default_value_t = 1.0)]
        alpha: f64,

        /// Train on single words only
        #[arg(long)]
        no_bigrams: bool,
    },
    /// Score a trained model against a labeled corpus
    Evaluate {
        #[arg(long)]
        corpus: PathBuf,

        #[arg(long)]
        format: Option<CorpusFormat>,

        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Classify posts and emit per-brand metric windows and crisis signals
    Analyze {
        /// Posts as JSON Lines
        #[arg(long)]
        posts: PathBuf,

        #[arg(long)]
        model: Option<PathBuf>,

        /// Bucket width: hour, day or week (defaults to `BRANDPULSE_BUCKET`)
        #[arg(long)]
        bucket: Option<BucketWidth>,

        /// Also emit empty windows for quiet buckets
        #[arg(long)]
        dense: bool,

        /// Write JSON Lines here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print per-brand and per-category totals
        #[arg(long)]
        summary: bool,
    },
    /// Validate and list the tracked brands file
    Brands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = brandpulse_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Train {
            corpus,
            format,
            model,
            alpha,
            no_bigrams,
        }) => {
            let format = format.unwrap_or_else(|| CorpusFormat::from_path(&corpus));
            let model = model.unwrap_or_else(|| config.model_path.clone());
            train::run_train(&config, &corpus, format, &model, alpha, no_bigrams)?;
        }
        Some(Commands::Evaluate {
            corpus,
            format,
            model,
        }) => {
            let format = format.unwrap_or_else(|| CorpusFormat::from_path(&corpus));
            let model = model.unwrap_or_else(|| config.model_path.clone());
            train::run_evaluate(&corpus, format, &model)?;
        }
        Some(Commands::Analyze {
            posts,
            model,
            bucket,
            dense,
            out,
            summary,
        }) => {
            let options = analyze::AnalyzeOptions {
                posts,
                model: model.unwrap_or_else(|| config.model_path.clone()),
                bucket: bucket.unwrap_or(config.bucket),
                dense,
                out,
                summary,
            };
            analyze::run_analyze(&config, options).await?;
        }
        Some(Commands::Brands) => brands::run_brands(&config.brands_path)?,
        None => println!("no command given; run `brandpulse --help` for usage"),
    }

    Ok(())
}
