use clap::{Parser, Subcommand};
use image_classifier::backend::{ClassifierBackend, select_backend};
use image_classifier::config::{self, BackendKind};
use image_classifier::fetch::HttpFetcher;
use image_classifier::output;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "image-classifier")]
#[command(about = "Classify the image behind a URL with a pre-trained model")]
#[command(long_about = "\
Classify the image behind a URL with a pre-trained model

The image is fetched, resized and normalized for the selected backend, run
through the model, and the labels are printed ranked by score.

Backends:

  inception   TensorFlow Inception graph, 224x224 RGB, returns every label
  nin         Network-in-Network ONNX model, 224x224 RGB, returns the top five

Model and label paths come from the config file. A missing config file means
stock defaults.

Run 'image-classifier gen-config' to generate a documented classifier.toml.
Set RUST_LOG (e.g. RUST_LOG=debug) to control log output on stderr.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Override the backend chosen in the config file
    #[arg(long, value_enum, global = true)]
    backend: Option<BackendArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum BackendArg {
    Inception,
    Nin,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Inception => BackendKind::Inception,
            BackendArg::Nin => BackendKind::Nin,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Classify the image at URL and print ranked labels
    Classify {
        /// Absolute http(s):// URL of the image (file:// with fetch.allow_file_urls)
        url: String,
        /// Print the JSON response body instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Load the model and labels, report, and exit
    Check,
    /// Print a stock classifier.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Classify { url, json } => {
            let backend = load_backend(&cli.config, cli.backend)?;
            let result = backend.classify(&url)?;
            if json {
                println!("{}", output::format_classification_json(&result)?);
            } else {
                output::print_classification(&result);
            }
        }
        Command::Check => {
            let backend = load_backend(&cli.config, cli.backend)?;
            output::print_startup_report(backend.as_ref());
            println!("==> Backend is ready");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialization phase: config, fetcher, model and labels. Any error is fatal.
fn load_backend(
    config_path: &Path,
    override_kind: Option<BackendArg>,
) -> Result<Box<dyn ClassifierBackend>, Box<dyn std::error::Error>> {
    init_tracing();

    let mut classifier_config = config::load_config(config_path)?;
    if let Some(kind) = override_kind {
        classifier_config.backend = kind.into();
        classifier_config.validate()?;
    }

    let fetcher = HttpFetcher::new(&classifier_config.fetch)?;
    Ok(select_backend(&classifier_config, fetcher)?)
}

/// Install the stderr log subscriber. `RUST_LOG` wins over the `info` default.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
