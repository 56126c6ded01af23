use super::commands;
use bioactivity_io::Receptor;
use bioactivity_models::{Architecture, TrainConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Dataset and model selection shared by the training commands.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    #[arg(long, default_value = "Mydata.csv")]
    pub data: PathBuf,

    #[arg(long, default_value = "cb1")]
    pub receptor: Receptor,

    #[arg(long, value_enum, default_value_t = Architecture::Lstm)]
    pub architecture: Architecture,

    #[arg(long, default_value_t = 9)]
    pub seed: u64,

    /// Run on the CPU even when a GPU is available.
    #[arg(long)]
    pub cpu: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    #[arg(long, default_value_t = 1000)]
    pub max_epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Epochs without validation improvement before stopping.
    #[arg(long, default_value_t = 5)]
    pub patience: usize,

    /// Input length of the convolutional encoder.
    #[arg(long, default_value_t = 300)]
    pub cnn_max_length: usize,

    /// Fraction of compounds held out for scoring.
    #[arg(long, default_value_t = 0.25)]
    pub test_size: f64,

    /// Fraction of the training compounds held out for early stopping.
    #[arg(long, default_value_t = 0.25)]
    pub validation_split: f64,
}

impl TrainArgs {
    pub fn train_config(&self, seed: u64) -> TrainConfig {
        TrainConfig {
            epochs: self.max_epochs,
            batch_size: self.batch_size,
            patience: self.patience,
            lr_patience: self.patience as f32 / 2.0,
            seed,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Score every point of a hyperparameter grid.
    Grid {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        train: TrainArgs,
        /// JSON file with `emb`, `lay`, `lr_param` and `l2_param` lists.
        #[arg(long)]
        grid: Option<PathBuf>,
        /// Write all results as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Stop after this many grid points.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Fit and score a single configuration.
    Fit {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        train: TrainArgs,
        #[arg(long, default_value_t = 20)]
        embedding_size: usize,
        /// LSTM widths or CNN filter counts, comma separated.
        #[arg(long, value_delimiter = ',', default_value = "128")]
        layers: Vec<usize>,
        #[arg(long, default_value_t = 0.001)]
        lr: f64,
        #[arg(long, default_value_t = 0.001)]
        l2: f64,
    },
    /// Print the padded integer encoding of SMILES strings.
    Encode {
        #[arg(required = true)]
        smiles: Vec<String>,
        #[arg(long)]
        max_length: Option<usize>,
    },
    /// Summarize the usable compounds per receptor.
    Stats {
        #[arg(long, default_value = "Mydata.csv")]
        data: PathBuf,
    },
}

impl Cli {
    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Grid {
                data,
                train,
                grid,
                output,
                limit,
            } => commands::grid::execute(data, train, grid, output, limit),
            Commands::Fit {
                data,
                train,
                embedding_size,
                layers,
                lr,
                l2,
            } => commands::fit::execute(data, train, embedding_size, layers, lr, l2),
            Commands::Encode { smiles, max_length } => commands::encode::execute(smiles, max_length),
            Commands::Stats { data } => commands::stats::execute(data),
        }
    }
}
