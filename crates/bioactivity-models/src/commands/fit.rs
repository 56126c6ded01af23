use super::load_dataset;
use crate::cli::{DataArgs, TrainArgs};
use anyhow::Result;
use bioactivity_core::{train_test_split, EvalMetrics};
use bioactivity_models::grid::evaluate_point;
use bioactivity_models::{device, NetConfig, TrainConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub fn execute(
    data: DataArgs,
    train: TrainArgs,
    embedding_size: usize,
    layers: Vec<usize>,
    lr: f64,
    l2: f64,
) -> Result<()> {
    let dataset = load_dataset(&data)?;
    let device = device(data.cpu)?;
    let mut rng = StdRng::seed_from_u64(data.seed);
    let (train_idx, test_idx) = train_test_split(dataset.len(), train.test_size, &mut rng)?;

    let net = NetConfig::from_params(
        data.architecture,
        embedding_size,
        &layers,
        l2,
        train.cnn_max_length,
    );
    let config = TrainConfig {
        learning_rate: lr,
        ..train.train_config(data.seed)
    };
    let (report, y_test, y_pred) = evaluate_point(
        &dataset,
        &train_idx,
        &test_idx,
        &net,
        config,
        train.validation_split,
        &device,
    )?;

    let metrics = EvalMetrics::compute(&y_test, &y_pred);
    println!("R2 score: {}", metrics.r2);
    println!("PCC score: {}", metrics.pearson);
    println!(
        "val_loss: {} after {} epochs (final lr {:.1e})",
        report.val_loss, report.epochs_run, report.final_lr
    );
    println!("{}", metrics);
    Ok(())
}
