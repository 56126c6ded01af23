use super::load_dataset;
use crate::cli::{DataArgs, TrainArgs};
use anyhow::{Context, Result};
use bioactivity_models::{best_by_r2, device, run_grid, GridOptions, ParamGrid};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

pub fn execute(
    data: DataArgs,
    train: TrainArgs,
    grid: Option<PathBuf>,
    output: Option<PathBuf>,
    limit: Option<usize>,
) -> Result<()> {
    let dataset = load_dataset(&data)?;
    let grid = match grid {
        Some(path) => ParamGrid::from_json(path)?,
        None => ParamGrid::default(),
    };
    let device = device(data.cpu)?;
    let options = GridOptions {
        architecture: data.architecture,
        test_size: train.test_size,
        validation_split: train.validation_split,
        cnn_max_length: train.cnn_max_length,
        train: train.train_config(data.seed),
        limit,
    };
    log::info!(
        "Searching {} grid points with the {:?} encoder on {} compounds",
        limit.map_or(grid.len(), |l| l.min(grid.len())),
        data.architecture,
        dataset.len()
    );

    let results = run_grid(&dataset, &grid, &options, &device)?;
    if let Some(best) = best_by_r2(&results) {
        println!(
            "Best R2 {:.4} (PCC {:.4}) for parameters {}",
            best.r2, best.pearson_r, best.params
        );
    }
    if let Some(path) = output {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &results)?;
        log::info!("Wrote {} results to {}", results.len(), path.display());
    }
    Ok(())
}
