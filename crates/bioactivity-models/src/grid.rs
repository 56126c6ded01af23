//! Hyperparameter grid search.
//!
//! Every grid point is scored on its own random train/test split: the regressor is fitted on
//! the training side (with a validation tail held out for early stopping) and the held-out
//! test compounds are scored with R² and Pearson correlation.
use crate::nets::{Architecture, NetConfig};
use crate::trainer::{FitReport, Regressor, TrainConfig, Validation};
use anyhow::{Context, Result};
use bioactivity_core::{pearson, r2_score, take, train_test_split};
use bioactivity_io::AffinityDataset;
use candle_core::Device;
use itertools::{iproduct, Itertools};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;

/// Axes of the search. Field names double as the parameter names in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub emb: Vec<usize>,
    pub lay: Vec<Vec<usize>>,
    pub lr_param: Vec<f64>,
    pub l2_param: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            emb: vec![20, 40, 60, 80, 100],
            lay: vec![
                vec![128],
                vec![64, 64],
                vec![128, 128],
                vec![64, 64, 64],
                vec![128, 128, 128],
            ],
            lr_param: vec![0.01, 0.001, 0.0001, 0.00001],
            l2_param: vec![0.0, 0.01, 0.001, 0.0001],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub emb: usize,
    pub l2_param: f64,
    pub lay: Vec<usize>,
    pub lr_param: f64,
}

impl Display for GridPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{'emb': {}, 'l2_param': {}, 'lay': [{}], 'lr_param': {}}}",
            self.emb,
            self.l2_param,
            self.lay.iter().join(", "),
            self.lr_param
        )
    }
}

impl ParamGrid {
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read grid file {}", path.display()))?;
        let grid = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse grid file {}", path.display()))?;
        Ok(grid)
    }

    pub fn len(&self) -> usize {
        self.emb.len() * self.lay.len() * self.lr_param.len() * self.l2_param.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Points with the parameter names in alphabetical order and the last one varying
    /// fastest.
    pub fn iter(&self) -> impl Iterator<Item = GridPoint> + '_ {
        iproduct!(
            self.emb.iter(),
            self.l2_param.iter(),
            self.lay.iter(),
            self.lr_param.iter()
        )
        .map(|(&emb, &l2_param, lay, &lr_param)| GridPoint {
            emb,
            l2_param,
            lay: lay.clone(),
            lr_param,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GridOptions {
    pub architecture: Architecture,
    pub test_size: f64,
    pub validation_split: f64,
    /// Input length of the convolutional encoder.
    pub cnn_max_length: usize,
    pub train: TrainConfig,
    pub limit: Option<usize>,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            architecture: Architecture::Lstm,
            test_size: 0.25,
            validation_split: 0.25,
            cnn_max_length: 300,
            train: TrainConfig::default(),
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GridResult {
    pub params: GridPoint,
    pub r2: f64,
    pub pearson_r: f64,
    pub pearson_p: f64,
    pub val_loss: f32,
    pub epochs_run: usize,
}

/// Training seed of the `index`-th grid point.
fn point_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add(index as u64)
}

/// Fit one regressor and score it on the test compounds.
pub fn evaluate_point(
    dataset: &AffinityDataset,
    train_idx: &[usize],
    test_idx: &[usize],
    net: &NetConfig,
    train: TrainConfig,
    validation_split: f64,
    device: &Device,
) -> Result<(FitReport, Vec<f32>, Vec<f32>)> {
    let x = dataset.smiles();
    let y = dataset.targets();
    let (x_train, y_train) = (take(&x, train_idx), take(&y, train_idx));
    let (x_test, y_test) = (take(&x, test_idx), take(&y, test_idx));

    let mut regressor = Regressor::new(net, train, device)?;
    let report = regressor.fit(&x_train, &y_train, Validation::Split(validation_split))?;
    let y_pred = regressor.predict(&x_test)?;
    Ok((report, y_test, y_pred))
}

/// Run the search, printing a report for every point as it completes.
pub fn run_grid(
    dataset: &AffinityDataset,
    grid: &ParamGrid,
    options: &GridOptions,
    device: &Device,
) -> Result<Vec<GridResult>> {
    let total = options.limit.map_or(grid.len(), |l| l.min(grid.len()));
    let mut rng = StdRng::seed_from_u64(options.train.seed);
    let mut results = Vec::with_capacity(total);

    for (i, params) in grid.iter().take(total).enumerate() {
        log::info!("[{}/{}] {}", i + 1, total, params);
        let (train_idx, test_idx) = train_test_split(dataset.len(), options.test_size, &mut rng)?;
        let net = NetConfig::from_params(
            options.architecture,
            params.emb,
            &params.lay,
            params.l2_param,
            options.cnn_max_length,
        );
        let train = TrainConfig {
            learning_rate: params.lr_param,
            seed: point_seed(options.train.seed, i),
            ..options.train.clone()
        };
        let (report, y_test, y_pred) = evaluate_point(
            dataset,
            &train_idx,
            &test_idx,
            &net,
            train,
            options.validation_split,
            device,
        )?;
        let score = r2_score(&y_test, &y_pred);
        let pear = pearson(&y_test, &y_pred);
        println!("\nR2 score for parameters {} is: {}\n", params, score);
        println!("PCC score for parameters {} is: {}\n", params, pear);

        results.push(GridResult {
            params,
            r2: score,
            pearson_r: pear.r,
            pearson_p: pear.p_value,
            val_loss: report.val_loss,
            epochs_run: report.epochs_run,
        });
    }
    Ok(results)
}

/// Highest R², ignoring points whose score is undefined.
pub fn best_by_r2(results: &[GridResult]) -> Option<&GridResult> {
    results
        .iter()
        .filter(|r| r.r2.is_finite())
        .max_by(|a, b| a.r2.total_cmp(&b.r2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_size() {
        let grid = ParamGrid::default();
        assert_eq!(grid.len(), 400);
        assert_eq!(grid.iter().count(), 400);
    }

    #[test]
    fn test_grid_order() {
        let grid = ParamGrid::default();
        let points: Vec<GridPoint> = grid.iter().take(5).collect();
        // lr_param varies fastest, then lay
        assert_eq!(points[0].lr_param, 0.01);
        assert_eq!(points[1].lr_param, 0.001);
        assert_eq!(points[3].lr_param, 0.00001);
        assert_eq!(points[4].lay, vec![64, 64]);
        assert!(points.iter().all(|p| p.emb == 20 && p.l2_param == 0.0));

        let last = grid.iter().last().unwrap();
        assert_eq!(last.emb, 100);
        assert_eq!(last.l2_param, 0.0001);
        assert_eq!(last.lay, vec![128, 128, 128]);
    }

    #[test]
    fn test_grid_point_display() {
        let point = GridPoint {
            emb: 20,
            l2_param: 0.001,
            lay: vec![64, 64],
            lr_param: 0.01,
        };
        assert_eq!(
            point.to_string(),
            "{'emb': 20, 'l2_param': 0.001, 'lay': [64, 64], 'lr_param': 0.01}"
        );
    }

    #[test]
    fn test_grid_json_roundtrip() -> Result<()> {
        let json = r#"{"emb": [4], "lay": [[2], [2, 2]], "lr_param": [0.01], "l2_param": [0.0]}"#;
        let grid: ParamGrid = serde_json::from_str(json)?;
        assert_eq!(grid.len(), 2);
        assert!(!grid.is_empty());
        Ok(())
    }

    #[test]
    fn test_point_seed_wraps() {
        assert_eq!(point_seed(9, 3), 12);
        assert_eq!(point_seed(u64::MAX, 0), u64::MAX);
        assert_eq!(point_seed(u64::MAX, 2), 1);
    }

    #[test]
    fn test_best_by_r2() {
        let point = GridPoint {
            emb: 1,
            l2_param: 0.0,
            lay: vec![1],
            lr_param: 0.1,
        };
        let result = |r2| GridResult {
            params: point.clone(),
            r2,
            pearson_r: 0.0,
            pearson_p: 1.0,
            val_loss: 0.0,
            epochs_run: 1,
        };
        let results = vec![result(0.2), result(f64::NAN), result(0.5), result(-1.0)];
        assert_eq!(best_by_r2(&results).map(|r| r.r2), Some(0.5));
        assert!(best_by_r2(&[]).is_none());
    }
}
