//! Fitting and inference for a single network configuration.
//!
//! A [`Regressor`] owns the network weights and the Adam optimizer. Training minimizes the
//! mean squared error plus the head's L2 penalty over shuffled mini-batches, with early
//! stopping on the validation loss and learning-rate reduction on training-loss plateaus.
use crate::callbacks::{EarlyStopping, ReduceLrOnPlateau};
use crate::nets::{BioactivityNet, NetConfig};
use anyhow::{anyhow, ensure, Result};
use bioactivity_core::{smiles_to_arrays, take, validation_split, EncodedBatch, SmilesVocab};
use candle_core::{DType, Device, Tensor};
use candle_nn::{loss, AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Epochs without validation improvement before stopping.
    pub patience: usize,
    pub lr_patience: f32,
    pub lr_factor: f64,
    pub lr_min_delta: f32,
    pub min_lr: f64,
    pub shuffle: bool,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let patience = 5;
        Self {
            epochs: 1000,
            batch_size: 32,
            learning_rate: 0.001,
            patience,
            lr_patience: patience as f32 / 2.0,
            lr_factor: 0.1,
            lr_min_delta: 1e-3,
            min_lr: 0.0,
            shuffle: true,
            seed: 9,
        }
    }
}

/// Where validation rows come from.
pub enum Validation<'a> {
    /// Hold out this fraction of the tail of the training rows.
    Split(f64),
    Data(&'a [String], &'a [f32]),
}

impl Default for Validation<'_> {
    fn default() -> Self {
        Validation::Split(0.2)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EpochLog {
    pub epoch: usize,
    pub loss: f32,
    pub val_loss: f32,
    pub lr: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    pub epochs_run: usize,
    /// Best validation loss seen during training.
    pub val_loss: f32,
    pub final_lr: f64,
    pub history: Vec<EpochLog>,
}

pub struct Regressor {
    varmap: VarMap,
    net: Box<dyn BioactivityNet>,
    vocab: SmilesVocab,
    device: Device,
    config: TrainConfig,
}

impl Regressor {
    pub fn new(net_config: &NetConfig, config: TrainConfig, device: &Device) -> Result<Self> {
        ensure!(config.batch_size > 0, "batch size must be positive");
        // the CPU backend draws from the thread rng and cannot be seeded
        if !device.is_cpu() {
            device.set_seed(config.seed)?;
        }
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let net = net_config.build(vb)?;
        Ok(Self {
            varmap,
            net,
            vocab: SmilesVocab::new(),
            device: device.clone(),
            config,
        })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    fn encode(&self, smiles: &[String]) -> Result<EncodedBatch> {
        Ok(smiles_to_arrays(
            &self.vocab,
            smiles,
            self.net.input_length(),
        )?)
    }

    fn to_tensors(&self, batch: &EncodedBatch) -> Result<Tensor> {
        Ok(Tensor::from_vec(
            batch.ids.clone(),
            (batch.rows(), batch.max_len),
            &self.device,
        )?)
    }

    fn objective(&self, batch: &EncodedBatch, targets: &[f32], train: bool) -> Result<Tensor> {
        let ids = self.to_tensors(batch)?;
        let target = Tensor::new(targets, &self.device)?;
        let pred = self.net.forward_t(&ids, &batch.lengths, train)?;
        Ok((loss::mse(&pred, &target)? + self.net.l2_penalty()?)?)
    }

    /// Mean objective over `batch`, evaluated in inference mode.
    fn evaluate(&self, batch: &EncodedBatch, targets: &[f32]) -> Result<f32> {
        let indices: Vec<usize> = (0..batch.rows()).collect();
        let mut total = 0.0f32;
        for chunk in indices.chunks(self.config.batch_size) {
            let loss = self.objective(&batch.select(chunk), &take(targets, chunk), false)?;
            total += loss.to_scalar::<f32>()? * chunk.len() as f32;
        }
        Ok(total / batch.rows() as f32)
    }

    pub fn fit(&mut self, x: &[String], y: &[f32], validation: Validation) -> Result<FitReport> {
        ensure!(
            x.len() == y.len(),
            "{} compounds but {} targets",
            x.len(),
            y.len()
        );
        let encoded = self.encode(x)?;
        let (train, train_y, val, val_y) = match validation {
            Validation::Split(fraction) => {
                let (train_rows, val_rows) = validation_split(x.len(), fraction)?;
                let train_rows: Vec<usize> = train_rows.collect();
                let val_rows: Vec<usize> = val_rows.collect();
                (
                    encoded.select(&train_rows),
                    take(y, &train_rows),
                    encoded.select(&val_rows),
                    take(y, &val_rows),
                )
            }
            Validation::Data(x_val, y_val) => {
                ensure!(
                    !x_val.is_empty() && x_val.len() == y_val.len(),
                    "validation data needs matching, non-empty compounds and targets"
                );
                (encoded, y.to_vec(), self.encode(x_val)?, y_val.to_vec())
            }
        };
        log::debug!(
            "Fitting on {} compounds, validating on {}",
            train.rows(),
            val.rows()
        );

        let params = ParamsAdamW {
            lr: self.config.learning_rate,
            eps: 1e-7,
            weight_decay: 0.0,
            ..Default::default()
        };
        let mut opt = AdamW::new(self.varmap.all_vars(), params)?;
        let mut early_stopping = EarlyStopping::new(self.config.patience);
        let mut reduce_lr = ReduceLrOnPlateau::new(
            self.config.lr_patience,
            self.config.lr_factor,
            self.config.lr_min_delta,
            self.config.min_lr,
        );
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut order: Vec<usize> = (0..train.rows()).collect();
        let mut history = Vec::new();

        for epoch in 0..self.config.epochs {
            if self.config.shuffle {
                order.shuffle(&mut rng);
            }
            let mut total = 0.0f32;
            for chunk in order.chunks(self.config.batch_size) {
                let loss = self.objective(&train.select(chunk), &take(&train_y, chunk), true)?;
                opt.backward_step(&loss)?;
                total += loss.to_scalar::<f32>()? * chunk.len() as f32;
            }
            let loss = total / train.rows() as f32;
            let val_loss = self.evaluate(&val, &val_y)?;
            ensure!(
                loss.is_finite(),
                "training loss diverged at epoch {}",
                epoch + 1
            );
            let lr = opt.learning_rate();
            log::debug!(
                "epoch {:>4}  loss {:.5}  val_loss {:.5}  lr {:.1e}",
                epoch + 1,
                loss,
                val_loss,
                lr
            );
            history.push(EpochLog {
                epoch: epoch + 1,
                loss,
                val_loss,
                lr,
            });

            let stop = early_stopping.step(val_loss);
            if let Some(new_lr) = reduce_lr.step(loss, lr) {
                log::debug!("Reducing learning rate to {:.1e}", new_lr);
                opt.set_learning_rate(new_lr);
            }
            if stop {
                log::debug!("Early stopping after epoch {}", epoch + 1);
                break;
            }
        }

        Ok(FitReport {
            epochs_run: history.len(),
            val_loss: early_stopping.best(),
            final_lr: opt.learning_rate(),
            history,
        })
    }

    /// Predict the affinity of every compound, in input order.
    pub fn predict(&self, x: &[String]) -> Result<Vec<f32>> {
        let encoded = self.encode(x)?;
        let indices: Vec<usize> = (0..encoded.rows()).collect();
        let mut out = Vec::with_capacity(x.len());
        for chunk in indices.chunks(self.config.batch_size) {
            let batch = encoded.select(chunk);
            let ids = self.to_tensors(&batch)?;
            let pred = self.net.forward_t(&ids, &batch.lengths, false)?;
            out.extend(pred.to_vec1::<f32>()?);
        }
        if out.len() != x.len() {
            return Err(anyhow!(
                "expected {} predictions, got {}",
                x.len(),
                out.len()
            ));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nets::{Architecture, CnnConfig, LstmConfig};

    fn toy_data() -> (Vec<String>, Vec<f32>) {
        let smiles: Vec<String> = (1..=12).map(|n| "C".repeat(n)).collect();
        let targets = (1..=12).map(|n| n as f32 / 4.0).collect();
        (smiles, targets)
    }

    fn small_train_config(epochs: usize) -> TrainConfig {
        TrainConfig {
            epochs,
            batch_size: 4,
            learning_rate: 0.01,
            ..Default::default()
        }
    }

    #[test]
    fn test_fit_and_predict_lstm() -> Result<()> {
        let (x, y) = toy_data();
        let net = NetConfig::Lstm(LstmConfig {
            embedding_size: 4,
            layer_sizes: vec![6],
            ..Default::default()
        });
        let mut regressor = Regressor::new(&net, small_train_config(3), &Device::Cpu)?;
        let report = regressor.fit(&x, &y, Validation::Split(0.25))?;
        assert!(report.epochs_run >= 1 && report.epochs_run <= 3);
        assert_eq!(report.history.len(), report.epochs_run);
        assert!(report.val_loss.is_finite());

        let pred = regressor.predict(&x[..5])?;
        assert_eq!(pred.len(), 5);
        assert!(pred.iter().all(|p| p.is_finite()));
        Ok(())
    }

    #[test]
    fn test_fit_cnn_with_explicit_validation() -> Result<()> {
        let (x, y) = toy_data();
        let net = NetConfig::from_params(Architecture::Cnn, 4, &[3, 2], 0.001, 16);
        let mut regressor = Regressor::new(&net, small_train_config(2), &Device::Cpu)?;
        let report = regressor.fit(&x[..9], &y[..9], Validation::Data(&x[9..], &y[9..]))?;
        assert!(report.epochs_run <= 2);
        assert_eq!(regressor.predict(&x)?.len(), 12);
        // default CNN length is kept when unspecified
        assert_eq!(CnnConfig::default().max_length, 300);
        Ok(())
    }

    #[test]
    fn test_early_stopping_on_flat_validation() -> Result<()> {
        let (x, y) = toy_data();
        let net = NetConfig::from_params(Architecture::Lstm, 4, &[4], 0.0, 0);
        let config = TrainConfig {
            patience: 2,
            learning_rate: 0.0,
            ..small_train_config(50)
        };
        let mut regressor = Regressor::new(&net, config, &Device::Cpu)?;
        // frozen weights: the first epoch sets the best loss, the next two fail to beat it
        let report = regressor.fit(&x, &y, Validation::Split(0.25))?;
        assert_eq!(report.epochs_run, 3);
        assert_eq!(report.val_loss, report.history[0].val_loss);
        assert_eq!(report.final_lr, 0.0);
        Ok(())
    }

    #[test]
    fn test_mismatched_lengths() -> Result<()> {
        let (x, y) = toy_data();
        let net = NetConfig::from_params(Architecture::Lstm, 4, &[4], 0.0, 0);
        let mut regressor = Regressor::new(&net, small_train_config(1), &Device::Cpu)?;
        assert!(regressor.fit(&x, &y[..3], Validation::default()).is_err());
        Ok(())
    }
}
