//! bioactivity-models
//!
//! Neural regressors predicting binding affinity (Ki) from SMILES strings, built on candle.
//!
//! - recurrent and convolutional SMILES encoders sharing a regression head
//! - a trainer with early stopping and learning-rate reduction on plateaus
//! - grid search over embedding size, layer widths, learning rate and L2 strength
//!
//! ```shell
//! cargo run --release --bin bioactivity -- grid --data Mydata.csv --receptor cb1
//! cargo run --release --bin bioactivity --features metal -- grid --architecture cnn
//! ```
use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{Device, Result};

pub mod callbacks;
pub mod grid;
pub mod nets;
pub mod trainer;

pub use grid::{best_by_r2, run_grid, GridOptions, GridPoint, GridResult, ParamGrid};
pub use nets::{
    Architecture, BioactivityCnn, BioactivityLstm, BioactivityNet, CnnConfig, LstmConfig, NetConfig,
};
pub use trainer::{FitReport, Regressor, TrainConfig, Validation};

pub fn device(cpu: bool) -> Result<Device> {
    if cpu {
        Ok(Device::Cpu)
    } else if cuda_is_available() {
        Ok(Device::new_cuda(0)?)
    } else if metal_is_available() {
        Ok(Device::new_metal(0)?)
    } else {
        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        {
            log::info!("Running on CPU, to run on GPU(metal), build with `--features metal`");
        }
        #[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
        {
            log::info!("Running on CPU, to run on GPU, build with `--features cuda`");
        }
        Ok(Device::Cpu)
    }
}
