//! Encoder architectures sharing a regression head.
pub mod cnn;
pub mod head;
pub mod lstm;

use candle_core::{Result, Tensor};
use candle_nn::init::Init;
use candle_nn::{Embedding, VarBuilder};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use cnn::{BioactivityCnn, CnnConfig};
pub use head::RegressionHead;
pub use lstm::{BioactivityLstm, LstmConfig};

/// Token embedding initialized uniformly in `[-0.05, 0.05]`.
pub(crate) fn embedding(vocab_size: usize, hidden: usize, vb: VarBuilder) -> Result<Embedding> {
    let weights = vb.get_with_hints(
        (vocab_size, hidden),
        "weight",
        Init::Uniform {
            lo: -0.05,
            up: 0.05,
        },
    )?;
    Ok(Embedding::new(weights, hidden))
}

/// A SMILES encoder followed by a [`RegressionHead`].
///
/// `ids` is a `(batch, len)` u32 tensor of token ids and `lengths` holds the number of
/// non-padding tokens of each row.
pub trait BioactivityNet {
    /// The unit-norm encoding fed to the head.
    fn encode(&self, ids: &Tensor, lengths: &[usize]) -> Result<Tensor>;

    fn head(&self) -> &RegressionHead;

    /// Fixed input length, or `None` when batches are padded to their longest row.
    fn input_length(&self) -> Option<usize>;

    fn forward_t(&self, ids: &Tensor, lengths: &[usize], train: bool) -> Result<Tensor> {
        let encoding = self.encode(ids, lengths)?;
        self.head().forward_t(&encoding, train)
    }

    fn l2_penalty(&self) -> Result<Tensor> {
        self.head().l2_penalty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[value(name = "lstm")]
    Lstm,
    #[value(name = "cnn")]
    Cnn,
}

#[derive(Debug, Clone)]
pub enum NetConfig {
    Lstm(LstmConfig),
    Cnn(CnnConfig),
}

impl NetConfig {
    /// Build a config from the grid-search axes. `layers` are LSTM widths or CNN filter
    /// counts depending on the architecture.
    pub fn from_params(
        architecture: Architecture,
        embedding_size: usize,
        layers: &[usize],
        l2: f64,
        max_length: usize,
    ) -> Self {
        match architecture {
            Architecture::Lstm => NetConfig::Lstm(LstmConfig {
                embedding_size,
                layer_sizes: layers.to_vec(),
                l2,
                ..Default::default()
            }),
            Architecture::Cnn => NetConfig::Cnn(CnnConfig {
                embedding_size,
                kernel_sizes: layers.to_vec(),
                max_length,
                l2,
                ..Default::default()
            }),
        }
    }

    pub fn architecture(&self) -> Architecture {
        match self {
            NetConfig::Lstm(_) => Architecture::Lstm,
            NetConfig::Cnn(_) => Architecture::Cnn,
        }
    }

    pub fn build(&self, vb: VarBuilder) -> Result<Box<dyn BioactivityNet>> {
        let net: Box<dyn BioactivityNet> = match self {
            NetConfig::Lstm(config) => Box::new(BioactivityLstm::load(vb, config)?),
            NetConfig::Cnn(config) => Box::new(BioactivityCnn::load(vb, config)?),
        };
        Ok(net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_from_params() -> Result<()> {
        let config = NetConfig::from_params(Architecture::Cnn, 8, &[4, 4], 0.01, 30);
        let NetConfig::Cnn(cnn) = &config else {
            panic!("expected a CNN config");
        };
        assert_eq!(cnn.kernel_sizes, vec![4, 4]);
        assert_eq!(cnn.max_length, 30);
        assert_eq!(cnn.vocab_size, 76);

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let net = config.build(vb)?;
        assert_eq!(net.input_length(), Some(30));
        assert_eq!(config.architecture(), Architecture::Cnn);
        Ok(())
    }

    #[test]
    fn test_embedding_init_range() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let emb = embedding(76, 5, vb)?;
        let w = emb.embeddings().flatten_all()?.to_vec1::<f32>()?;
        assert!(w.iter().all(|v| v.abs() <= 0.05));
        Ok(())
    }
}
