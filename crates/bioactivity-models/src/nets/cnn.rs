//! Convolutional encoder.
//!
//! Branch `i` convolves the embedded sequence with `kernel_sizes[i]` filters of width
//! `i + 1` ('same' padding), optionally max-pools, and flattens. Branches with zero
//! filters are skipped.
use super::head::{l2_normalize, RegressionHead};
use super::{embedding, BioactivityNet};
use bioactivity_core::SmilesVocab;
use candle_core::{bail, Module, Result, Tensor, D};
use candle_nn::{conv1d, Conv1d, Conv1dConfig, Embedding, VarBuilder};

#[derive(Debug, Clone)]
pub struct CnnConfig {
    pub vocab_size: usize,
    /// Every input is padded or truncated to this many tokens.
    pub max_length: usize,
    pub embedding_size: usize,
    /// Filter count per branch; branch `i` uses kernel width `i + 1`.
    pub kernel_sizes: Vec<usize>,
    pub pool: usize,
    pub l2: f64,
    pub dropout: f32,
}

impl Default for CnnConfig {
    fn default() -> Self {
        Self {
            vocab_size: SmilesVocab::new().len(),
            max_length: 300,
            embedding_size: 20,
            kernel_sizes: vec![128],
            pool: 1,
            l2: 0.001,
            dropout: 0.0,
        }
    }
}

impl CnnConfig {
    fn pooled_length(&self) -> usize {
        if self.pool > 1 {
            self.max_length / self.pool
        } else {
            self.max_length
        }
    }

    pub fn encoding_size(&self) -> usize {
        self.kernel_sizes.iter().sum::<usize>() * self.pooled_length()
    }
}

struct ConvBranch {
    conv: Conv1d,
    pad_left: usize,
    pad_right: usize,
}

impl ConvBranch {
    fn forward(&self, x: &Tensor, pool: usize) -> Result<Tensor> {
        let x = x.pad_with_zeros(D::Minus1, self.pad_left, self.pad_right)?;
        let mut x = self.conv.forward(&x)?;
        if pool > 1 {
            x = x.unsqueeze(2)?.max_pool2d((1, pool))?.squeeze(2)?;
        }
        x.flatten_from(1)
    }
}

pub struct BioactivityCnn {
    embedding: Embedding,
    branches: Vec<ConvBranch>,
    pool: usize,
    max_length: usize,
    head: RegressionHead,
}

impl BioactivityCnn {
    pub fn load(vb: VarBuilder, config: &CnnConfig) -> Result<Self> {
        if config.kernel_sizes.iter().all(|&k| k == 0) {
            bail!(
                "CNN needs at least one branch with filters, got {:?}",
                config.kernel_sizes
            )
        }
        if config.max_length < config.pool.max(1) {
            bail!(
                "max_length {} is shorter than the pooling window {}",
                config.max_length,
                config.pool
            )
        }
        let embedding = embedding(config.vocab_size, config.embedding_size, vb.pp("embedding"))?;
        let mut branches = Vec::new();
        for (i, &filters) in config.kernel_sizes.iter().enumerate() {
            if filters == 0 {
                continue;
            }
            let kernel = i + 1;
            let conv = conv1d(
                config.embedding_size,
                filters,
                kernel,
                Conv1dConfig::default(),
                vb.pp(format!("conv_{}", i + 1)),
            )?;
            branches.push(ConvBranch {
                conv,
                pad_left: (kernel - 1) / 2,
                pad_right: kernel - 1 - (kernel - 1) / 2,
            });
        }
        let head = RegressionHead::load(
            vb.pp("head"),
            config.encoding_size(),
            config.l2,
            config.dropout,
        )?;
        Ok(Self {
            embedding,
            branches,
            pool: config.pool,
            max_length: config.max_length,
            head,
        })
    }
}

impl BioactivityNet for BioactivityCnn {
    fn encode(&self, ids: &Tensor, _lengths: &[usize]) -> Result<Tensor> {
        // (batch, len, emb) -> (batch, emb, len) for the convolutions
        let x = self.embedding.forward(ids)?.transpose(1, 2)?.contiguous()?;
        let branches = self
            .branches
            .iter()
            .map(|b| b.forward(&x, self.pool))
            .collect::<Result<Vec<_>>>()?;
        let x = if branches.len() > 1 {
            Tensor::cat(&branches, 1)?
        } else {
            branches[0].clone()
        };
        l2_normalize(&x)
    }

    fn head(&self) -> &RegressionHead {
        &self.head
    }

    fn input_length(&self) -> Option<usize> {
        Some(self.max_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bioactivity_core::smiles_to_arrays;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn config(kernel_sizes: Vec<usize>, pool: usize) -> CnnConfig {
        CnnConfig {
            max_length: 12,
            embedding_size: 4,
            kernel_sizes,
            pool,
            ..Default::default()
        }
    }

    fn encode(config: &CnnConfig, smiles: &[&str]) -> Result<Tensor> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let net = BioactivityCnn::load(vb, config)?;
        let batch = smiles_to_arrays(&SmilesVocab::new(), smiles, Some(config.max_length))
            .map_err(candle_core::Error::wrap)?;
        let ids = Tensor::from_vec(batch.ids, (smiles.len(), config.max_length), &Device::Cpu)?;
        assert_eq!(net.forward_t(&ids, &batch.lengths, false)?.dims(), &[smiles.len()]);
        net.encode(&ids, &batch.lengths)
    }

    #[test]
    fn test_branches_concatenate() -> Result<()> {
        // widths 1, 2 (skipped) and 3
        let config = config(vec![3, 0, 2], 1);
        assert_eq!(config.encoding_size(), 5 * 12);
        let enc = encode(&config, &["CCO", "c1ccccc1"])?;
        assert_eq!(enc.dims(), &[2, 60]);
        Ok(())
    }

    #[test]
    fn test_even_kernel_keeps_length() -> Result<()> {
        let config = config(vec![0, 4], 1);
        let enc = encode(&config, &["CCO"])?;
        assert_eq!(enc.dims(), &[1, 48]);
        Ok(())
    }

    #[test]
    fn test_pooling_shrinks_encoding() -> Result<()> {
        let config = config(vec![2], 5);
        assert_eq!(config.encoding_size(), 2 * 2);
        let enc = encode(&config, &["CCO", "ClCBr", "CCCCCCCCCCCCCCCC"])?;
        assert_eq!(enc.dims(), &[3, 4]);
        Ok(())
    }

    #[test]
    fn test_rejects_empty_branches() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        assert!(BioactivityCnn::load(vb, &config(vec![0, 0], 1)).is_err());
    }
}
