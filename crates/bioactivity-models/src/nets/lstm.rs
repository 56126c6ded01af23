//! Recurrent encoder.
//!
//! Embedded tokens run through a stack of LSTMs. The final hidden and cell states of every
//! layer are concatenated and normalized before the regression head. Padding is masked by
//! reading the states at each compound's last real token, so the encoding of a compound
//! does not depend on how far its batch was padded.
use super::head::{l2_normalize, RegressionHead};
use super::{embedding, BioactivityNet};
use bioactivity_core::SmilesVocab;
use candle_core::{bail, Module, Result, Tensor};
use candle_nn::rnn::{lstm, LSTMConfig, LSTM, RNN};
use candle_nn::{Embedding, VarBuilder};

#[derive(Debug, Clone)]
pub struct LstmConfig {
    pub vocab_size: usize,
    pub embedding_size: usize,
    pub layer_sizes: Vec<usize>,
    pub l2: f64,
    pub dropout: f32,
}

impl Default for LstmConfig {
    fn default() -> Self {
        Self {
            vocab_size: SmilesVocab::new().len(),
            embedding_size: 20,
            layer_sizes: vec![128],
            l2: 0.001,
            dropout: 0.0,
        }
    }
}

impl LstmConfig {
    /// Width of the concatenated `(h, c)` states of every layer.
    pub fn encoding_size(&self) -> usize {
        2 * self.layer_sizes.iter().sum::<usize>()
    }
}

pub struct BioactivityLstm {
    embedding: Embedding,
    layers: Vec<LSTM>,
    head: RegressionHead,
}

impl BioactivityLstm {
    pub fn load(vb: VarBuilder, config: &LstmConfig) -> Result<Self> {
        if config.layer_sizes.is_empty() || config.layer_sizes.contains(&0) {
            bail!(
                "LSTM layer sizes must be non-empty and positive, got {:?}",
                config.layer_sizes
            )
        }
        let embedding = embedding(config.vocab_size, config.embedding_size, vb.pp("embedding"))?;
        let mut layers = Vec::with_capacity(config.layer_sizes.len());
        let mut in_dim = config.embedding_size;
        for (i, &hidden) in config.layer_sizes.iter().enumerate() {
            layers.push(lstm(
                in_dim,
                hidden,
                LSTMConfig::default(),
                vb.pp(format!("lstm_{}", i + 1)),
            )?);
            in_dim = hidden;
        }
        let head = RegressionHead::load(
            vb.pp("head"),
            config.encoding_size(),
            config.l2,
            config.dropout,
        )?;
        Ok(Self {
            embedding,
            layers,
            head,
        })
    }
}

/// Pick `states[b, lengths[b] - 1, :]` for every row `b` of a `(batch, seq, hidden)` tensor.
fn last_step(states: &Tensor, lengths: &[usize]) -> Result<Tensor> {
    let (batch, _seq, hidden) = states.dims3()?;
    let idx: Vec<u32> = lengths.iter().map(|&l| l.max(1) as u32 - 1).collect();
    let idx = Tensor::from_vec(idx, (batch, 1, 1), states.device())?
        .broadcast_as((batch, 1, hidden))?
        .contiguous()?;
    states.gather(&idx, 1)?.squeeze(1)
}

impl BioactivityNet for BioactivityLstm {
    fn encode(&self, ids: &Tensor, lengths: &[usize]) -> Result<Tensor> {
        let steps = lengths.iter().copied().max().unwrap_or(1).max(1);
        let ids = ids.narrow(1, 0, steps.min(ids.dim(1)?))?;
        let mut x = self.embedding.forward(&ids)?;
        let mut finals = Vec::with_capacity(2 * self.layers.len());
        for layer in &self.layers {
            let states = layer.seq(&x)?;
            let h = layer.states_to_tensor(&states)?;
            let c = Tensor::stack(&states.iter().map(|s| s.c().clone()).collect::<Vec<_>>(), 1)?;
            finals.push(last_step(&h, lengths)?);
            finals.push(last_step(&c, lengths)?);
            x = h;
        }
        l2_normalize(&Tensor::cat(&finals, 1)?)
    }

    fn head(&self) -> &RegressionHead {
        &self.head
    }

    fn input_length(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bioactivity_core::smiles_to_arrays;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn tiny_lstm(varmap: &VarMap, layers: Vec<usize>) -> Result<BioactivityLstm> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, &Device::Cpu);
        let config = LstmConfig {
            embedding_size: 4,
            layer_sizes: layers,
            ..Default::default()
        };
        BioactivityLstm::load(vb, &config)
    }

    fn to_tensor(smiles: &[&str]) -> Result<(Tensor, Vec<usize>)> {
        let batch = smiles_to_arrays(&SmilesVocab::new(), smiles, None)
            .map_err(candle_core::Error::wrap)?;
        let ids = Tensor::from_vec(batch.ids, (batch.lengths.len(), batch.max_len), &Device::Cpu)?;
        Ok((ids, batch.lengths))
    }

    #[test]
    fn test_encoding_shape() -> Result<()> {
        let varmap = VarMap::new();
        let net = tiny_lstm(&varmap, vec![3, 5])?;
        let (ids, lengths) = to_tensor(&["CCO", "c1ccccc1", "ClCBr"])?;
        let enc = net.encode(&ids, &lengths)?;
        assert_eq!(enc.dims(), &[3, 16]);
        assert_eq!(net.forward_t(&ids, &lengths, false)?.dims(), &[3]);

        let norms = enc.sqr()?.sum(1)?.to_vec1::<f32>()?;
        for n in norms {
            assert!((n - 1.0).abs() < 1e-4);
        }
        Ok(())
    }

    #[test]
    fn test_padding_is_masked() -> Result<()> {
        let varmap = VarMap::new();
        let net = tiny_lstm(&varmap, vec![6])?;
        let (alone, alone_len) = to_tensor(&["CCO"])?;
        let (padded, padded_len) = to_tensor(&["CCO", "CCCCCn1cc(C(=O)c2cccc3ccccc23)c2ccccc21"])?;

        let a = net.encode(&alone, &alone_len)?.to_vec2::<f32>()?;
        let b = net.encode(&padded, &padded_len)?.to_vec2::<f32>()?;
        for (x, y) in a[0].iter().zip(b[0].iter()) {
            assert!((x - y).abs() < 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_default_config_trains_without_dropout() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let config = LstmConfig {
            layer_sizes: vec![8],
            ..Default::default()
        };
        assert_eq!(config.dropout, 0.0);
        let net = BioactivityLstm::load(vb, &config)?;
        let (ids, lengths) = to_tensor(&["CCO"])?;
        let train = net.forward_t(&ids, &lengths, true)?.to_vec1::<f32>()?;
        let eval = net.forward_t(&ids, &lengths, false)?.to_vec1::<f32>()?;
        assert_eq!(train, eval);
        Ok(())
    }

    #[test]
    fn test_rejects_empty_layers() {
        let varmap = VarMap::new();
        assert!(tiny_lstm(&varmap, vec![]).is_err());
    }
}
