use candle_core::{Module, Result, Tensor};
use candle_nn::{self as nn, Dropout, Linear, VarBuilder};

const L2_NORM_EPS: f64 = 1e-12;

/// Rescale every row to unit Euclidean norm.
pub fn l2_normalize(x: &Tensor) -> Result<Tensor> {
    let norm = x.sqr()?.sum_keepdim(1)?.maximum(L2_NORM_EPS)?.sqrt()?;
    x.broadcast_div(&norm)
}

/// Regression head shared by the encoders: unit-norm encoding followed by a single
/// L2-regularized dense unit.
pub struct RegressionHead {
    dense: Linear,
    /// Applied to the encoding while training; `None` for a zero rate.
    dropout: Option<Dropout>,
    l2: f64,
}

impl RegressionHead {
    pub fn load(vb: VarBuilder, in_dim: usize, l2: f64, dropout: f32) -> Result<Self> {
        let dense = nn::linear(in_dim, 1, vb.pp("dense"))?;
        Ok(Self {
            dense,
            dropout: (dropout > 0.0).then(|| Dropout::new(dropout)),
            l2,
        })
    }

    /// `(batch, in_dim)` encoding to `(batch,)` predictions.
    pub fn forward_t(&self, encoding: &Tensor, train: bool) -> Result<Tensor> {
        let x = match &self.dropout {
            Some(dropout) => dropout.forward(encoding, train)?,
            None => encoding.clone(),
        };
        self.dense.forward(&x)?.squeeze(1)
    }

    /// `l2 * sum(W^2)` over the dense kernel; zero when unregularized.
    pub fn l2_penalty(&self) -> Result<Tensor> {
        let kernel = self.dense.weight();
        if self.l2 == 0.0 {
            return kernel.zeros_like()?.sum_all();
        }
        kernel.sqr()?.sum_all()?.affine(self.l2, 0.0)
    }
}
