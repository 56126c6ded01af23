//! Regression metrics used to score a fitted model on held-out compounds.
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pearson {
    pub r: f64,
    /// Two-sided p-value for the null hypothesis of no correlation.
    pub p_value: f64,
}

impl Pearson {
    fn nan() -> Self {
        Self {
            r: f64::NAN,
            p_value: f64::NAN,
        }
    }
}

impl Display for Pearson {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4e})", self.r, self.p_value)
    }
}

#[derive(Clone, Debug)]
pub struct EvalMetrics {
    /// Mean squared error.
    pub mse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Coefficient of determination.
    pub r2: f64,
    pub pearson: Pearson,
}

impl EvalMetrics {
    pub fn compute(y_true: &[f32], y_pred: &[f32]) -> Self {
        Self {
            mse: mse(y_true, y_pred),
            mae: mae(y_true, y_pred),
            r2: r2_score(y_true, y_pred),
            pearson: pearson(y_true, y_pred),
        }
    }
}

impl Display for EvalMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MSE: {:.3}  MAE: {:.3}  R²: {:.3}  Pearson: {}",
            self.mse, self.mae, self.r2, self.pearson
        )
    }
}

fn mean(xs: &[f32]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().map(|&x| x as f64).sum::<f64>() / xs.len() as f64
}

pub fn mse(y_true: &[f32], y_pred: &[f32]) -> f64 {
    if y_true.len() != y_pred.len() || y_true.is_empty() {
        return f64::NAN;
    }
    let se: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&y, &p)| (y as f64 - p as f64).powi(2))
        .sum();
    se / y_true.len() as f64
}

pub fn mae(y_true: &[f32], y_pred: &[f32]) -> f64 {
    if y_true.len() != y_pred.len() || y_true.is_empty() {
        return f64::NAN;
    }
    let ae: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&y, &p)| (y as f64 - p as f64).abs())
        .sum();
    ae / y_true.len() as f64
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
pub fn r2_score(y_true: &[f32], y_pred: &[f32]) -> f64 {
    if y_true.len() != y_pred.len() || y_true.len() < 2 {
        return f64::NAN;
    }
    let y_mean = mean(y_true);
    let mut ss_res = 0.0f64;
    let mut ss_tot = 0.0f64;
    for (&y, &p) in y_true.iter().zip(y_pred) {
        let y = y as f64;
        ss_res += (y - p as f64).powi(2);
        ss_tot += (y - y_mean).powi(2);
    }
    if ss_tot == 0.0 || !ss_tot.is_finite() {
        return f64::NAN;
    }
    1.0 - ss_res / ss_tot
}

/// Pearson correlation coefficient with its two-sided p-value.
pub fn pearson(xs: &[f32], ys: &[f32]) -> Pearson {
    let n = xs.len();
    if n != ys.len() || n < 2 {
        return Pearson::nan();
    }
    let mx = mean(xs);
    let my = mean(ys);
    let (mut sxx, mut syy, mut sxy) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x as f64 - mx;
        let dy = y as f64 - my;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return Pearson::nan();
    }
    let r = (sxy / denom).clamp(-1.0, 1.0);
    Pearson {
        r,
        p_value: two_sided_p(r, n),
    }
}

fn two_sided_p(r: f64, n: usize) -> f64 {
    if n == 2 {
        return 1.0;
    }
    if r.abs() == 1.0 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * dist.sf(t.abs()),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r2_perfect_and_mean() {
        let y = [1.0f32, 2.0, 3.0, 4.0];
        assert!((r2_score(&y, &y) - 1.0).abs() < 1e-12);
        let mean_pred = [2.5f32; 4];
        assert!(r2_score(&y, &mean_pred).abs() < 1e-12);
        assert!(r2_score(&[1.0, 1.0], &[1.0, 2.0]).is_nan());
    }

    #[test]
    fn test_r2_known_value() {
        // sklearn.metrics.r2_score([3, -0.5, 2, 7], [2.5, 0.0, 2, 8]) == 0.9486081370449679
        let r2 = r2_score(&[3.0, -0.5, 2.0, 7.0], &[2.5, 0.0, 2.0, 8.0]);
        assert!((r2 - 0.948_608_137).abs() < 1e-6);
    }

    #[test]
    fn test_pearson_known_value() {
        // scipy.stats.pearsonr([1, 2, 3, 4, 5], [5, 6, 7, 8, 7]) == (0.8320502943378437, 0.08050957329849711)
        let p = pearson(&[1.0, 2.0, 3.0, 4.0, 5.0], &[5.0, 6.0, 7.0, 8.0, 7.0]);
        assert!((p.r - 0.832_050_294).abs() < 1e-6);
        assert!((p.p_value - 0.080_509_573).abs() < 1e-4);
    }

    #[test]
    fn test_pearson_degenerate() {
        let p = pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]);
        assert!(p.r.is_nan());
        let p = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((p.r - 1.0).abs() < 1e-12);
        assert_eq!(p.p_value, 0.0);
    }

    #[test]
    fn test_mse_mae() {
        let y = [1.0f32, 2.0, 3.0];
        let p = [2.0f32, 2.0, 1.0];
        assert!((mse(&y, &p) - 5.0 / 3.0).abs() < 1e-12);
        assert!((mae(&y, &p) - 1.0).abs() < 1e-12);
        assert!(mse(&y, &p[..2]).is_nan());
    }
}
