//! Dataset splitting.
//!
//! Two conventions are used by the training pipeline: a shuffled train/test split over
//! the whole dataset, and a validation split that holds out the tail of the training
//! rows before any per-epoch shuffling happens.
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("split fraction must lie in (0, 1), got {0}")]
    InvalidFraction(f64),
    #[error("splitting {n} samples with fraction {fraction} leaves an empty side")]
    EmptySide { n: usize, fraction: f64 },
}

fn check_fraction(fraction: f64) -> Result<(), SplitError> {
    if fraction.is_nan() || fraction <= 0.0 || fraction >= 1.0 {
        return Err(SplitError::InvalidFraction(fraction));
    }
    Ok(())
}

/// Shuffled index split. The test side receives `ceil(test_size * n)` samples.
pub fn train_test_split<R: Rng + ?Sized>(
    n: usize,
    test_size: f64,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<usize>), SplitError> {
    check_fraction(test_size)?;
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(SplitError::EmptySide {
            n,
            fraction: test_size,
        });
    }
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    let test = indices.split_off(n - n_test);
    Ok((indices, test))
}

/// Hold out the tail of the samples for validation; the training side keeps the first
/// `floor(n * (1 - fraction))` rows.
pub fn validation_split(
    n: usize,
    fraction: f64,
) -> Result<(Range<usize>, Range<usize>), SplitError> {
    check_fraction(fraction)?;
    let cut = (n as f64 * (1.0 - fraction)) as usize;
    if cut == 0 || cut >= n {
        return Err(SplitError::EmptySide { n, fraction });
    }
    Ok((0..cut, cut..n))
}

pub fn take<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_train_test_split_sizes() {
        let mut rng = StdRng::seed_from_u64(9);
        let (train, test) = train_test_split(10, 0.25, &mut rng).unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 7);

        let all: HashSet<usize> = train.iter().chain(test.iter()).copied().collect();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_train_test_split_is_seeded() {
        let a = train_test_split(50, 0.25, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = train_test_split(50, 0.25, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_train_test_split_rejects_degenerate() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            train_test_split(1, 0.25, &mut rng),
            Err(SplitError::EmptySide {
                n: 1,
                fraction: 0.25
            })
        );
        assert_eq!(
            train_test_split(10, 1.0, &mut rng),
            Err(SplitError::InvalidFraction(1.0))
        );
    }

    #[test]
    fn test_validation_split_holds_out_tail() {
        let (train, val) = validation_split(10, 0.25).unwrap();
        assert_eq!(train, 0..7);
        assert_eq!(val, 7..10);
        assert_eq!(validation_split(3, 0.2).unwrap(), (0..2, 2..3));
        assert!(validation_split(1, 0.2).is_err());
    }

    #[test]
    fn test_take() {
        let values = vec!["a", "b", "c"];
        assert_eq!(take(&values, &[2, 0]), vec!["c", "a"]);
    }
}
