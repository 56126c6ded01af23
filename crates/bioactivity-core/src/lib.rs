//! # bioactivity-core
//!
//! Building blocks for SMILES-based affinity regression that do not depend on a
//! tensor framework.
//!
//! __bioactivity-core__ provides functionality for:
//! * Mapping SMILES strings onto a fixed vocabulary and padding them to integer arrays
//! * Shuffled train/test splits and Keras-style validation tail splits
//! * Regression metrics (R², Pearson correlation with p-value, MSE, MAE)
//!
mod metrics;
mod smiles;
mod split;

pub use self::metrics::{mae, mse, pearson, r2_score, EvalMetrics, Pearson};
pub use self::smiles::{
    pad_sequences, smiles_to_arrays, EncodedBatch, Padding, SmilesError, SmilesVocab, Truncating,
    PAD_ID, SMILES_ALPHABET,
};
pub use self::split::{take, train_test_split, validation_split, SplitError};
