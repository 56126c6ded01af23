//! bioactivity-io
//!
//! Readers for the binding-affinity tables that feed the regressors.
mod dataset;

pub use dataset::{
    load_affinity_csv, load_all, AffinityDataset, AffinityRecord, CsvColumns, Receptor,
};
