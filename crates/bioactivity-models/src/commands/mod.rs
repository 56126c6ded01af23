pub mod encode;
pub mod fit;
pub mod grid;
pub mod stats;

use crate::cli::DataArgs;
use anyhow::{ensure, Result};
use bioactivity_core::SmilesVocab;
use bioactivity_io::{load_affinity_csv, AffinityDataset, CsvColumns};

/// Load the receptor's compounds and drop the ones the vocabulary cannot encode.
pub fn load_dataset(args: &DataArgs) -> Result<AffinityDataset> {
    let mut dataset = load_affinity_csv(&args.data, args.receptor, CsvColumns::default())?;
    let dropped = dataset.retain_encodable(&SmilesVocab::new());
    if dropped > 0 {
        log::warn!("Dropped {} compounds with unknown SMILES tokens", dropped);
    }
    ensure!(
        !dataset.is_empty(),
        "No usable compounds for {} in {}",
        args.receptor,
        args.data.display()
    );
    Ok(dataset)
}
