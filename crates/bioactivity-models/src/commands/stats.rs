use anyhow::Result;
use bioactivity_core::SmilesVocab;
use bioactivity_io::{load_all, CsvColumns, Receptor};
use std::path::PathBuf;
use strum::IntoEnumIterator;

pub fn execute(data: PathBuf) -> Result<()> {
    let vocab = SmilesVocab::new();
    let mut datasets = load_all(&data, CsvColumns::default())?;
    for receptor in Receptor::iter() {
        let Some(dataset) = datasets.get_mut(&receptor) else {
            continue;
        };
        let loaded = dataset.len();
        let dropped = dataset.retain_encodable(&vocab);
        let max_tokens = dataset
            .records
            .iter()
            .filter_map(|r| vocab.tokenize(&r.smiles).ok())
            .map(|ids| ids.len())
            .max()
            .unwrap_or(0);
        println!(
            "{} ({}): {} compounds, {} unencodable, longest SMILES {} tokens",
            receptor,
            receptor.cluster_label(),
            loaded,
            dropped,
            max_tokens
        );
    }
    Ok(())
}
