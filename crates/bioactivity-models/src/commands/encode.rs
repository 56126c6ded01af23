use anyhow::Result;
use bioactivity_core::{smiles_to_arrays, SmilesVocab};
use itertools::Itertools;

pub fn execute(smiles: Vec<String>, max_length: Option<usize>) -> Result<()> {
    let vocab = SmilesVocab::new();
    let batch = smiles_to_arrays(&vocab, &smiles, max_length)?;
    for (i, s) in smiles.iter().enumerate() {
        println!("{}\t{}", s, batch.row(i).iter().join(" "));
    }
    Ok(())
}
