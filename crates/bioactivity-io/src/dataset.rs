//! Binding-affinity CSV loading.
//!
//! The source table is read positionally: one column holds the SMILES string, one the
//! receptor cluster label and one the measured Ki. Rows are kept when the cluster label
//! matches the requested receptor and a Ki value is present.
use anyhow::{anyhow, Context, Result};
use bioactivity_core::{take, SmilesVocab};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Receptor {
    /// Cannabinoid receptor 1
    #[strum(serialize = "cb1")]
    Cb1,
    /// Cannabinoid receptor 2
    #[strum(serialize = "cb2")]
    Cb2,
}

impl Receptor {
    pub fn cluster_label(&self) -> &'static str {
        match self {
            Receptor::Cb1 => "Cluster 131",
            Receptor::Cb2 => "Cluster 225",
        }
    }
}

/// Zero-based positions of the columns the loader reads.
#[derive(Debug, Clone, Copy)]
pub struct CsvColumns {
    pub smiles: usize,
    pub cluster: usize,
    pub ki: usize,
}

impl CsvColumns {
    /// Number of leading columns the loader needs.
    pub fn width(&self) -> usize {
        self.smiles.max(self.cluster).max(self.ki) + 1
    }
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            smiles: 3,
            cluster: 4,
            ki: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AffinityRecord {
    pub smiles: String,
    pub ki: f32,
}

#[derive(Debug, Clone)]
pub struct AffinityDataset {
    pub receptor: Receptor,
    pub records: Vec<AffinityRecord>,
}

impl AffinityDataset {
    pub fn new(receptor: Receptor) -> Self {
        Self {
            receptor,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn smiles(&self) -> Vec<String> {
        self.records.iter().map(|r| r.smiles.clone()).collect()
    }

    pub fn targets(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.ki).collect()
    }

    pub fn subset(&self, indices: &[usize]) -> AffinityDataset {
        AffinityDataset {
            receptor: self.receptor,
            records: take(&self.records, indices),
        }
    }

    /// Drop the compounds the vocabulary cannot encode. Returns the number removed.
    pub fn retain_encodable(&mut self, vocab: &SmilesVocab) -> usize {
        let before = self.records.len();
        let receptor = self.receptor;
        self.records.retain(|record| match vocab.tokenize(&record.smiles) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Skipping compound for {}: {}", receptor, e);
                false
            }
        });
        before - self.records.len()
    }
}

/// Read every column as a string. The table is `width` columns wide regardless of its first
/// line; shorter rows are filled with nulls and longer ones truncated.
fn read_table<P: AsRef<Path>>(path: P, width: usize) -> Result<DataFrame> {
    let path = path.as_ref();
    let schema = Schema::from_iter(
        (1..=width).map(|i| Field::new(format!("column_{}", i).into(), DataType::String)),
    );
    let df = CsvReadOptions::default()
        .with_has_header(false)
        .with_schema(Some(Arc::new(schema)))
        .with_parse_options(CsvParseOptions::default().with_truncate_ragged_lines(true))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to open {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(df)
}

fn string_column(df: &DataFrame, idx: usize) -> Result<&StringChunked> {
    let column = df
        .select_at_idx(idx)
        .ok_or_else(|| anyhow!("CSV has {} columns, column {} requested", df.width(), idx))?;
    if df.height() > 0 && column.null_count() == df.height() {
        return Err(anyhow!("No row of the CSV reaches column {}", idx));
    }
    Ok(column.as_materialized_series().str()?)
}

fn collect_records(
    df: &DataFrame,
    columns: CsvColumns,
    receptors: &[Receptor],
) -> Result<HashMap<Receptor, AffinityDataset>> {
    let smiles = string_column(df, columns.smiles)?;
    let cluster = string_column(df, columns.cluster)?;
    let ki = string_column(df, columns.ki)?;

    let mut datasets: HashMap<Receptor, AffinityDataset> = receptors
        .iter()
        .map(|&r| (r, AffinityDataset::new(r)))
        .collect();

    for (row, ((smiles, cluster), ki)) in smiles
        .into_iter()
        .zip(cluster.into_iter())
        .zip(ki.into_iter())
        .enumerate()
    {
        let (Some(cluster), Some(ki)) = (cluster, ki) else {
            continue;
        };
        if ki.is_empty() {
            continue;
        }
        let Some(dataset) = datasets
            .values_mut()
            .find(|d| d.receptor.cluster_label() == cluster)
        else {
            continue;
        };
        let value: f32 = ki
            .trim()
            .parse()
            .with_context(|| format!("Row {}: Ki value {:?} is not a number", row + 1, ki))?;
        dataset.records.push(AffinityRecord {
            smiles: smiles.unwrap_or_default().to_string(),
            ki: value,
        });
    }
    Ok(datasets)
}

/// Load the compounds measured against a single receptor.
pub fn load_affinity_csv<P: AsRef<Path>>(
    path: P,
    receptor: Receptor,
    columns: CsvColumns,
) -> Result<AffinityDataset> {
    let df = read_table(path, columns.width())?;
    let mut datasets = collect_records(&df, columns, &[receptor])?;
    let dataset = datasets
        .remove(&receptor)
        .ok_or_else(|| anyhow!("No dataset collected for {}", receptor))?;
    log::info!(
        "Loaded {} compounds for {} ({})",
        dataset.len(),
        receptor,
        receptor.cluster_label()
    );
    Ok(dataset)
}

/// Load every receptor in a single pass over the table.
pub fn load_all<P: AsRef<Path>>(
    path: P,
    columns: CsvColumns,
) -> Result<HashMap<Receptor, AffinityDataset>> {
    let df = read_table(path, columns.width())?;
    let receptors: Vec<Receptor> = Receptor::iter().collect();
    collect_records(&df, columns, &receptors)
}
