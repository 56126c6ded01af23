//! bioactivity-test-data
//!
//! A module to provide test files embedded in the crate for use in testing.
//!
//! The test files are represented as `TestFile` objects which package the raw binary data
//! and create temporary files for programs to operate on.
use std::fs;
use tempfile::{Builder, NamedTempFile};

#[derive(Debug)]
/// Test File
///
/// Example usage:
///
/// ```ignore
/// // returns (filepath, _tempfile_handle).
/// // _handle ensures the tempfile remains in scope
/// use bioactivity_test_data::TestFile;
/// let (csv_file, _temp) = TestFile::cannabinoid_ki().create_temp().unwrap();
/// ```
pub struct TestFile {
    filebinary: &'static [u8],
    suffix: &'static str,
}

impl TestFile {
    /// Small binding table in the layout of `Mydata.csv`:
    /// `id,target,assay,smiles,cluster,ki`.
    ///
    /// - 25 `Cluster 131` (CB1) rows with a Ki value, one of which (`C[Ge](C)(C)c1ccccc1`)
    ///   cannot be encoded with the SMILES alphabet
    /// - 16 `Cluster 225` (CB2) rows with a Ki value
    /// - one row per receptor with an empty Ki
    /// - two rows from unrelated clusters
    pub fn cannabinoid_ki() -> Self {
        Self {
            filebinary: include_bytes!("../data/csv/cannabinoid_ki.csv"),
            suffix: "csv",
        }
    }

    /// Longest tokenized SMILES among the encodable CB1 and CB2 rows of
    /// [`TestFile::cannabinoid_ki`]. It belongs to a CB2 compound.
    pub const CANNABINOID_KI_MAX_TOKENS: usize = 58;

    pub fn create_temp(&self) -> std::io::Result<(String, NamedTempFile)> {
        let temp = Builder::new()
            .suffix(&format!(".{}", self.suffix))
            .tempfile()?;

        fs::write(&temp, self.filebinary)?;
        let path = temp.path().to_string_lossy().into_owned();

        Ok((path, temp))
    }
}
