//! SMILES vocabulary and integer encoding.
//!
//! Compounds are tokenized against a fixed alphabet of SMILES punctuation, ring-bond digits,
//! aromatic atoms and the periodic elements present in the binding datasets. Token `i` of
//! [`SMILES_ALPHABET`] is encoded as `i + 1`; `0` is reserved for padding so that it never
//! collides with a real token.
use itertools::Itertools;
use std::collections::HashMap;
use thiserror::Error;

/// Padding id shared by every encoded batch.
pub const PAD_ID: u32 = 0;

/// Token alphabet. The order is significant: it fixes the integer ids.
pub const SMILES_ALPHABET: [&str; 75] = [
    // punctuation, digits and aromatic atoms
    "#", "%", ")", "(", "+", "*", "-", "/", ".", "1", "0", "3", "2", "5", "4", "7", "6", "9", "8",
    ":", "=", "@", "[", "]", "\\", "c", "o", "n", "s", "l", "r",
    // periodic elements
    "H", "Li", "B", "C", "N", "O", "F", "Na", "Al", "Si", "P", "S", "Cl", "K", "Ca", "V", "Mn",
    "Fe", "Co", "Ni", "Cu", "Zn", "As", "Se", "Br", "Nb", "Mo", "Tc", "Ru", "Pd", "Ag", "Sn",
    "Sb", "Te", "I", "Gd", "W", "Re", "Os", "Pt", "Au", "Hg", "Bi",
    // aromatic selenium
    "se",
];

#[derive(Debug, Error, PartialEq)]
pub enum SmilesError {
    #[error("unknown SMILES token {found:?} at position {position} in {smiles:?}")]
    UnknownToken {
        smiles: String,
        position: usize,
        found: char,
    },
    #[error("empty SMILES string")]
    EmptySmiles,
    #[error("cannot encode an empty batch of SMILES")]
    EmptyBatch,
    #[error("maximum sequence length must be at least 1")]
    ZeroLength,
}

/// Where padding (or truncation) is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    Pre,
    #[default]
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Truncating {
    /// Drop tokens from the start, keeping the tail.
    #[default]
    Pre,
    Post,
}

/// Row-major `(rows, max_len)` block of token ids.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBatch {
    pub ids: Vec<u32>,
    /// Number of non-padding tokens in each row.
    pub lengths: Vec<usize>,
    pub max_len: usize,
}

impl EncodedBatch {
    pub fn rows(&self) -> usize {
        self.lengths.len()
    }

    pub fn row(&self, idx: usize) -> &[u32] {
        &self.ids[idx * self.max_len..(idx + 1) * self.max_len]
    }

    /// Gather a subset of rows, in the given order.
    pub fn select(&self, indices: &[usize]) -> EncodedBatch {
        let ids = indices
            .iter()
            .flat_map(|&i| self.row(i).iter().copied())
            .collect();
        let lengths = indices.iter().map(|&i| self.lengths[i]).collect();
        EncodedBatch {
            ids,
            lengths,
            max_len: self.max_len,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmilesVocab {
    token_to_id: HashMap<&'static str, u32>,
}

impl Default for SmilesVocab {
    fn default() -> Self {
        Self::new()
    }
}

impl SmilesVocab {
    pub fn new() -> Self {
        let token_to_id = SMILES_ALPHABET
            .iter()
            .enumerate()
            .map(|(i, &tok)| (tok, i as u32 + 1))
            .collect();
        Self { token_to_id }
    }

    /// Size of the embedding table: every token plus the padding id.
    pub fn len(&self) -> usize {
        SMILES_ALPHABET.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    pub fn id_to_token(&self, id: u32) -> Option<&'static str> {
        if id == PAD_ID {
            return None;
        }
        SMILES_ALPHABET.get(id as usize - 1).copied()
    }

    /// Greedy longest-match tokenization: two-letter tokens (`Cl`, `Br`, `se`, ...) win
    /// over their single-letter prefixes.
    pub fn tokenize(&self, smiles: &str) -> Result<Vec<u32>, SmilesError> {
        if smiles.is_empty() {
            return Err(SmilesError::EmptySmiles);
        }
        let chars: Vec<char> = smiles.chars().collect();
        let mut ids = Vec::with_capacity(chars.len());
        let mut pos = 0;
        while pos < chars.len() {
            if pos + 1 < chars.len() {
                let pair: String = chars[pos..pos + 2].iter().collect();
                if let Some(id) = self.token_to_id(&pair) {
                    ids.push(id);
                    pos += 2;
                    continue;
                }
            }
            let single = chars[pos].to_string();
            match self.token_to_id(&single) {
                Some(id) => ids.push(id),
                None => {
                    return Err(SmilesError::UnknownToken {
                        smiles: smiles.to_string(),
                        position: pos,
                        found: chars[pos],
                    })
                }
            }
            pos += 1;
        }
        Ok(ids)
    }

    pub fn decode(&self, ids: &[u32]) -> String {
        ids.iter().filter_map(|&id| self.id_to_token(id)).join("")
    }
}

/// Pad (or truncate) every sequence to `max_len`, following the Keras `pad_sequences` rules.
pub fn pad_sequences(
    seqs: &[Vec<u32>],
    max_len: usize,
    padding: Padding,
    truncating: Truncating,
    value: u32,
) -> EncodedBatch {
    let mut ids = Vec::with_capacity(seqs.len() * max_len);
    let mut lengths = Vec::with_capacity(seqs.len());
    for seq in seqs {
        let kept: &[u32] = if seq.len() > max_len {
            match truncating {
                Truncating::Pre => &seq[seq.len() - max_len..],
                Truncating::Post => &seq[..max_len],
            }
        } else {
            seq
        };
        let fill = max_len - kept.len();
        match padding {
            Padding::Post => {
                ids.extend_from_slice(kept);
                ids.extend(std::iter::repeat(value).take(fill));
            }
            Padding::Pre => {
                ids.extend(std::iter::repeat(value).take(fill));
                ids.extend_from_slice(kept);
            }
        }
        lengths.push(kept.len());
    }
    EncodedBatch {
        ids,
        lengths,
        max_len,
    }
}

/// Tokenize and post-pad a batch of SMILES. Without `max_len` the batch is padded to its
/// longest tokenized sequence.
pub fn smiles_to_arrays<S: AsRef<str>>(
    vocab: &SmilesVocab,
    smiles: &[S],
    max_len: Option<usize>,
) -> Result<EncodedBatch, SmilesError> {
    if smiles.is_empty() {
        return Err(SmilesError::EmptyBatch);
    }
    if max_len == Some(0) {
        return Err(SmilesError::ZeroLength);
    }
    let seqs = smiles
        .iter()
        .map(|s| vocab.tokenize(s.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    let max_len = max_len.unwrap_or_else(|| seqs.iter().map(Vec::len).max().unwrap_or(0));
    Ok(pad_sequences(
        &seqs,
        max_len,
        Padding::Post,
        Truncating::Pre,
        PAD_ID,
    ))
}
