use rustc_hash::FxHashMap;
use std::str::FromStr;

use crate::error::DemuxError;

/// The alphabet substitutions are drawn from when enumerating mutated
/// barcodes. Mirrors the `--edit-alphabet` choices in the original tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAlphabet {
    N,
    Acgt,
    AcgtN,
}

impl EditAlphabet {
    pub fn letters(self) -> &'static [u8] {
        match self {
            EditAlphabet::N => b"N",
            EditAlphabet::Acgt => b"ACGT",
            EditAlphabet::AcgtN => b"ACGTN",
        }
    }
}

impl FromStr for EditAlphabet {
    type Err = DemuxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "N" => Ok(EditAlphabet::N),
            "ACGT" => Ok(EditAlphabet::Acgt),
            "ACGTN" => Ok(EditAlphabet::AcgtN),
            other => Err(DemuxError::config(format!(
                "invalid edit alphabet '{other}', expected one of N, ACGT, ACGTN"
            ))),
        }
    }
}

/// A precomputed map from every sequence within Hamming distance `k` of some
/// reference barcode to the set of reference indices that could have
/// produced it. Built once at startup and shared read-only across workers.
pub struct MutationHash {
    table: FxHashMap<Box<[u8]>, Vec<u32>>,
    references: Vec<Box<[u8]>>,
}

impl MutationHash {
    /// Build the index for `references` (deduplicated callers must already
    /// have validated as unique) at edit distance `k` over `alphabet`.
    /// Requires uniform-length references; see spec.md §9's Open Question on
    /// variable-length handling.
    pub fn build(
        references: &[Vec<u8>],
        k: usize,
        alphabet: EditAlphabet,
    ) -> Result<Self, DemuxError> {
        if references.is_empty() {
            return Err(DemuxError::config("reference barcode set is empty"));
        }
        let length = references[0].len();
        if references.iter().any(|b| b.len() != length) {
            return Err(DemuxError::config(
                "all reference barcodes must have identical length",
            ));
        }

        let positions = k_combinations(length, k);
        let letter_tuples = letter_products(alphabet.letters(), k);

        let mut table: FxHashMap<Box<[u8]>, Vec<u32>> = FxHashMap::default();
        let refs: Vec<Box<[u8]>> = references.iter().map(|b| b.clone().into()).collect();

        for (idx, reference) in refs.iter().enumerate() {
            let idx = idx as u32;
            insert_or_extend(&mut table, reference.as_ref(), idx);

            for pos in &positions {
                if pos.iter().any(|&p| p >= reference.len()) {
                    continue;
                }
                for letters in &letter_tuples {
                    let mutated = mutate(reference.as_ref(), pos, letters);
                    insert_or_extend(&mut table, &mutated, idx);
                }
            }
        }

        Ok(MutationHash {
            table,
            references: refs,
        })
    }

    /// Look up a sequence, returning the set of matching reference barcodes
    /// as indices into the reference list passed to `build`.
    pub fn get(&self, sequence: &[u8]) -> Option<&[u32]> {
        self.table.get(sequence).map(|v| v.as_slice())
    }

    pub fn reference(&self, idx: u32) -> &[u8] {
        &self.references[idx as usize]
    }

    pub fn num_references(&self) -> usize {
        self.references.len()
    }
}

fn insert_or_extend(table: &mut FxHashMap<Box<[u8]>, Vec<u32>>, key: &[u8], idx: u32) {
    match table.get_mut(key) {
        Some(existing) => {
            if !existing.contains(&idx) {
                existing.push(idx);
            }
        }
        None => {
            table.insert(key.into(), vec![idx]);
        }
    }
}

fn mutate(reference: &[u8], positions: &[usize], letters: &[u8]) -> Box<[u8]> {
    let mut out = reference.to_vec();
    for (&pos, &letter) in positions.iter().zip(letters) {
        out[pos] = letter;
    }
    out.into_boxed_slice()
}

/// All sorted k-combinations of `0..n`, i.e. `C(n, k)` position sets.
fn k_combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k == 0 {
        return vec![Vec::new()];
    }
    if k > n {
        return Vec::new();
    }
    let mut combos = Vec::new();
    let mut current = Vec::with_capacity(k);
    combine(0, n, k, &mut current, &mut combos);
    combos
}

fn combine(start: usize, n: usize, k: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    if current.len() == k {
        out.push(current.clone());
        return;
    }
    for i in start..n {
        current.push(i);
        combine(i + 1, n, k, current, out);
        current.pop();
    }
}

/// All length-`k` tuples drawn (with repetition) from `alphabet`.
fn letter_products(alphabet: &[u8], k: usize) -> Vec<Vec<u8>> {
    if k == 0 {
        return vec![Vec::new()];
    }
    let mut out = vec![Vec::new()];
    for _ in 0..k {
        let mut next = Vec::with_capacity(out.len() * alphabet.len());
        for prefix in &out {
            for &letter in alphabet {
                let mut tuple = prefix.clone();
                tuple.push(letter);
                next.push(tuple);
            }
        }
        out = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(strs: &[&str]) -> Vec<Vec<u8>> {
        strs.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn identity_mapping_preserved() {
        let h = MutationHash::build(&refs(&["AAAA", "CCCC"]), 1, EditAlphabet::Acgt).unwrap();
        let hit = h.get(b"AAAA").unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(h.reference(hit[0]), b"AAAA");
    }

    #[test]
    fn one_substitution_is_found() {
        let h = MutationHash::build(&refs(&["AAAA", "CCCC"]), 1, EditAlphabet::Acgt).unwrap();
        let hit = h.get(b"ACAA").unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(h.reference(hit[0]), b"AAAA");
    }

    #[test]
    fn ambiguous_key_has_multiple_references() {
        let h = MutationHash::build(&refs(&["AAAA", "AATA"]), 1, EditAlphabet::Acgt).unwrap();
        let hit = h.get(b"AATA").unwrap();
        assert_eq!(hit.len(), 2);
    }

    #[test]
    fn unknown_sequence_is_absent() {
        let h = MutationHash::build(&refs(&["AAAA", "CCCC"]), 1, EditAlphabet::Acgt).unwrap();
        assert!(h.get(b"TTTT").is_none());
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let err = MutationHash::build(&refs(&["AAAA", "CCCCC"]), 1, EditAlphabet::Acgt);
        assert!(err.is_err());
    }

    #[test]
    fn zero_edit_distance_is_exact_only() {
        let h = MutationHash::build(&refs(&["AAAA"]), 0, EditAlphabet::Acgt).unwrap();
        assert!(h.get(b"AAAA").is_some());
        assert!(h.get(b"ACAA").is_none());
    }
}
