use std::collections::HashMap;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::DemuxError;

/// The finite `sample -> reference barcode` mapping read from the sample
/// sheet. Injective on values is enforced by `load` -- duplicate barcodes
/// across samples are a configuration error caught at startup.
pub struct SampleSheet {
    pub samples: Vec<String>,
    pub barcodes: Vec<Vec<u8>>,
}

impl SampleSheet {
    pub fn barcode_for(&self, sample: &str) -> Option<&[u8]> {
        self.samples
            .iter()
            .position(|s| s == sample)
            .map(|i| self.barcodes[i].as_slice())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Read a delimited sample sheet, pulling `sample_column` and
/// `barcode_column` out of each row by name; all other columns are ignored.
/// Rejects duplicate sample names and duplicate (non-unique) barcodes.
pub fn load_samplesheet(
    path: &Path,
    delimiter: u8,
    sample_column: &str,
    barcode_column: &str,
) -> Result<SampleSheet, DemuxError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| DemuxError::config(format!("failed to read sample sheet: {e}")))?;

    let mut samples = Vec::new();
    let mut barcodes: Vec<Vec<u8>> = Vec::new();
    let mut seen_barcodes: FxHashMap<Vec<u8>, String> = FxHashMap::default();

    for row in reader.deserialize::<HashMap<String, String>>() {
        let row = row.map_err(|e| DemuxError::config(format!("malformed sample sheet row: {e}")))?;
        let sample = row.get(sample_column).ok_or_else(|| {
            DemuxError::config(format!("sample sheet has no column named '{sample_column}'"))
        })?;
        let barcode = row.get(barcode_column).ok_or_else(|| {
            DemuxError::config(format!("sample sheet has no column named '{barcode_column}'"))
        })?;
        let barcode_bytes = barcode.as_bytes().to_vec();

        if samples.contains(sample) {
            return Err(DemuxError::config(format!(
                "duplicate sample name '{sample}' in sample sheet"
            )));
        }
        if let Some(existing) = seen_barcodes.insert(barcode_bytes.clone(), sample.clone()) {
            return Err(DemuxError::config(format!(
                "barcode '{barcode}' is used by both '{existing}' and '{sample}'; barcodes must be unique"
            )));
        }

        samples.push(sample.clone());
        barcodes.push(barcode_bytes);
    }

    if samples.is_empty() {
        return Err(DemuxError::config("sample sheet contains no rows"));
    }

    Ok(SampleSheet { samples, barcodes })
}

/// Read a newline-delimited whitelist of bare barcodes (counting mode).
/// Blank lines are ignored; duplicates are a configuration error.
pub fn load_whitelist(path: &Path) -> Result<Vec<Vec<u8>>, DemuxError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| DemuxError::config(format!("failed to read whitelist: {e}")))?;

    let mut barcodes = Vec::new();
    let mut seen: FxHashMap<Vec<u8>, ()> = FxHashMap::default();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let bytes = line.as_bytes().to_vec();
        if seen.insert(bytes.clone(), ()).is_some() {
            return Err(DemuxError::config(format!(
                "duplicate barcode '{line}' in whitelist"
            )));
        }
        barcodes.push(bytes);
    }

    if barcodes.is_empty() {
        return Err(DemuxError::config("whitelist contains no barcodes"));
    }

    Ok(barcodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_basic_sheet() {
        let f = write_temp("Sample\tBarcode\nA\tAAAA\nB\tCCCC\n");
        let sheet = load_samplesheet(f.path(), b'\t', "Sample", "Barcode").unwrap();
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.barcode_for("A"), Some(b"AAAA".as_slice()));
    }

    #[test]
    fn rejects_duplicate_barcodes() {
        let f = write_temp("Sample\tBarcode\nA\tAAAA\nB\tAAAA\n");
        let err = load_samplesheet(f.path(), b'\t', "Sample", "Barcode");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_missing_column() {
        let f = write_temp("Sample\tOther\nA\tAAAA\n");
        let err = load_samplesheet(f.path(), b'\t', "Sample", "Barcode");
        assert!(err.is_err());
    }

    #[test]
    fn loads_whitelist() {
        let f = write_temp("AAAA\nCCCC\n\nGGGG\n");
        let list = load_whitelist(f.path()).unwrap();
        assert_eq!(list.len(), 3);
    }
}
