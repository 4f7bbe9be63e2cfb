use regex::Regex;

use crate::error::DemuxError;

/// A compiled header pattern with a mandatory named capture group, built
/// once and shared immutably across worker threads.
pub struct BarcodePattern {
    regex: Regex,
    group: &'static str,
}

impl BarcodePattern {
    /// Compile `pattern` and verify it has a capture group named `group`
    /// (`CB` for demultiplexing, `HTO` for hashtag counting). Malformed
    /// patterns or patterns missing the group are rejected here, at
    /// startup, rather than surfacing as per-record failures later.
    pub fn compile(pattern: &str, group: &'static str) -> Result<Self, DemuxError> {
        // Anchored at the start, mirroring the original tool's `re.match`
        // (which anchors implicitly) rather than Rust's default unanchored
        // search -- otherwise a user-supplied pattern without a leading
        // `.*` would match anywhere in the header instead of only at its
        // start.
        let anchored = format!("^(?:{pattern})");
        let regex = Regex::new(&anchored)
            .map_err(|e| DemuxError::config(format!("invalid barcode regex '{pattern}': {e}")))?;
        if regex.capture_names().flatten().all(|name| name != group) {
            return Err(DemuxError::config(format!(
                "barcode regex '{pattern}' has no named capture group '{group}'"
            )));
        }
        Ok(BarcodePattern { regex, group })
    }

    /// Extract the captured barcode substring from `header`, or `None` if
    /// the header doesn't match (malformed UTF-8 in the header also yields
    /// `None` rather than panicking).
    pub fn extract<'a>(&self, header: &'a [u8]) -> Option<&'a [u8]> {
        let header_str = std::str::from_utf8(header).ok()?;
        let caps = self.regex.captures(header_str)?;
        let m = caps.name(self.group)?;
        Some(&header[m.start()..m.end()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_named_group() {
        let p = BarcodePattern::compile(r"(.*):(?P<CB>[ATGCN]{4})", "CB").unwrap();
        assert_eq!(p.extract(b"read1:ACGT"), Some(b"ACGT".as_slice()));
    }

    #[test]
    fn no_match_is_none() {
        let p = BarcodePattern::compile(r"(.*):(?P<CB>[ATGCN]{4})", "CB").unwrap();
        assert_eq!(p.extract(b"malformed"), None);
    }

    #[test]
    fn missing_group_is_rejected_at_compile_time() {
        let err = BarcodePattern::compile(r"(.*):(?P<WRONG>[ATGCN]{4})", "CB");
        assert!(err.is_err());
    }

    #[test]
    fn malformed_pattern_is_rejected() {
        let err = BarcodePattern::compile(r"(.*", "CB");
        assert!(err.is_err());
    }

    #[test]
    fn default_demux_pattern_has_cb_group() {
        let p = BarcodePattern::compile(r"(.*):(?P<CB>[ATGCN]{11})", "CB").unwrap();
        assert!(p.extract(b"x:ACGTACGTACG").is_some());
    }

    #[test]
    fn default_hto_pattern_has_hto_group() {
        let p = BarcodePattern::compile(r"(.*)(?P<HTO>[ATGCN]{15})", "HTO").unwrap();
        assert!(p.extract(b"xACGTACGTACGTACG").is_some());
    }
}
