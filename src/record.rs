/// A FASTQ record viewed as byte-slice windows into the owning blob -- no
/// copying happens until a record is actually routed to a writer.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub header: &'a [u8],
    pub sequence: &'a [u8],
    pub quality: &'a [u8],
}

impl<'a> Record<'a> {
    /// Append this record to `out` as `@header\nsequence\n+\nquality\n`.
    pub fn write_fastq(&self, out: &mut Vec<u8>) {
        out.push(b'@');
        out.extend_from_slice(self.header);
        out.push(b'\n');
        out.extend_from_slice(self.sequence);
        out.push(b'\n');
        out.extend_from_slice(b"+\n");
        out.extend_from_slice(self.quality);
        out.push(b'\n');
    }
}

/// Split a record-aligned blob into `(header, sequence, quality)` views.
///
/// The blob's length must be a multiple of the 4-line record structure --
/// that invariant is established by the chunker, not checked here. The
/// separator `+` line is skipped without inspection. A single trailing
/// newline is tolerated (the final blob of a stream may carry one); headers
/// are not required to start with `@` and sequence/quality lengths are not
/// cross-checked, both of which are chunker preconditions.
pub fn split_records(blob: &[u8]) -> impl Iterator<Item = Record<'_>> {
    let trimmed = blob.strip_suffix(b"\n").unwrap_or(blob);
    let lines: Vec<&[u8]> = if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split(|&b| b == b'\n').collect()
    };

    RecordIter { lines, pos: 0 }
}

struct RecordIter<'a> {
    lines: Vec<&'a [u8]>,
    pos: usize,
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos + 4 > self.lines.len() {
            return None;
        }
        let header = self.lines[self.pos].strip_prefix(b"@").unwrap_or(self.lines[self.pos]);
        let sequence = self.lines[self.pos + 1];
        let quality = self.lines[self.pos + 3];
        self.pos += 4;
        Some(Record {
            header,
            sequence,
            quality,
        })
    }
}
