use std::io::Read;

use memchr::memmem;

use crate::error::DemuxError;

/// Cuts a continuous byte stream into self-contained blobs of complete
/// 4-line FASTQ records, without rescanning or copying record payloads
/// beyond the carry buffer itself.
///
/// Each emitted blob is newline-delimited internally with no trailing
/// newline -- the newline that would separate it from the next blob is
/// consumed as the cut delimiter (dropped from both pieces), the same way
/// `str::split` consumes its separator. Reassembling the original stream
/// means re-inserting that newline between consecutive blobs, not raw
/// concatenation.
pub struct Chunker<R> {
    reader: R,
    buf_size: usize,
    carry: Vec<u8>,
    consumed: u64,
    eof: bool,
}

impl<R: Read> Chunker<R> {
    pub fn new(reader: R, buf_size: usize) -> Self {
        Chunker {
            reader,
            buf_size,
            carry: Vec::new(),
            consumed: 0,
            eof: false,
        }
    }

    /// Produce the next blob, or `None` once the stream and carry are both
    /// exhausted.
    ///
    /// Reads at most `buf_size` bytes per step and looks for a safe cut in
    /// the accumulated carry. If none is found yet, it reads again rather
    /// than failing outright -- a record that merely lands flush against a
    /// read boundary (including the very last record in the file) is not an
    /// error. Only once the carry has grown past a full `buf_size` with
    /// still no boundary in sight -- meaning a single record truly exceeds
    /// the configured buffer -- does this report `Format` (`BufferTooSmall`).
    pub fn next_blob(&mut self) -> Result<Option<Vec<u8>>, DemuxError> {
        loop {
            if self.eof {
                if self.carry.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.carry)));
            }

            let mut read_buf = vec![0u8; self.buf_size];
            let n = self.reader.read(&mut read_buf)?;
            if n == 0 {
                self.eof = true;
                continue;
            }
            self.consumed += n as u64;
            read_buf.truncate(n);

            let carry_len_before = self.carry.len();
            self.carry.extend_from_slice(&read_buf);

            match find_safe_cut(&self.carry) {
                Some(cut) => {
                    // carry[cut] is the delimiter newline; it belongs to
                    // neither the blob nor the next carry.
                    let tail = self.carry.split_off(cut + 1);
                    self.carry.pop();
                    let blob = std::mem::replace(&mut self.carry, tail);
                    return Ok(Some(blob));
                }
                None if carry_len_before >= self.buf_size => {
                    let offset = self.consumed.saturating_sub(self.carry.len() as u64);
                    return Err(DemuxError::format(
                        "no record boundary found within buffer; a single record exceeds --buffer-size",
                        offset,
                    ));
                }
                None => continue,
            }
        }
    }
}

/// Search backward in `work` for a `\n@` pair that genuinely opens a new
/// record, rejecting candidates where the `@` instead opens a quality line
/// immediately following a `+` separator line (i.e. the two bytes before
/// the newline read `\n+`).
fn find_safe_cut(work: &[u8]) -> Option<usize> {
    let mut search_end = work.len();
    loop {
        let i = memmem::rfind(&work[..search_end], b"\n@")?;
        if i >= 2 && work[i - 1] == b'+' && work[i - 2] == b'\n' {
            search_end = i - 2;
            continue;
        }
        return Some(i);
    }
}
