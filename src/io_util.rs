use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use indicatif::{ProgressBar, ProgressStyle};

/// Whether `path`'s name indicates gzip framing, judged purely by suffix --
/// the same convention the teacher crate and the rest of the corpus use for
/// both input detection and output compression.
pub fn gz_named(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map_or(false, |s| s.ends_with(".gz"))
}

/// Open `path` for reading, transparently decompressing if its name ends in
/// `.gz`. This is the entire extent to which decompression is this crate's
/// concern -- the chunker downstream only ever sees a plain `Read` of
/// uncompressed bytes.
pub fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    let file =
        File::open(path).with_context(|| format!("failed to open input {}", path.display()))?;
    if gz_named(path) {
        Ok(Box::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// A writer shard's output sink: either a plain buffered file or a
/// gzip-compressing one, chosen by the configured output suffix. Unlike a
/// boxed `dyn Write`, this lets shutdown call the gzip-specific `finish()`
/// so a truncated or partial gzip trailer is a write error, not a silent
/// `Drop`.
pub enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Sink {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create output {}", path.display()))?;
        let writer = BufWriter::new(file);
        if gz_named(path) {
            Ok(Sink::Gzip(GzEncoder::new(writer, Compression::default())))
        } else {
            Ok(Sink::Plain(writer))
        }
    }

    pub fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Sink::Plain(w) => w.write_all(buf),
            Sink::Gzip(w) => w.write_all(buf),
        }
    }

    /// Flush (and, for gzip, finish the stream) -- a write error on either
    /// step is fatal, per the writer shard's no-partial-writes contract.
    pub fn close(self) -> std::io::Result<()> {
        match self {
            Sink::Plain(mut w) => w.flush(),
            Sink::Gzip(w) => {
                let mut inner = w.finish()?;
                inner.flush()
            }
        }
    }
}

pub fn progress_reader_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:.bold.cyan/blue} {decimal_bytes}/{decimal_total_bytes} {spinner:.green} [{elapsed_precise}] {decimal_bytes_per_sec} (ETA {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Build a progress bar tracking bytes consumed from `path`, or a hidden one
/// if the size can't be determined. Disabled entirely when stdout isn't a
/// terminal, matching how the rest of the corpus treats interactive
/// progress reporting as cosmetic, never load-bearing.
pub fn input_progress_bar(path: &Path) -> ProgressBar {
    if !is_tty_stdout() {
        return ProgressBar::hidden();
    }
    let len = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let pb = ProgressBar::new(len);
    pb.set_style(progress_reader_style());
    pb.set_prefix("demultiplexing");
    pb
}

fn is_tty_stdout() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal()
}

/// A `Read` wrapper that advances a progress bar by the number of bytes
/// actually returned from the underlying reader.
pub struct ProgressRead<R> {
    inner: R,
    bar: ProgressBar,
}

impl<R: Read> ProgressRead<R> {
    pub fn new(inner: R, bar: ProgressBar) -> Self {
        ProgressRead { inner, bar }
    }
}

impl<R: Read> Read for ProgressRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bar.inc(n as u64);
        Ok(n)
    }
}
