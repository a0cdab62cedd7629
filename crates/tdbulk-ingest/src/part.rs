//! Compressed part files
//!
//! A part is a gzip stream of concatenated MessagePack maps written to a uniquely named
//! temporary file. The file is removed when its [`PartFile`] is finalized or dropped.

use crate::error::{ImportError, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::TempPath;
use tracing::{debug, warn};

const PART_SUFFIX: &str = ".msgpack.gz";

/// Upload state of a finished part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartState {
    Pending,
    Uploading,
    Uploaded,
    Failed,
}

/// Counts bytes as they reach the file, i.e. after compression
struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Part name as seen by the remote session
pub fn part_name(prefix: &str, seq: u64) -> String {
    format!("{}_{:08}", prefix, seq)
}

/// Accumulates records for one part
pub struct PartFileBuilder {
    seq: u64,
    name: String,
    encoder: GzEncoder<CountingWriter<BufWriter<File>>>,
    path: TempPath,
    record_count: u64,
}

impl std::fmt::Debug for PartFileBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartFileBuilder")
            .field("name", &self.name)
            .field("path", &self.path.to_path_buf())
            .field("record_count", &self.record_count)
            .finish()
    }
}

impl PartFileBuilder {
    /// Create an empty part in `dir`
    pub fn create(dir: &Path, seq: u64, prefix: &str) -> Result<Self> {
        let name = part_name(prefix, seq);
        let file = tempfile::Builder::new()
            .prefix(&format!("{}.", name))
            .suffix(PART_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| ImportError::io(dir, e))?;
        let (file, path) = file.into_parts();

        debug!(part = %name, path = %path.display(), "Created part file");

        Ok(Self {
            seq,
            name,
            encoder: GzEncoder::new(
                CountingWriter {
                    inner: BufWriter::new(file),
                    count: 0,
                },
                Compression::default(),
            ),
            path,
            record_count: 0,
        })
    }

    pub fn add_record(&mut self, record: &rmpv::Value) -> Result<()> {
        rmpv::encode::write_value(&mut self.encoder, record)?;
        self.record_count += 1;
        Ok(())
    }

    /// Compressed bytes emitted so far
    pub fn compressed_size(&self) -> u64 {
        self.encoder.get_ref().count
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// Flush and close the part
    ///
    /// Returns `None` (and deletes the file) when no record was added.
    pub fn finish(self) -> Result<Option<PartFile>> {
        let Self {
            seq,
            name,
            encoder,
            path,
            record_count,
        } = self;

        let counting = encoder.finish().map_err(|e| ImportError::io(&path, e))?;
        let size = counting.count;
        let mut writer = counting.inner;
        writer.flush().map_err(|e| ImportError::io(&path, e))?;
        drop(writer);

        if record_count == 0 {
            debug!(part = %name, "Discarding empty part");
            let display = path.to_path_buf();
            path.close().map_err(|e| ImportError::io(display, e))?;
            return Ok(None);
        }

        Ok(Some(PartFile {
            seq,
            name,
            record_count,
            size,
            path,
            state: PartState::Pending,
        }))
    }
}

/// A closed part waiting to be uploaded
#[derive(Debug)]
pub struct PartFile {
    seq: u64,
    name: String,
    record_count: u64,
    size: u64,
    path: TempPath,
    state: PartState,
}

impl PartFile {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Compressed size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> PartState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: PartState) {
        self.state = state;
    }

    /// Delete the backing file
    pub fn finalize(self) {
        let name = self.name;
        if let Err(e) = self.path.close() {
            warn!(part = %name, error = %e, "Failed to delete part file");
        }
    }
}
