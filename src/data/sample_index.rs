// ============================================================
// Layer 4 — Sample Offset Index
// ============================================================
// Maps logical sample number → byte offset of its record in a
// flat, newline-delimited data file.
//
// The file is scanned exactly once at startup. Afterwards any
// sample can be read with one seek + one line read, so datasets
// far larger than memory can be shuffled freely.
//
// Whitespace-only lines (a trailing blank line, a stray empty
// line) are not records and get no offset.
//
//   offsets[i]      = first byte of record i
//   offsets[i + 1]  = first byte of record i + 1 (or file length)
//
// Reference: Rust Book §12 (I/O), std::io::BufRead

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader, Read, Seek, SeekFrom},
    ops::Range,
    path::Path,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleIndex {
    offsets: Vec<u64>,
    /// One past the last byte of each record, terminator included
    ends:    Vec<u64>,
}

impl SampleIndex {
    /// Scan `path` once and record where every non-blank line starts.
    pub fn build(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Cannot open data file '{}'", path.display()))?;
        Self::scan(BufReader::new(file))
            .with_context(|| format!("Cannot index data file '{}'", path.display()))
    }

    /// Index any buffered reader positioned at its start.
    pub fn scan<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut offsets = Vec::new();
        let mut ends    = Vec::new();
        let mut line    = Vec::new();
        let mut pos     = 0u64;
        let mut blank   = 0usize;

        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                break;
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                blank += 1;
            } else {
                offsets.push(pos);
                ends.push(pos + n as u64);
            }
            pos += n as u64;
        }

        if blank > 0 {
            tracing::debug!("Skipped {} blank line(s) while indexing", blank);
        }
        Ok(Self { offsets, ends })
    }

    /// Number of records found.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Byte offset where record `i` starts.
    pub fn offset(&self, i: usize) -> Option<u64> {
        self.offsets.get(i).copied()
    }

    /// Byte range of record `i`, including its line terminator.
    pub fn record_range(&self, i: usize) -> Option<Range<u64>> {
        let start = self.offset(i)?;
        let end   = self.ends.get(i).copied()?;
        Some(start..end)
    }

    /// Read the bytes of record `i` from `source`, without the line terminator.
    pub fn read_record<R: Read + Seek>(&self, source: &mut R, i: usize) -> Result<Vec<u8>> {
        let range = self.record_range(i)
            .with_context(|| format!("record {i} is out of range (have {})", self.len()))?;

        source.seek(SeekFrom::Start(range.start))?;
        let mut bytes = vec![0u8; (range.end - range.start) as usize];
        source.read_exact(&mut bytes)?;

        if bytes.last() == Some(&b'\n') {
            bytes.pop();
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
        }
        Ok(bytes)
    }
}
