//! Append-only JSONL stream of scan results.
//!
//! Each record is written and flushed as soon as its scan ends, so a crash
//! loses at most the record being written. Replay tolerates a torn final line.

use crate::error::{BatchError, Result};
use crate::result::ScanResult;
use pixelscan_core::BatchId;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Writer for `<batch_id>.results.jsonl`.
pub struct ResultSink {
    writer: BufWriter<File>,
    path: PathBuf,
    count: usize,
}

impl ResultSink {
    /// Results file for a batch.
    #[must_use]
    pub fn path(dir: &Path, batch_id: &BatchId) -> PathBuf {
        dir.join(format!("{batch_id}.results.jsonl"))
    }

    /// Open the batch's results file for appending, creating it if needed.
    pub fn open(dir: &Path, batch_id: &BatchId) -> Result<Self> {
        let path = Self::path(dir, batch_id);
        let output_err = |source| BatchError::Output {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(dir).map_err(output_err)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)
            .map_err(output_err)?;

        // A torn last line must not swallow the next record
        if !ends_with_newline(&mut file).map_err(output_err)? {
            file.write_all(b"\n").map_err(output_err)?;
        }

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            count: 0,
        })
    }

    /// Append one record and flush it to the OS.
    pub fn append(&mut self, result: &ScanResult) -> Result<()> {
        let json = serde_json::to_string(result)?;
        self.write_line(json.as_bytes())
            .map_err(|source| BatchError::Output {
                path: self.path.clone(),
                source,
            })?;
        self.count += 1;
        Ok(())
    }

    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(line)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    /// Records appended through this sink.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.path
    }

    /// Read every intact record back. A missing file yields no records;
    /// lines that fail to parse are skipped.
    pub fn replay(path: &Path) -> Result<Vec<ScanResult>> {
        let mut results = Vec::new();
        Self::for_each_record(path, |result| results.push(result))?;
        Ok(results)
    }

    /// Stream intact records to `visit` one line at a time, returning how
    /// many were visited.
    pub fn for_each_record<F>(path: &Path, mut visit: F) -> Result<usize>
    where
        F: FnMut(ScanResult),
    {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(BatchError::Input {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut recovered = 0_usize;
        let mut skipped = 0_usize;

        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Stopped reading {} at line {}: {}", path.display(), line_num + 1, e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ScanResult>(&line) {
                Ok(result) => {
                    recovered += 1;
                    visit(result);
                }
                Err(e) => {
                    skipped += 1;
                    warn!("Skipping corrupt result at {}:{}: {}", path.display(), line_num + 1, e);
                }
            }
        }

        if skipped > 0 {
            warn!(path = %path.display(), skipped, recovered, "results replayed with corrupt lines");
        }
        Ok(recovered)
    }
}

fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0_u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
