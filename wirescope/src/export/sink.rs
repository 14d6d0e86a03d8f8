//! Line-oriented output media
//!
//! Exporters only need "append one formatted line". [`RotatingFileSink`]
//! keeps a bounded set of files on disk:
//!
//! ```text
//! <dir>/<base>.log      active file
//! <dir>/<base>.1.log    previous
//! <dir>/<base>.2.log    ...
//! ```
//!
//! When the next line would push the active file past `max_file_size`, every
//! file shifts up by one index and the oldest beyond `max_files` is removed.

use log::debug;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Destination for formatted lines
pub trait LineSink: Send + Sync {
    /// Append `line` followed by a newline
    fn write_line(&self, line: &str) -> io::Result<()>;
}

impl<S: LineSink + ?Sized> LineSink for Arc<S> {
    fn write_line(&self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }
}

/// Console output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{line}")
    }
}

/// Collects lines in memory
///
/// Handy for embedding the exporters in another process and for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line written so far
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        self.lines.lock().push(line.to_owned());
        Ok(())
    }
}

struct ActiveFile {
    file: File,
    written: u64,
}

/// Size-rotated log files
pub struct RotatingFileSink {
    dir: PathBuf,
    base: String,
    max_files: usize,
    max_file_size: u64,
    active: Mutex<ActiveFile>,
}

impl RotatingFileSink {
    /// Open (or append to) `<dir>/<base>.log`, creating `dir` if needed
    ///
    /// `max_files` counts the active file; values below 1 are treated as 1.
    ///
    /// # Errors
    /// Returns the I/O error if the directory or file cannot be created.
    pub fn open(
        dir: impl Into<PathBuf>,
        base: &str,
        max_files: usize,
        max_file_size: u64,
    ) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{base}.log"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            dir,
            base: base.to_owned(),
            max_files: max_files.max(1),
            max_file_size,
            active: Mutex::new(ActiveFile { file, written }),
        })
    }

    /// Path of the active file
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.indexed_path(0)
    }

    /// `index` 0 is the active file
    fn indexed_path(&self, index: usize) -> PathBuf {
        if index == 0 {
            self.dir.join(format!("{}.log", self.base))
        } else {
            self.dir.join(format!("{}.{index}.log", self.base))
        }
    }

    fn rotate(&self, active: &mut ActiveFile) -> io::Result<()> {
        active.file.flush()?;
        let oldest = self.indexed_path(self.max_files - 1);
        remove_if_exists(&oldest)?;
        for index in (0..self.max_files - 1).rev() {
            let from = self.indexed_path(index);
            if from.exists() {
                fs::rename(&from, self.indexed_path(index + 1))?;
            }
        }
        debug!("Rotated {}", self.path().display());
        active.file = OpenOptions::new().create(true).write(true).truncate(true).open(self.path())?;
        active.written = 0;
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl LineSink for RotatingFileSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut active = self.active.lock();
        let len = line.len() as u64 + 1;
        if active.written > 0 && active.written + len > self.max_file_size {
            self.rotate(&mut active)?;
        }
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        active.file.write_all(&buf)?;
        active.written += len;
        Ok(())
    }
}
