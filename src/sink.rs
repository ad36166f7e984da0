//! Append-only log storage.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// File sink collaborator. Each call opens the named log in append mode,
/// writes the lines and closes it again.
pub trait LogSink: Send + Sync {
    fn append(&self, log_name: &str, lines: &[String]) -> io::Result<()>;
}

/// Writes `<log_name>.csv` files into a single directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing a named log.
    pub fn log_path(&self, log_name: &str) -> PathBuf {
        self.dir.join(format!("{log_name}.csv"))
    }
}

impl LogSink for DirectorySink {
    fn append(&self, log_name: &str, lines: &[String]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(log_name))?;
        let mut writer = BufWriter::new(file);

        for line in lines {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }

        writer.flush()
    }
}
