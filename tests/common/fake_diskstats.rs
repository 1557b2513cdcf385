/// A rewritable /proc/diskstats stand-in

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct FakeDiskStats {
    _dir: TempDir,
    path: PathBuf,
}

impl FakeDiskStats {
    pub fn new() -> std::io::Result<Self> {
        let dir = TempDir::new()?;
        let path = dir.path().join("diskstats");
        fs::write(&path, "")?;
        Ok(Self { _dir: dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file with one line per `(name, sectors_read, sectors_written)`
    pub fn write(&self, devices: &[(&str, u64, u64)]) -> std::io::Result<()> {
        let content: String = devices
            .iter()
            .enumerate()
            .map(|(i, (name, reads, writes))| line(i as u32, name, *reads, *writes))
            .collect();
        fs::write(&self.path, content)
    }
}

fn line(minor: u32, name: &str, reads: u64, writes: u64) -> String {
    format!(
        "   8      {:>3} {} 1520 37 {} 2210 880 112 {} 1460 0 3120 3670 0 0 0 0\n",
        minor, name, reads, writes
    )
}
