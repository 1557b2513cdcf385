// Counter source read at every cycle

use super::holders::{HolderLookup, SysfsHolders};
use super::{aggregate, parse_line, ConsolidatedStats};
use crate::{IdleError, IdleResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub const PROC_DISKSTATS: &str = "/proc/diskstats";

/// Produces one consolidated snapshot per call
pub trait StatsSource {
    fn snapshot(&self) -> IdleResult<Vec<ConsolidatedStats>>;
}

/// `/proc/diskstats` reader with sysfs holder lookup
#[derive(Debug, Clone)]
pub struct DiskStatsSource<H = SysfsHolders> {
    path: PathBuf,
    holders: H,
}

impl DiskStatsSource<SysfsHolders> {
    pub fn new() -> Self {
        Self::with_paths(PROC_DISKSTATS, SysfsHolders::default())
    }
}

impl Default for DiskStatsSource<SysfsHolders> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: HolderLookup> DiskStatsSource<H> {
    pub fn with_paths(path: impl AsRef<Path>, holders: H) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            holders,
        }
    }
}

impl<H: HolderLookup> StatsSource for DiskStatsSource<H> {
    fn snapshot(&self) -> IdleResult<Vec<ConsolidatedStats>> {
        let source_error = |source| IdleError::StatsSource {
            path: self.path.display().to_string(),
            source,
        };

        let file = File::open(&self.path).map_err(source_error)?;
        read_snapshot(BufReader::new(file), &self.holders).map_err(|e| match e {
            IdleError::IoError(io) => source_error(io),
            other => other,
        })
    }
}

/// Parse and aggregate a whole counter table.
///
/// Malformed lines are skipped; a read error is returned.
pub fn read_snapshot<R, H>(reader: R, holders: &H) -> IdleResult<Vec<ConsolidatedStats>>
where
    R: BufRead,
    H: HolderLookup + ?Sized,
{
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(record) = parse_line(&line) {
            records.push(record);
        }
    }

    Ok(aggregate(records, holders))
}
