// Block device statistics
//
// Organized structure:
// - parser.rs: /proc/diskstats line parsing and name classification
// - holders.rs: device-mapper holder lookup in sysfs
// - aggregator.rs: folding partitions and holders into physical disks
// - source.rs: the counter source read once per cycle

pub mod aggregator;
pub mod holders;
pub mod parser;
pub mod source;


pub use aggregator::aggregate;
pub use holders::{HolderLookup, NoHolders, SysfsHolders};
pub use parser::{classify, parse_line};
pub use source::{read_snapshot, DiskStatsSource, StatsSource};

/// Kind of block device, derived from its kernel name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Disk,
    Partition,
    DeviceMapper,
    Unknown,
}

/// One parsed counter line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub name: String,
    pub kind: DeviceKind,
    /// Cumulative sectors read
    pub reads: u64,
    /// Cumulative sectors written
    pub writes: u64,
}

/// Activity figure for one physical disk
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsolidatedStats {
    pub name: String,
    pub reads: u64,
    pub writes: u64,
}
