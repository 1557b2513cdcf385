/// Parsing of `/proc/diskstats`
///
/// Each line has positional fields (see Documentation/admin-guide/iostats.rst):
///
/// ```text
///  1 major number           8 writes completed
///  2 minor number           9 writes merged
///  3 device name           10 sectors written
///  4 reads completed       11 time spent writing (ms)
///  5 reads merged          12 I/Os currently in progress
///  6 sectors read          13 time spent doing I/Os (ms)
///  7 time spent reading    14 weighted time spent doing I/Os (ms)
/// ```
///
/// Kernel 4.18+ appends four discard fields and 5.5+ two flush fields;
/// only the name and the two sector counters are consumed.
use super::{DeviceKind, DeviceRecord};
use lazy_static::lazy_static;
use regex::Regex;

const DEVICE_NAME_COL: usize = 2;
const SECTORS_READ_COL: usize = 5;
const SECTORS_WRITTEN_COL: usize = 9;

lazy_static! {
    static ref SCSI_DISK: Regex = Regex::new(r"^sd[a-z]+$").unwrap();
    static ref SCSI_PARTITION: Regex = Regex::new(r"^sd[a-z]+[0-9]+$").unwrap();
    static ref DEVICE_MAPPER: Regex = Regex::new(r"^dm-[0-9]+$").unwrap();
}

/// Classify a kernel block device name
pub fn classify(name: &str) -> DeviceKind {
    if SCSI_DISK.is_match(name) {
        DeviceKind::Disk
    } else if SCSI_PARTITION.is_match(name) {
        DeviceKind::Partition
    } else if DEVICE_MAPPER.is_match(name) {
        DeviceKind::DeviceMapper
    } else {
        DeviceKind::Unknown
    }
}

/// Parse one counter line.
///
/// Returns `None` for short or malformed lines and for devices that are not
/// SCSI disks, SCSI partitions or device-mapper targets.
pub fn parse_line(line: &str) -> Option<DeviceRecord> {
    let cols: Vec<&str> = line.split_whitespace().collect();
    if cols.len() <= SECTORS_WRITTEN_COL {
        return None;
    }

    let name = cols[DEVICE_NAME_COL];
    let kind = classify(name);
    if kind == DeviceKind::Unknown {
        return None;
    }

    let reads = cols[SECTORS_READ_COL].parse::<u64>().ok()?;
    let writes = cols[SECTORS_WRITTEN_COL].parse::<u64>().ok()?;

    Some(DeviceRecord {
        name: name.to_string(),
        kind,
        reads,
        writes,
    })
}
