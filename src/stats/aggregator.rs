/// Folding of partition and holder counters into physical disks
///
/// The kernel also accounts read-ahead and merged requests on the parent
/// disk, so the parent's own counters are only used for disks with neither
/// partitions nor a device-mapper holder.
use super::holders::HolderLookup;
use super::{ConsolidatedStats, DeviceKind, DeviceRecord};
use std::collections::HashMap;

/// Owning disk of a partition: the name without its trailing digits
pub fn partition_parent(name: &str) -> &str {
    name.trim_end_matches(|c: char| c.is_ascii_digit())
}

/// Consolidate one full set of records into one entry per physical disk.
pub fn aggregate<H>(records: Vec<DeviceRecord>, holders: &H) -> Vec<ConsolidatedStats>
where
    H: HolderLookup + ?Sized,
{
    let mut disks: HashMap<String, ConsolidatedStats> = HashMap::new();
    let mut mappers: HashMap<String, (u64, u64)> = HashMap::new();
    let mut partition_sums: HashMap<String, (u64, u64)> = HashMap::new();
    let mut disk_holders: HashMap<String, String> = HashMap::new();

    for record in records {
        match record.kind {
            DeviceKind::Disk => {
                if let Some(holder) = holders.holder(&record.name) {
                    disk_holders.insert(record.name.clone(), holder);
                }
                disks.insert(
                    record.name.clone(),
                    ConsolidatedStats {
                        name: record.name,
                        reads: record.reads,
                        writes: record.writes,
                    },
                );
            }
            DeviceKind::Partition => {
                let sum = partition_sums
                    .entry(partition_parent(&record.name).to_string())
                    .or_insert((0, 0));
                sum.0 = sum.0.wrapping_add(record.reads);
                sum.1 = sum.1.wrapping_add(record.writes);
            }
            DeviceKind::DeviceMapper => {
                mappers.insert(record.name, (record.reads, record.writes));
            }
            DeviceKind::Unknown => {}
        }
    }

    for (name, stats) in disks.iter_mut() {
        let holder_counters = disk_holders
            .get(name)
            .and_then(|holder| mappers.get(holder));

        if let Some(&(reads, writes)) = holder_counters {
            stats.reads = reads;
            stats.writes = writes;
        } else if let Some(&(reads, writes)) = partition_sums.get(name) {
            stats.reads = reads;
            stats.writes = writes;
        }
    }

    disks.into_values().collect()
}
