// Device-mapper holder lookup
//
// A LUKS or LVM mapping on top of a whole disk shows up as a single entry in
// /sys/class/block/<disk>/holders/. That holder sees the real I/O.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const SYS_CLASS_BLOCK: &str = "/sys/class/block";

/// Finds the device-mapper holder sitting on top of a disk
pub trait HolderLookup {
    /// Name of the single holder of `disk`, if there is exactly one
    fn holder(&self, disk: &str) -> Option<String>;
}

/// Holder lookup backed by the sysfs block class tree
#[derive(Debug, Clone)]
pub struct SysfsHolders {
    root: PathBuf,
}

impl SysfsHolders {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl Default for SysfsHolders {
    fn default() -> Self {
        Self::new(SYS_CLASS_BLOCK)
    }
}

impl HolderLookup for SysfsHolders {
    fn holder(&self, disk: &str) -> Option<String> {
        let holders_dir = self.root.join(disk).join("holders");
        let entries = fs::read_dir(&holders_dir).ok()?;

        let names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();

        match names.as_slice() {
            [single] => Some(single.clone()),
            [] => None,
            _ => {
                tracing::debug!(
                    disk = %disk,
                    holders = ?names,
                    "Several holders found, ignoring them"
                );
                None
            }
        }
    }
}

/// Lookup that never finds a holder
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHolders;

impl HolderLookup for NoHolders {
    fn holder(&self, _disk: &str) -> Option<String> {
        None
    }
}

/// Static disk -> holder table
impl HolderLookup for HashMap<String, String> {
    fn holder(&self, disk: &str) -> Option<String> {
        self.get(disk).cloned()
    }
}
