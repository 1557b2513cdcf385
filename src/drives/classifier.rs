/// USB-to-ATA bridge detection
///
/// Some USB enclosures do not implement the SAT pass-through and need a
/// vendor encoding instead. The USB descriptor attributes live on an
/// ancestor of the block device in sysfs, so the lookup walks up from
/// `/sys/block/<disk>` until it finds them.
use std::fs;
use std::path::{Path, PathBuf};

pub const SYS_BLOCK: &str = "/sys/block";

/// Parent directories visited before giving up on an attribute
pub const MAX_WALK_UP_DEPTH: usize = 20;

const JMICRON_VENDOR_ID: u16 = 0x152d;
const JMICRON_PRODUCT_IDS: [u16; 4] = [0x2329, 0x2336, 0x2338, 0x2339];

/// How ATA commands reach the drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandDialect {
    /// SAT ATA PASS-THROUGH(16)
    #[default]
    Standard,
    /// JMicron vendor-specific 12-byte commands
    JMicron,
}

/// USB identity of the bridge in front of a disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_revision: u16,
}

impl BridgeDescriptor {
    pub fn is_jmicron(&self) -> bool {
        self.vendor_id == JMICRON_VENDOR_ID && JMICRON_PRODUCT_IDS.contains(&self.product_id)
    }

    pub fn dialect(&self) -> CommandDialect {
        if self.is_jmicron() {
            CommandDialect::JMicron
        } else {
            CommandDialect::Standard
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeviceClassifier {
    sys_block: PathBuf,
}

impl Default for DeviceClassifier {
    fn default() -> Self {
        Self::new(SYS_BLOCK)
    }
}

impl DeviceClassifier {
    pub fn new(sys_block: impl AsRef<Path>) -> Self {
        Self {
            sys_block: sys_block.as_ref().to_path_buf(),
        }
    }

    /// Dialect for `disk` (kernel name such as `sde`).
    ///
    /// Never fails: anything short of a positive bridge match is Standard.
    pub fn classify(&self, disk: &str) -> CommandDialect {
        match self.bridge_descriptor(disk) {
            Some(descriptor) => {
                tracing::debug!(
                    disk = %disk,
                    "USB ID = {:#06x}:{:#06x} ({:#05x})",
                    descriptor.vendor_id,
                    descriptor.product_id,
                    descriptor.device_revision
                );
                let dialect = descriptor.dialect();
                if dialect == CommandDialect::JMicron {
                    tracing::debug!(disk = %disk, "Found supported bridge: JMicron");
                }
                dialect
            }
            None => CommandDialect::Standard,
        }
    }

    /// Read the bridge descriptor, if the disk sits behind a USB device.
    ///
    /// All three ids come from the nearest ancestor that has `idVendor`.
    pub fn bridge_descriptor(&self, disk: &str) -> Option<BridgeDescriptor> {
        let usb_dir = find_attribute_dir(&self.sys_block.join(disk), "idVendor")?;

        Some(BridgeDescriptor {
            vendor_id: read_hex_attribute(&usb_dir, "idVendor")?,
            product_id: read_hex_attribute(&usb_dir, "idProduct")?,
            device_revision: read_hex_attribute(&usb_dir, "bcdDevice")?,
        })
    }
}

/// Read attribute `name` of `dir` and parse it as hex.
///
/// Missing and malformed attributes both yield `None`.
pub fn read_hex_attribute(dir: &Path, name: &str) -> Option<u16> {
    let raw = fs::read_to_string(dir.join(name)).ok()?;
    match u16::from_str_radix(raw.trim(), 16) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(
                attribute = %name,
                value = %raw.trim(),
                "Malformed sysfs attribute: {}",
                e
            );
            None
        }
    }
}

/// First directory at or above `start` holding attribute `name`
pub fn find_attribute_dir(start: &Path, name: &str) -> Option<PathBuf> {
    // /sys/block entries are symlinks into /sys/devices; walk the real tree
    let mut dir = fs::canonicalize(start).ok()?;

    for _ in 0..=MAX_WALK_UP_DEPTH {
        if dir.join(name).is_file() {
            return Some(dir);
        }
        if !dir.pop() {
            break;
        }
    }

    None
}
