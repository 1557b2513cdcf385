// Hardware command layer
//
// - cdb.rs: command descriptor block encoding
// - sense.rs: completion status and sense decoding
// - transport.rs: SG_IO ioctl transport
// - scsi.rs / ata.rs: the spin-down sequences, generic over `SgTarget`

pub mod ata;
pub mod cdb;
pub mod scsi;
pub mod sense;
pub mod transport;


pub use ata::stop_ata_device;
pub use scsi::stop_scsi_device;
pub use sense::{SenseKey, SgStatus};
pub use transport::{AccessMode, SgDevice, SgTarget};

use crate::config::CommandType;
use crate::drives::{CommandDialect, DeviceClassifier};
use crate::engine::DiskController;
use crate::IdleResult;
use std::path::{Path, PathBuf};

/// Spins disks down through `/dev/<disk>` using SG_IO
#[derive(Debug, Clone)]
pub struct SgioController {
    dev_root: PathBuf,
    classifier: DeviceClassifier,
}

impl Default for SgioController {
    fn default() -> Self {
        Self::new("/dev", DeviceClassifier::default())
    }
}

impl SgioController {
    pub fn new(dev_root: impl AsRef<Path>, classifier: DeviceClassifier) -> Self {
        Self {
            dev_root: dev_root.as_ref().to_path_buf(),
            classifier,
        }
    }

    pub fn device_path(&self, disk: &str) -> PathBuf {
        self.dev_root.join(disk)
    }
}

impl DiskController for SgioController {
    fn spin_down(
        &self,
        disk: &str,
        command: CommandType,
        power_condition: u8,
        dialect: &mut Option<CommandDialect>,
    ) -> IdleResult<()> {
        let device = self.device_path(disk);
        match command {
            CommandType::Scsi => stop_scsi_device(&device, power_condition),
            CommandType::Ata => {
                let dialect = *dialect.get_or_insert_with(|| self.classifier.classify(disk));
                stop_ata_device(&device, dialect)
            }
        }
    }
}
