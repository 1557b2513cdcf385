// SCSI START STOP UNIT

use super::cdb::scsi_stop_unit;
use super::transport::{with_device, AccessMode, DataTransfer, SgTarget, NO_TIMEOUT};
use crate::IdleResult;
use std::path::Path;

/// Stop the spindle of a SCSI (or SAT-translated) disk
pub fn stop_scsi_device(device: impl AsRef<Path>, power_condition: u8) -> IdleResult<()> {
    with_device(device, AccessMode::ReadOnly, |dev| stop_unit(dev, power_condition))
}

/// Send START STOP UNIT with `power_condition` to an open target
pub fn stop_unit<D>(dev: &D, power_condition: u8) -> IdleResult<()>
where
    D: SgTarget + ?Sized,
{
    let cdb = scsi_stop_unit(power_condition);
    dev.submit(&cdb, DataTransfer::None, NO_TIMEOUT)?
        .check(dev.path(), &cdb)
}
