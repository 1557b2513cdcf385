/// Interpretation of SG_IO completion status and sense data
use super::cdb::format_bytes;
use crate::{IdleError, IdleResult};
use std::fmt;

pub const SG_INFO_OK_MASK: u32 = 0x1;
pub const SG_INFO_OK: u32 = 0x0;

/// ASC/ASCQ 00/1D: ATA PASS-THROUGH INFORMATION AVAILABLE
const ATA_PASS_THROUGH_INFO: (u8, u8) = (0x00, 0x1d);
/// ATA status register bits that signal failure (ERR, DF)
const ATA_STATUS_FAILURE_MASK: u8 = 0x01 | 0x20;
/// Descriptor type of the ATA Status Return sense descriptor
const ATA_STATUS_RETURN_DESCRIPTOR: u8 = 0x09;

/// Completion fields copied out of the kernel `sg_io_hdr`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SgStatus {
    pub status: u8,
    pub masked_status: u8,
    pub host_status: u16,
    pub driver_status: u16,
    pub info: u32,
    /// The `sb_len_wr` valid bytes of the sense buffer
    pub sense: Vec<u8>,
}

/// SCSI sense key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenseKey {
    NoSense,
    RecoveredError,
    NotReady,
    MediumError,
    HardwareError,
    IllegalRequest,
    UnitAttention,
    DataProtect,
    BlankCheck,
    VendorSpecific,
    CopyAborted,
    AbortedCommand,
    Equal,
    VolumeOverflow,
    Miscompare,
    Completed,
}

impl SenseKey {
    pub fn from_code(code: u8) -> Self {
        match code & 0x0f {
            0x0 => SenseKey::NoSense,
            0x1 => SenseKey::RecoveredError,
            0x2 => SenseKey::NotReady,
            0x3 => SenseKey::MediumError,
            0x4 => SenseKey::HardwareError,
            0x5 => SenseKey::IllegalRequest,
            0x6 => SenseKey::UnitAttention,
            0x7 => SenseKey::DataProtect,
            0x8 => SenseKey::BlankCheck,
            0x9 => SenseKey::VendorSpecific,
            0xa => SenseKey::CopyAborted,
            0xb => SenseKey::AbortedCommand,
            0xc => SenseKey::Equal,
            0xd => SenseKey::VolumeOverflow,
            0xe => SenseKey::Miscompare,
            _ => SenseKey::Completed,
        }
    }
}

impl fmt::Display for SenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SenseKey::NoSense => "No Sense",
            SenseKey::RecoveredError => "Recovered Error",
            SenseKey::NotReady => "Not Ready",
            SenseKey::MediumError => "Medium Error",
            SenseKey::HardwareError => "Hardware Error",
            SenseKey::IllegalRequest => "Illegal Request",
            SenseKey::UnitAttention => "Unit Attention",
            SenseKey::DataProtect => "Data Protect",
            SenseKey::BlankCheck => "Blank Check",
            SenseKey::VendorSpecific => "Vendor Specific",
            SenseKey::CopyAborted => "Copy Aborted",
            SenseKey::AbortedCommand => "Aborted Command",
            SenseKey::Equal => "Equal",
            SenseKey::VolumeOverflow => "Volume Overflow",
            SenseKey::Miscompare => "Miscompare",
            SenseKey::Completed => "Completed",
        };
        write!(f, "{}", name)
    }
}

/// Decoded sense header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenseInfo {
    pub key: SenseKey,
    pub asc: u8,
    pub ascq: u8,
    /// ATA status register, when the sense carries ATA registers
    pub ata_status: Option<u8>,
}

/// Parse fixed (0x70/0x71) or descriptor (0x72/0x73) format sense data
pub fn parse_sense(sense: &[u8]) -> Option<SenseInfo> {
    let response_code = *sense.first()? & 0x7f;
    match response_code {
        0x70 | 0x71 => {
            if sense.len() < 14 {
                return None;
            }
            Some(SenseInfo {
                key: SenseKey::from_code(sense[2]),
                asc: sense[12],
                ascq: sense[13],
                // SAT puts ERROR, STATUS, DEVICE, COUNT in the information field
                ata_status: Some(sense[4]),
            })
        }
        0x72 | 0x73 => {
            if sense.len() < 4 {
                return None;
            }
            let ata_status = (sense.len() >= 22 && sense[8] == ATA_STATUS_RETURN_DESCRIPTOR)
                .then(|| sense[21]);
            Some(SenseInfo {
                key: SenseKey::from_code(sense[1]),
                asc: sense[2],
                ascq: sense[3],
                ata_status,
            })
        }
        _ => None,
    }
}

fn host_status_name(code: u16) -> &'static str {
    match code {
        0x00 => "DID_OK",
        0x01 => "DID_NO_CONNECT",
        0x02 => "DID_BUS_BUSY",
        0x03 => "DID_TIME_OUT",
        0x04 => "DID_BAD_TARGET",
        0x05 => "DID_ABORT",
        0x06 => "DID_PARITY",
        0x07 => "DID_ERROR",
        0x08 => "DID_RESET",
        0x09 => "DID_BAD_INTR",
        0x0a => "DID_PASSTHROUGH",
        0x0b => "DID_SOFT_ERROR",
        _ => "unknown",
    }
}

fn driver_status_name(code: u16) -> &'static str {
    match code & 0x0f {
        0x0 => "DRIVER_OK",
        0x1 => "DRIVER_BUSY",
        0x2 => "DRIVER_SOFT",
        0x3 => "DRIVER_MEDIA",
        0x4 => "DRIVER_ERROR",
        0x5 => "DRIVER_INVALID",
        0x6 => "DRIVER_TIMEOUT",
        0x7 => "DRIVER_HARD",
        0x8 => "DRIVER_SENSE",
        _ => "unknown",
    }
}

impl SgStatus {
    pub fn is_ok(&self) -> bool {
        self.info & SG_INFO_OK_MASK == SG_INFO_OK
    }

    /// CK_COND makes a successful ATA pass-through complete with
    /// CHECK CONDITION; the ATA status inside the sense tells the outcome.
    pub fn is_ata_pass_through_success(&self) -> bool {
        match parse_sense(&self.sense) {
            Some(info) => {
                matches!(info.key, SenseKey::NoSense | SenseKey::RecoveredError)
                    && (info.asc, info.ascq) == ATA_PASS_THROUGH_INFO
                    && info
                        .ata_status
                        .map_or(true, |s| s & ATA_STATUS_FAILURE_MASK == 0)
            }
            None => false,
        }
    }

    /// Human-readable description of a failed command
    pub fn describe(&self, cdb: &[u8]) -> String {
        let mut text = format!(
            "CDB: {}\nSCSI status: {:#04x}, host status: {:#06x} ({}), driver status: {:#06x} ({})",
            format_bytes(cdb),
            self.status,
            self.host_status,
            host_status_name(self.host_status),
            self.driver_status,
            driver_status_name(self.driver_status)
        );

        if !self.sense.is_empty() {
            text.push_str(&format!("\nSense data: {}", format_bytes(&self.sense)));
            match parse_sense(&self.sense) {
                Some(info) => text.push_str(&format!(
                    "\nSense key: {}, ASC/ASCQ: {:#04x}/{:#04x}",
                    info.key, info.asc, info.ascq
                )),
                None => text.push_str("\nSense data in unknown format"),
            }
        }

        text
    }

    /// Fail unless the kernel reported the command as OK
    pub fn check(&self, device: &str, cdb: &[u8]) -> IdleResult<()> {
        if self.is_ok() {
            return Ok(());
        }
        Err(IdleError::CommandFailed {
            device: device.to_string(),
            details: self.describe(cdb),
        })
    }

    /// Like [`SgStatus::check`], accepting CK_COND sense with a clean ATA status
    pub fn check_ata(&self, device: &str, cdb: &[u8]) -> IdleResult<()> {
        if self.is_ok() || self.is_ata_pass_through_success() {
            return Ok(());
        }
        self.check(device, cdb)
    }
}
