/// Command descriptor block encoding
///
/// References:
/// - SCSI START STOP UNIT: Seagate SCSI Commands Reference, section 3.49
/// - ATA PASS-THROUGH(16): T10 SAT-4, section 12.2.2
/// - JMicron bridge commands: smartmontools `scsiata.cpp` (usbjmicron)

/// SCSI START STOP UNIT operation code
pub const START_STOP_UNIT: u8 = 0x1b;
pub const START_STOP_UNIT_LEN: usize = 6;

/// SAT ATA PASS-THROUGH(16) operation code
pub const ATA_PASS_THROUGH_16: u8 = 0x85;
pub const ATA_PASS_THROUGH_16_LEN: usize = 16;

/// PROTOCOL field (byte 1, bits 4..1): non-data
pub const ATA_PROTOCOL_NON_DATA: u8 = 3 << 1;
/// CK_COND (byte 2): return the ATA registers in the sense data
pub const ATA_CHECK_CONDITION: u8 = 1 << 5;
/// DEVICE register LBA bit
pub const ATA_USING_LBA: u8 = 1 << 6;

/// JMicron vendor-specific operation code
pub const JMICRON_ATA: u8 = 0xdf;
pub const JMICRON_CDB_LEN: usize = 12;
/// Bridge register reporting which SATA port has a drive attached
pub const JMICRON_PORT_REGISTER: u16 = 0x720f;

const JMICRON_DATA_IN: u8 = 0x10;
const JMICRON_REGISTER_READ: u8 = 0xfd;

/// ATA standby commands, in the order they are tried
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtaStandbyOpcode {
    /// STANDBY IMMEDIATE
    StandbyImmediate = 0xe0,
    /// Pre-ATA-4 STANDBY IMMEDIATE; never coexisted with ATAPI
    LegacyStandbyImmediate = 0x94,
}

impl AtaStandbyOpcode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Drive port behind a JMicron bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JMicronPort {
    First,
    Second,
}

impl JMicronPort {
    /// Decode the port register value read from the bridge
    pub fn from_register(value: u8) -> Option<Self> {
        if value & 0x04 != 0 {
            Some(JMicronPort::First)
        } else if value & 0x40 != 0 {
            Some(JMicronPort::Second)
        } else {
            None
        }
    }

    /// DEVICE register value selecting this port
    pub fn device_register(self) -> u8 {
        match self {
            JMicronPort::First => 0xa0,
            JMicronPort::Second => 0xb0,
        }
    }
}

/// START STOP UNIT with START=0, requesting `power_condition`.
///
/// Layout: opcode, IMMED, reserved, power condition modifier,
/// POWER CONDITION (upper nibble) / NO_FLUSH / LOEJ / START, CONTROL.
pub fn scsi_stop_unit(power_condition: u8) -> [u8; START_STOP_UNIT_LEN] {
    [START_STOP_UNIT, 0, 0, 0, (power_condition & 0x0f) << 4, 0]
}

/// ATA PASS-THROUGH(16) carrying a non-data standby command
pub fn ata_standby(opcode: AtaStandbyOpcode) -> [u8; ATA_PASS_THROUGH_16_LEN] {
    let mut cdb = [0u8; ATA_PASS_THROUGH_16_LEN];
    cdb[0] = ATA_PASS_THROUGH_16;
    cdb[1] = ATA_PROTOCOL_NON_DATA;
    cdb[2] = ATA_CHECK_CONDITION;
    cdb[13] = ATA_USING_LBA;
    cdb[14] = opcode.code();
    cdb
}

/// Read `len` bytes of a JMicron bridge register
pub fn jmicron_read_register(register: u16, len: u16) -> [u8; JMICRON_CDB_LEN] {
    let [len_hi, len_lo] = len.to_be_bytes();
    let [reg_hi, reg_lo] = register.to_be_bytes();
    [
        JMICRON_ATA,
        JMICRON_DATA_IN,
        0x00,
        len_hi,
        len_lo,
        0x00,
        reg_hi,
        reg_lo,
        0x00,
        0x00,
        0x00,
        JMICRON_REGISTER_READ,
    ]
}

/// Non-data ATA command forwarded by a JMicron bridge to `port`
pub fn jmicron_ata_command(command: u8, port: JMicronPort) -> [u8; JMICRON_CDB_LEN] {
    let mut cdb = [0u8; JMICRON_CDB_LEN];
    cdb[0] = JMICRON_ATA;
    // bytes 1..=9: no data transfer, features, count and LBA all zero
    cdb[10] = port.device_register();
    cdb[11] = command;
    cdb
}

/// Hex dump used in diagnostics
pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
