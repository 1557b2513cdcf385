/// ATA STANDBY IMMEDIATE, through SAT pass-through or a JMicron bridge
use super::cdb::{
    ata_standby, jmicron_ata_command, jmicron_read_register, AtaStandbyOpcode, JMicronPort,
    JMICRON_PORT_REGISTER,
};
use super::transport::{
    with_device, AccessMode, DataTransfer, SgTarget, NO_TIMEOUT, PROBE_TIMEOUT_MS,
};
use crate::drives::CommandDialect;
use crate::{IdleError, IdleResult};
use std::path::Path;

/// Put an ATA disk into standby using the given dialect
pub fn stop_ata_device(device: impl AsRef<Path>, dialect: CommandDialect) -> IdleResult<()> {
    match dialect {
        CommandDialect::Standard => {
            with_device(device, AccessMode::ReadOnly, |dev| standby_pass_through(dev))
        }
        CommandDialect::JMicron => {
            with_device(device, AccessMode::ReadWrite, |dev| standby_jmicron(dev))
        }
    }
}

fn send_pass_through<D>(dev: &D, opcode: AtaStandbyOpcode) -> IdleResult<()>
where
    D: SgTarget + ?Sized,
{
    let cdb = ata_standby(opcode);
    dev.submit(&cdb, DataTransfer::None, NO_TIMEOUT)?
        .check_ata(dev.path(), &cdb)
}

/// STANDBY IMMEDIATE, retried with the legacy opcode only if rejected
pub fn standby_pass_through<D>(dev: &D) -> IdleResult<()>
where
    D: SgTarget + ?Sized,
{
    match send_pass_through(dev, AtaStandbyOpcode::StandbyImmediate) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(
                device = %dev.path(),
                "STANDBY IMMEDIATE rejected, trying legacy opcode: {}",
                e
            );
            send_pass_through(dev, AtaStandbyOpcode::LegacyStandbyImmediate)
        }
    }
}

/// Probe the bridge port, then send STANDBY IMMEDIATE to that port
pub fn standby_jmicron<D>(dev: &D) -> IdleResult<()>
where
    D: SgTarget + ?Sized,
{
    let port = jmicron_port(dev)?;
    tracing::debug!(device = %dev.path(), port = ?port, "JMicron drive port selected");

    let cdb = jmicron_ata_command(AtaStandbyOpcode::StandbyImmediate.code(), port);
    dev.submit(&cdb, DataTransfer::None, NO_TIMEOUT)?
        .check(dev.path(), &cdb)
}

/// Read the bridge port register to learn where the drive is attached
fn jmicron_port<D>(dev: &D) -> IdleResult<JMicronPort>
where
    D: SgTarget + ?Sized,
{
    let cdb = jmicron_read_register(JMICRON_PORT_REGISTER, 1);
    let mut register = [0u8; 1];

    dev.submit(&cdb, DataTransfer::FromDevice(&mut register), PROBE_TIMEOUT_MS)?
        .check(dev.path(), &cdb)?;

    JMicronPort::from_register(register[0]).ok_or_else(|| IdleError::CommandFailed {
        device: dev.path().to_string(),
        details: format!(
            "no drive attached to the JMicron bridge (port register {:#04x})",
            register[0]
        ),
    })
}
