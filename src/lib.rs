// Allow uppercase acronyms for industry-standard terms like SCSI, ATA, CDB
#![allow(clippy::upper_case_acronyms)]

pub mod cli;
pub mod config;
pub mod drives;
pub mod engine;
pub mod eventlog;
pub mod sgio;
pub mod stats;

// Re-export the pieces the scheduler loop needs
pub use config::{CommandType, Config, DefaultConfig, DeviceConfig, SymlinkPolicy};
pub use drives::{canonical_device_name, CommandDialect, DeviceClassifier};
pub use engine::{DeviceState, DiskController, IdleEngine, IdleEvent};
pub use eventlog::EventLog;
pub use sgio::SgioController;
pub use stats::{ConsolidatedStats, DeviceKind, DeviceRecord, DiskStatsSource, StatsSource};

use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

// Global flag for handling SIGINT / SIGTERM
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Set the interrupt flag (called by signal handler)
pub fn set_interrupted() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Check if an interrupt has been received
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Reset the interrupt flag (primarily for testing)
pub fn reset_interrupted() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

#[derive(Error, Debug)]
pub enum IdleError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cannot read disk statistics from {path}: {source}")]
    StatsSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open file {device}. Error: {source}")]
    DeviceOpen {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Device {0} does not appear to be an sg device")]
    NotSgDevice(String),

    #[error("ioctl on {device} failed: {errno}")]
    Ioctl { device: String, errno: nix::errno::Errno },

    #[error("Command failed on {device}: {details}")]
    CommandFailed { device: String, details: String },

    #[error("Cannot close file {device}. Error: {source}")]
    DeviceClose {
        device: String,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("Cannot find device for {0}")]
    SymlinkResolution(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type IdleResult<T> = Result<T, IdleError>;

#[cfg(test)]
mod lib_tests;
