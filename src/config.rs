/// Daemon configuration: defaults, per-device overrides, and the derived
/// polling interval.
use crate::{IdleError, IdleResult};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Idle threshold used when nothing else is configured
pub const DEFAULT_IDLE_TIME: Duration = Duration::from_secs(600);

/// Highest SCSI power condition encodable in the stop-unit nibble
pub const MAX_POWER_CONDITION: u8 = 15;

/// Command family used to spin a disk down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommandType {
    /// SCSI START STOP UNIT
    #[default]
    Scsi,
    /// ATA STANDBY IMMEDIATE via ATA pass-through
    Ata,
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandType::Scsi => write!(f, "scsi"),
            CommandType::Ata => write!(f, "ata"),
        }
    }
}

impl FromStr for CommandType {
    type Err = IdleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scsi" => Ok(CommandType::Scsi),
            "ata" => Ok(CommandType::Ata),
            other => Err(IdleError::InvalidArgument(format!(
                "Wrong command_type -c {}. Must be one of: scsi, ata",
                other
            ))),
        }
    }
}

/// When symbolic device names given with `-a` are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymlinkPolicy {
    /// Resolve once at startup; unresolved devices are dropped
    #[default]
    ResolveOnce,
    /// Retry unresolved names at the start of every cycle
    Retry,
}

impl FromStr for SymlinkPolicy {
    type Err = IdleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(SymlinkPolicy::ResolveOnce),
            "1" => Ok(SymlinkPolicy::Retry),
            other => Err(IdleError::InvalidArgument(format!(
                "Wrong symlink_policy -s {}. Must be 0 or 1",
                other
            ))),
        }
    }
}

impl fmt::Display for SymlinkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymlinkPolicy::ResolveOnce => write!(f, "0"),
            SymlinkPolicy::Retry => write!(f, "1"),
        }
    }
}

/// Parse a power condition argument, rejecting values outside 0..=15
pub fn parse_power_condition(s: &str) -> IdleResult<u8> {
    match s.parse::<u8>() {
        Ok(pc) if pc <= MAX_POWER_CONDITION => Ok(pc),
        _ => Err(IdleError::InvalidArgument(format!(
            "Wrong power_condition -p {}. Must be a number between 0 and {}",
            s, MAX_POWER_CONDITION
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultConfig {
    pub idle: Duration,
    pub command_type: CommandType,
    pub power_condition: u8,
    pub debug: bool,
    pub log_file: Option<String>,
    pub symlink_policy: SymlinkPolicy,
}

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            idle: DEFAULT_IDLE_TIME,
            command_type: CommandType::Scsi,
            power_condition: 0,
            debug: false,
            log_file: None,
            symlink_policy: SymlinkPolicy::ResolveOnce,
        }
    }
}

/// Per-device override created by `-a`
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    /// Canonical kernel name (e.g. `sda`); `None` while a symlink is unresolved
    pub name: Option<String>,
    /// Name exactly as the user supplied it
    pub given_name: String,
    pub idle: Duration,
    pub command_type: CommandType,
    pub power_condition: u8,
}

impl DeviceConfig {
    /// New section inheriting the defaults currently in effect
    pub fn inheriting(given_name: impl Into<String>, defaults: &DefaultConfig) -> Self {
        Self {
            name: None,
            given_name: given_name.into(),
            idle: defaults.idle,
            command_type: defaults.command_type,
            power_condition: defaults.power_condition,
        }
    }
}

impl fmt::Display for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name={}, givenName={}, idle={}, commandType={}, powerCondition={}",
            self.name.as_deref().unwrap_or(""),
            self.given_name,
            self.idle.as_secs(),
            self.command_type,
            self.power_condition
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub devices: Vec<DeviceConfig>,
    pub defaults: DefaultConfig,
}

impl Config {
    pub fn new(defaults: DefaultConfig, devices: Vec<DeviceConfig>) -> Self {
        Self { devices, defaults }
    }

    /// Look up the override for a canonical device name
    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices
            .iter()
            .find(|d| d.name.as_deref() == Some(name))
    }

    /// Interval between two observation cycles
    pub fn poll_interval(&self) -> Duration {
        poll_interval(&self.devices)
    }

    /// Gap between cycles beyond which a suspend is assumed
    pub fn skew_tolerance(&self) -> Duration {
        self.poll_interval() * 3
    }

    /// Name to show for a device in logs
    pub fn display_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.device(name)
            .map(|d| d.given_name.as_str())
            .unwrap_or(name)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let devices: String = self
            .devices
            .iter()
            .map(|d| format!("{{{}}}", d))
            .collect();
        write!(
            f,
            "symlinkPolicy={}, defaultIdle={}, defaultCommand={}, defaultPowerCondition={}, debug={}, logFile={}, devices={}",
            self.defaults.symlink_policy,
            self.defaults.idle.as_secs(),
            self.defaults.command_type,
            self.defaults.power_condition,
            self.defaults.debug,
            self.defaults.log_file.as_deref().unwrap_or(""),
            devices
        )
    }
}

/// Poll interval: a tenth of the smallest configured idle threshold
/// (capped at the default threshold), never below one second.
pub fn poll_interval(devices: &[DeviceConfig]) -> Duration {
    let shortest = devices
        .iter()
        .map(|d| d.idle)
        .fold(DEFAULT_IDLE_TIME, Duration::min);

    let interval = Duration::from_secs(shortest.as_secs() / 10);
    if interval.is_zero() {
        Duration::from_secs(1)
    } else {
        interval
    }
}
