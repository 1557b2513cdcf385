/// Command-line interface
///
/// `-i`, `-c` and `-p` are positional: before any `-a` they set the
/// defaults, after an `-a` they configure that device. Clap collects the
/// values; their argv indices restore the order.
use crate::config::{
    parse_power_condition, CommandType, Config, DefaultConfig, DeviceConfig, SymlinkPolicy,
};
use crate::drives::canonical_device_name;
use crate::{IdleError, IdleResult};
use clap::{ArgAction, ArgMatches, Parser};
use std::str::FromStr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "hd-idle")]
#[command(about = "Spin down idle hard disks")]
#[command(
    override_usage = "hd-idle [-t <disk>] [-s <symlink_policy>] [-a <name>] [-i <idle_time>] [-c <command_type>] [-p <power_condition>] [-l <logfile>] [-d] [-h]"
)]
#[command(version)]
pub struct Cli {
    /// Spin down the given disk immediately and exit
    #[arg(short = 't', value_name = "disk")]
    pub test_disk: Option<String>,

    /// Symlink resolution: 0 = once at startup, 1 = retry every cycle
    #[arg(short = 's', value_name = "symlink_policy", value_parser = SymlinkPolicy::from_str)]
    pub symlink_policy: Option<SymlinkPolicy>,

    /// Disk to configure (sda, /dev/sda or /dev/disk/by-id/...); following -i/-c/-p apply to it
    #[arg(short = 'a', value_name = "name", action = ArgAction::Append)]
    pub names: Vec<String>,

    /// Idle time in seconds (0 disables spin-down)
    #[arg(short = 'i', value_name = "idle_time", action = ArgAction::Append)]
    pub idle_times: Vec<u64>,

    /// Command type: scsi or ata
    #[arg(
        short = 'c',
        value_name = "command_type",
        action = ArgAction::Append,
        value_parser = CommandType::from_str
    )]
    pub command_types: Vec<CommandType>,

    /// SCSI power condition (0-15) for stop-unit
    #[arg(
        short = 'p',
        value_name = "power_condition",
        action = ArgAction::Append,
        value_parser = parse_power_condition
    )]
    pub power_conditions: Vec<u8>,

    /// Append spin-up and resume events to this file
    #[arg(short = 'l', value_name = "logfile")]
    pub log_file: Option<String>,

    /// Enable debug output
    #[arg(short = 'd')]
    pub debug: bool,
}

/// What the binary was asked to do
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub config: Config,
    /// `-t`: spin this disk down once and exit
    pub test_disk: Option<String>,
}

enum Setting {
    Device(String),
    Idle(u64),
    Command(CommandType),
    PowerCondition(u8),
}

fn ordered<T: Clone>(
    matches: &ArgMatches,
    id: &str,
    wrap: fn(T) -> Setting,
) -> Vec<(usize, Setting)>
where
    T: Send + Sync + 'static,
{
    match (matches.indices_of(id), matches.get_many::<T>(id)) {
        (Some(indices), Some(values)) => indices
            .zip(values)
            .map(|(index, value)| (index, wrap(value.clone())))
            .collect(),
        _ => Vec::new(),
    }
}

/// Build the configuration from parsed arguments, resolving `-a` names
pub fn invocation_from_matches(matches: &ArgMatches) -> IdleResult<Invocation> {
    let mut defaults = DefaultConfig {
        debug: matches.get_flag("debug"),
        log_file: matches.get_one::<String>("log_file").cloned(),
        ..Default::default()
    };
    if let Some(policy) = matches.get_one::<SymlinkPolicy>("symlink_policy") {
        defaults.symlink_policy = *policy;
    }

    let mut settings = ordered::<String>(matches, "names", Setting::Device);
    settings.extend(ordered::<u64>(matches, "idle_times", Setting::Idle));
    settings.extend(ordered::<CommandType>(matches, "command_types", Setting::Command));
    settings.extend(ordered::<u8>(matches, "power_conditions", Setting::PowerCondition));
    settings.sort_by_key(|(index, _)| *index);

    let mut devices: Vec<DeviceConfig> = Vec::new();
    for (_, setting) in settings {
        if let Setting::Device(given) = setting {
            let mut device = DeviceConfig::inheriting(given, &defaults);
            device.name = resolve(&device.given_name);
            devices.push(device);
            continue;
        }

        match (setting, devices.last_mut()) {
            (Setting::Idle(secs), Some(device)) => device.idle = Duration::from_secs(secs),
            (Setting::Idle(secs), None) => defaults.idle = Duration::from_secs(secs),
            (Setting::Command(command), Some(device)) => device.command_type = command,
            (Setting::Command(command), None) => defaults.command_type = command,
            (Setting::PowerCondition(pc), Some(device)) => device.power_condition = pc,
            (Setting::PowerCondition(pc), None) => defaults.power_condition = pc,
            (Setting::Device(_), _) => {}
        }
    }

    let test_disk = matches.get_one::<String>("test_disk").cloned();
    if test_disk.as_deref() == Some("") {
        return Err(IdleError::InvalidArgument(
            "Missing disk argument. Must be a device (e.g. sda)".to_string(),
        ));
    }

    Ok(Invocation {
        config: Config::new(defaults, devices),
        test_disk,
    })
}

fn resolve(given: &str) -> Option<String> {
    match canonical_device_name(given) {
        Ok(name) => Some(name),
        Err(e) => {
            tracing::warn!(given = %given, "Unable to resolve symlink: {}", e);
            None
        }
    }
}
