/// Idle detection state machine
///
/// One `IdleEngine` owns the state of every disk seen so far. Each cycle the
/// scheduler hands it a consolidated snapshot and the current time; the
/// engine compares counters, spins idle disks down through its
/// `DiskController`, and notices disks that woke up.
///
/// ```text
///            first sighting
///                  │
///                  ▼
///   ┌──────────► Running ──── idle > threshold ────► SpunDown
///   │              ▲            (command OK)            │
///   │              └──────── counters changed ──────────┘
///   │                                                   │
///   └───────────── gap > skew tolerance (suspend) ──────┘
/// ```
pub mod state;


pub use state::{DeviceState, IdleEvent};

use crate::config::{CommandType, Config, SymlinkPolicy};
use crate::drives::{canonical_device_name, CommandDialect};
use crate::stats::{ConsolidatedStats, StatsSource};
use crate::IdleResult;
use chrono::{DateTime, Local};
use state::elapsed;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Issues the spin-down command for one disk
pub trait DiskController {
    /// Spin `disk` down.
    ///
    /// `dialect` is the per-disk cache of the detected ATA dialect; an
    /// implementation fills it on first use.
    fn spin_down(
        &self,
        disk: &str,
        command: CommandType,
        power_condition: u8,
        dialect: &mut Option<CommandDialect>,
    ) -> IdleResult<()>;
}

#[derive(Debug)]
pub struct IdleEngine<C> {
    config: Config,
    controller: C,
    devices: HashMap<String, DeviceState>,
    last_cycle: Option<SystemTime>,
}

impl<C: DiskController> IdleEngine<C> {
    pub fn new(config: Config, controller: C) -> Self {
        Self {
            config,
            controller,
            devices: HashMap::new(),
            last_cycle: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn device(&self, name: &str) -> Option<&DeviceState> {
        self.devices.get(name)
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceState> {
        self.devices.values()
    }

    /// One full cycle: optional symlink retry, snapshot, update.
    ///
    /// Only a failure to read the counter source is an error.
    pub fn run_cycle<S>(&mut self, source: &S, now: SystemTime) -> IdleResult<Vec<IdleEvent>>
    where
        S: StatsSource + ?Sized,
    {
        let mut events = match self.config.defaults.symlink_policy {
            SymlinkPolicy::Retry => self.resolve_symlinks(),
            SymlinkPolicy::ResolveOnce => Vec::new(),
        };

        let snapshot = source.snapshot()?;
        events.extend(self.update(&snapshot, now));
        Ok(events)
    }

    /// Resolve `-a` names that are still unresolved.
    ///
    /// A name resolving to an already tracked disk re-applies its settings.
    pub fn resolve_symlinks(&mut self) -> Vec<IdleEvent> {
        let mut events = Vec::new();

        for dev in self.config.devices.iter_mut().filter(|d| d.name.is_none()) {
            match canonical_device_name(&dev.given_name) {
                Ok(name) => {
                    tracing::info!(given = %dev.given_name, disk = %name, "symlink resolved");
                    if let Some(state) = self.devices.get_mut(&name) {
                        state.idle_time = dev.idle;
                        state.command_type = dev.command_type;
                        state.power_condition = dev.power_condition;
                    }
                    dev.name = Some(name.clone());
                    events.push(IdleEvent::SymlinkResolved {
                        given_name: dev.given_name.clone(),
                        name,
                    });
                }
                Err(e) => {
                    tracing::debug!(given = %dev.given_name, "Cannot resolve symlink: {}", e);
                }
            }
        }

        events
    }

    /// Apply one consolidated snapshot taken at `now`
    pub fn update(&mut self, snapshot: &[ConsolidatedStats], now: SystemTime) -> Vec<IdleEvent> {
        let mut events = Vec::new();

        if let Some(last) = self.last_cycle {
            if elapsed(last, now) > self.config.skew_tolerance() {
                self.reset_after_sleep(now, &mut events);
            }
        }

        for stats in snapshot {
            self.update_device(stats, now, &mut events);
        }

        self.last_cycle = Some(now);
        events
    }

    /// We slept too long: assume a suspend, after which the disks may have
    /// been spun up by firmware.
    fn reset_after_sleep(&mut self, now: SystemTime, events: &mut Vec<IdleEvent>) {
        for state in self.devices.values_mut() {
            state.reset_after_sleep(now);
            tracing::info!(disk = %state.name, "assuming disk spun up after long sleep");
            events.push(IdleEvent::SkewReset {
                disk: state.name.clone(),
                at: now,
            });
        }
    }

    fn update_device(
        &mut self,
        stats: &ConsolidatedStats,
        now: SystemTime,
        events: &mut Vec<IdleEvent>,
    ) {
        let config = &self.config;
        let controller = &self.controller;

        if !self.devices.contains_key(&stats.name) {
            let state = DeviceState::new(stats, config, now);
            tracing::debug!(
                disk = %state.name,
                idle = %humantime::format_duration(state.idle_time),
                command = %state.command_type,
                "Tracking new disk"
            );
            self.devices.insert(stats.name.clone(), state);
            return;
        }
        let Some(state) = self.devices.get_mut(&stats.name) else {
            return;
        };

        let display_name = config.display_name(&state.name).to_string();

        if !state.has_activity(stats) {
            if state.should_spin_down(now) {
                tracing::info!(disk = %display_name, "spindown");
                match controller.spin_down(
                    &state.name,
                    state.command_type,
                    state.power_condition,
                    &mut state.dialect,
                ) {
                    Ok(()) => {
                        state.spin_down_at = Some(now);
                        state.spun_down = true;
                        events.push(IdleEvent::SpinDown {
                            disk: state.name.clone(),
                            display_name: display_name.clone(),
                            at: now,
                        });
                    }
                    Err(e) => {
                        tracing::error!(
                            disk = %display_name,
                            command = %state.command_type,
                            "cannot spindown disk: {}",
                            e
                        );
                        events.push(IdleEvent::CommandFailed {
                            disk: state.name.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        } else {
            if state.spun_down {
                let running = state.running_time();
                let stopped = state.stopped_time(now);
                tracing::info!(
                    disk = %display_name,
                    running = running.as_secs(),
                    stopped = stopped.as_secs(),
                    "spinup"
                );
                events.push(IdleEvent::SpinUp {
                    disk: state.name.clone(),
                    display_name: display_name.clone(),
                    running,
                    stopped,
                    at: now,
                });
                state.spin_up_at = now;
            }
            state.reads = stats.reads;
            state.writes = stats.writes;
            state.last_io_at = now;
            state.spun_down = false;
        }

        log_state(state, now);
    }
}

fn format_time(t: SystemTime) -> String {
    DateTime::<Local>::from(t).format(DATE_FORMAT).to_string()
}

fn log_state(state: &DeviceState, now: SystemTime) {
    tracing::debug!(
        "disk={} command={} spunDown={} reads={} writes={} idleTime={} idleDuration={} spindown={} spinup={} lastIO={}",
        state.name,
        state.command_type,
        state.spun_down,
        state.reads,
        state.writes,
        humantime::format_duration(state.idle_time),
        humantime::format_duration(Duration::from_secs(state.idle_duration(now).as_secs())),
        state.spin_down_at.map(format_time).unwrap_or_default(),
        format_time(state.spin_up_at),
        format_time(state.last_io_at)
    );
}
