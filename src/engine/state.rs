/// Per-disk state tracked between cycles
use crate::config::{CommandType, Config};
use crate::drives::CommandDialect;
use crate::stats::ConsolidatedStats;
use std::time::{Duration, SystemTime};

/// Elapsed time from `earlier` to `later`, zero if the clock went backwards
pub fn elapsed(earlier: SystemTime, later: SystemTime) -> Duration {
    later.duration_since(earlier).unwrap_or(Duration::ZERO)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub name: String,
    /// Zero disables spin-down
    pub idle_time: Duration,
    pub command_type: CommandType,
    pub power_condition: u8,
    /// Detected on the first ATA spin-down, then reused
    pub dialect: Option<CommandDialect>,
    pub reads: u64,
    pub writes: u64,
    pub last_io_at: SystemTime,
    pub spin_down_at: Option<SystemTime>,
    pub spin_up_at: SystemTime,
    pub spun_down: bool,
}

impl DeviceState {
    /// State for a disk seen for the first time, configured from its
    /// `-a` section or from the defaults
    pub fn new(stats: &ConsolidatedStats, config: &Config, now: SystemTime) -> Self {
        let (idle_time, command_type, power_condition) = match config.device(&stats.name) {
            Some(dev) => (dev.idle, dev.command_type, dev.power_condition),
            None => (
                config.defaults.idle,
                config.defaults.command_type,
                config.defaults.power_condition,
            ),
        };

        Self {
            name: stats.name.clone(),
            idle_time,
            command_type,
            power_condition,
            dialect: None,
            reads: stats.reads,
            writes: stats.writes,
            last_io_at: now,
            spin_down_at: None,
            spin_up_at: now,
            spun_down: false,
        }
    }

    /// Any difference from the stored counters counts as I/O, including a
    /// decrease after a counter reset.
    pub fn has_activity(&self, stats: &ConsolidatedStats) -> bool {
        self.reads != stats.reads || self.writes != stats.writes
    }

    pub fn idle_duration(&self, now: SystemTime) -> Duration {
        elapsed(self.last_io_at, now)
    }

    /// Running, spin-down enabled, and idle longer than the threshold
    pub fn should_spin_down(&self, now: SystemTime) -> bool {
        !self.spun_down && !self.idle_time.is_zero() && self.idle_duration(now) > self.idle_time
    }

    /// How long the disk ran before the last spin-down
    pub fn running_time(&self) -> Duration {
        self.spin_down_at
            .map(|down| elapsed(self.spin_up_at, down))
            .unwrap_or(Duration::ZERO)
    }

    /// How long the disk has been stopped as of `now`
    pub fn stopped_time(&self, now: SystemTime) -> Duration {
        self.spin_down_at
            .map(|down| elapsed(down, now))
            .unwrap_or(Duration::ZERO)
    }

    /// Forget any spin-down: the host was suspended and firmware has
    /// powered the disk back up.
    pub fn reset_after_sleep(&mut self, now: SystemTime) {
        self.spin_up_at = now;
        self.last_io_at = now;
        self.spun_down = false;
    }
}

/// Something the engine did, reported to the caller
#[derive(Debug, Clone, PartialEq)]
pub enum IdleEvent {
    SpinDown {
        disk: String,
        display_name: String,
        at: SystemTime,
    },
    SpinUp {
        disk: String,
        display_name: String,
        running: Duration,
        stopped: Duration,
        at: SystemTime,
    },
    SkewReset {
        disk: String,
        at: SystemTime,
    },
    CommandFailed {
        disk: String,
        error: String,
    },
    SymlinkResolved {
        given_name: String,
        name: String,
    },
}
