/// End-to-end idle cycles over a fake diskstats file
///
/// Drives `IdleEngine::run_cycle` the way the daemon loop does, with a
/// recording controller in place of SG_IO.
#[path = "common/mod.rs"]
mod common;

use common::fake_diskstats::FakeDiskStats;
use common::mock_controller::MockController;
use hd_idle::stats::NoHolders;
use hd_idle::{
    CommandType, Config, DefaultConfig, DeviceConfig, DiskStatsSource, EventLog, IdleEngine,
    IdleEvent,
};
use std::collections::HashMap;
use std::fs;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
}

fn device(name: &str, idle_secs: u64, command: CommandType) -> DeviceConfig {
    DeviceConfig {
        name: Some(name.to_string()),
        given_name: name.to_string(),
        idle: Duration::from_secs(idle_secs),
        command_type: command,
        power_condition: 0,
    }
}

/// Default idle disabled, sda spins down after 60s of inactivity
fn sda_only() -> Config {
    let defaults = DefaultConfig {
        idle: Duration::ZERO,
        ..Default::default()
    };
    Config::new(defaults, vec![device("sda", 60, CommandType::Ata)])
}

#[test]
fn test_idle_disk_spins_down_and_wakes_up() {
    let stats = FakeDiskStats::new().unwrap();
    stats.write(&[("sda", 1000, 500), ("sda1", 900, 400)]).unwrap();
    let source = DiskStatsSource::with_paths(stats.path(), NoHolders);

    let controller = MockController::new();
    let config = sda_only();
    assert_eq!(config.poll_interval(), Duration::from_secs(6));
    let mut engine = IdleEngine::new(config, controller.clone());

    let dir = TempDir::new().unwrap();
    let log = EventLog::new(dir.path().join("hd-idle.log"));

    // Quiet for 66s, polled every 6s
    for t in (0..=66).step_by(6) {
        let events = engine.run_cycle(&source, at(t)).unwrap();
        log.record_all(&events);
    }

    let sent = controller.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].disk, "sda");
    assert_eq!(sent[0].command, CommandType::Ata);
    assert!(engine.device("sda").unwrap().spun_down);

    // Already down: no repeated command
    engine.run_cycle(&source, at(72)).unwrap();
    assert_eq!(controller.sent_to("sda"), 1);

    // Reads resume
    stats.write(&[("sda", 1200, 500), ("sda1", 1100, 400)]).unwrap();
    let events = engine.run_cycle(&source, at(78)).unwrap();
    log.record_all(&events);

    let spin_up = events
        .iter()
        .find_map(|e| match e {
            IdleEvent::SpinUp { running, stopped, .. } => Some((*running, *stopped)),
            _ => None,
        })
        .expect("spin-up event");
    assert_eq!(spin_up, (Duration::from_secs(66), Duration::from_secs(12)));
    assert!(!engine.device("sda").unwrap().spun_down);

    let content = fs::read_to_string(log.path()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("disk: sda, running: 66, stopped: 12"));
}

#[test]
fn test_disabled_disks_are_tracked_but_never_stopped() {
    let stats = FakeDiskStats::new().unwrap();
    stats.write(&[("sda", 10, 10), ("sdb", 20, 20)]).unwrap();
    let source = DiskStatsSource::with_paths(stats.path(), NoHolders);

    let controller = MockController::new();
    let mut engine = IdleEngine::new(sda_only(), controller.clone());

    for t in (0..=120).step_by(6) {
        engine.run_cycle(&source, at(t)).unwrap();
    }

    assert!(engine.device("sdb").is_some());
    assert!(!engine.device("sdb").unwrap().spun_down);
    assert_eq!(controller.sent_to("sdb"), 0);
    assert_eq!(controller.sent_to("sda"), 1);
}

#[test]
fn test_failed_spin_down_is_retried_next_cycle() {
    let stats = FakeDiskStats::new().unwrap();
    stats.write(&[("sda", 10, 10)]).unwrap();
    let source = DiskStatsSource::with_paths(stats.path(), NoHolders);

    let controller = MockController::new();
    controller.fail("sda");
    let mut engine = IdleEngine::new(sda_only(), controller.clone());

    for t in (0..=66).step_by(6) {
        engine.run_cycle(&source, at(t)).unwrap();
    }
    assert_eq!(controller.sent_to("sda"), 1);
    assert!(!engine.device("sda").unwrap().spun_down);

    controller.recover("sda");
    let events = engine.run_cycle(&source, at(72)).unwrap();
    assert_eq!(controller.sent_to("sda"), 2);
    assert!(events.iter().any(|e| matches!(e, IdleEvent::SpinDown { .. })));
    assert!(engine.device("sda").unwrap().spun_down);
}

#[test]
fn test_long_gap_resets_spun_down_disks() {
    let stats = FakeDiskStats::new().unwrap();
    stats.write(&[("sda", 10, 10)]).unwrap();
    let source = DiskStatsSource::with_paths(stats.path(), NoHolders);

    let controller = MockController::new();
    let mut engine = IdleEngine::new(sda_only(), controller.clone());

    for t in (0..=66).step_by(6) {
        engine.run_cycle(&source, at(t)).unwrap();
    }
    assert!(engine.device("sda").unwrap().spun_down);

    // Host suspended for an hour
    let events = engine.run_cycle(&source, at(3666)).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, IdleEvent::SkewReset { disk, .. } if disk == "sda")));
    assert!(!engine.device("sda").unwrap().spun_down);

    // Idle countdown restarts from the resume
    for t in (3672..=3726).step_by(6) {
        engine.run_cycle(&source, at(t)).unwrap();
    }
    assert_eq!(controller.sent_to("sda"), 1);
    engine.run_cycle(&source, at(3732)).unwrap();
    assert_eq!(controller.sent_to("sda"), 2);
}

#[test]
fn test_device_mapper_holder_drives_its_disk() {
    let stats = FakeDiskStats::new().unwrap();
    stats
        .write(&[("sda", 100, 100), ("sda1", 100, 100), ("dm-0", 500, 500)])
        .unwrap();
    let holders: HashMap<String, String> =
        HashMap::from([("sda".to_string(), "dm-0".to_string())]);
    let source = DiskStatsSource::with_paths(stats.path(), holders);

    let controller = MockController::new();
    let mut engine = IdleEngine::new(sda_only(), controller.clone());

    engine.run_cycle(&source, at(0)).unwrap();
    let sda = engine.device("sda").unwrap();
    assert_eq!((sda.reads, sda.writes), (500, 500));
    assert!(engine.device("dm-0").is_none());

    // Only the holder moves: still activity on sda
    stats
        .write(&[("sda", 100, 100), ("sda1", 100, 100), ("dm-0", 600, 500)])
        .unwrap();
    engine.run_cycle(&source, at(6)).unwrap();
    assert_eq!(engine.device("sda").unwrap().reads, 600);
}

#[test]
fn test_missing_diskstats_is_an_error() {
    let dir = TempDir::new().unwrap();
    let source = DiskStatsSource::with_paths(dir.path().join("absent"), NoHolders);
    let mut engine = IdleEngine::new(sda_only(), MockController::new());

    assert!(engine.run_cycle(&source, at(0)).is_err());
}
