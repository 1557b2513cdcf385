use anyhow::{Context, Result};
use clap::CommandFactory;
use hd_idle::cli::{self, Cli};
use hd_idle::{
    canonical_device_name, is_interrupted, DiskController, DiskStatsSource, EventLog, IdleEngine,
    SgioController,
};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"))
    }
}

fn main() -> Result<()> {
    if std::env::var("START_HD_IDLE").as_deref() == Ok("false") {
        println!("START_HD_IDLE=false exiting now.");
        return Ok(());
    }

    let matches = Cli::command().get_matches();
    init_tracing(matches.get_flag("debug"));

    let invocation = cli::invocation_from_matches(&matches)?;
    let controller = SgioController::default();

    if let Some(disk) = invocation.test_disk {
        let defaults = &invocation.config.defaults;
        let name = canonical_device_name(&disk)?;
        controller
            .spin_down(&name, defaults.command_type, defaults.power_condition, &mut None)
            .with_context(|| format!("Unable to spin down {}", disk))?;
        tracing::info!(disk = %name, "Disk spun down");
        return Ok(());
    }

    if !is_root() {
        eprintln!("Error: hd-idle requires root privileges to send commands to disks.");
        eprintln!("Please run with sudo or as root user.");
        std::process::exit(1);
    }

    setup_signal_handlers()?;

    let config = invocation.config;
    tracing::info!("{}", config);

    let interval = config.poll_interval();
    let event_log = config.defaults.log_file.as_ref().map(EventLog::new);
    let source = DiskStatsSource::new();
    let mut engine = IdleEngine::new(config, controller);

    tracing::info!(
        interval = %humantime::format_duration(interval),
        "hd-idle started"
    );

    while !is_interrupted() {
        match engine.run_cycle(&source, SystemTime::now()) {
            Ok(events) => {
                if let Some(log) = &event_log {
                    log.record_all(&events);
                }
            }
            Err(e) => tracing::error!("{}", e),
        }
        sleep_interruptible(interval);
    }

    tracing::info!("hd-idle stopped");
    Ok(())
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Sleep in one-second slices so a signal stops the loop promptly
fn sleep_interruptible(total: Duration) {
    let slice = Duration::from_secs(1);
    let mut remaining = total;
    while !remaining.is_zero() && !is_interrupted() {
        let step = remaining.min(slice);
        thread::sleep(step);
        remaining -= step;
    }
}

fn setup_signal_handlers() -> Result<()> {
    use signal_hook::{
        consts::{SIGINT, SIGTERM},
        iterator::Signals,
    };

    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    thread::spawn(move || {
        for sig in signals.forever() {
            if sig == SIGINT || sig == SIGTERM {
                tracing::info!(signal = sig, "Signal received, stopping");
                hd_idle::set_interrupted();
            }
        }
    });

    Ok(())
}
