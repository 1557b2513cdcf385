/// Plain-text event log (`-l <file>`)
///
/// Only spin-ups, suspend resets and symlink resolutions are recorded, one
/// line each, appended to a file created with mode 0600.
use crate::engine::IdleEvent;
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the line for `event`, if it has one
    pub fn record(&self, event: &IdleEvent) -> io::Result<()> {
        match format_event(event) {
            Some(line) => self.append(&line),
            None => Ok(()),
        }
    }

    /// Record every event, reporting write failures without stopping
    pub fn record_all(&self, events: &[IdleEvent]) {
        for event in events {
            if let Err(e) = self.record(event) {
                tracing::error!(file = %self.path.display(), "Cannot write into event log: {}", e);
            }
        }
    }

    fn append(&self, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o600)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        file.sync_data()
    }
}

fn date_and_time(t: SystemTime) -> (String, String) {
    let local = DateTime::<Local>::from(t);
    (
        local.format("%Y-%m-%d").to_string(),
        local.format("%H:%M:%S").to_string(),
    )
}

/// Text line for an event; spin-downs and command failures go to tracing only
pub fn format_event(event: &IdleEvent) -> Option<String> {
    match event {
        IdleEvent::SpinUp {
            display_name,
            running,
            stopped,
            at,
            ..
        } => {
            let (date, time) = date_and_time(*at);
            Some(format!(
                "date: {}, time: {}, disk: {}, running: {}, stopped: {}",
                date,
                time,
                display_name,
                running.as_secs(),
                stopped.as_secs()
            ))
        }
        IdleEvent::SkewReset { disk, at } => {
            let (date, time) = date_and_time(*at);
            Some(format!(
                "date: {}, time: {}, disk: {}, assuming disk spun up after long sleep",
                date, time, disk
            ))
        }
        IdleEvent::SymlinkResolved { given_name, name } => {
            Some(format!("symlink {} resolved to {}", given_name, name))
        }
        IdleEvent::SpinDown { .. } | IdleEvent::CommandFailed { .. } => None,
    }
}
