/// Disk controller that records commands instead of sending them

use hd_idle::{CommandDialect, CommandType, DiskController, IdleError, IdleResult};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct SentCommand {
    pub disk: String,
    pub command: CommandType,
    pub power_condition: u8,
}

#[derive(Clone, Default)]
pub struct MockController {
    sent: Arc<Mutex<Vec<SentCommand>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MockController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every command to `disk` fail until `recover` is called
    #[allow(dead_code)]
    pub fn fail(&self, disk: &str) {
        self.failing.lock().unwrap().insert(disk.to_string());
    }

    #[allow(dead_code)]
    pub fn recover(&self, disk: &str) {
        self.failing.lock().unwrap().remove(disk);
    }

    pub fn sent(&self) -> Vec<SentCommand> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, disk: &str) -> usize {
        self.sent().iter().filter(|c| c.disk == disk).count()
    }
}

impl DiskController for MockController {
    fn spin_down(
        &self,
        disk: &str,
        command: CommandType,
        power_condition: u8,
        dialect: &mut Option<CommandDialect>,
    ) -> IdleResult<()> {
        self.sent.lock().unwrap().push(SentCommand {
            disk: disk.to_string(),
            command,
            power_condition,
        });

        if self.failing.lock().unwrap().contains(disk) {
            return Err(IdleError::CommandFailed {
                device: format!("/dev/{}", disk),
                details: "medium not present".to_string(),
            });
        }

        dialect.get_or_insert(CommandDialect::Standard);
        Ok(())
    }
}
