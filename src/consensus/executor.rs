use std::sync::{Arc, Mutex};

use tracing::info;

use super::peers::ReplicaId;

/// Applies committed commands. What a command means is up to the application.
pub trait CommandExecutor: Send {
    fn execute(&mut self, command: &str);
}

/// Logs each executed command and appends it to a log shared with every
/// clone, so a harness can read what a replica applied.
#[derive(Clone)]
pub struct CommandLog {
    id: ReplicaId,
    log: Arc<Mutex<Vec<String>>>,
}

impl CommandLog {
    pub fn new(id: ReplicaId) -> Self {
        CommandLog {
            id,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        match self.log.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl CommandExecutor for CommandLog {
    fn execute(&mut self, command: &str) {
        info!(replica = self.id, command, "executing command");
        match self.log.lock() {
            Ok(mut log) => log.push(command.to_string()),
            Err(poisoned) => poisoned.into_inner().push(command.to_string()),
        }
    }
}
