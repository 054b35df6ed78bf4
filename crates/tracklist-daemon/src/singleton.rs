//! Startup check that leaves this process as the only running instance.
//!
//! Siblings get SIGINT so they run their own shutdown path. Best effort:
//! failures are logged and startup always continues.

use sysinfo::{Pid, Signal, System};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("process discovery failed: {0}")]
    Discovery(String),

    #[error("could not signal pid {pid}: {reason}")]
    Signal { pid: u32, reason: String },
}

/// The two OS operations the guard needs.
pub trait ProcessTable {
    fn find_by_name(&mut self, name: &str) -> Result<Vec<u32>, GuardError>;
    fn terminate(&mut self, pid: u32) -> Result<(), GuardError>;
}

/// Process table backed by `sysinfo`.
pub struct SystemProcessTable {
    system: System,
}

impl SystemProcessTable {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemProcessTable {
    fn find_by_name(&mut self, name: &str) -> Result<Vec<u32>, GuardError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(GuardError::Discovery(
                "process listing not supported on this platform".to_string(),
            ));
        }
        self.system.refresh_processes();
        Ok(self
            .system
            .processes_by_exact_name(name)
            .map(|p| p.pid().as_u32())
            .collect())
    }

    fn terminate(&mut self, pid: u32) -> Result<(), GuardError> {
        let process = self
            .system
            .process(Pid::from_u32(pid))
            .ok_or_else(|| GuardError::Signal {
                pid,
                reason: "no longer running".to_string(),
            })?;

        match process.kill_with(Signal::Interrupt) {
            Some(true) => Ok(()),
            Some(false) => Err(GuardError::Signal {
                pid,
                reason: "signal was not delivered".to_string(),
            }),
            None => Err(GuardError::Signal {
                pid,
                reason: "SIGINT unsupported on this platform".to_string(),
            }),
        }
    }
}

/// Signal every process called `name` except `own_pid`. Returns how many
/// siblings were signalled.
pub fn enforce_singleton(table: &mut dyn ProcessTable, name: &str, own_pid: u32) -> usize {
    let pids = match table.find_by_name(name) {
        Ok(pids) => pids,
        Err(e) => {
            warn!("[guard] {}; assuming no other instance", e);
            return 0;
        }
    };

    if pids.len() <= 1 {
        return 0;
    }

    let mut killed = 0;
    for pid in pids.into_iter().filter(|&p| p != own_pid) {
        info!("Other instance found ({}), killing...", pid);
        match table.terminate(pid) {
            Ok(()) => killed += 1,
            Err(e) => warn!("[guard] {}", e),
        }
    }
    killed
}
