//! Supervisor side of the filesystem protocol.
//!
//! Spawns and stops the worker without ever touching its memory: start is a
//! subprocess spawn, stop is the creation of the stop-signal artifact, and
//! liveness is inferred purely from heartbeat staleness.

use crate::config::Config;
use crate::error::RelayError;
use crate::protocol::{parse_heartbeat, ArtifactKey, ArtifactStore};
use std::process::{Command, Stdio};

/// A heartbeat older than this many intervals means the worker is stalled
/// or dead, whatever the underlying cause.
pub const STALL_MULTIPLIER: f64 = 3.0;

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("A worker is already running (live heartbeat)")]
    AlreadyRunning,

    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error(transparent)]
    Artifact(#[from] RelayError),
}

#[derive(Debug)]
pub struct StatusReport {
    pub running: bool,
    /// Seconds since the last heartbeat, when one exists.
    pub heartbeat_age_secs: Option<i64>,
    pub pid: Option<u32>,
    pub last_text: Option<String>,
}

/// Spawn a detached `watch` worker. Clears any leftover stop signal first
/// so the new worker does not immediately shut itself down.
pub fn start(cfg: &Config, store: &dyn ArtifactStore) -> Result<u32, SupervisorError> {
    if is_running(cfg.heartbeat_sec, store) {
        return Err(SupervisorError::AlreadyRunning);
    }

    store.remove(ArtifactKey::StopSignal)?;

    let exe = std::env::current_exe()?;
    let child = Command::new(exe)
        .arg("watch")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let pid = child.id();
    log::info!("[SUPERVISOR] Started worker, pid {}", pid);
    Ok(pid)
}

/// Request a graceful shutdown by creating the stop signal. The worker
/// honors it at the top of its next cycle.
pub fn stop(store: &dyn ArtifactStore) -> Result<(), RelayError> {
    store.write(ArtifactKey::StopSignal, "stop\n")?;
    log::info!("[SUPERVISOR] Stop requested");
    Ok(())
}

/// Liveness policy: the worker is running iff its heartbeat is younger than
/// `STALL_MULTIPLIER` heartbeat intervals. An OS-level process query is
/// deliberately never consulted.
pub fn is_running(heartbeat_sec: f64, store: &dyn ArtifactStore) -> bool {
    heartbeat_age(store)
        .map(|age| (age as f64) <= heartbeat_sec * STALL_MULTIPLIER)
        .unwrap_or(false)
}

fn heartbeat_age(store: &dyn ArtifactStore) -> Option<i64> {
    let record = store.read(ArtifactKey::Heartbeat)?;
    let ts = parse_heartbeat(&record)?;
    Some(chrono::Utc::now().timestamp().saturating_sub(ts))
}

pub fn status(cfg: &Config, store: &dyn ArtifactStore) -> StatusReport {
    let age = heartbeat_age(store);
    StatusReport {
        running: age
            .map(|a| (a as f64) <= cfg.heartbeat_sec * STALL_MULTIPLIER)
            .unwrap_or(false),
        heartbeat_age_secs: age,
        pid: store
            .read(ArtifactKey::Pid)
            .and_then(|s| s.trim().parse().ok()),
        last_text: store.read(ArtifactKey::LastText),
    }
}
