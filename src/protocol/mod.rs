//! File-based inter-process protocol.
//!
//! The worker and supervisor never share memory; they coordinate through
//! four filesystem artifacts. The worker is the sole writer of the PID
//! marker, heartbeat, and latest-text snapshot; the supervisor is the sole
//! writer of the stop signal. Every write is a full overwrite — there is at
//! most one heartbeat and one snapshot at any time.

use crate::config::Config;
use crate::error::RelayError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    /// Worker process id, advisory only.
    Pid,
    /// Existence-only shutdown request; content is irrelevant.
    StopSignal,
    /// `running|<unix-seconds>` liveness record.
    Heartbeat,
    /// Latest recognized text, truncated.
    LastText,
}

impl ArtifactKey {
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKey::Pid => "pid",
            ArtifactKey::StopSignal => "stop-signal",
            ArtifactKey::Heartbeat => "heartbeat",
            ArtifactKey::LastText => "last-text",
        }
    }
}

/// Durable shared medium behind the worker/supervisor protocol. The
/// filesystem is the production implementation; the logic on both sides
/// only ever goes through this interface.
pub trait ArtifactStore {
    fn write(&self, key: ArtifactKey, value: &str) -> Result<(), RelayError>;
    fn read(&self, key: ArtifactKey) -> Option<String>;
    fn exists(&self, key: ArtifactKey) -> bool;
    fn remove(&self, key: ArtifactKey) -> Result<(), RelayError>;
}

pub struct FsArtifactStore {
    pid: PathBuf,
    stop: PathBuf,
    heartbeat: PathBuf,
    last_text: PathBuf,
}

impl FsArtifactStore {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            pid: cfg.pid_file.clone(),
            stop: cfg.stop_file.clone(),
            heartbeat: cfg.status_file.clone(),
            last_text: cfg.last_text_file.clone(),
        }
    }

    fn path(&self, key: ArtifactKey) -> &Path {
        match key {
            ArtifactKey::Pid => &self.pid,
            ArtifactKey::StopSignal => &self.stop,
            ArtifactKey::Heartbeat => &self.heartbeat,
            ArtifactKey::LastText => &self.last_text,
        }
    }
}

impl ArtifactStore for FsArtifactStore {
    fn write(&self, key: ArtifactKey, value: &str) -> Result<(), RelayError> {
        std::fs::write(self.path(key), value).map_err(|source| RelayError::ArtifactWriteFailed {
            key: key.name(),
            source,
        })
    }

    fn read(&self, key: ArtifactKey) -> Option<String> {
        std::fs::read_to_string(self.path(key)).ok()
    }

    fn exists(&self, key: ArtifactKey) -> bool {
        self.path(key).exists()
    }

    fn remove(&self, key: ArtifactKey) -> Result<(), RelayError> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(RelayError::ArtifactWriteFailed {
                key: key.name(),
                source,
            }),
        }
    }
}

/// Encode the liveness record the supervisor parses.
pub fn heartbeat_record(unix_secs: i64) -> String {
    format!("running|{}", unix_secs)
}

/// Parse a liveness record, returning its timestamp. Anything that is not
/// a well-formed `running|<ts>` line reads as "no heartbeat".
pub fn parse_heartbeat(record: &str) -> Option<i64> {
    let line = record.lines().next()?.trim();
    let (state, ts) = line.split_once('|')?;
    if state.trim() != "running" {
        return None;
    }
    ts.trim().parse().ok()
}

/// Head-truncate to at most `max` characters, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
