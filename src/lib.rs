//! screen-relay — watches a desktop window region, OCRs it, and relays
//! newly-observed text to a webhook.
//!
//! Two processes cooperate through the filesystem and nothing else:
//! - The **worker** (`worker`) runs the capture → preprocess → OCR →
//!   change-detect → publish pipeline on a fixed interval and maintains its
//!   PID, heartbeat, and latest-text artifacts.
//! - The **supervisor** (`supervisor`) spawns/stops the worker and infers
//!   liveness from heartbeat staleness via the same artifact store
//!   (`protocol`).

pub mod capture;
pub mod config;
pub mod error;
pub mod ocr;
pub mod protocol;
pub mod publish;
pub mod supervisor;
pub mod worker;

pub use config::Config;
pub use error::RelayError;
