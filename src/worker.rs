//! The capture worker — fixed-interval loop and its state machine.
//!
//! Single-threaded by design: one cycle runs capture → crop → preprocess →
//! OCR → change-detect → publish as sequential blocking calls, then writes
//! its heartbeat and latest-text artifacts, then sleeps. The stop signal is
//! checked exactly once per cycle, at the top, so shutdown latency is
//! bounded by one pipeline execution plus one poll interval.

use crate::capture::{self, FrameSource, PreprocessOptions, ScreenSource};
use crate::config::Config;
use crate::error::RelayError;
use crate::ocr::{self, TesseractEngine, TextRecognizer};
use crate::protocol::{heartbeat_record, truncate_chars, ArtifactKey, ArtifactStore};
use crate::publish::{self, Publisher, WebhookSender};
use chrono::{Local, Utc};
use image::DynamicImage;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Starting,
    Running,
    StopRequested,
    Terminated,
}

/// Rolling per-process state threaded through the loop. Never global, so a
/// single cycle can be exercised in isolation.
#[derive(Debug, Default)]
pub struct WorkerState {
    /// Text of the most recent successful publish; the change-detection
    /// baseline.
    pub last_published: String,
    /// Most recent recognition, whether or not it was published. Feeds the
    /// latest-text artifact.
    pub last_recognized: String,
    pub cycles: u64,
}

#[derive(Debug)]
pub struct CycleOutcome {
    pub recognized: String,
    pub published: bool,
}

/// Run one full pipeline pass. Errors out of any stage surface here and are
/// handled at the cycle boundary by the caller.
pub fn run_cycle(
    cfg: &Config,
    source: &mut dyn FrameSource,
    engine: &dyn TextRecognizer,
    sender: &dyn Publisher,
    state: &mut WorkerState,
) -> Result<CycleOutcome, RelayError> {
    let frame = source.grab()?;

    let cropped = match cfg.crop_rect {
        Some(rect) => capture::crop_frame(&frame, rect)?,
        None => frame.clone(),
    };

    if cfg.save_screenshot || cfg.single_shot {
        save_screenshots(cfg, &frame, &cropped)?;
    }

    let ocr_input = if cfg.preprocess {
        capture::prepare_for_ocr(&cropped, &PreprocessOptions::from_config(cfg))
    } else {
        cropped
    };

    let raw = engine.recognize(&ocr_input)?;
    let text = ocr::normalize_text(&raw, cfg.keep_newlines);
    state.last_recognized = text.clone();
    state.cycles += 1;

    // Blank recognitions never publish; unchanged text only publishes when
    // change suppression is off.
    let should_publish =
        !text.is_empty() && (!cfg.only_on_change || text != state.last_published);

    if should_publish {
        sender.publish(&publish::format_message(&text, cfg.add_timestamp))?;
        state.last_published = text.clone();
        log::info!("[WORKER] Published {} chars", text.chars().count());
    }

    Ok(CycleOutcome {
        recognized: text,
        published: should_publish,
    })
}

/// Write the full frame and the cropped frame to the screenshot directory,
/// named by capture timestamp.
fn save_screenshots(
    cfg: &Config,
    full: &DynamicImage,
    cropped: &DynamicImage,
) -> Result<(), RelayError> {
    std::fs::create_dir_all(&cfg.screenshot_dir).map_err(|source| {
        RelayError::ArtifactWriteFailed {
            key: "screenshot-dir",
            source,
        }
    })?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let full_path = cfg.screenshot_dir.join(format!("full_{}.png", ts));
    let crop_path = cfg.screenshot_dir.join(format!("crop_{}.png", ts));

    for (path, img) in [(&full_path, full), (&crop_path, cropped)] {
        img.save(path).map_err(|e| RelayError::ArtifactWriteFailed {
            key: "screenshot",
            source: std::io::Error::other(e.to_string()),
        })?;
    }

    log::info!(
        "[WORKER] Saved screenshots: {} / {}",
        full_path.display(),
        crop_path.display()
    );
    Ok(())
}

/// Worker entry point: resolve the real pipeline collaborators, then run
/// the loop. Failure to resolve the OCR engine here is fatal — no cycle
/// could ever succeed without it.
pub fn run(cfg: &Config, store: &dyn ArtifactStore) -> Result<(), RelayError> {
    let engine = TesseractEngine::resolve(cfg.tesseract_cmd.as_deref(), &cfg.ocr_lang)?;

    let url = cfg
        .webhook_url
        .as_deref()
        .ok_or_else(|| RelayError::Config("WEBHOOK_URL is not set".to_string()))?;
    let sender = WebhookSender::new(url)?;

    let mut source = ScreenSource::from_config(cfg);
    run_loop(cfg, store, &mut source, &engine, &sender)
}

/// The state machine proper, generic over the pipeline seams so tests can
/// drive it without a screen, an OCR binary, or a network.
pub fn run_loop(
    cfg: &Config,
    store: &dyn ArtifactStore,
    source: &mut dyn FrameSource,
    engine: &dyn TextRecognizer,
    sender: &dyn Publisher,
) -> Result<(), RelayError> {
    let mut phase = WorkerPhase::Starting;
    let mut state = WorkerState::default();

    // Advisory only; a failed write costs observability, not correctness.
    if let Err(e) = store.write(ArtifactKey::Pid, &std::process::id().to_string()) {
        log::warn!("[WORKER] {}", e);
    }
    phase = advance(phase, WorkerPhase::Running);

    while phase == WorkerPhase::Running {
        // The single stop check per cycle.
        if store.exists(ArtifactKey::StopSignal) {
            phase = advance(phase, WorkerPhase::StopRequested);
            break;
        }

        match run_cycle(cfg, source, engine, sender, &mut state) {
            Ok(outcome) => {
                log::debug!(
                    "[WORKER] Cycle {}: {} chars, published={}",
                    state.cycles,
                    outcome.recognized.chars().count(),
                    outcome.published
                );
            }
            // Per-cycle errors never terminate the loop; the next cycle
            // gets a fresh attempt.
            Err(e) => log::warn!("[WORKER] Cycle failed: {}", e),
        }

        // Heartbeat and latest-text snapshot go out every cycle, publish or
        // not. A write failure here only costs observability.
        if let Err(e) = store.write(ArtifactKey::Heartbeat, &heartbeat_record(Utc::now().timestamp()))
        {
            log::warn!("[WORKER] {}", e);
        }
        if let Err(e) = store.write(
            ArtifactKey::LastText,
            truncate_chars(&state.last_recognized, cfg.last_text_max_chars),
        ) {
            log::warn!("[WORKER] {}", e);
        }

        // Single-shot exits straight to Terminated, skipping the sleep.
        if cfg.single_shot {
            log::info!("[WORKER] Single-shot cycle complete");
            break;
        }

        std::thread::sleep(Duration::from_secs_f64(cfg.poll_sec.max(0.0)));
    }

    // Cleanup: drop the PID marker and consume the stop signal so the next
    // run starts clean.
    if let Err(e) = store.remove(ArtifactKey::Pid) {
        log::warn!("[WORKER] {}", e);
    }
    if let Err(e) = store.remove(ArtifactKey::StopSignal) {
        log::warn!("[WORKER] {}", e);
    }

    advance(phase, WorkerPhase::Terminated);
    Ok(())
}

fn advance(from: WorkerPhase, to: WorkerPhase) -> WorkerPhase {
    log::info!("[WORKER] {:?} -> {:?}", from, to);
    to
}
