//! Worker loop integration tests.
//!
//! The loop is driven end-to-end through its seams: canned frames instead
//! of a screen, scripted recognizers instead of Tesseract, a counting
//! publisher instead of the webhook, and a tempdir-backed artifact store.

use image::{DynamicImage, RgbaImage};
use screen_relay::capture::FrameSource;
use screen_relay::config::Config;
use screen_relay::error::RelayError;
use screen_relay::ocr::TextRecognizer;
use screen_relay::protocol::{ArtifactKey, ArtifactStore, FsArtifactStore};
use screen_relay::publish::Publisher;
use screen_relay::worker::{run_cycle, run_loop, WorkerState};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn test_config(dir: &Path) -> Config {
    Config {
        webhook_url: Some("http://localhost/hook".into()),
        window_title: "test".into(),
        screen_rect: None,
        crop_rect: None,
        poll_sec: 0.0,
        ocr_lang: "eng".into(),
        preprocess: false,
        threshold: 160,
        upscale: 1.0,
        denoise_kernel: 0,
        sharpen: false,
        invert: false,
        keep_newlines: false,
        add_timestamp: false,
        only_on_change: true,
        stop_file: dir.join("STOP"),
        pid_file: dir.join("ocr.pid"),
        status_file: dir.join("ocr.status"),
        heartbeat_sec: 5.0,
        last_text_file: dir.join("ocr.last"),
        last_text_max_chars: 2000,
        tesseract_cmd: None,
        save_screenshot: false,
        single_shot: false,
        screenshot_dir: dir.join("screenshots"),
    }
}

/// Frame source that always returns the same blank frame.
struct FlatFrames;

impl FrameSource for FlatFrames {
    fn grab(&mut self) -> Result<DynamicImage, RelayError> {
        Ok(DynamicImage::ImageRgba8(RgbaImage::new(40, 30)))
    }
}

/// Frame source that fails a set number of times before recovering.
struct FlakyFrames {
    failures_left: u32,
}

impl FrameSource for FlakyFrames {
    fn grab(&mut self) -> Result<DynamicImage, RelayError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(RelayError::WindowNotFound("test".into()));
        }
        Ok(DynamicImage::ImageRgba8(RgbaImage::new(40, 30)))
    }
}

/// Returns scripted texts in order; once exhausted, creates the stop signal
/// so the loop shuts down on its next cycle, and returns blanks meanwhile.
struct ScriptedRecognizer {
    texts: RefCell<VecDeque<String>>,
    stop_path: PathBuf,
}

impl ScriptedRecognizer {
    fn new(texts: &[&str], stop_path: PathBuf) -> Self {
        Self {
            texts: RefCell::new(texts.iter().map(|s| s.to_string()).collect()),
            stop_path,
        }
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, RelayError> {
        match self.texts.borrow_mut().pop_front() {
            Some(text) => Ok(text),
            None => {
                std::fs::write(&self.stop_path, "stop\n").unwrap();
                Ok(String::new())
            }
        }
    }
}

#[derive(Default)]
struct CountingPublisher {
    sent: RefCell<Vec<String>>,
}

impl Publisher for CountingPublisher {
    fn publish(&self, text: &str) -> Result<(), RelayError> {
        self.sent.borrow_mut().push(text.to_string());
        Ok(())
    }
}

#[test]
fn identical_text_publishes_once_when_change_gated() {
    let dir = TempDir::new().unwrap();
    let cfg = test_config(dir.path());
    let recognizer = ScriptedRecognizer::new(&["Hello", "Hello", "Hello there"], cfg.stop_file.clone());
    let publisher = CountingPublisher::default();
    let mut source = FlatFrames;
    let mut state = WorkerState::default();

    for _ in 0..3 {
        run_cycle(&cfg, &mut source, &recognizer, &publisher, &mut state).unwrap();
    }

    // Cycle 1 and cycle 3 publish; cycle 2 is suppressed as unchanged.
    assert_eq!(*publisher.sent.borrow(), vec!["Hello", "Hello there"]);
}

#[test]
fn every_nonempty_cycle_publishes_when_change_gate_is_off() {
    let dir = TempDir::new().unwrap();
    let mut cfg = test_config(dir.path());
    cfg.only_on_change = false;
    let recognizer = ScriptedRecognizer::new(&["same", "same", "same"], cfg.stop_file.clone());
    let publisher = CountingPublisher::default();
    let mut source = FlatFrames;
    let mut state = WorkerState::default();

    for _ in 0..3 {
        run_cycle(&cfg, &mut source, &recognizer, &publisher, &mut state).unwrap();
    }

    assert_eq!(publisher.sent.borrow().len(), 3);
}

#[test]
fn blank_recognitions_never_publish() {
    let dir = TempDir::new().unwrap();
    let mut cfg = test_config(dir.path());
    cfg.only_on_change = false;
    let recognizer = ScriptedRecognizer::new(&["", "  \n\t ", ""], cfg.stop_file.clone());
    let publisher = CountingPublisher::default();
    let mut source = FlatFrames;
    let mut state = WorkerState::default();

    for _ in 0..3 {
        run_cycle(&cfg, &mut source, &recognizer, &publisher, &mut state).unwrap();
    }

    assert!(publisher.sent.borrow().is_empty());
}

#[test]
fn stop_signal_terminates_loop_and_cleans_up() {
    let dir = TempDir::new().unwrap();
    let cfg = test_config(dir.path());
    let store = FsArtifactStore::from_config(&cfg);

    // Stop signal already present: the first cycle's check must honor it.
    std::fs::write(&cfg.stop_file, "stop\n").unwrap();

    let recognizer = ScriptedRecognizer::new(&["never seen"], cfg.stop_file.clone());
    let publisher = CountingPublisher::default();
    let mut source = FlatFrames;

    run_loop(&cfg, &store, &mut source, &recognizer, &publisher).unwrap();

    assert!(publisher.sent.borrow().is_empty());
    assert!(!store.exists(ArtifactKey::Pid));
    assert!(!store.exists(ArtifactKey::StopSignal));
}

#[test]
fn loop_writes_heartbeat_and_last_text_each_cycle() {
    let dir = TempDir::new().unwrap();
    let cfg = test_config(dir.path());
    let store = FsArtifactStore::from_config(&cfg);
    let recognizer =
        ScriptedRecognizer::new(&["Hello", "Hello", "Hello there"], cfg.stop_file.clone());
    let publisher = CountingPublisher::default();
    let mut source = FlatFrames;

    run_loop(&cfg, &store, &mut source, &recognizer, &publisher).unwrap();

    assert_eq!(*publisher.sent.borrow(), vec!["Hello", "Hello there"]);
    let record = store.read(ArtifactKey::Heartbeat).unwrap();
    assert!(screen_relay::protocol::parse_heartbeat(&record).is_some());
    // The final scripted cycle recognized blank text, so the snapshot is
    // empty — but it exists and was overwritten every cycle.
    assert_eq!(store.read(ArtifactKey::LastText).as_deref(), Some(""));
}

#[test]
fn last_text_artifact_is_head_truncated() {
    let dir = TempDir::new().unwrap();
    let mut cfg = test_config(dir.path());
    cfg.last_text_max_chars = 10;
    cfg.single_shot = true;
    let store = FsArtifactStore::from_config(&cfg);
    let recognizer = ScriptedRecognizer::new(
        &["0123456789ABCDEF this tail is dropped"],
        cfg.stop_file.clone(),
    );
    let publisher = CountingPublisher::default();
    let mut source = FlatFrames;

    run_loop(&cfg, &store, &mut source, &recognizer, &publisher).unwrap();

    assert_eq!(store.read(ArtifactKey::LastText).as_deref(), Some("0123456789"));
}

#[test]
fn single_shot_runs_one_cycle_saves_screenshot_and_exits() {
    let dir = TempDir::new().unwrap();
    let mut cfg = test_config(dir.path());
    cfg.single_shot = true;
    // A long poll interval proves single-shot never reaches the sleep.
    cfg.poll_sec = 3600.0;
    let store = FsArtifactStore::from_config(&cfg);
    let recognizer = ScriptedRecognizer::new(&["one and done"], cfg.stop_file.clone());
    let publisher = CountingPublisher::default();
    let mut source = FlatFrames;

    let started = std::time::Instant::now();
    run_loop(&cfg, &store, &mut source, &recognizer, &publisher).unwrap();
    assert!(started.elapsed().as_secs() < 60);

    assert_eq!(publisher.sent.borrow().len(), 1);
    assert!(!store.exists(ArtifactKey::Pid));

    let shots: Vec<_> = std::fs::read_dir(&cfg.screenshot_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert!(shots.iter().any(|n| n.starts_with("full_")));
    assert!(shots.iter().any(|n| n.starts_with("crop_")));
}

#[test]
fn per_cycle_errors_do_not_terminate_the_loop() {
    let dir = TempDir::new().unwrap();
    let cfg = test_config(dir.path());
    let store = FsArtifactStore::from_config(&cfg);
    let recognizer = ScriptedRecognizer::new(&["recovered"], cfg.stop_file.clone());
    let publisher = CountingPublisher::default();
    let mut source = FlakyFrames { failures_left: 2 };

    run_loop(&cfg, &store, &mut source, &recognizer, &publisher).unwrap();

    // Two failed cycles were swallowed; the third recognized and published.
    assert_eq!(*publisher.sent.borrow(), vec!["recovered"]);
}

#[test]
fn crop_rect_is_applied_before_recognition() {
    let dir = TempDir::new().unwrap();
    let mut cfg = test_config(dir.path());
    cfg.crop_rect = Some(screen_relay::config::Rect {
        left: 5,
        top: 5,
        right: 25,
        bottom: 20,
    });

    /// Captures the dimensions of the image handed to the recognizer.
    struct SizeProbe {
        seen: RefCell<Option<(u32, u32)>>,
    }
    impl TextRecognizer for SizeProbe {
        fn recognize(&self, image: &DynamicImage) -> Result<String, RelayError> {
            *self.seen.borrow_mut() = Some((image.width(), image.height()));
            Ok(String::new())
        }
    }

    let probe = SizeProbe {
        seen: RefCell::new(None),
    };
    let publisher = CountingPublisher::default();
    let mut source = FlatFrames;
    let mut state = WorkerState::default();

    run_cycle(&cfg, &mut source, &probe, &publisher, &mut state).unwrap();
    assert_eq!(*probe.seen.borrow(), Some((20, 15)));
}

#[test]
fn invalid_crop_rect_fails_the_cycle() {
    let dir = TempDir::new().unwrap();
    let mut cfg = test_config(dir.path());
    cfg.crop_rect = Some(screen_relay::config::Rect {
        left: 0,
        top: 0,
        right: 500,
        bottom: 500,
    });
    let recognizer = ScriptedRecognizer::new(&["unreached"], cfg.stop_file.clone());
    let publisher = CountingPublisher::default();
    let mut source = FlatFrames;
    let mut state = WorkerState::default();

    let result = run_cycle(&cfg, &mut source, &recognizer, &publisher, &mut state);
    assert!(matches!(result, Err(RelayError::InvalidCropRect { .. })));
    assert!(publisher.sent.borrow().is_empty());
}
