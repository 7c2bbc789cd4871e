//! Runtime configuration — resolved once at startup from environment
//! variables, with optional `.env` loading via dotenvy.
//!
//! All options are read-only for the process lifetime. Paths default to the
//! working directory so the worker and supervisor agree on artifact
//! locations without any extra coordination.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} is not a valid number: \"{value}\"")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be four comma-separated integers (left,top,right,bottom): \"{value}\"")]
    InvalidRect { key: &'static str, value: String },
}

/// A rectangle in `left,top,right,bottom` form — the grammar the coordinate
/// picker tools emit and the crop/capture steps consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

impl FromStr for Rect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<i32> = s
            .split(',')
            .map(|p| p.trim().parse::<i32>())
            .collect::<Result<_, _>>()
            .map_err(|e| e.to_string())?;
        if parts.len() != 4 {
            return Err(format!("expected 4 fields, got {}", parts.len()));
        }
        Ok(Rect {
            left: parts[0],
            top: parts[1],
            right: parts[2],
            bottom: parts[3],
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Destination for recognized text. Required to enter the worker loop.
    pub webhook_url: Option<String>,
    /// Case-insensitive substring matched against window titles.
    pub window_title: String,
    /// Alternate capture mode: a fixed rectangle in screen coordinates on
    /// the primary monitor, used instead of window lookup when set.
    pub screen_rect: Option<Rect>,
    /// Crop applied to the captured frame, in frame coordinates.
    pub crop_rect: Option<Rect>,
    pub poll_sec: f64,
    pub ocr_lang: String,
    pub preprocess: bool,
    pub threshold: u8,
    pub upscale: f32,
    pub denoise_kernel: u32,
    pub sharpen: bool,
    pub invert: bool,
    pub keep_newlines: bool,
    pub add_timestamp: bool,
    pub only_on_change: bool,
    pub stop_file: PathBuf,
    pub pid_file: PathBuf,
    pub status_file: PathBuf,
    pub heartbeat_sec: f64,
    pub last_text_file: PathBuf,
    pub last_text_max_chars: usize,
    /// Explicit tesseract binary path; falls back to a PATH lookup.
    pub tesseract_cmd: Option<PathBuf>,
    pub save_screenshot: bool,
    pub single_shot: bool,
    pub screenshot_dir: PathBuf,
}

/// Load the `.env` file named by `ENV_FILE` (default `.env`), if present.
/// Missing files are fine; real parse errors are not.
pub fn load_env_file() {
    let path = std::env::var("ENV_FILE").unwrap_or_else(|_| ".env".to_string());
    match dotenvy::from_path(&path) {
        Ok(()) => log::debug!("[CONFIG] Loaded env file: {}", path),
        Err(dotenvy::Error::Io(_)) => {}
        Err(e) => log::warn!("[CONFIG] Ignoring malformed env file {}: {}", path, e),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            webhook_url: env_opt("WEBHOOK_URL"),
            window_title: env_or("WINDOW_TITLE", "LINE"),
            screen_rect: env_rect("SCREEN_RECT")?,
            crop_rect: env_rect("CROP_RECT")?,
            poll_sec: env_f64("POLL_SEC", 1.0)?,
            ocr_lang: env_or("OCR_LANG", "jpn+eng"),
            preprocess: env_bool("PREPROCESS", false),
            threshold: env_u32("THRESHOLD", 160)?.min(255) as u8,
            upscale: env_f64("UPSCALE", 1.0)? as f32,
            denoise_kernel: env_u32("DENOISE_KERNEL", 0)?,
            sharpen: env_bool("SHARPEN", false),
            invert: env_bool("INVERT", false),
            keep_newlines: env_bool("KEEP_NEWLINES", false),
            add_timestamp: env_bool("ADD_TIMESTAMP", true),
            only_on_change: env_bool("ONLY_ON_CHANGE", true),
            stop_file: env_or("STOP_FILE", "STOP").into(),
            pid_file: env_or("PID_FILE", "ocr.pid").into(),
            status_file: env_or("STATUS_FILE", "ocr.status").into(),
            heartbeat_sec: env_f64("HEARTBEAT_SEC", 5.0)?,
            last_text_file: env_or("LAST_TEXT_FILE", "ocr.last").into(),
            last_text_max_chars: env_u32("LAST_TEXT_MAX_CHARS", 2000)? as usize,
            tesseract_cmd: env_opt("TESSERACT_CMD").map(PathBuf::from),
            save_screenshot: env_bool("SAVE_SCREENSHOT", false),
            single_shot: env_bool("SINGLE_SHOT", false),
            screenshot_dir: env_or("SCREENSHOT_DIR", "screenshots").into(),
        })
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

/// Truthy values: `1`, `true`, `yes`, `on` (case-insensitive). Anything else
/// is false; unset/empty falls back to the default.
pub fn parse_bool(value: &str, default: bool) -> bool {
    let v = value.trim().to_lowercase();
    if v.is_empty() {
        return default;
    }
    matches!(v.as_str(), "1" | "true" | "yes" | "on")
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => parse_bool(&v, default),
        Err(_) => default,
    }
}

fn env_f64(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env_opt(key) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value: v }),
        None => Ok(default),
    }
}

fn env_u32(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env_opt(key) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value: v }),
        None => Ok(default),
    }
}

fn env_rect(key: &'static str) -> Result<Option<Rect>, ConfigError> {
    match env_opt(key) {
        Some(v) => v
            .parse::<Rect>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidRect { key, value: v }),
        None => Ok(None),
    }
}
