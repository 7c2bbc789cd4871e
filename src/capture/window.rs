//! OS-level frame capture using the `xcap` crate.
//!
//! This is the infrastructure layer — it talks to the windowing system.
//! Everything downstream of here operates on plain `DynamicImage`s.

use crate::config::Rect;
use crate::error::RelayError;
use image::DynamicImage;
use xcap::{Monitor, Window};

/// Captures the window whose title contains `title` (case-insensitive).
///
/// When several windows match, the one with the lowest window id wins —
/// enumeration order varies between platforms, so the id sort keeps the
/// selection deterministic across cycles.
pub fn capture_window(title: &str) -> Result<DynamicImage, RelayError> {
    let needle = title.to_lowercase();
    let windows = Window::all().map_err(|e| RelayError::CaptureFailed(e.to_string()))?;

    let mut matches: Vec<Window> = windows
        .into_iter()
        .filter(|w| {
            w.title()
                .map(|t| t.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
        .collect();

    if matches.is_empty() {
        return Err(RelayError::WindowNotFound(title.to_string()));
    }

    matches.sort_by_key(|w| w.id().unwrap_or(u32::MAX));
    let target = &matches[0];

    if matches.len() > 1 {
        log::debug!(
            "[CAPTURE] {} windows match \"{}\" — using id {:?}",
            matches.len(),
            title,
            target.id().ok()
        );
    }

    let image = target
        .capture_image()
        .map_err(|e| RelayError::CaptureFailed(e.to_string()))?;

    Ok(DynamicImage::ImageRgba8(image))
}

/// Captures a fixed rectangle of the primary monitor, in screen coordinates.
pub fn capture_screen_rect(rect: Rect) -> Result<DynamicImage, RelayError> {
    let monitor = primary_monitor()?;

    let image = monitor
        .capture_image()
        .map_err(|e| RelayError::CaptureFailed(e.to_string()))?;

    super::crop_frame(&DynamicImage::ImageRgba8(image), rect)
}

fn primary_monitor() -> Result<Monitor, RelayError> {
    let monitors = Monitor::all().map_err(|e| RelayError::CaptureFailed(e.to_string()))?;

    monitors
        .into_iter()
        .find(|m| m.is_primary().unwrap_or(false))
        .or_else(|| {
            // No monitor reports as primary — fall back to the first one
            Monitor::all().ok()?.into_iter().next()
        })
        .ok_or_else(|| RelayError::CaptureFailed("no monitors found".to_string()))
}
