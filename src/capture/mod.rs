//! Frame acquisition domain — window lookup, screen capture, cropping,
//! and OCR preprocessing.
//!
//! External code should only use the public items exported here.

mod preprocess;
mod region;
mod window;

pub use preprocess::{prepare_for_ocr, PreprocessOptions};
pub use region::crop_frame;
pub use window::{capture_screen_rect, capture_window};

use crate::config::Config;
use crate::error::RelayError;
use image::DynamicImage;

/// Source of raw frames for the worker loop. A trait seam so the loop can
/// be driven by canned images in tests.
pub trait FrameSource {
    fn grab(&mut self) -> Result<DynamicImage, RelayError>;
}

/// Production frame source: either a window matched by title substring or a
/// fixed rectangle of the primary monitor.
pub enum ScreenSource {
    Window { title: String },
    Region { rect: crate::config::Rect },
}

impl ScreenSource {
    pub fn from_config(cfg: &Config) -> Self {
        match cfg.screen_rect {
            Some(rect) => ScreenSource::Region { rect },
            None => ScreenSource::Window {
                title: cfg.window_title.clone(),
            },
        }
    }
}

impl FrameSource for ScreenSource {
    fn grab(&mut self) -> Result<DynamicImage, RelayError> {
        match self {
            ScreenSource::Window { title } => capture_window(title),
            ScreenSource::Region { rect } => capture_screen_rect(*rect),
        }
    }
}
