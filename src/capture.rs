use crate::error::{Error, Result};
use crate::region::Region;
use image::RgbaImage;
use log::debug;
use xcap::Monitor;

/// Something that can produce a pixel buffer for a screen region on demand.
///
/// Repeated calls with the same region may return different content -- the
/// screen changes underneath us. That is the whole point, not an error.
pub trait FrameSource {
    fn capture(&mut self, region: &Region) -> Result<RgbaImage>;
}

/// Captures regions of the primary monitor via `xcap`.
pub struct ScreenCapturer {
    monitor: Monitor,
}

impl ScreenCapturer {
    /// Attaches to the first monitor reported by the OS.
    pub fn primary() -> Result<Self> {
        let monitor = Monitor::all()
            .map_err(Error::capture_from)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::capture("no monitors found"))?;
        Ok(ScreenCapturer { monitor })
    }
}

impl FrameSource for ScreenCapturer {
    /// Grabs the current monitor contents and crops to `region`.
    ///
    /// A region that falls partly or wholly outside the monitor is clamped;
    /// it yields a degenerate (possibly zero-area) frame rather than an
    /// error. Only a failure of the capture mechanism itself (no display,
    /// permission denied) is reported.
    fn capture(&mut self, region: &Region) -> Result<RgbaImage> {
        let screen = self.monitor.capture_image().map_err(Error::capture_from)?;

        let x = region.left.min(screen.width());
        let y = region.top.min(screen.height());
        let w = region.width.min(screen.width() - x);
        let h = region.height.min(screen.height() - y);
        debug!("captured region {} (clamped to {}x{})", region, w, h);

        Ok(image::imageops::crop_imm(&screen, x, y, w, h).to_image())
    }
}
