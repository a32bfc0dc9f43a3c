use crate::config::ZoomSettings;
use crate::snapping::find_snap_point;
use crate::types::TimeUs;

/// Maps timeline time to horizontal pixels through a single zoom factor
/// (pixels per second), bounded to `[min_zoom, max_zoom]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    zoom: f64,
    settings: ZoomSettings,
}

impl Viewport {
    /// Invalid bounds fall back to the default zoom settings.
    pub fn new(settings: ZoomSettings) -> Self {
        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring zoom settings");
                ZoomSettings::default()
            }
        };
        let mut viewport = Self {
            zoom: settings.min_zoom,
            settings,
        };
        viewport.set_zoom(viewport.settings.default_zoom);
        viewport
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn min_zoom(&self) -> f64 {
        self.settings.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.settings.max_zoom
    }

    /// Out-of-range requests snap to the nearest bound. Non-finite requests are ignored.
    pub fn set_zoom(&mut self, pixels_per_second: f64) {
        if !pixels_per_second.is_finite() {
            return;
        }
        self.zoom = pixels_per_second.clamp(self.settings.min_zoom, self.settings.max_zoom);
    }

    /// Pick the zoom at which `total` fills the viewport minus the label gutter.
    /// A zero-length arrangement leaves the zoom as it is.
    pub fn fit_to_window(&mut self, viewport_width_px: f64, total: TimeUs) {
        if total <= TimeUs::ZERO {
            return;
        }
        let usable = (viewport_width_px - self.settings.label_gutter_px).max(0.0);
        self.set_zoom(usable / total.as_seconds());
    }

    pub fn time_to_pixel(&self, t: TimeUs) -> f64 {
        t.as_seconds() * self.zoom
    }

    pub fn pixel_to_time(&self, x: f64) -> TimeUs {
        TimeUs::from_seconds(x / self.zoom)
    }

    /// Convert a pointer position to time, snapping to the closest point that
    /// lies within `threshold_px` on screen. Never returns a negative time.
    pub fn pointer_to_time(&self, x: f64, snap_points: &[TimeUs], threshold_px: f64) -> TimeUs {
        let raw = self.pixel_to_time(x).max(TimeUs::ZERO);
        let threshold = self.pixel_to_time(threshold_px.max(0.0));
        find_snap_point(raw, snap_points, threshold)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ZoomSettings::default())
    }
}
