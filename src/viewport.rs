//! Viewport transform for the displayed plan image.
//!
//! Owns the zoom level and pan offset and converts between raw pointer
//! coordinates and image-relative percentage coordinates. Zoom is clamped
//! to `[fit_scale, 3.0]`; pan is unclamped, the image may be pushed out
//! of view. Any change to the image's natural size or the container size
//! resets the view to fit.

use crate::constants::zoom;
use crate::model::clamp_percent;

/// Axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Check if a point is inside the rectangle.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

/// In-progress pan drag bookkeeping.
#[derive(Debug, Clone, Copy)]
struct PanDrag {
    start_pointer: (f32, f32),
    start_pan: (f32, f32),
}

/// Zoom and pan state for one displayed plan image.
#[derive(Debug, Clone)]
pub struct ViewportTransform {
    /// Container (viewport element) size in pixels.
    container: (f32, f32),
    /// Natural pixel size of the loaded image, once known. Pins can be
    /// placed before it is known because positions are percentages.
    natural: Option<(f32, f32)>,
    /// Current zoom level. `1.0` means natural pixel size.
    zoom: f32,
    /// Pan offset in pixels from the centered position.
    pan: (f32, f32),
    drag: Option<PanDrag>,
}

impl ViewportTransform {
    pub fn new(container_width: f32, container_height: f32) -> Self {
        let mut vp = Self {
            container: (container_width, container_height),
            natural: None,
            zoom: 1.0,
            pan: (0.0, 0.0),
            drag: None,
        };
        vp.reset_to_fit();
        vp
    }

    /// The zoom level at which the full image exactly fits the container
    /// without cropping. Never upscales past natural size.
    pub fn fit_scale(&self) -> f32 {
        match self.natural {
            Some((nw, nh)) if nw > 0.0 && nh > 0.0 => {
                (self.container.0 / nw).min(self.container.1 / nh).min(1.0)
            }
            _ => 1.0,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> (f32, f32) {
        self.pan
    }

    /// Record the image's natural size (on image load) and reset to fit.
    pub fn set_natural_size(&mut self, width: f32, height: f32) {
        self.natural = Some((width, height));
        self.reset_to_fit();
        log::debug!("Viewport: natural size {}x{}, fit {:.3}", width, height, self.zoom);
    }

    /// Record a new container size (on resize) and reset to fit.
    pub fn set_container_size(&mut self, width: f32, height: f32) {
        self.container = (width, height);
        self.reset_to_fit();
        log::debug!("Viewport: container {}x{}, fit {:.3}", width, height, self.zoom);
    }

    /// Reset zoom to the fit scale and pan to the origin.
    pub fn reset_to_fit(&mut self) {
        self.zoom = self.fit_scale();
        self.pan = (0.0, 0.0);
        self.drag = None;
    }

    /// Apply one wheel/pinch event. Positive delta zooms in by one step,
    /// negative zooms out; the result is clamped to `[fit_scale, MAX]`.
    pub fn wheel(&mut self, delta: f32) {
        let step = if delta > 0.0 { zoom::STEP } else { -zoom::STEP };
        self.set_zoom(self.zoom + step);
    }

    /// Set the zoom level, clamped to the legal range.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(self.fit_scale(), zoom::MAX);
    }

    /// Begin a pan drag at the given pointer position.
    pub fn begin_pan(&mut self, pointer: (f32, f32)) {
        self.drag = Some(PanDrag {
            start_pointer: pointer,
            start_pan: self.pan,
        });
    }

    /// Update an in-progress pan drag. Pan follows the pointer delta since
    /// drag start with no clamping.
    pub fn pan_to(&mut self, pointer: (f32, f32)) {
        if let Some(drag) = self.drag {
            self.pan = (
                drag.start_pan.0 + (pointer.0 - drag.start_pointer.0),
                drag.start_pan.1 + (pointer.1 - drag.start_pointer.1),
            );
        }
    }

    /// End the pan drag, keeping the final offset.
    pub fn end_pan(&mut self) {
        self.drag = None;
    }

    pub fn is_panning(&self) -> bool {
        self.drag.is_some()
    }

    /// Bounding box of the rendered image under the current transform:
    /// centered in the container, scaled by zoom, offset by pan.
    ///
    /// Before the natural size is known the box falls back to the
    /// container itself so percentage placement keeps working.
    pub fn rendered_bounds(&self) -> Rect {
        let (dw, dh) = match self.natural {
            Some((nw, nh)) => (nw * self.zoom, nh * self.zoom),
            None => self.container,
        };
        Rect::new(
            (self.container.0 - dw) / 2.0 + self.pan.0,
            (self.container.1 - dh) / 2.0 + self.pan.1,
            dw,
            dh,
        )
    }

    /// Convert a pointer position to image-relative percentages, clamped
    /// to `[0, 100]`.
    pub fn pointer_to_percent(&self, px: f32, py: f32) -> (f32, f32) {
        let bounds = self.rendered_bounds();
        if bounds.width <= 0.0 || bounds.height <= 0.0 {
            return (0.0, 0.0);
        }
        (
            clamp_percent((px - bounds.x) / bounds.width * 100.0),
            clamp_percent((py - bounds.y) / bounds.height * 100.0),
        )
    }

    /// Convert image-relative percentages back to a pointer position.
    pub fn percent_to_pointer(&self, x: f32, y: f32) -> (f32, f32) {
        let bounds = self.rendered_bounds();
        (
            bounds.x + x / 100.0 * bounds.width,
            bounds.y + y / 100.0 * bounds.height,
        )
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}
