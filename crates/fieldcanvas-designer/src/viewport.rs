//! Viewport and coordinate transformation for the document image.
//!
//! Three coordinate spaces are in play:
//! - screen: viewport-local pixels, (0,0) at the viewport's top-left
//! - image: untransformed pixels of the letterboxed image, (0,0) at its top-left
//! - percent: 0..100 of the image's width and height
//!
//! The image is first fitted into the viewport (uniform scale, centered),
//! which yields `base_origin`. The camera's scale S and translate T are then
//! applied about the image center C:
//!
//! ```text
//! screen = base_origin + T + S * image + C * (1 - S)
//! image  = (screen - base_origin - T - C * (1 - S)) / S
//! ```

use fieldcanvas_core::Field;
use fieldcanvas_settings::ZoomSettings;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canvas::{ImageSize, Point, Rect, Size};

/// Process-local camera transform. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl CameraState {
    pub fn new(scale: f64, translate_x: f64, translate_y: f64) -> Self {
        Self {
            scale,
            translate_x,
            translate_y,
        }
    }

    pub fn translate(&self) -> Point {
        Point::new(self.translate_x, self.translate_y)
    }

    pub fn is_finite(&self) -> bool {
        self.scale.is_finite() && self.translate_x.is_finite() && self.translate_y.is_finite()
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
}

/// Camera over the document image.
#[derive(Debug, Clone)]
pub struct Viewport {
    viewport_size: Size,
    natural_size: Size,
    camera: CameraState,
    min_scale: f64,
    max_scale: f64,
    zoom_step: f64,
    /// Screen position of image point (0, 0) under the current camera.
    overlay_origin: Point,
}

impl Viewport {
    /// Creates a viewport with the default zoom limits.
    pub fn new(viewport_size: Size, natural_size: Size) -> Self {
        Self::with_zoom(viewport_size, natural_size, &ZoomSettings::default())
    }

    pub fn with_zoom(viewport_size: Size, natural_size: Size, zoom: &ZoomSettings) -> Self {
        let mut viewport = Self {
            viewport_size,
            natural_size,
            camera: CameraState::default(),
            min_scale: zoom.min_scale,
            max_scale: zoom.max_scale,
            zoom_step: zoom.step,
            overlay_origin: Point::ZERO,
        };
        viewport.sync_overlay_origin();
        viewport
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    pub fn natural_size(&self) -> Size {
        self.natural_size
    }

    pub fn camera(&self) -> CameraState {
        self.camera
    }

    pub fn scale(&self) -> f64 {
        self.camera.scale
    }

    pub fn scale_limits(&self) -> (f64, f64) {
        (self.min_scale, self.max_scale)
    }

    /// Letterboxed image size in untransformed pixels.
    pub fn fitted_size(&self) -> ImageSize {
        let (vw, vh) = (self.viewport_size.width, self.viewport_size.height);
        let (iw, ih) = (self.natural_size.width, self.natural_size.height);
        if self.natural_size.is_empty() || self.viewport_size.is_empty() {
            return Size::new(vw.max(0.0), vh.max(0.0));
        }
        let fit = (vw / iw).min(vh / ih);
        Size::new(iw * fit, ih * fit)
    }

    /// Screen position of the untransformed image's top-left corner.
    pub fn base_origin(&self) -> Point {
        let fitted = self.fitted_size();
        Point::new(
            (self.viewport_size.width - fitted.width) / 2.0,
            (self.viewport_size.height - fitted.height) / 2.0,
        )
    }

    /// Transform anchor, in image space.
    pub fn image_center(&self) -> Point {
        let fitted = self.fitted_size();
        Point::new(fitted.width / 2.0, fitted.height / 2.0)
    }

    pub fn screen_from_image(&self, p: Point) -> Point {
        let s = self.camera.scale;
        Point::new(
            self.overlay_origin.x + s * p.x,
            self.overlay_origin.y + s * p.y,
        )
    }

    pub fn image_from_screen(&self, s: Point) -> Point {
        let k = self.camera.scale;
        Point::new(
            (s.x - self.overlay_origin.x) / k,
            (s.y - self.overlay_origin.y) / k,
        )
    }

    fn sync_overlay_origin(&mut self) {
        self.overlay_origin = Self::screen_from_image_with(
            self.base_origin(),
            self.image_center(),
            &self.camera,
            Point::ZERO,
        );
    }

    /// Forward mapping under an arbitrary camera.
    pub fn screen_from_image_with(
        base: Point,
        center: Point,
        camera: &CameraState,
        p: Point,
    ) -> Point {
        let s = camera.scale;
        Point::new(
            base.x + camera.translate_x + s * p.x + center.x * (1.0 - s),
            base.y + camera.translate_y + s * p.y + center.y * (1.0 - s),
        )
    }

    /// Inverse mapping under an arbitrary camera.
    pub fn image_from_screen_with(
        base: Point,
        center: Point,
        camera: &CameraState,
        s: Point,
    ) -> Point {
        let k = camera.scale;
        Point::new(
            (s.x - base.x - camera.translate_x - center.x * (1.0 - k)) / k,
            (s.y - base.y - camera.translate_y - center.y * (1.0 - k)) / k,
        )
    }

    pub fn percent_from_image(&self, p: Point) -> Point {
        let fitted = self.fitted_size();
        Point::new(p.x / fitted.width * 100.0, p.y / fitted.height * 100.0)
    }

    pub fn image_from_percent(&self, p: Point) -> Point {
        let fitted = self.fitted_size();
        Point::new(p.x / 100.0 * fitted.width, p.y / 100.0 * fitted.height)
    }

    pub fn screen_from_percent(&self, p: Point) -> Point {
        self.screen_from_image(self.image_from_percent(p))
    }

    pub fn percent_from_screen(&self, s: Point) -> Point {
        self.percent_from_image(self.image_from_screen(s))
    }

    /// Converts a screen-space finger travel to a percent-space delta.
    pub fn percent_delta_from_screen(&self, delta: Point) -> Point {
        let fitted = self.fitted_size();
        let s = self.camera.scale;
        Point::new(
            delta.x / s / fitted.width * 100.0,
            delta.y / s / fitted.height * 100.0,
        )
    }

    /// Field bounds in image space.
    pub fn image_rect_for_field(&self, field: &Field) -> Rect {
        let fitted = self.fitted_size();
        Rect::new(
            field.x / 100.0 * fitted.width,
            field.y / 100.0 * fitted.height,
            field.width / 100.0 * fitted.width,
            field.height,
        )
    }

    /// Field bounds in screen space.
    pub fn screen_rect_for_field(&self, field: &Field) -> Rect {
        let r = self.image_rect_for_field(field);
        let top_left = self.screen_from_image(Point::new(r.x, r.y));
        let s = self.camera.scale;
        Rect::new(top_left.x, top_left.y, r.width * s, r.height * s)
    }

    /// The single camera setter.
    ///
    /// Non-finite input is discarded in favor of the current value. Scale is
    /// clamped to the zoom limits and the cached overlay origin is recomputed.
    /// An unfinished pinch belongs to the gesture arbitrator; callers that set
    /// the camera mid-gesture rebase it.
    pub fn set_transform(&mut self, scale: f64, translate_x: f64, translate_y: f64) -> bool {
        let candidate = CameraState::new(scale, translate_x, translate_y);
        if !candidate.is_finite() || scale <= 0.0 {
            tracing::warn!(
                "Discarding non-finite camera transform ({}, {}, {})",
                scale,
                translate_x,
                translate_y
            );
            return false;
        }

        self.camera = CameraState::new(
            scale.clamp(self.min_scale, self.max_scale),
            translate_x,
            translate_y,
        );
        self.sync_overlay_origin();
        true
    }

    pub fn set_camera(&mut self, camera: CameraState) -> bool {
        self.set_transform(camera.scale, camera.translate_x, camera.translate_y)
    }

    /// Camera that scales by `factor` about `focal` (screen) and then pans.
    ///
    /// The image point under `focal` ends up under `focal + pan`.
    pub fn camera_for_gesture(&self, pan: Point, factor: f64, focal: Point) -> CameraState {
        let target_scale = (self.camera.scale * factor).clamp(self.min_scale, self.max_scale);
        let anchor = self.image_from_screen(focal);
        self.camera_placing(anchor, focal + pan, target_scale)
    }

    /// Camera at `scale` that maps image point `image` to screen point `screen`.
    pub fn camera_placing(&self, image: Point, screen: Point, scale: f64) -> CameraState {
        let base = self.base_origin();
        let center = self.image_center();
        CameraState::new(
            scale,
            screen.x - base.x - scale * image.x - center.x * (1.0 - scale),
            screen.y - base.y - scale * image.y - center.y * (1.0 - scale),
        )
    }

    /// Commits a finished pan/pinch gesture.
    pub fn apply_gesture(&mut self, pan: Point, factor: f64, focal: Point) -> bool {
        let camera = self.camera_for_gesture(pan, factor, focal);
        self.set_camera(camera)
    }

    fn zoom_about_center(&mut self, factor: f64) -> bool {
        let center = Point::new(
            self.viewport_size.width / 2.0,
            self.viewport_size.height / 2.0,
        );
        self.apply_gesture(Point::ZERO, factor, center)
    }

    /// Zooms in one step about the viewport center.
    pub fn zoom_in(&mut self) -> bool {
        self.zoom_about_center(self.zoom_step)
    }

    /// Zooms out one step about the viewport center.
    pub fn zoom_out(&mut self) -> bool {
        self.zoom_about_center(1.0 / self.zoom_step)
    }

    /// Resets to the fitted, untransformed view.
    pub fn reset(&mut self) -> bool {
        self.set_transform(1.0, 0.0, 0.0)
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport_size = size;
        self.sync_overlay_origin();
    }

    pub fn set_image_size(&mut self, natural: Size) {
        self.natural_size = natural;
        self.sync_overlay_origin();
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scale: {:.2}x | Translate: ({:.1}, {:.1})",
            self.camera.scale, self.camera.translate_x, self.camera.translate_y
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(Size::new(400.0, 800.0), Size::new(850.0, 1100.0))
    }
}
