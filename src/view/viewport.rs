/// Visible domain window, device mapping and the derived 2D camera.
///
/// A [`Viewport`] is a plain value: every transform returns a new viewport and
/// leaves the receiver untouched, so the interaction layer decides when a
/// change is committed.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, Result, ViewError};

/// Plot margins in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Closed interval on one domain axis, always `lo <= hi`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub lo: f64,
    pub hi: f64,
}

impl Span {
    /// Build a span from two bounds in either order
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    pub fn center(&self) -> f64 {
        0.5 * (self.lo + self.hi)
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.lo && x <= self.hi
    }

    pub fn shifted(&self, delta: f64) -> Self {
        Self {
            lo: self.lo + delta,
            hi: self.hi + delta,
        }
    }

    /// Scale about `anchor`: `lo' = p - (p - lo) * f`, `hi' = p + (hi - p) * f`
    pub fn scaled_about(&self, anchor: f64, factor: f64) -> Self {
        Self {
            lo: anchor - (anchor - self.lo) * factor,
            hi: anchor + (self.hi - anchor) * factor,
        }
    }

    fn checked(name: &str, a: f64, b: f64) -> Result<Self> {
        ensure_finite(name, a)?;
        ensure_finite(name, b)?;
        let span = Self::new(a, b);
        if span.width() <= 0.0 {
            return Err(ViewError::InvalidArgument(format!(
                "{} has zero width ({} .. {})",
                name, a, b
            )));
        }
        Ok(span)
    }
}

/// Visible domain window plus the device surface it is mapped onto.
///
/// Device coordinates have their origin at the top-left corner of the
/// surface with y growing downwards. `x_reversed` puts larger x values on the
/// left (chemical-shift convention); `y_reversed` puts larger y values at the
/// bottom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    x: Span,
    y: Span,
    width: f64,
    height: f64,
    margins: Margins,
    x_reversed: bool,
    y_reversed: bool,
}

impl Viewport {
    /// Unit domain on a `width` × `height` surface, ppm orientation on x.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            x: Span::new(0.0, 1.0),
            y: Span::new(0.0, 1.0),
            width,
            height,
            margins: Margins::default(),
            x_reversed: true,
            y_reversed: false,
        }
    }

    pub fn domain_x(&self) -> Span {
        self.x
    }

    pub fn domain_y(&self) -> Span {
        self.y
    }

    pub fn device_size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    pub fn x_reversed(&self) -> bool {
        self.x_reversed
    }

    pub fn y_reversed(&self) -> bool {
        self.y_reversed
    }

    /// Replace both domain windows. Bounds may come in either order but must
    /// be finite and distinct.
    pub fn set_domain(&self, x: (f64, f64), y: (f64, f64)) -> Result<Self> {
        Ok(Self {
            x: Span::checked("domain_x", x.0, x.1)?,
            y: Span::checked("domain_y", y.0, y.1)?,
            ..*self
        })
    }

    pub fn set_domain_x(&self, x: (f64, f64)) -> Result<Self> {
        Ok(Self {
            x: Span::checked("domain_x", x.0, x.1)?,
            ..*self
        })
    }

    pub fn set_domain_y(&self, y: (f64, f64)) -> Result<Self> {
        Ok(Self {
            y: Span::checked("domain_y", y.0, y.1)?,
            ..*self
        })
    }

    pub fn resize(&self, width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..*self
        }
    }

    pub fn with_margins(&self, margins: Margins) -> Self {
        Self { margins, ..*self }
    }

    pub fn with_orientation(&self, x_reversed: bool, y_reversed: bool) -> Self {
        Self {
            x_reversed,
            y_reversed,
            ..*self
        }
    }

    /// Shift both windows by a domain-space delta. No clamping is applied.
    pub fn pan(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x.shifted(dx),
            y: self.y.shifted(dy),
            ..*self
        }
    }

    /// Zoom about a domain point. Factors below 1 zoom in; a factor of 1
    /// leaves that axis untouched.
    pub fn zoom(&self, anchor: [f64; 2], fx: f64, fy: f64) -> Self {
        Self {
            x: self.x.scaled_about(anchor[0], fx),
            y: self.y.scaled_about(anchor[1], fy),
            ..*self
        }
    }

    /// Jump the x window to an explicit range, keeping y
    pub fn zoom_to(&self, x: (f64, f64)) -> Result<Self> {
        self.set_domain_x(x)
    }

    /// Plot area (inside the margins) as `(left, top, width, height)`
    pub fn plot_area(&self) -> (f64, f64, f64, f64) {
        (
            self.margins.left,
            self.margins.top,
            self.width - self.margins.left - self.margins.right,
            self.height - self.margins.top - self.margins.bottom,
        )
    }

    pub fn plot_rect(&self) -> egui::Rect {
        let (left, top, w, h) = self.plot_area();
        egui::Rect::from_min_size(
            egui::pos2(left as f32, top as f32),
            egui::vec2(w.max(0.0) as f32, h.max(0.0) as f32),
        )
    }

    pub fn contains_device(&self, pos: egui::Pos2) -> bool {
        self.plot_rect().contains(pos)
    }

    /// True when a transform would divide by zero or produce non-finite output
    pub fn is_degenerate(&self) -> bool {
        let (_, _, w, h) = self.plot_area();
        !(self.x.width() > 0.0 && self.y.width() > 0.0 && w > 0.0 && h > 0.0)
            || !self.x.width().is_finite()
            || !self.y.width().is_finite()
    }

    /// Widen any window narrower than `min_span` around its centre.
    pub fn clamp_degenerate(&self, min_span: f64) -> Self {
        let widen = |s: Span| {
            if s.width() >= min_span {
                s
            } else {
                let c = s.center();
                Span::new(c - 0.5 * min_span, c + 0.5 * min_span)
            }
        };
        Self {
            x: widen(self.x),
            y: widen(self.y),
            ..*self
        }
    }

    /// Domain coordinate → device pixel (f64 precision)
    pub fn to_device_f64(&self, p: [f64; 2]) -> [f64; 2] {
        let (left, top, w, h) = self.plot_area();
        let fx = (p[0] - self.x.lo) / self.x.width();
        let fy = (p[1] - self.y.lo) / self.y.width();
        let dx = if self.x_reversed { 1.0 - fx } else { fx };
        let dy = if self.y_reversed { fy } else { 1.0 - fy };
        [left + dx * w, top + dy * h]
    }

    pub fn to_device(&self, p: [f64; 2]) -> egui::Pos2 {
        let [x, y] = self.to_device_f64(p);
        egui::pos2(x as f32, y as f32)
    }

    /// Device pixel → domain coordinate
    pub fn to_domain_f64(&self, d: [f64; 2]) -> [f64; 2] {
        let (left, top, w, h) = self.plot_area();
        let dx = (d[0] - left) / w;
        let dy = (d[1] - top) / h;
        let fx = if self.x_reversed { 1.0 - dx } else { dx };
        let fy = if self.y_reversed { dy } else { 1.0 - dy };
        [self.x.lo + fx * self.x.width(), self.y.lo + fy * self.y.width()]
    }

    pub fn to_domain(&self, pos: egui::Pos2) -> [f64; 2] {
        self.to_domain_f64([pos.x as f64, pos.y as f64])
    }

    /// Domain delta that makes content follow the pointer from `from` to
    /// `to`, evaluated against the current window.
    pub fn drag_delta(&self, from: egui::Pos2, to: egui::Pos2) -> [f64; 2] {
        let a = self.to_domain(from);
        let b = self.to_domain(to);
        [a[0] - b[0], a[1] - b[1]]
    }
}

/// Translation + per-axis zoom of the GPU pass.
///
/// Maps vertex coordinates to pixels of the drawing surface with the origin
/// at its bottom-left corner: `pixel = (v - translation) * zoom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub translation: [f64; 2],
    pub zoom_x: f64,
    pub zoom_y: f64,
}

impl Camera2D {
    /// Camera showing vertex x in `left..right` and y in `bottom..top`
    /// across a `width` × `height` surface. Reversed ranges mirror the axis.
    pub fn from_bounds(left: f64, right: f64, bottom: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            translation: [left, bottom],
            zoom_x: width / (right - left),
            zoom_y: height / (top - bottom),
        }
    }

    /// Camera for vertices expressed through per-axis calibrations
    /// (`domain → vertex` maps), covering the viewport's plot area.
    pub fn derive(
        viewport: &Viewport,
        x_to_vertex: impl Fn(f64) -> f64,
        y_to_vertex: impl Fn(f64) -> f64,
    ) -> Self {
        let (left, top, w, h) = viewport.plot_area();
        let top_left = viewport.to_domain_f64([left, top]);
        let bottom_right = viewport.to_domain_f64([left + w, top + h]);
        Self::from_bounds(
            x_to_vertex(top_left[0]),
            x_to_vertex(bottom_right[0]),
            y_to_vertex(bottom_right[1]),
            y_to_vertex(top_left[1]),
            w,
            h,
        )
    }

    /// Vertex → surface pixel (bottom-left origin)
    pub fn apply(&self, v: [f64; 2]) -> [f64; 2] {
        [
            (v[0] - self.translation[0]) * self.zoom_x,
            (v[1] - self.translation[1]) * self.zoom_y,
        ]
    }

    /// Column-major 3×3 matrix taking vertices straight to clip space
    pub fn clip_matrix(&self, width: f64, height: f64) -> [f32; 9] {
        let sx = 2.0 * self.zoom_x / width;
        let sy = 2.0 * self.zoom_y / height;
        let tx = -sx * self.translation[0] - 1.0;
        let ty = -sy * self.translation[1] - 1.0;
        [
            sx as f32, 0.0, 0.0, //
            0.0, sy as f32, 0.0, //
            tx as f32, ty as f32, 1.0,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> Viewport {
        Viewport::new(200.0, 100.0)
            .set_domain((0.0, 10.0), (-1.0, 1.0))
            .unwrap()
    }

    #[test]
    fn test_zoom_then_unzoom_restores_domain() {
        let v = view();
        let zoomed = v.zoom([5.0, 0.0], 0.5, 1.0);
        assert_eq!(zoomed.domain_x(), Span::new(2.5, 7.5));
        let back = zoomed.zoom([5.0, 0.0], 2.0, 1.0);
        assert!((back.domain_x().lo - 0.0).abs() < 1e-12);
        assert!((back.domain_x().hi - 10.0).abs() < 1e-12);
        assert_eq!(back.domain_y(), v.domain_y());
    }

    #[test]
    fn test_pan_and_back_is_exact() {
        let v = view();
        let moved = v.pan(1.25, -0.5).pan(-1.25, 0.5);
        assert_eq!(moved, v);
    }

    #[test]
    fn test_set_domain_normalizes_and_validates() {
        let v = Viewport::new(10.0, 10.0).set_domain((8.0, 2.0), (1.0, 0.0)).unwrap();
        assert_eq!(v.domain_x(), Span { lo: 2.0, hi: 8.0 });
        assert!(matches!(
            Viewport::new(10.0, 10.0).set_domain((1.0, 1.0), (0.0, 1.0)),
            Err(ViewError::InvalidArgument(_))
        ));
        assert!(Viewport::new(10.0, 10.0)
            .set_domain((f64::NAN, 1.0), (0.0, 1.0))
            .is_err());
    }

    #[test]
    fn test_ppm_orientation_puts_large_values_left() {
        let v = view();
        assert_eq!(v.to_device_f64([10.0, 1.0]), [0.0, 0.0]);
        assert_eq!(v.to_device_f64([0.0, -1.0]), [200.0, 100.0]);
    }

    #[test]
    fn test_device_round_trip_with_margins() {
        let v = view()
            .with_margins(Margins { top: 5.0, right: 10.0, bottom: 15.0, left: 20.0 })
            .with_orientation(false, true);
        let p = [3.3, 0.4];
        let d = v.to_device_f64(p);
        let back = v.to_domain_f64(d);
        assert!((back[0] - p[0]).abs() < 1e-12);
        assert!((back[1] - p[1]).abs() < 1e-12);
    }

    #[test]
    fn test_drag_delta_follows_pointer() {
        let v = view();
        // ppm axis: dragging right reveals larger values
        let delta = v.drag_delta(egui::pos2(100.0, 50.0), egui::pos2(120.0, 50.0));
        assert!((delta[0] - 1.0).abs() < 1e-6);
        let panned = v.pan(delta[0], delta[1]);
        assert!((panned.domain_x().lo - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_clamp_degenerate_widens_zero_span() {
        let v = view().zoom([5.0, 0.0], 0.0, 1.0);
        assert!(v.is_degenerate());
        let fixed = v.clamp_degenerate(1e-6);
        assert!(!fixed.is_degenerate());
        assert!((fixed.domain_x().center() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_camera_maps_viewport_corners() {
        // ppm on both axes: larger values left and bottom
        let v = Viewport::new(100.0, 50.0)
            .set_domain((0.0, 10.0), (0.0, 5.0))
            .unwrap()
            .with_orientation(true, true);
        let cam = Camera2D::derive(&v, |x| x, |y| y);
        assert_eq!(cam.apply([10.0, 5.0]), [0.0, 0.0]);
        assert_eq!(cam.apply([0.0, 0.0]), [100.0, 50.0]);
        let m = cam.clip_matrix(100.0, 50.0);
        let clip_x = m[0] as f64 * 10.0 + m[6] as f64;
        assert!((clip_x + 1.0).abs() < 1e-6);
    }
}
