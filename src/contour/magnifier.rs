/// Magnifying-glass inset for the contour view.
///
/// The inset sits beside the cursor on whichever side has room and shows the
/// neighbourhood of the cursor enlarged by `factor`. Placement is recomputed
/// on every call so it tracks the cursor.

use crate::view::viewport::Viewport;

/// Device-space rectangle, top-left origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn from_egui(rect: egui::Rect) -> Self {
        Self {
            x: rect.left(),
            y: rect.top(),
            width: rect.width(),
            height: rect.height(),
        }
    }

    pub fn to_egui(&self) -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(self.x, self.y), egui::vec2(self.width, self.height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Above,
    Below,
}

/// Where the inset lands and what it shows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inset {
    pub rect: PixelRect,
    pub horizontal: Side,
    pub vertical: Side,
    /// Full-surface viewport whose mapping puts the cursor's domain point at
    /// the inset centre, enlarged by the factor
    pub viewport: Viewport,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Magnifier {
    pub factor: f64,
    /// Inset edge as a fraction of the plot size
    pub size: f64,
}

impl Default for Magnifier {
    fn default() -> Self {
        Self {
            factor: 4.0,
            size: 0.1,
        }
    }
}

impl Magnifier {
    /// Inset for a cursor at device `cursor`, or `None` outside the plot
    pub fn inset(&self, main: &Viewport, cursor: egui::Pos2) -> Option<Inset> {
        if !main.contains_device(cursor) || main.is_degenerate() || self.factor <= 0.0 {
            return None;
        }
        let (left, top, w, h) = main.plot_area();
        let iw = self.size * w;
        let ih = self.size * h;
        let (cx, cy) = (cursor.x as f64 - left, cursor.y as f64 - top);

        let (x0, horizontal) = if cx - 1.1 * iw < 0.0 {
            (cx + 0.1 * iw, Side::Right)
        } else {
            (cx - 1.1 * iw, Side::Left)
        };
        let (y0, vertical) = if cy - 1.1 * ih < 0.0 {
            (cy + 0.1 * ih, Side::Below)
        } else {
            (cy - 1.1 * ih, Side::Above)
        };
        // a large inset may still overrun the far edge after flipping
        let x0 = x0.min(w - iw).max(0.0);
        let y0 = y0.min(h - ih).max(0.0);

        let centre = main.to_domain_f64([left + x0 + 0.5 * iw, top + y0 + 0.5 * ih]);
        let p = main.to_domain(cursor);
        let dx = main.domain_x();
        let dy = main.domain_y();
        let f = self.factor;
        let viewport = main
            .set_domain(
                (p[0] + (dx.lo - centre[0]) / f, p[0] + (dx.hi - centre[0]) / f),
                (p[1] + (dy.lo - centre[1]) / f, p[1] + (dy.hi - centre[1]) / f),
            )
            .ok()?;

        Some(Inset {
            rect: PixelRect {
                x: (left + x0) as f32,
                y: (top + y0) as f32,
                width: iw as f32,
                height: ih as f32,
            },
            horizontal,
            vertical,
            viewport,
        })
    }
}
