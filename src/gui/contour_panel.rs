/// 2D contour panel: pointer handling around the shared compositor and the
/// glow paint callback that runs its GPU passes.
///
/// Wheel zooms about the cursor, drag pans, Shift-drag draws a zoom box,
/// Alt-drag moves the topmost spectrum and a right click steps back through
/// the zoom history.

use std::sync::{Arc, Mutex, MutexGuard};

use egui::{Align2, FontId, PointerButton, Pos2, Rect, Sense, Stroke, Vec2};

use crate::config::ViewerConfig;
use crate::contour::glow_surface::GlowContourResources;
use crate::contour::ContourCompositor;
use crate::error::{Result, ViewError};
use crate::gui::theme::PlotColors;
use crate::history::Edit;
use crate::view::axis;
use crate::view::viewport::Viewport;

pub type SharedCompositor = Arc<Mutex<ContourCompositor<GlowContourResources>>>;

const AXIS_LEFT: f32 = 64.0;
const AXIS_BOTTOM: f32 = 34.0;
const PAD: f32 = 10.0;
const TICKS: usize = 8;

#[derive(Debug, Default)]
pub struct ContourPanelState {
    pub magnifier_enabled: bool,
    /// Device corners of the zoom box, canvas-local
    rubber_band: Option<(Pos2, Pos2)>,
    /// Spectrum being moved and the shift accumulated so far
    reference_drag: Option<(usize, f64, f64)>,
}

impl ContourPanelState {
    pub fn is_selecting(&self) -> bool {
        self.rubber_band.is_some()
    }
}

/// Lock that survives a panicked paint callback
pub fn lock(shared: &SharedCompositor) -> MutexGuard<'_, ContourCompositor<GlowContourResources>> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Wheel zoom about a canvas-local point, both axes at once
pub fn wheel_zoom(view: &Viewport, at: Pos2, scroll: f32, config: &ViewerConfig) -> Viewport {
    if scroll == 0.0 || !view.contains_device(at) {
        return *view;
    }
    let f = if scroll > 0.0 {
        config.wheel_zoom_in
    } else {
        config.wheel_zoom_out
    };
    view.zoom(view.to_domain(at), f, f)
        .clamp_degenerate(config.min_domain_span)
}

/// Domain window of a zoom box, or `None` when the box is too thin to mean
/// anything
pub fn rubber_band_domain(
    view: &Viewport,
    a: Pos2,
    b: Pos2,
    min_px: f32,
) -> Option<((f64, f64), (f64, f64))> {
    if (a.x - b.x).abs() <= min_px || (a.y - b.y).abs() <= min_px {
        return None;
    }
    let p = view.to_domain(a);
    let q = view.to_domain(b);
    Some(((p[0], q[0]), (p[1], q[1])))
}

/// Lay out and draw the contour panel. Returns an edit when a reference drag
/// finished this frame.
pub fn show_contour_panel(
    ui: &mut egui::Ui,
    compositor: &SharedCompositor,
    state: &mut ContourPanelState,
    config: &ViewerConfig,
    colors: &PlotColors,
) -> Result<Option<Edit>> {
    let size = ui.available_size().max(Vec2::new(240.0, 200.0));
    let (outer, painter) = ui.allocate_painter(size, Sense::hover());
    let canvas = Rect::from_min_max(
        outer.rect.min + Vec2::new(AXIS_LEFT, PAD),
        outer.rect.max - Vec2::new(PAD, AXIS_BOTTOM),
    );
    let response = ui.interact(canvas, ui.id().with("contour_canvas"), Sense::click_and_drag());
    let local = |p: Pos2| (p - canvas.min).to_pos2();
    let (modifiers, scroll, press_origin) =
        ui.input(|i| (i.modifiers, i.raw_scroll_delta.y, i.pointer.press_origin()));

    let mut edit = None;
    let (view, inset) = {
        let mut comp = lock(compositor);
        let mut view = *comp.viewport();
        let (w, h) = view.device_size();
        if (w - canvas.width() as f64).abs() > 0.5 || (h - canvas.height() as f64).abs() > 0.5 {
            view = view.resize(canvas.width() as f64, canvas.height() as f64);
        }

        if let Some(hover) = response.hover_pos() {
            view = wheel_zoom(&view, local(hover), scroll, config);
        }

        if response.drag_started_by(PointerButton::Primary) {
            let start = press_origin.or(response.interact_pointer_pos()).map(local);
            if let Some(start) = start {
                if modifiers.shift {
                    state.rubber_band = Some((start, start));
                } else if modifiers.alt {
                    state.reference_drag = comp.scene().top_visible().map(|i| (i, 0.0, 0.0));
                }
            }
        }
        if response.dragged_by(PointerButton::Primary) {
            if let Some(p) = response.interact_pointer_pos() {
                let to = local(p);
                let from = to - response.drag_delta();
                if let Some(band) = state.rubber_band.as_mut() {
                    band.1 = to;
                } else if let Some((index, dx, dy)) = state.reference_drag.as_mut() {
                    // the spectrum follows the pointer
                    let d = view.drag_delta(from, to);
                    comp.scene_mut().shift_reference(*index, -d[0], -d[1])?;
                    *dx -= d[0];
                    *dy -= d[1];
                } else {
                    let d = view.drag_delta(from, to);
                    view = view.pan(d[0], d[1]);
                }
            }
        }
        comp.set_viewport(view);

        if response.drag_stopped() {
            if let Some((a, b)) = state.rubber_band.take() {
                if let Some((x, y)) = rubber_band_domain(&view, a, b, config.click_threshold_px) {
                    comp.push_zoom(x, y)?;
                    log::info!("Contour zoom pushed (depth {})", comp.zoom_depth());
                }
            }
            if let Some((spectrum, dx, dy)) = state.reference_drag.take() {
                edit = Some(Edit::ContourReference { spectrum, dx, dy });
            }
        }
        if response.secondary_clicked() && !comp.pop_zoom() {
            log::debug!("contour zoom history empty");
        }

        let cursor = if state.magnifier_enabled && state.rubber_band.is_none() {
            response.hover_pos().map(local)
        } else {
            None
        };
        comp.set_cursor(cursor);
        (*comp.viewport(), comp.inset())
    };

    painter.rect_filled(canvas, 0.0, colors.plot_bg);
    painter.add(paint_callback(canvas, compositor));
    paint_axes(&painter, canvas, &view, colors);

    if let Some(inset) = inset {
        let r = inset.rect.to_egui().translate(canvas.min.to_vec2());
        painter.rect_stroke(r, 0.0, Stroke::new(1.5, colors.inset_frame), egui::StrokeKind::Outside);
    }
    if let Some((a, b)) = state.rubber_band {
        let r = Rect::from_two_pos(a + canvas.min.to_vec2(), b + canvas.min.to_vec2());
        painter.rect_filled(r, 0.0, colors.frame.gamma_multiply(0.12));
        painter.rect_stroke(r, 0.0, Stroke::new(1.0, colors.frame), egui::StrokeKind::Inside);
    }
    Ok(edit)
}

fn paint_callback(canvas: Rect, compositor: &SharedCompositor) -> egui::PaintCallback {
    let shared = Arc::clone(compositor);
    egui::PaintCallback {
        rect: canvas,
        callback: Arc::new(eframe::egui_glow::CallbackFn::new(move |info, _painter| {
            let mut comp = lock(&shared);
            let result = match comp.surface_mut() {
                Some(surface) => surface.begin_frame(&info),
                None => Err(ViewError::PreconditionFailed("contour surface destroyed".into())),
            }
            .and_then(|_| comp.draw());
            if let Err(e) = result {
                log::warn!("Contour draw skipped: {}", e);
            }
        })),
    }
}

fn paint_axes(painter: &egui::Painter, canvas: Rect, view: &Viewport, colors: &PlotColors) {
    let font = FontId::proportional(11.0);
    let stroke = Stroke::new(1.0, colors.frame);
    let dx = view.domain_x();
    let dy = view.domain_y();

    let x_step = axis::nice_step(dx.width(), TICKS);
    for t in axis::ticks(dx.lo, dx.hi, TICKS) {
        let x = canvas.min.x + view.to_device([t, dy.lo]).x;
        painter.line_segment([Pos2::new(x, canvas.bottom()), Pos2::new(x, canvas.bottom() + 4.0)], stroke);
        painter.text(
            Pos2::new(x, canvas.bottom() + 6.0),
            Align2::CENTER_TOP,
            axis::format_tick(t, x_step),
            font.clone(),
            colors.tick_text,
        );
    }
    let y_step = axis::nice_step(dy.width(), TICKS);
    for t in axis::ticks(dy.lo, dy.hi, TICKS) {
        let y = canvas.min.y + view.to_device([dx.lo, t]).y;
        painter.line_segment([Pos2::new(canvas.left() - 4.0, y), Pos2::new(canvas.left(), y)], stroke);
        painter.text(
            Pos2::new(canvas.left() - 6.0, y),
            Align2::RIGHT_CENTER,
            axis::format_tick(t, y_step),
            font.clone(),
            colors.tick_text,
        );
    }
    painter.rect_stroke(canvas, 0.0, stroke, egui::StrokeKind::Outside);
}
