/// 1D trace renderer: owns the traces, the viewport and the interaction
/// state, and turns them into device-space frames for the painter.
///
/// Every state change bumps a generation counter. [`TraceRenderer::frame`]
/// rebuilds the cached frame whenever its generation is stale, so a burst of
/// input events costs one rebuild at paint time.

use egui::{Color32, Modifiers, PointerButton, Pos2, Rect};

use crate::config::ViewerConfig;
use crate::data::peaks::PeakCollection;
use crate::data::series::SampleSeries;
use crate::error::{Result, ViewError};
use crate::render::input::{exceeds_click_threshold, DragMode, InputEvent, InputState, RendererEvent};
use crate::render::lod::decimate;
use crate::render::peak_overlay::{LabelPolicy, PeakMarker, PeakOverlay};
use crate::render::phase::{PhaseCorrector, PhaseState};
use crate::render::trace::{Trace, TraceId, TraceRole, TraceStyle};
use crate::view::axis;
use crate::view::viewport::{Span, Viewport};

const X_TICKS: usize = 10;
const Y_TICKS: usize = 6;

/// One polyline ready to stroke
#[derive(Debug, Clone)]
pub struct TraceLine {
    pub id: TraceId,
    pub role: TraceRole,
    pub color: Color32,
    pub width: f32,
    pub points: Vec<Pos2>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Device coordinate along the axis
    pub pos: f32,
    pub label: String,
}

/// Everything the painter needs for one redraw
#[derive(Debug, Clone)]
pub struct TraceFrame {
    pub generation: u64,
    pub plot_rect: Rect,
    pub x_ticks: Vec<Tick>,
    pub y_ticks: Vec<Tick>,
    /// Back to front
    pub lines: Vec<TraceLine>,
    pub markers: Vec<PeakMarker>,
    /// Device x of the phase pivot
    pub anchor_x: Option<f32>,
}

pub struct TraceRenderer {
    config: ViewerConfig,
    viewport: Viewport,
    /// Stacking order, last is drawn on top
    traces: Vec<Trace>,
    primary: TraceId,
    next_id: u32,
    phase: Option<PhaseCorrector>,
    baseline: Option<TraceId>,
    overlay: PeakOverlay,
    input: InputState,
    generation: u64,
    frame: Option<TraceFrame>,
}

impl TraceRenderer {
    /// Renderer for a primary series. Complex series become phasable.
    pub fn new(primary: SampleSeries, config: ViewerConfig) -> Result<Self> {
        let phase = if primary.has_imaginary() {
            Some(PhaseCorrector::new(primary.clone())?)
        } else {
            None
        };
        let id = TraceId(0);
        let mut renderer = Self {
            viewport: Viewport::new(800.0, 400.0).with_margins(config.margins),
            config,
            traces: vec![Trace::new(id, primary, TraceRole::Experimental, TraceStyle::default())],
            primary: id,
            next_id: 1,
            phase,
            baseline: None,
            overlay: PeakOverlay::default(),
            input: InputState::Idle,
            generation: 0,
            frame: None,
        };
        renderer.fit_to_data()?;
        Ok(renderer)
    }

    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.touch();
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn input_state(&self) -> InputState {
        self.input
    }

    /// Show the whole primary trace with 5% vertical headroom
    pub fn fit_to_data(&mut self) -> Result<()> {
        let primary = self.primary_trace()?;
        let empty = || ViewError::EmptyInput("primary trace is empty".into());
        let (x0, x1) = match primary.series.x_extent().ok_or_else(empty)? {
            (a, b) if b > a => (a + primary.style.reference, b + primary.style.reference),
            (a, _) => (a - 0.5, a + 0.5),
        };
        let (y0, y1) = match primary.series.y_extent().ok_or_else(empty)? {
            (a, b) if b > a => {
                let (a, b) = (a * primary.style.scale, b * primary.style.scale);
                let pad = 0.05 * (b - a).abs();
                (a.min(b) - pad, a.max(b) + pad)
            }
            (a, _) => (a - 1.0, a + 1.0),
        };
        self.viewport = self.viewport.set_domain((x0, x1), (y0, y1))?;
        self.touch();
        Ok(())
    }

    /// Jump to an explicit x window
    pub fn zoom_to(&mut self, lo: f64, hi: f64) -> Result<()> {
        self.viewport = self.viewport.zoom_to((lo, hi))?;
        self.touch();
        Ok(())
    }

    // ---- traces ----

    pub fn primary_id(&self) -> TraceId {
        self.primary
    }

    fn position(&self, id: TraceId) -> Result<usize> {
        self.traces
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| ViewError::InvalidArgument(format!("unknown trace {:?}", id)))
    }

    pub fn trace(&self, id: TraceId) -> Option<&Trace> {
        self.traces.iter().find(|t| t.id == id)
    }

    pub fn primary_trace(&self) -> Result<&Trace> {
        self.trace(self.primary)
            .ok_or_else(|| ViewError::PreconditionFailed("primary trace missing".into()))
    }

    fn primary_mut(&mut self) -> Result<&mut Trace> {
        let i = self.position(self.primary)?;
        Ok(&mut self.traces[i])
    }

    /// Traces in stacking order
    pub fn traces(&self) -> impl Iterator<Item = &Trace> {
        self.traces.iter()
    }

    pub fn add_trace(&mut self, series: SampleSeries, role: TraceRole, style: TraceStyle) -> TraceId {
        let id = TraceId(self.next_id);
        self.next_id += 1;
        self.traces.push(Trace::new(id, series, role, style));
        self.touch();
        id
    }

    pub fn remove_trace(&mut self, id: TraceId) -> Result<()> {
        if id == self.primary {
            return Err(ViewError::InvalidArgument("the primary trace cannot be removed".into()));
        }
        let i = self.position(id)?;
        self.traces.remove(i);
        if self.baseline == Some(id) {
            self.baseline = None;
        }
        self.touch();
        Ok(())
    }

    pub fn set_style(&mut self, id: TraceId, style: TraceStyle) -> Result<()> {
        let i = self.position(id)?;
        self.traces[i].style = style;
        self.touch();
        Ok(())
    }

    pub fn set_visible(&mut self, id: TraceId, visible: bool) -> Result<()> {
        let i = self.position(id)?;
        self.traces[i].style.visible = visible;
        self.touch();
        Ok(())
    }

    /// Move a trace to the top of the stack
    pub fn raise(&mut self, id: TraceId) -> Result<()> {
        let i = self.position(id)?;
        let trace = self.traces.remove(i);
        self.traces.push(trace);
        self.touch();
        Ok(())
    }

    /// Shift the primary trace along x by `delta` domain units
    pub fn shift_reference(&mut self, delta: f64) -> Result<()> {
        crate::error::ensure_finite("reference delta", delta)?;
        self.primary_mut()?.style.reference += delta;
        self.touch();
        Ok(())
    }

    /// Multiply the primary trace's vertical scale
    pub fn scale_primary(&mut self, factor: f64) -> Result<()> {
        crate::error::ensure_finite("scale factor", factor)?;
        self.primary_mut()?.style.scale *= factor;
        self.touch();
        Ok(())
    }

    // ---- baseline ----

    /// Overlay a baseline estimate on the primary trace
    pub fn show_baseline(&mut self, values: Vec<f64>) -> Result<TraceId> {
        let primary = self.primary_trace()?;
        if values.len() != primary.series.len() {
            return Err(ViewError::InvalidArgument(format!(
                "baseline has {} points, trace has {}",
                values.len(),
                primary.series.len()
            )));
        }
        let series = primary.series.with_values(values, None)?;
        let style = TraceStyle {
            color: Color32::from_rgb(0xB8, 0x3A, 0x3A),
            width: 1.0,
            reference: primary.style.reference,
            scale: primary.style.scale,
            visible: true,
        };
        if let Some(id) = self.baseline {
            let i = self.position(id)?;
            self.traces[i].series = series;
            self.traces[i].style = style;
            self.touch();
            return Ok(id);
        }
        let id = self.add_trace(series, TraceRole::Baseline, style);
        self.baseline = Some(id);
        Ok(id)
    }

    pub fn hide_baseline(&mut self) -> Result<()> {
        match self.baseline {
            Some(id) => self.remove_trace(id),
            None => Ok(()),
        }
    }

    /// Subtract the shown baseline from the primary trace.
    /// Pending phase angles are folded into the new original.
    pub fn apply_baseline(&mut self) -> Result<()> {
        let id = self
            .baseline
            .ok_or_else(|| ViewError::PreconditionFailed("no baseline shown".into()))?;
        let baseline = self.position(id)?;
        let primary = self.primary_trace()?;
        let corrected: Vec<f64> = primary
            .series
            .y()
            .iter()
            .zip(self.traces[baseline].series.y())
            .map(|(y, b)| y - b)
            .collect();
        let series = primary
            .series
            .with_values(corrected, primary.series.z().map(<[f64]>::to_vec))?;
        if let Some(phase) = &mut self.phase {
            phase.reset(series.clone())?;
        }
        self.primary_mut()?.series = series;
        self.remove_trace(id)?;
        log::info!("Baseline subtracted from primary trace");
        Ok(())
    }

    // ---- phase ----

    fn phase_mut(&mut self) -> Result<&mut PhaseCorrector> {
        self.phase.as_mut().ok_or_else(|| {
            ViewError::InvalidArgument("primary trace has no imaginary part".into())
        })
    }

    pub fn phase_state(&self) -> Option<PhaseState> {
        self.phase.as_ref().map(PhaseCorrector::state)
    }

    fn sync_phased(&mut self) -> Result<()> {
        let working = match &self.phase {
            Some(p) => p.working().clone(),
            None => return Ok(()),
        };
        self.primary_mut()?.series = working;
        self.touch();
        Ok(())
    }

    pub fn set_phase(&mut self, phase0: f64, phase1: f64) -> Result<()> {
        self.phase_mut()?.set(phase0, phase1)?;
        self.sync_phased()
    }

    pub fn nudge_phase(&mut self, delta: f64) -> Result<()> {
        self.phase_mut()?.nudge(delta)?;
        self.sync_phased()
    }

    /// Pivot first-order changes around the sample nearest `domain_x`
    pub fn set_phase_anchor_at(&mut self, domain_x: f64) -> Result<()> {
        let primary = self.primary_trace()?;
        let n = primary.series.len();
        let index = primary
            .nearest_index(domain_x)
            .ok_or_else(|| ViewError::EmptyInput("primary trace is empty".into()))?;
        let fraction = index as f64 / n as f64;
        self.phase_mut()?.set_anchor(fraction)?;
        self.touch();
        Ok(())
    }

    pub fn clear_phase_anchor(&mut self) {
        if let Some(p) = &mut self.phase {
            p.clear_anchor();
            self.touch();
        }
    }

    pub fn commit_phase(&mut self) -> Result<PhaseState> {
        let committed = self.phase_mut()?.commit();
        self.touch();
        Ok(committed)
    }

    pub fn discard_phase(&mut self) -> Result<()> {
        self.phase_mut()?.discard();
        self.sync_phased()
    }

    // ---- peaks ----

    pub fn add_peaks(&mut self, collection: PeakCollection) {
        self.overlay.add(collection);
        self.touch();
    }

    pub fn remove_peaks(&mut self) {
        self.overlay.remove();
        if matches!(self.input, InputState::DraggingPeak { .. }) {
            self.input = InputState::Idle;
        }
        self.touch();
    }

    pub fn peaks(&self) -> Option<&PeakCollection> {
        self.overlay.collection()
    }

    // ---- input ----

    /// Single entry point for pointer, wheel and resize input
    pub fn handle_input(&mut self, event: InputEvent) -> Result<Option<RendererEvent>> {
        match event {
            InputEvent::PointerDown {
                pos,
                button,
                modifiers,
            } => self.pointer_down(pos, button, modifiers),
            InputEvent::PointerMove { pos } => self.pointer_move(pos),
            InputEvent::PointerUp { pos, .. } => self.pointer_up(pos),
            InputEvent::Wheel {
                pos,
                delta,
                modifiers,
            } => self.wheel(pos, delta, modifiers),
            InputEvent::Resize { width, height } => {
                self.viewport = self.viewport.resize(width as f64, height as f64);
                self.touch();
                Ok(None)
            }
        }
    }

    fn pointer_down(
        &mut self,
        pos: Pos2,
        button: PointerButton,
        modifiers: Modifiers,
    ) -> Result<Option<RendererEvent>> {
        match button {
            PointerButton::Primary => {
                let hit = self.overlay.hit_test(
                    &self.viewport,
                    self.primary_trace()?,
                    pos,
                    self.config.marker_hit_radius_px,
                );
                self.input = match hit {
                    Some(identity_index) => {
                        self.overlay.begin_drag(identity_index)?;
                        InputState::DraggingPeak {
                            identity_index,
                            press: pos,
                            moved: false,
                        }
                    }
                    None => InputState::Panning {
                        press: pos,
                        last: pos,
                        moved: false,
                        mode: if modifiers.alt {
                            DragMode::Reference {
                                start_reference: self.primary_trace()?.style.reference,
                            }
                        } else {
                            DragMode::View
                        },
                    },
                };
            }
            PointerButton::Secondary => {
                if self.phase.is_some() && self.viewport.contains_device(pos) {
                    let x = self.viewport.to_domain(pos)[0];
                    self.set_phase_anchor_at(x)?;
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn pointer_move(&mut self, pos: Pos2) -> Result<Option<RendererEvent>> {
        let threshold = self.config.click_threshold_px;
        match self.input {
            InputState::Idle => {}
            InputState::Panning {
                press,
                last,
                moved,
                mode,
            } => {
                // delta against the window as it is now, not at press time
                let d = self.viewport.drag_delta(last, pos);
                match mode {
                    DragMode::View => {
                        self.viewport = self.viewport.pan(d[0], d[1]);
                        self.touch();
                    }
                    DragMode::Reference { .. } => self.shift_reference(-d[0])?,
                }
                self.input = InputState::Panning {
                    press,
                    last: pos,
                    moved: moved || exceeds_click_threshold(press, pos, threshold),
                    mode,
                };
            }
            InputState::DraggingPeak {
                identity_index,
                press,
                moved,
            } => {
                let moved = moved || exceeds_click_threshold(press, pos, threshold);
                if moved {
                    let x = self.viewport.to_domain(pos)[0];
                    let primary = self.primary_trace()?;
                    let intensity = primary.value_at(x).unwrap_or(0.0);
                    let stored_x = x - primary.style.reference;
                    self.overlay.drag_to(stored_x, intensity)?;
                    self.touch();
                }
                self.input = InputState::DraggingPeak {
                    identity_index,
                    press,
                    moved,
                };
            }
        }
        Ok(None)
    }

    fn pointer_up(&mut self, pos: Pos2) -> Result<Option<RendererEvent>> {
        let state = std::mem::take(&mut self.input);
        let [domain_x, domain_y] = self.viewport.to_domain(pos);
        let click = RendererEvent::ClickAt { domain_x, domain_y };
        let event = match state {
            InputState::Idle => None,
            InputState::Panning { moved: false, .. } => Some(click),
            InputState::Panning {
                mode: DragMode::Reference { start_reference },
                ..
            } => {
                let total = self.primary_trace()?.style.reference;
                log::info!("Reference shifted by {:.4}", total - start_reference);
                Some(RendererEvent::ReferenceShifted {
                    delta: total - start_reference,
                    total,
                })
            }
            InputState::Panning { .. } => None,
            InputState::DraggingPeak { moved, .. } => {
                let released = self.overlay.release()?;
                self.touch();
                if moved {
                    released
                } else {
                    Some(click)
                }
            }
        };
        Ok(event)
    }

    fn wheel(&mut self, pos: Pos2, delta: f32, modifiers: Modifiers) -> Result<Option<RendererEvent>> {
        if delta == 0.0 {
            return Ok(None);
        }
        let up = delta > 0.0;
        if modifiers.alt {
            let step = self.config.scale_step;
            return self.scale_primary(if up { step } else { 2.0 - step }).map(|_| None);
        }
        if modifiers.shift || modifiers.ctrl {
            if self.phase.is_none() {
                log::debug!("phase wheel ignored: primary trace is real");
                return Ok(None);
            }
            let step = if modifiers.ctrl {
                self.config.phase_step_fine
            } else {
                self.config.phase_step_coarse
            };
            return self.nudge_phase(if up { step } else { -step }).map(|_| None);
        }

        let factor = if up {
            self.config.wheel_zoom_in
        } else {
            self.config.wheel_zoom_out
        };
        let plot = self.viewport.plot_rect();
        let anchor = self.viewport.to_domain(pos);
        let zoomed = if pos.x < plot.left() && pos.y >= plot.top() && pos.y <= plot.bottom() {
            self.viewport.zoom(anchor, 1.0, factor)
        } else if plot.contains(pos) {
            self.viewport.zoom(anchor, factor, 1.0)
        } else {
            return Ok(None);
        };
        self.viewport = zoomed.clamp_degenerate(self.config.min_domain_span);
        self.touch();
        Ok(None)
    }

    // ---- drawing ----

    /// Current frame, rebuilt if any state changed since it was built
    pub fn frame(&mut self) -> Result<&TraceFrame> {
        let frame = match self.frame.take() {
            Some(f) if f.generation == self.generation => f,
            _ => self.build_frame()?,
        };
        Ok(self.frame.insert(frame))
    }

    fn build_frame(&self) -> Result<TraceFrame> {
        let mut view = self.viewport;
        if view.is_degenerate() {
            log::debug!("degenerate viewport, widening before redraw");
            view = view.clamp_degenerate(self.config.min_domain_span);
        }
        let plot_rect = view.plot_rect();
        let mut frame = TraceFrame {
            generation: self.generation,
            plot_rect,
            x_ticks: Vec::new(),
            y_ticks: Vec::new(),
            lines: Vec::new(),
            markers: Vec::new(),
            anchor_x: None,
        };
        if view.is_degenerate() {
            log::debug!("plot area is empty, nothing drawn");
            return Ok(frame);
        }

        let dx = view.domain_x();
        let dy = view.domain_y();
        frame.x_ticks = ticks_along(dx, X_TICKS, |t| view.to_device([t, dy.lo]).x);
        frame.y_ticks = ticks_along(dy, Y_TICKS, |t| view.to_device([dx.lo, t]).y);

        let cap = self.config.lod_cap_for_width(plot_rect.width() as f64);
        for trace in self.traces.iter().filter(|t| t.style.visible) {
            let lod = decimate(&trace.series, trace.source_window(dx), cap)?;
            frame.lines.push(TraceLine {
                id: trace.id,
                role: trace.role,
                color: trace.style.color,
                width: trace.style.width,
                points: lod
                    .points()
                    .map(|p| view.to_device(trace.display_point(p)))
                    .collect(),
            });
        }

        let primary = self.primary_trace()?;
        let policy = LabelPolicy {
            width_multiple: self.config.label_width_multiple,
            edge_margin_px: self.config.label_edge_margin_px,
        };
        frame.markers = self.overlay.markers(&view, primary, &policy);

        if let Some(a) = self.phase.as_ref().and_then(|p| p.state().anchor) {
            let n = primary.series.len();
            let i = ((a * n as f64).round() as usize).min(n.saturating_sub(1));
            if let Some(&x) = primary.series.x().get(i) {
                let shown = x + primary.style.reference;
                if dx.contains(shown) {
                    frame.anchor_x = Some(view.to_device([shown, dy.lo]).x);
                }
            }
        }

        log::debug!(
            "frame {}: {} lines, {} markers",
            frame.generation,
            frame.lines.len(),
            frame.markers.len()
        );
        Ok(frame)
    }
}

fn ticks_along(span: Span, max_ticks: usize, to_device: impl Fn(f64) -> f32) -> Vec<Tick> {
    let step = axis::nice_step(span.width(), max_ticks);
    axis::ticks(span.lo, span.hi, max_ticks)
        .into_iter()
        .map(|t| Tick {
            pos: to_device(t),
            label: axis::format_tick(t, step),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::peaks::Peak;

    fn real_ramp(n: usize) -> SampleSeries {
        // ppm-style: 10 → 0
        let step = -10.0 / (n - 1) as f64;
        SampleSeries::from_uniform(10.0, step, (0..n).map(|i| i as f64).collect(), None).unwrap()
    }

    fn complex(n: usize) -> SampleSeries {
        let step = -10.0 / (n - 1) as f64;
        let y = (0..n).map(|i| (i as f64 * 0.1).cos()).collect();
        let z = (0..n).map(|i| (i as f64 * 0.1).sin()).collect();
        SampleSeries::from_uniform(10.0, step, y, Some(z)).unwrap()
    }

    fn renderer(series: SampleSeries) -> TraceRenderer {
        // plot area: x 70..790, y 10..360
        TraceRenderer::new(series, ViewerConfig::default()).unwrap()
    }

    fn down(pos: Pos2, modifiers: Modifiers) -> InputEvent {
        InputEvent::PointerDown {
            pos,
            button: PointerButton::Primary,
            modifiers,
        }
    }

    fn up(pos: Pos2) -> InputEvent {
        InputEvent::PointerUp {
            pos,
            button: PointerButton::Primary,
        }
    }

    fn wheel(pos: Pos2, delta: f32, modifiers: Modifiers) -> InputEvent {
        InputEvent::Wheel {
            pos,
            delta,
            modifiers,
        }
    }

    #[test]
    fn test_empty_primary_is_rejected() {
        let empty = SampleSeries::new(Vec::new(), Vec::new(), None).unwrap();
        let r = TraceRenderer::new(empty, ViewerConfig::default());
        assert!(matches!(r, Err(ViewError::EmptyInput(_))));
    }

    #[test]
    fn test_press_release_in_place_is_click() {
        let mut r = renderer(real_ramp(101));
        let p = egui::pos2(430.0, 185.0);
        r.handle_input(down(p, Modifiers::NONE)).unwrap();
        r.handle_input(InputEvent::PointerMove { pos: egui::pos2(431.0, 185.0) }).unwrap();
        let ev = r.handle_input(up(egui::pos2(431.0, 185.0))).unwrap();
        match ev {
            Some(RendererEvent::ClickAt { domain_x, .. }) => assert!((domain_x - 5.0).abs() < 0.1),
            other => panic!("expected click, got {:?}", other),
        }
        assert!(r.input_state().is_idle());
    }

    #[test]
    fn test_drag_pans_and_emits_nothing() {
        let mut r = renderer(real_ramp(101));
        let before = r.viewport().domain_x();
        r.handle_input(down(egui::pos2(300.0, 100.0), Modifiers::NONE)).unwrap();
        r.handle_input(InputEvent::PointerMove { pos: egui::pos2(372.0, 100.0) }).unwrap();
        let ev = r.handle_input(up(egui::pos2(372.0, 100.0))).unwrap();
        assert_eq!(ev, None);
        // 72 px of 720 px on a 10 ppm window, ppm axis
        let after = r.viewport().domain_x();
        assert!((after.lo - (before.lo + 1.0)).abs() < 1e-4);
    }

    #[test]
    fn test_wheel_in_plot_zooms_x_only() {
        let mut r = renderer(real_ramp(101));
        let y = r.viewport().domain_y();
        r.handle_input(wheel(egui::pos2(430.0, 185.0), 1.0, Modifiers::NONE)).unwrap();
        assert!((r.viewport().domain_x().width() - 9.0).abs() < 1e-6);
        assert_eq!(r.viewport().domain_y(), y);
    }

    #[test]
    fn test_wheel_in_left_margin_zooms_y_only() {
        let mut r = renderer(real_ramp(101));
        let x = r.viewport().domain_x();
        let height = r.viewport().domain_y().width();
        r.handle_input(wheel(egui::pos2(30.0, 185.0), -1.0, Modifiers::NONE)).unwrap();
        assert_eq!(r.viewport().domain_x(), x);
        assert!((r.viewport().domain_y().width() - height * 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_alt_wheel_scales_primary() {
        let mut r = renderer(real_ramp(11));
        r.handle_input(wheel(egui::pos2(430.0, 185.0), 1.0, Modifiers::ALT)).unwrap();
        assert!((r.primary_trace().unwrap().style.scale - 1.01).abs() < 1e-12);
    }

    #[test]
    fn test_shift_wheel_nudges_phase_only_for_complex() {
        let mut real = renderer(real_ramp(11));
        real.handle_input(wheel(egui::pos2(430.0, 185.0), 1.0, Modifiers::SHIFT)).unwrap();
        assert!(real.phase_state().is_none());

        let mut r = renderer(complex(64));
        r.handle_input(wheel(egui::pos2(430.0, 185.0), 1.0, Modifiers::SHIFT)).unwrap();
        r.handle_input(wheel(egui::pos2(430.0, 185.0), -1.0, Modifiers::CTRL)).unwrap();
        let state = r.phase_state().unwrap();
        assert!((state.phase0 - (0.0175 - 0.00175)).abs() < 1e-12);
        assert_ne!(r.primary_trace().unwrap().series.y()[0], 1.0);
    }

    #[test]
    fn test_secondary_click_sets_anchor() {
        let mut r = renderer(complex(101));
        r.handle_input(InputEvent::PointerDown {
            pos: egui::pos2(430.0, 185.0),
            button: PointerButton::Secondary,
            modifiers: Modifiers::NONE,
        })
        .unwrap();
        let anchor = r.phase_state().unwrap().anchor.unwrap();
        assert!((anchor - 0.5).abs() < 0.02);
        assert!(r.frame().unwrap().anchor_x.is_some());
    }

    #[test]
    fn test_alt_drag_shifts_reference() {
        let mut r = renderer(real_ramp(101));
        let domain = r.viewport().domain_x();
        r.handle_input(down(egui::pos2(300.0, 100.0), Modifiers::ALT)).unwrap();
        r.handle_input(InputEvent::PointerMove { pos: egui::pos2(228.0, 100.0) }).unwrap();
        let ev = r.handle_input(up(egui::pos2(228.0, 100.0))).unwrap();
        // dragging left on a ppm axis moves the trace to larger values
        match ev {
            Some(RendererEvent::ReferenceShifted { delta, total }) => {
                assert!((delta - 1.0).abs() < 1e-4);
                assert_eq!(delta, total);
            }
            other => panic!("expected reference shift, got {:?}", other),
        }
        assert_eq!(r.viewport().domain_x(), domain);
    }

    #[test]
    fn test_peak_drag_emits_single_update() {
        let mut r = renderer(real_ramp(101));
        let peaks = PeakCollection::new(vec![Peak::new(4, 5.0, 50.0)]);
        r.add_peaks(peaks.clone());
        let start = r.viewport().to_device([5.0, 50.0]);
        r.handle_input(down(start, Modifiers::NONE)).unwrap();
        assert!(matches!(r.input_state(), InputState::DraggingPeak { identity_index: 4, .. }));
        let target = egui::pos2(start.x + 72.0, start.y);
        r.handle_input(InputEvent::PointerMove { pos: target }).unwrap();
        let ev = r.handle_input(up(target)).unwrap();
        match ev {
            Some(RendererEvent::PeakMoved {
                identity_index,
                domain_x,
                intensity,
            }) => {
                assert_eq!(identity_index, 4);
                assert!((domain_x - 4.0).abs() < 1e-3);
                assert_eq!(intensity, 60.0);
            }
            other => panic!("expected peak move, got {:?}", other),
        }
        let stored = peaks.get(4).unwrap();
        assert_eq!(stored.identity_index, 4);
        assert!((stored.domain_x - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_baseline_length_mismatch_and_apply() {
        let mut r = renderer(real_ramp(11));
        assert!(matches!(
            r.show_baseline(vec![0.0; 3]),
            Err(ViewError::InvalidArgument(_))
        ));
        assert!(r.apply_baseline().is_err());
        r.show_baseline(vec![1.0; 11]).unwrap();
        assert_eq!(r.traces().count(), 2);
        r.apply_baseline().unwrap();
        assert_eq!(r.traces().count(), 1);
        assert_eq!(r.primary_trace().unwrap().series.y()[3], 2.0);
    }

    #[test]
    fn test_frame_cached_until_state_changes() {
        let mut r = renderer(real_ramp(101));
        let g = r.frame().unwrap().generation;
        assert_eq!(r.frame().unwrap().generation, g);
        r.shift_reference(0.1).unwrap();
        assert_ne!(r.frame().unwrap().generation, g);
    }

    #[test]
    fn test_each_trace_decimated_independently() {
        let mut r = renderer(real_ramp(100_000));
        let small = SampleSeries::from_uniform(9.0, -0.08, vec![0.0; 101], None).unwrap();
        let aux = r.add_trace(small, TraceRole::Reconstruction, TraceStyle::default());
        let hidden = r.add_trace(real_ramp(50), TraceRole::SimulatedPeakProfile, TraceStyle::default());
        r.set_visible(hidden, false).unwrap();
        let frame = r.frame().unwrap();
        assert_eq!(frame.lines.len(), 2);
        // cap = 2 px⁻¹ × 720 px; 100000 points clamp to stride 4
        assert_eq!(frame.lines[0].points.len(), 25_000);
        assert_eq!(frame.lines[1].id, aux);
        assert_eq!(frame.lines[1].points.len(), 101);
        assert!(!frame.x_ticks.is_empty());
    }

    #[test]
    fn test_raise_reorders_stack() {
        let mut r = renderer(real_ramp(11));
        let aux = r.add_trace(real_ramp(11), TraceRole::Reconstruction, TraceStyle::default());
        r.raise(r.primary_id()).unwrap();
        let order: Vec<TraceId> = r.traces().map(|t| t.id).collect();
        assert_eq!(order, vec![aux, r.primary_id()]);
        assert!(r.remove_trace(r.primary_id()).is_err());
    }

    #[test]
    fn test_phase_commit_and_discard() {
        let mut r = renderer(complex(32));
        r.set_phase(0.5, 0.5).unwrap();
        let committed = r.commit_phase().unwrap();
        assert_eq!(committed.phase0, 0.5);
        let after_commit = r.primary_trace().unwrap().series.clone();
        r.set_phase(0.2, 0.1).unwrap();
        r.discard_phase().unwrap();
        assert_eq!(r.primary_trace().unwrap().series, after_commit);

        let mut real = renderer(real_ramp(4));
        assert!(matches!(real.set_phase(0.1, 0.1), Err(ViewError::InvalidArgument(_))));
    }
}
