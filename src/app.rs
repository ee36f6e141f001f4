/// Main application state and UI layout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eframe::egui;

use crate::compute::{BuiltinKernels, ComputeJob, ComputeOutput, ComputeService, PickParams};
use crate::config::ViewerConfig;
use crate::contour::glow_surface::GlowContourResources;
use crate::contour::{ContourCompositor, Magnifier};
use crate::data::peaks::{self, PeakCollection};
use crate::demo;
use crate::error::{Result, ViewError};
use crate::gui::contour_panel::{self, ContourPanelState, SharedCompositor};
use crate::gui::theme::{self, AppTheme, PlotColors};
use crate::gui::trace_panel;
use crate::history::{Edit, EditLog};
use crate::render::trace::{TraceId, TraceRole, TraceStyle};
use crate::render::{RendererEvent, TraceRenderer};
use crate::view::viewport::{Margins, Viewport};

/// Which panel fills the central area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewMode {
    Trace,
    Contour,
}

/// What an outstanding compute request was for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingJob {
    Transform,
    PickPeaks,
    Baseline,
}

pub struct ViewerApp {
    config: ViewerConfig,

    /// 1D renderer, created once the transform arrives
    trace: Option<TraceRenderer>,
    simulated: Option<TraceId>,

    contour: SharedCompositor,
    contour_state: ContourPanelState,

    compute: ComputeService,
    pending: HashMap<u64, PendingJob>,
    pick_params: PickParams,

    edits: EditLog,
    view_mode: ViewMode,
    current_theme: AppTheme,
    colors: PlotColors,

    status_message: String,
    show_log_window: bool,
}

impl ViewerApp {
    /// Fails when eframe was started without a glow context
    pub fn new(cc: &eframe::CreationContext<'_>, config: ViewerConfig) -> Result<Self> {
        let default_theme = AppTheme::Light;
        theme::apply_theme(&cc.egui_ctx, default_theme);
        let colors = PlotColors::from_theme(default_theme);

        let mut style = (*cc.egui_ctx.style()).clone();
        style.spacing.item_spacing = egui::vec2(8.0, 5.0);
        style.spacing.button_padding = egui::vec2(8.0, 4.0);
        cc.egui_ctx.set_style(style);

        let surface = cc.gl.clone().map(GlowContourResources::new).transpose()?;
        let magnifier = Magnifier {
            factor: config.magnifier_factor,
            size: config.magnifier_size,
        };
        let viewport = Viewport::new(800.0, 600.0)
            .with_margins(Margins::default())
            .with_orientation(true, true);
        let mut compositor = ContourCompositor::new(surface, viewport, magnifier)?;
        for d in demo::demo_contours(colors.contour_positive, colors.contour_negative, colors.reconstruction)? {
            compositor
                .scene_mut()
                .push(d.name, d.x_calibration, d.y_calibration, d.positive, d.negative)?;
        }
        if let Some((x0, x1, y0, y1)) = compositor.scene().domain_extent() {
            let fitted = compositor.viewport().set_domain((x0, x1), (y0, y1))?;
            compositor.set_viewport(fitted);
        }

        let mut compute = ComputeService::spawn(BuiltinKernels)?;
        let (re, im) = demo::synthetic_fid(demo::FID_POINTS, demo::PHASE_ERROR);
        let mut pending = HashMap::new();
        pending.insert(compute.submit(ComputeJob::Fft { re, im })?, PendingJob::Transform);

        log::info!("Viewer ready, waiting for the 1D transform");
        Ok(Self {
            config,
            trace: None,
            simulated: None,
            contour: Arc::new(Mutex::new(compositor)),
            contour_state: ContourPanelState::default(),
            compute,
            pending,
            pick_params: PickParams::default(),
            edits: EditLog::new(),
            view_mode: ViewMode::Trace,
            current_theme: default_theme,
            colors,
            status_message: "Transforming FID…".to_string(),
            show_log_window: false,
        })
    }

    fn report(&mut self, what: &str, result: Result<()>) {
        match result {
            Ok(()) => self.status_message = what.to_string(),
            Err(e) => {
                log::warn!("{} failed: {}", what, e);
                self.status_message = format!("{} failed: {}", what, e);
            }
        }
    }

    fn submit(&mut self, job: ComputeJob, kind: PendingJob) {
        let name = job.name();
        match self.compute.submit(job) {
            Ok(id) => {
                self.pending.insert(id, kind);
                self.status_message = format!("Running {}…", name);
            }
            Err(e) => self.report(name, Err(e)),
        }
    }

    // ---- compute responses ----

    fn poll_compute(&mut self, ctx: &egui::Context) {
        for response in self.compute.poll() {
            let Some(kind) = self.pending.remove(&response.id) else {
                log::warn!("Dropping compute response {} nobody asked for", response.id);
                continue;
            };
            let result = response
                .result
                .and_then(|output| self.accept_output(kind, output));
            let label = match kind {
                PendingJob::Transform => "Transform",
                PendingJob::PickPeaks => "Peak picking",
                PendingJob::Baseline => "Baseline estimate",
            };
            self.report(label, result);
        }
        if !self.pending.is_empty() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }

    fn accept_output(&mut self, kind: PendingJob, output: ComputeOutput) -> Result<()> {
        match (kind, output) {
            (PendingJob::Transform, ComputeOutput::Spectrum { re, im }) => {
                let spectrum = demo::spectrum_from_fft(re, im)?;
                let mut renderer = TraceRenderer::new(spectrum.to_series()?, self.config.clone())?;
                let id = renderer.primary_id();
                renderer.set_style(
                    id,
                    TraceStyle {
                        color: self.colors.spectrum_line,
                        ..TraceStyle::default()
                    },
                )?;
                log::info!("1D spectrum ready: {} points", spectrum.n_points);
                self.trace = Some(renderer);
                Ok(())
            }
            (PendingJob::PickPeaks, ComputeOutput::Peaks(found)) => {
                let trace = self.trace_mut()?;
                log::info!("{} peaks picked", found.len());
                trace.add_peaks(PeakCollection::new(found));
                Ok(())
            }
            (PendingJob::Baseline, ComputeOutput::Baseline(values)) => {
                let color = self.colors.baseline;
                let trace = self.trace_mut()?;
                let id = trace.show_baseline(values)?;
                if let Some(style) = trace.trace(id).map(|t| t.style) {
                    trace.set_style(id, TraceStyle { color, ..style })?;
                }
                Ok(())
            }
            (kind, _) => Err(ViewError::PreconditionFailed(format!(
                "unexpected compute output for {:?}",
                kind
            ))),
        }
    }

    fn trace_mut(&mut self) -> Result<&mut TraceRenderer> {
        self.trace
            .as_mut()
            .ok_or_else(|| ViewError::PreconditionFailed("no 1D spectrum loaded".into()))
    }

    // ---- renderer notifications ----

    fn handle_trace_event(&mut self, event: RendererEvent) {
        match event {
            RendererEvent::ClickAt { domain_x, domain_y } => {
                self.status_message = format!("δ {:.4} ppm, intensity {:.4}", domain_x, domain_y);
            }
            RendererEvent::PeakMoved {
                identity_index,
                domain_x,
                intensity,
            } => {
                let edit = Edit::PeakMoved {
                    identity_index,
                    domain_x,
                    intensity,
                };
                self.status_message = edit.to_string();
                self.edits.record(edit);
            }
            RendererEvent::ReferenceShifted { delta, total } => {
                let edit = Edit::ReferenceShift { delta, total };
                self.status_message = edit.to_string();
                self.edits.record(edit);
            }
        }
    }

    /// Re-colour traces after a theme switch
    fn restyle(&mut self) {
        self.colors = PlotColors::from_theme(self.current_theme);
        let colors = self.colors;
        if let Some(trace) = self.trace.as_mut() {
            let restyled: Vec<(TraceId, TraceStyle)> = trace
                .traces()
                .map(|t| {
                    let color = match t.role {
                        TraceRole::Experimental => colors.spectrum_line,
                        TraceRole::Reconstruction => colors.reconstruction,
                        TraceRole::Baseline => colors.baseline,
                        TraceRole::SimulatedPeakProfile => colors.simulated,
                    };
                    (t.id, TraceStyle { color, ..t.style })
                })
                .collect();
            for (id, style) in restyled {
                if let Err(e) = trace.set_style(id, style) {
                    log::warn!("restyle of trace {:?} failed: {}", id, e);
                }
            }
        }
    }

    // ---- side panel ----

    fn trace_controls(&mut self, ui: &mut egui::Ui) {
        let Some(trace) = self.trace.as_mut() else {
            ui.spinner();
            return;
        };
        let mut outcome: Option<(&str, Result<()>)> = None;

        ui.heading("Phase");
        if let Some(state) = trace.phase_state() {
            let mut p0 = state.phase0.to_degrees();
            let mut p1 = state.phase1.to_degrees();
            let c0 = ui
                .add(egui::DragValue::new(&mut p0).speed(0.5).prefix("ph0 ").suffix("°"))
                .changed();
            let c1 = ui
                .add(egui::DragValue::new(&mut p1).speed(0.5).prefix("ph1 ").suffix("°"))
                .changed();
            if c0 || c1 {
                if let Err(e) = trace.set_phase(p0.to_radians(), p1.to_radians()) {
                    outcome = Some(("Phase", Err(e)));
                }
            }
            match state.anchor {
                Some(a) => {
                    ui.label(format!("Pivot at {:.1}% of the trace", a * 100.0));
                    if ui.small_button("Clear pivot").clicked() {
                        trace.clear_phase_anchor();
                    }
                }
                None => {
                    ui.label(egui::RichText::new("Right click sets the pivot").small().weak());
                }
            }
            ui.horizontal(|ui| {
                if ui.button("Commit").clicked() {
                    match trace.commit_phase() {
                        Ok(s) => {
                            self.edits.record(Edit::PhaseCommit {
                                phase0: s.phase0,
                                phase1: s.phase1,
                            });
                            outcome = Some(("Phase committed", Ok(())));
                        }
                        Err(e) => outcome = Some(("Phase commit", Err(e))),
                    }
                }
                if ui.button("Discard").clicked() {
                    outcome = Some(("Phase discarded", trace.discard_phase()));
                }
            });
        } else {
            ui.label("Real-only trace");
        }

        ui.separator();
        ui.heading("Peaks");
        ui.add(
            egui::Slider::new(&mut self.pick_params.threshold_fraction, 0.01..=0.5)
                .text("threshold"),
        );
        let mut pick = false;
        let mut simulate = false;
        ui.horizontal(|ui| {
            pick = ui.button("Pick").clicked();
            if ui.button("Clear").clicked() {
                trace.remove_peaks();
            }
            simulate = ui
                .add_enabled(trace.peaks().is_some(), egui::Button::new("Simulate"))
                .clicked();
        });
        if let Some(p) = trace.peaks() {
            ui.label(format!("{} peaks", p.len()));
        }

        ui.separator();
        ui.heading("Baseline");
        let mut estimate = false;
        ui.horizontal(|ui| {
            estimate = ui.button("Estimate").clicked();
            if ui.button("Apply").clicked() {
                match trace.apply_baseline() {
                    Ok(()) => {
                        self.edits.record(Edit::BaselineApplied);
                        outcome = Some(("Baseline subtracted", Ok(())));
                    }
                    Err(e) => outcome = Some(("Baseline", Err(e))),
                }
            }
            if ui.button("Hide").clicked() {
                outcome = Some(("Baseline hidden", trace.hide_baseline()));
            }
        });

        ui.separator();
        ui.heading("Traces");
        let rows: Vec<(TraceId, TraceRole, bool)> =
            trace.traces().map(|t| (t.id, t.role, t.style.visible)).collect();
        for (id, role, visible) in rows {
            let mut v = visible;
            if ui.checkbox(&mut v, format!("{:?} #{}", role, id.0)).changed() {
                outcome = Some(("Visibility", trace.set_visible(id, v)));
            }
        }
        if ui.button("Fit to data").clicked() {
            outcome = Some(("View reset", trace.fit_to_data()));
        }

        if simulate {
            outcome = Some(("Simulated profile", self.show_simulated()));
        }
        if pick || estimate {
            let primary = self.trace.as_ref().and_then(|t| t.primary_trace().ok());
            if let Some(series) = primary.map(|t| t.series.clone()) {
                if pick {
                    let params = self.pick_params;
                    self.submit(ComputeJob::PickPeaks { series, params }, PendingJob::PickPeaks);
                } else {
                    let values = series.y().to_vec();
                    self.submit(ComputeJob::EstimateBaseline { values }, PendingJob::Baseline);
                }
            }
        }
        if let Some((what, result)) = outcome {
            self.report(what, result);
        }
    }

    /// Overlay the sum of the picked peak shapes on the primary trace
    fn show_simulated(&mut self) -> Result<()> {
        let color = self.colors.simulated;
        let previous = self.simulated.take();
        let trace = self.trace_mut()?;
        if let Some(id) = previous {
            trace.remove_trace(id)?;
        }
        let found = trace
            .peaks()
            .map(PeakCollection::snapshot)
            .ok_or_else(|| ViewError::PreconditionFailed("no peaks picked".into()))?;
        let primary = trace.primary_trace()?;
        let values = peaks::simulate(&found, primary.series.x());
        let series = primary.series.with_values(values, None)?;
        let style = TraceStyle {
            color,
            width: 1.0,
            ..primary.style
        };
        let id = trace.add_trace(series, TraceRole::SimulatedPeakProfile, style);
        self.simulated = Some(id);
        Ok(())
    }

    fn contour_controls(&mut self, ui: &mut egui::Ui) {
        let mut comp = contour_panel::lock(&self.contour);
        let mut outcome: Option<(&str, Result<()>)> = None;

        ui.heading("Magnifier");
        ui.checkbox(&mut self.contour_state.magnifier_enabled, "Show inset");
        let mut magnifier = comp.magnifier();
        let changed = ui
            .add(egui::Slider::new(&mut magnifier.factor, 1.5..=10.0).text("factor"))
            .changed()
            | ui
                .add(egui::Slider::new(&mut magnifier.size, 0.05..=0.3).text("size"))
                .changed();
        if changed {
            comp.set_magnifier(magnifier);
        }

        ui.separator();
        ui.heading("Zoom");
        ui.label(format!("History depth {}", comp.zoom_depth()));
        if ui.button("Back").clicked() && !comp.pop_zoom() {
            outcome = Some(("Zoom", Err(ViewError::PreconditionFailed("zoom history empty".into()))));
        }

        ui.separator();
        ui.heading("Spectra");
        let rows: Vec<(usize, String, bool, usize, usize)> = (0..comp.scene().len())
            .filter_map(|i| {
                let s = comp.scene().spectrum(i)?;
                let levels = s.positive.levels.groups().max(s.negative.levels.groups());
                Some((i, s.name.clone(), s.visible, s.positive.floor_index, levels))
            })
            .collect();
        for (i, name, visible, floor, levels) in rows {
            ui.horizontal(|ui| {
                let mut v = visible;
                if ui.checkbox(&mut v, &name).changed() {
                    outcome = Some(("Visibility", comp.scene_mut().set_visible(i, v)));
                }
                if ui.small_button("Front").clicked() {
                    let mut order: Vec<usize> = (0..comp.scene().len()).filter(|&j| j != i).collect();
                    order.push(i);
                    outcome = Some(("Draw order", comp.scene_mut().set_order(order)));
                }
            });
            let mut f = floor;
            if ui
                .add(egui::Slider::new(&mut f, 0..=levels.saturating_sub(1)).text("lowest level"))
                .changed()
            {
                outcome = Some(("Contour floor", comp.scene_mut().set_floor(i, f)));
            }
        }
        drop(comp);
        if let Some((what, result)) = outcome {
            self.report(what, result);
        }
    }

    fn log_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_log_window;
        let mut save = false;
        egui::Window::new("Edit History")
            .open(&mut open)
            .default_size([520.0, 360.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    save = ui.button("Save…").clicked();
                    ui.label(format!("{} edits", self.edits.len()));
                });
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.style_mut().override_font_id = Some(egui::FontId::monospace(12.0));
                    ui.label(self.edits.to_text());
                });
            });
        self.show_log_window = open;

        if save {
            if let Some(path) = rfd::FileDialog::new()
                .set_title("Save Edit History")
                .set_file_name("edits.json")
                .add_filter("JSON", &["json"])
                .add_filter("Text", &["txt"])
                .save_file()
            {
                let ext = path
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                let result = match ext.as_str() {
                    "json" => self.edits.save_json(&path),
                    _ => self.edits.save_text(&path),
                };
                let what = format!("History saved to {}", path.display());
                self.report(&what, result);
            }
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        theme::apply_theme(ctx, self.current_theme);
        self.poll_compute(ctx);

        // ── Toolbar ──
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.view_mode, ViewMode::Trace, "1D");
                ui.selectable_value(&mut self.view_mode, ViewMode::Contour, "2D");
                ui.separator();
                if ui.button(self.current_theme.label()).clicked() {
                    self.current_theme = self.current_theme.next();
                    self.restyle();
                }
                if ui.button("History").clicked() {
                    self.show_log_window = !self.show_log_window;
                }
            });
        });

        // ── Status Bar ──
        let colors = self.colors;
        egui::TopBottomPanel::bottom("status_bar")
            .frame(egui::Frame::new().inner_margin(egui::Margin::symmetric(12, 4)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(&self.status_message).size(11.5));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(
                            egui::RichText::new(format!("{} edits", self.edits.len()))
                                .size(11.0)
                                .color(colors.tick_text),
                        );
                        if !self.pending.is_empty() {
                            ui.separator();
                            ui.spinner();
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .default_width(240.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| match self.view_mode {
                    ViewMode::Trace => self.trace_controls(ui),
                    ViewMode::Contour => self.contour_controls(ui),
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| match self.view_mode {
            ViewMode::Trace => {
                let Some(trace) = self.trace.as_mut() else {
                    ui.centered_and_justified(|ui| ui.heading("Waiting for the transform…"));
                    return;
                };
                match trace_panel::show_trace_panel(ui, trace, &colors) {
                    Ok(events) => {
                        for event in events {
                            self.handle_trace_event(event);
                        }
                    }
                    Err(e) => self.report("1D view", Err(e)),
                }
            }
            ViewMode::Contour => {
                let result = contour_panel::show_contour_panel(
                    ui,
                    &self.contour,
                    &mut self.contour_state,
                    &self.config,
                    &colors,
                );
                match result {
                    Ok(Some(edit)) => {
                        self.status_message = edit.to_string();
                        self.edits.record(edit);
                    }
                    Ok(None) => {}
                    Err(e) => self.report("2D view", Err(e)),
                }
            }
        });

        if self.show_log_window {
            self.log_window(ctx);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        contour_panel::lock(&self.contour).destroy();
        self.compute.shutdown();
        log::info!("Session closed after {} edits", self.edits.len());
    }
}
