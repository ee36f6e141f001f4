/// 1D spectrum panel: routes egui input into the trace renderer and paints
/// its frames with the egui painter.

use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Shape, Stroke, Vec2};

use crate::error::Result;
use crate::gui::theme::PlotColors;
use crate::render::input::{InputEvent, RendererEvent};
use crate::render::trace_renderer::{TraceFrame, TraceRenderer};

const MARKER_RADIUS: f32 = 3.5;

/// Translate raw egui events into renderer input, in coordinates local to
/// `rect`. Presses and wheel ticks only count inside `rect`; moves and
/// releases are forwarded while a gesture is in progress so drags survive
/// leaving the panel.
pub fn collect_input(
    events: &[egui::Event],
    rect: Rect,
    hover: Option<Pos2>,
    gesture_active: bool,
) -> Vec<InputEvent> {
    let local = |p: Pos2| (p - rect.min).to_pos2();
    let mut active = gesture_active;
    let mut last_hover = hover;
    let mut out = Vec::new();

    for event in events {
        match *event {
            egui::Event::PointerMoved(pos) => {
                last_hover = Some(pos);
                if active || rect.contains(pos) {
                    out.push(InputEvent::PointerMove { pos: local(pos) });
                }
            }
            egui::Event::PointerButton {
                pos,
                button,
                pressed: true,
                modifiers,
            } => {
                if rect.contains(pos) {
                    if button == egui::PointerButton::Primary {
                        active = true;
                    }
                    out.push(InputEvent::PointerDown {
                        pos: local(pos),
                        button,
                        modifiers,
                    });
                }
            }
            egui::Event::PointerButton {
                pos,
                button,
                pressed: false,
                ..
            } => {
                if active && button == egui::PointerButton::Primary {
                    active = false;
                    out.push(InputEvent::PointerUp {
                        pos: local(pos),
                        button,
                    });
                }
            }
            egui::Event::MouseWheel {
                delta, modifiers, ..
            } => {
                // some platforms turn shift+wheel into a horizontal scroll
                let delta = if delta.y != 0.0 { delta.y } else { delta.x };
                if let Some(pos) = last_hover.filter(|p| rect.contains(*p)) {
                    out.push(InputEvent::Wheel {
                        pos: local(pos),
                        delta,
                        modifiers,
                    });
                }
            }
            _ => {}
        }
    }
    out
}

/// Lay out, feed input and paint one 1D panel filling the available space.
/// Returns the notifications the renderer emitted this frame.
pub fn show_trace_panel(
    ui: &mut egui::Ui,
    renderer: &mut TraceRenderer,
    colors: &PlotColors,
) -> Result<Vec<RendererEvent>> {
    let size = ui.available_size().max(Vec2::new(200.0, 120.0));
    let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
    let rect = response.rect;

    let (w, h) = renderer.viewport().device_size();
    if (w - rect.width() as f64).abs() > 0.5 || (h - rect.height() as f64).abs() > 0.5 {
        renderer.handle_input(InputEvent::Resize {
            width: rect.width(),
            height: rect.height(),
        })?;
    }

    let (events, hover) = ui.input(|i| (i.events.clone(), i.pointer.hover_pos()));
    let gesture_active = !renderer.input_state().is_idle();
    let mut emitted = Vec::new();
    for input in collect_input(&events, rect, hover, gesture_active) {
        if let Some(event) = renderer.handle_input(input)? {
            emitted.push(event);
        }
    }

    let frame = renderer.frame()?;
    paint_frame(&painter, frame, rect.min.to_vec2(), colors);
    Ok(emitted)
}

fn paint_frame(painter: &egui::Painter, frame: &TraceFrame, offset: Vec2, colors: &PlotColors) {
    let plot = frame.plot_rect.translate(offset);
    let font = FontId::proportional(11.0);

    painter.rect_filled(plot, 0.0, colors.plot_bg);
    for tick in &frame.x_ticks {
        let x = tick.pos + offset.x;
        painter.line_segment([Pos2::new(x, plot.top()), Pos2::new(x, plot.bottom())], Stroke::new(1.0, colors.grid));
        painter.line_segment([Pos2::new(x, plot.bottom()), Pos2::new(x, plot.bottom() + 4.0)], Stroke::new(1.0, colors.frame));
        painter.text(
            Pos2::new(x, plot.bottom() + 6.0),
            Align2::CENTER_TOP,
            &tick.label,
            font.clone(),
            colors.tick_text,
        );
    }
    for tick in &frame.y_ticks {
        let y = tick.pos + offset.y;
        painter.line_segment([Pos2::new(plot.left(), y), Pos2::new(plot.right(), y)], Stroke::new(1.0, colors.grid));
        painter.line_segment([Pos2::new(plot.left() - 4.0, y), Pos2::new(plot.left(), y)], Stroke::new(1.0, colors.frame));
        painter.text(
            Pos2::new(plot.left() - 6.0, y),
            Align2::RIGHT_CENTER,
            &tick.label,
            font.clone(),
            colors.tick_text,
        );
    }

    let clipped = painter.with_clip_rect(plot);
    for line in &frame.lines {
        if line.points.len() < 2 {
            continue;
        }
        let points = line.points.iter().map(|p| *p + offset).collect();
        clipped.add(Shape::line(points, Stroke::new(line.width, line.color)));
    }

    if let Some(x) = frame.anchor_x {
        let x = x + offset.x;
        clipped.add(Shape::dashed_line(
            &[Pos2::new(x, plot.top()), Pos2::new(x, plot.bottom())],
            Stroke::new(1.0, colors.phase_anchor),
            6.0,
            4.0,
        ));
    }

    for marker in &frame.markers {
        let pos = marker.pos + offset;
        let fill = if marker.dragging {
            colors.peak_label
        } else {
            colors.peak_marker
        };
        clipped.circle_filled(pos, MARKER_RADIUS, fill);
        if let Some(label) = &marker.label {
            clipped.line_segment(
                [pos - Vec2::new(0.0, 6.0), pos - Vec2::new(0.0, 18.0)],
                Stroke::new(1.0, colors.peak_label),
            );
            clipped.text(
                pos - Vec2::new(0.0, 20.0),
                Align2::CENTER_BOTTOM,
                label,
                font.clone(),
                colors.peak_label,
            );
        }
    }

    painter.rect_stroke(plot, 0.0, Stroke::new(1.0, colors.frame), egui::StrokeKind::Inside);
    if frame.lines.is_empty() {
        painter.text(plot.center(), Align2::CENTER_CENTER, "no visible traces", font, Color32::GRAY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{Modifiers, PointerButton};

    fn panel() -> Rect {
        Rect::from_min_size(Pos2::new(100.0, 50.0), Vec2::new(400.0, 200.0))
    }

    fn button(x: f32, y: f32, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos: Pos2::new(x, y),
            button: PointerButton::Primary,
            pressed,
            modifiers: Modifiers::NONE,
        }
    }

    #[test]
    fn test_positions_are_panel_local() {
        let events = [button(150.0, 60.0, true)];
        let out = collect_input(&events, panel(), None, false);
        assert_eq!(
            out,
            vec![InputEvent::PointerDown {
                pos: Pos2::new(50.0, 10.0),
                button: PointerButton::Primary,
                modifiers: Modifiers::NONE,
            }]
        );
    }

    #[test]
    fn test_drag_continues_outside_panel() {
        let events = [
            button(150.0, 60.0, true),
            egui::Event::PointerMoved(Pos2::new(700.0, 60.0)),
            button(700.0, 60.0, false),
        ];
        let out = collect_input(&events, panel(), None, false);
        assert_eq!(out.len(), 3);
        assert!(matches!(out[2], InputEvent::PointerUp { pos, .. } if (pos.x - 600.0).abs() < 1e-4));
    }

    #[test]
    fn test_outside_press_and_move_are_ignored() {
        let events = [
            button(10.0, 10.0, true),
            egui::Event::PointerMoved(Pos2::new(20.0, 20.0)),
            button(20.0, 20.0, false),
        ];
        assert!(collect_input(&events, panel(), None, false).is_empty());
    }

    #[test]
    fn test_wheel_uses_last_hover_position() {
        let events = [
            egui::Event::PointerMoved(Pos2::new(200.0, 100.0)),
            egui::Event::MouseWheel {
                unit: egui::MouseWheelUnit::Line,
                delta: Vec2::new(0.0, 1.0),
                modifiers: Modifiers::NONE,
            },
        ];
        let out = collect_input(&events, panel(), None, false);
        assert_eq!(out.len(), 2);
        assert!(matches!(out[1], InputEvent::Wheel { pos, delta, .. }
            if pos == Pos2::new(100.0, 50.0) && delta > 0.0));
    }
}
