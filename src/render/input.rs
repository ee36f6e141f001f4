/// Pointer and wheel input for the 1D renderer, plus the events it emits.

use egui::{Modifiers, PointerButton, Pos2};

/// Raw input routed into [`crate::render::trace_renderer::TraceRenderer::handle_input`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown {
        pos: Pos2,
        button: PointerButton,
        modifiers: Modifiers,
    },
    PointerMove {
        pos: Pos2,
    },
    PointerUp {
        pos: Pos2,
        button: PointerButton,
    },
    /// `delta > 0` scrolls up (zoom in)
    Wheel {
        pos: Pos2,
        delta: f32,
        modifiers: Modifiers,
    },
    Resize {
        width: f32,
        height: f32,
    },
}

/// What a drag manipulates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragMode {
    /// Pan the visible window
    View,
    /// Shift the primary trace's reference along x
    Reference { start_reference: f64 },
}

/// Interaction state machine
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InputState {
    #[default]
    Idle,
    Panning {
        press: Pos2,
        last: Pos2,
        moved: bool,
        mode: DragMode,
    },
    DraggingPeak {
        identity_index: usize,
        press: Pos2,
        moved: bool,
    },
}

impl InputState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InputState::Idle)
    }
}

/// Notifications for the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RendererEvent {
    /// Press and release without a drag
    ClickAt { domain_x: f64, domain_y: f64 },
    /// A dragged peak marker was released at a new position
    PeakMoved {
        identity_index: usize,
        domain_x: f64,
        intensity: f64,
    },
    /// An Alt-drag finished; `total` is the primary's accumulated reference
    ReferenceShifted { delta: f64, total: f64 },
}

/// True once the pointer left the click radius around the press point
pub fn exceeds_click_threshold(press: Pos2, pos: Pos2, threshold_px: f32) -> bool {
    press.distance(pos) > threshold_px
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_threshold() {
        let p = egui::pos2(10.0, 10.0);
        assert!(!exceeds_click_threshold(p, egui::pos2(12.0, 11.0), 3.0));
        assert!(exceeds_click_threshold(p, egui::pos2(14.0, 10.0), 3.0));
    }

    #[test]
    fn test_default_state_is_idle() {
        assert!(InputState::default().is_idle());
    }
}
