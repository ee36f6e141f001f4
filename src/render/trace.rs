/// Traces: a sample series plus how it is drawn.

use egui::Color32;

use crate::data::series::{Direction, SampleSeries};
use crate::view::viewport::Span;

/// Stable handle for a trace inside a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(pub u32);

/// What a trace represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceRole {
    Experimental,
    Reconstruction,
    Baseline,
    SimulatedPeakProfile,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceStyle {
    pub color: Color32,
    /// Stroke width in points
    pub width: f32,
    pub visible: bool,
    /// Vertical multiplier applied at draw time
    pub scale: f64,
    /// Domain shift applied at draw time
    pub reference: f64,
}

impl Default for TraceStyle {
    fn default() -> Self {
        Self {
            color: Color32::from_rgb(0x1A, 0x3A, 0x6B),
            width: 1.2,
            visible: true,
            scale: 1.0,
            reference: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trace {
    pub id: TraceId,
    pub series: SampleSeries,
    pub style: TraceStyle,
    pub role: TraceRole,
}

impl Trace {
    pub fn new(id: TraceId, series: SampleSeries, role: TraceRole, style: TraceStyle) -> Self {
        Self {
            id,
            series,
            style,
            role,
        }
    }

    /// Window in the series' own coordinates for a displayed window
    pub fn source_window(&self, displayed: Span) -> Span {
        displayed.shifted(-self.style.reference)
    }

    /// Stored sample → displayed domain point
    pub fn display_point(&self, p: [f64; 2]) -> [f64; 2] {
        [p[0] + self.style.reference, p[1] * self.style.scale]
    }

    /// Index of the sample nearest to displayed `x`
    pub fn nearest_index(&self, x: f64) -> Option<usize> {
        let xs = self.series.x();
        if xs.is_empty() {
            return None;
        }
        let target = x - self.style.reference;
        let k = match self.series.direction() {
            Direction::Increasing => xs.partition_point(|&v| v < target),
            Direction::Decreasing => xs.partition_point(|&v| v > target),
        };
        let lo = k.saturating_sub(1);
        let hi = k.min(xs.len() - 1);
        Some(if (xs[lo] - target).abs() <= (xs[hi] - target).abs() {
            lo
        } else {
            hi
        })
    }

    /// Stored y of the sample nearest to displayed `x`
    pub fn value_at(&self, x: f64) -> Option<f64> {
        self.nearest_index(x).map(|i| self.series.y()[i])
    }
}
