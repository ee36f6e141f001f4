/// Peak markers drawn over the primary trace, with draggable positions.

use crate::data::peaks::PeakCollection;
use crate::error::{Result, ViewError};
use crate::render::input::RendererEvent;
use crate::render::trace::Trace;
use crate::view::viewport::Viewport;

/// A marker ready to paint
#[derive(Debug, Clone, PartialEq)]
pub struct PeakMarker {
    pub identity_index: usize,
    pub pos: egui::Pos2,
    pub label: Option<String>,
    pub dragging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PeakDrag {
    identity_index: usize,
    domain_x: f64,
    intensity: f64,
    moved: bool,
}

/// Label thresholds in device pixels and peak widths
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPolicy {
    /// Labels show only while the visible span is below this many median widths
    pub width_multiple: f64,
    /// Labels closer than this to either plot edge are culled
    pub edge_margin_px: f32,
}

impl LabelPolicy {
    pub fn labels_visible(&self, visible_span: f64, median_width: f64) -> bool {
        visible_span < self.width_multiple * median_width
    }

    pub fn keeps(&self, x: f32, plot: egui::Rect) -> bool {
        x - plot.left() >= self.edge_margin_px && plot.right() - x >= self.edge_margin_px
    }
}

/// Holds a handle to the shared peak collection and the drag in progress
#[derive(Debug, Clone, Default)]
pub struct PeakOverlay {
    collection: Option<PeakCollection>,
    drag: Option<PeakDrag>,
}

impl PeakOverlay {
    pub fn add(&mut self, collection: PeakCollection) {
        log::info!("Peak overlay attached ({} peaks)", collection.len());
        self.collection = Some(collection);
        self.drag = None;
    }

    pub fn remove(&mut self) {
        self.collection = None;
        self.drag = None;
    }

    pub fn collection(&self) -> Option<&PeakCollection> {
        self.collection.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Identity of the marker within `radius_px` of `pos`, nearest first
    pub fn hit_test(
        &self,
        viewport: &Viewport,
        primary: &Trace,
        pos: egui::Pos2,
        radius_px: f32,
    ) -> Option<usize> {
        let peaks = self.collection.as_ref()?.snapshot();
        peaks
            .iter()
            .map(|p| {
                let d = viewport.to_device(primary.display_point([p.domain_x, p.intensity]));
                (p.identity_index, d.distance(pos))
            })
            .filter(|(_, dist)| *dist <= radius_px)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    pub fn begin_drag(&mut self, identity_index: usize) -> Result<()> {
        let collection = self
            .collection
            .as_ref()
            .ok_or_else(|| ViewError::PreconditionFailed("no peak collection attached".into()))?;
        let peak = collection.get(identity_index).ok_or_else(|| {
            ViewError::InvalidArgument(format!("no peak with identity {}", identity_index))
        })?;
        self.drag = Some(PeakDrag {
            identity_index,
            domain_x: peak.domain_x,
            intensity: peak.intensity,
            moved: false,
        });
        Ok(())
    }

    /// Move the dragged marker; stored coordinates, not displayed ones
    pub fn drag_to(&mut self, domain_x: f64, intensity: f64) -> Result<()> {
        let drag = self
            .drag
            .as_mut()
            .ok_or_else(|| ViewError::PreconditionFailed("no peak drag in progress".into()))?;
        drag.domain_x = domain_x;
        drag.intensity = intensity;
        drag.moved = true;
        Ok(())
    }

    /// Finish the drag. A moved marker writes exactly one update.
    pub fn release(&mut self) -> Result<Option<RendererEvent>> {
        let Some(drag) = self.drag.take() else {
            return Ok(None);
        };
        if !drag.moved {
            return Ok(None);
        }
        let collection = self
            .collection
            .as_ref()
            .ok_or_else(|| ViewError::PreconditionFailed("peak collection removed mid-drag".into()))?;
        collection.update(drag.identity_index, drag.domain_x, drag.intensity)?;
        log::info!(
            "Peak {} moved to {:.4} (intensity {:.4})",
            drag.identity_index,
            drag.domain_x,
            drag.intensity
        );
        Ok(Some(RendererEvent::PeakMoved {
            identity_index: drag.identity_index,
            domain_x: drag.domain_x,
            intensity: drag.intensity,
        }))
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// Device-space markers with labels per the policy
    pub fn markers(&self, viewport: &Viewport, primary: &Trace, policy: &LabelPolicy) -> Vec<PeakMarker> {
        let Some(collection) = &self.collection else {
            return Vec::new();
        };
        let peaks = collection.snapshot();
        if peaks.is_empty() {
            log::debug!("peak overlay skipped: no peaks");
            return Vec::new();
        }
        let show_labels = match collection.median_width() {
            Ok(w) => policy.labels_visible(viewport.domain_x().width(), w),
            Err(_) => false,
        };
        let plot = viewport.plot_rect();
        let window = viewport.domain_x();
        peaks
            .iter()
            .filter_map(|p| {
                let (x, y, dragging) = match self.drag {
                    Some(d) if d.identity_index == p.identity_index => (d.domain_x, d.intensity, true),
                    _ => (p.domain_x, p.intensity, false),
                };
                let shown = primary.display_point([x, y]);
                if !window.contains(shown[0]) {
                    return None;
                }
                let pos = viewport.to_device(shown);
                let label = (show_labels && policy.keeps(pos.x, plot))
                    .then(|| format!("{:.3}", shown[0]));
                Some(PeakMarker {
                    identity_index: p.identity_index,
                    pos,
                    label,
                    dragging,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::peaks::Peak;
    use crate::data::series::SampleSeries;
    use crate::render::trace::{TraceId, TraceRole, TraceStyle};

    fn setup() -> (Viewport, Trace, PeakCollection) {
        let viewport = Viewport::new(200.0, 100.0)
            .set_domain((0.0, 10.0), (0.0, 10.0))
            .unwrap();
        let series = SampleSeries::from_uniform(0.0, 0.1, vec![0.0; 101], None).unwrap();
        let trace = Trace::new(TraceId(0), series, TraceRole::Experimental, TraceStyle::default());
        let mut a = Peak::new(3, 5.0, 5.0);
        a.sigma = 0.5;
        a.gamma = 0.5;
        let mut b = Peak::new(8, 0.1, 1.0);
        b.sigma = 0.5;
        b.gamma = 0.5;
        (viewport, trace, PeakCollection::new(vec![a, b]))
    }

    fn policy() -> LabelPolicy {
        LabelPolicy {
            width_multiple: 100.0,
            edge_margin_px: 20.0,
        }
    }

    #[test]
    fn test_labels_culled_near_edges() {
        let (viewport, trace, peaks) = setup();
        let mut overlay = PeakOverlay::default();
        overlay.add(peaks);
        let markers = overlay.markers(&viewport, &trace, &policy());
        assert_eq!(markers.len(), 2);
        let centre = markers.iter().find(|m| m.identity_index == 3).unwrap();
        assert_eq!(centre.label.as_deref(), Some("5.000"));
        // x = 0.1 sits 2 px from the right edge on a ppm axis
        let edge = markers.iter().find(|m| m.identity_index == 8).unwrap();
        assert!(edge.label.is_none());
    }

    #[test]
    fn test_labels_hidden_when_zoomed_out() {
        let (viewport, trace, peaks) = setup();
        let wide = viewport.set_domain_x((-1000.0, 1000.0)).unwrap();
        let mut overlay = PeakOverlay::default();
        overlay.add(peaks);
        let markers = overlay.markers(&wide, &trace, &policy());
        assert!(markers.iter().all(|m| m.label.is_none()));
    }

    #[test]
    fn test_empty_collection_skips_overlay() {
        let (viewport, trace, _) = setup();
        let mut overlay = PeakOverlay::default();
        overlay.add(PeakCollection::default());
        assert!(overlay.markers(&viewport, &trace, &policy()).is_empty());
    }

    #[test]
    fn test_drag_release_updates_once_and_keeps_identity() {
        let (viewport, trace, peaks) = setup();
        let mut overlay = PeakOverlay::default();
        overlay.add(peaks.clone());
        let hit = overlay.hit_test(&viewport, &trace, viewport.to_device([5.0, 5.0]), 6.0);
        assert_eq!(hit, Some(3));
        overlay.begin_drag(3).unwrap();
        overlay.drag_to(4.0, 2.0).unwrap();
        // collection untouched until release
        assert_eq!(peaks.get(3).unwrap().domain_x, 5.0);
        let event = overlay.release().unwrap();
        assert_eq!(
            event,
            Some(RendererEvent::PeakMoved {
                identity_index: 3,
                domain_x: 4.0,
                intensity: 2.0
            })
        );
        assert_eq!(peaks.get(3).unwrap().domain_x, 4.0);
        assert_eq!(overlay.release().unwrap(), None);
    }

    #[test]
    fn test_release_without_move_writes_nothing() {
        let (_, _, peaks) = setup();
        let mut overlay = PeakOverlay::default();
        overlay.add(peaks.clone());
        overlay.begin_drag(8).unwrap();
        assert_eq!(overlay.release().unwrap(), None);
        assert_eq!(peaks.get(8).unwrap().domain_x, 0.1);
    }

    #[test]
    fn test_begin_drag_without_collection_fails() {
        let mut overlay = PeakOverlay::default();
        assert!(matches!(overlay.begin_drag(0), Err(ViewError::PreconditionFailed(_))));
    }
}
