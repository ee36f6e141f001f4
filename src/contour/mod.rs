/// 2D contour compositing: scene data, the GPU seam and the draw loop.

pub mod glow_surface;
pub mod magnifier;
pub mod ragged;
pub mod scene;

use crate::error::{Result, ViewError};
use crate::view::viewport::{Camera2D, Viewport};

pub use magnifier::{Inset, Magnifier, PixelRect};
pub use scene::{ContourScene, LayerInput};

/// Inset background
pub const INSET_CLEAR: [f32; 4] = [0.9, 0.9, 0.9, 1.0];

/// The GPU calls the compositor needs. Rectangles are device pixels with a
/// top-left origin relative to the drawing area.
pub trait ContourSurface {
    fn upload_vertices(&mut self, vertices: &[f32]) -> Result<()>;
    fn clear(&mut self, rect: PixelRect, rgba: [f32; 4]) -> Result<()>;
    /// Limit drawing to `rect`, or lift the limit
    fn restrict(&mut self, rect: Option<PixelRect>) -> Result<()>;
    /// Column-major 3×3 vertex → clip-space matrix
    fn set_transform(&mut self, matrix: &[f32; 9]) -> Result<()>;
    fn set_color(&mut self, rgba: [f32; 4]) -> Result<()>;
    /// One closed polyline over `count` vertices starting at `first`
    fn draw_closed_strip(&mut self, first: usize, count: usize) -> Result<()>;
    /// Free GPU objects
    fn release(&mut self);
}

/// Draws a [`ContourScene`] through a [`ContourSurface`], with zoom history
/// and an optional magnifier.
pub struct ContourCompositor<S: ContourSurface> {
    surface: Option<S>,
    scene: ContourScene,
    viewport: Viewport,
    zoom_history: Vec<Viewport>,
    magnifier: Magnifier,
    cursor: Option<egui::Pos2>,
    uploaded_revision: Option<u64>,
}

impl<S: ContourSurface> ContourCompositor<S> {
    /// A missing surface is fatal; there is no software fallback.
    pub fn new(surface: Option<S>, viewport: Viewport, magnifier: Magnifier) -> Result<Self> {
        let surface = surface.ok_or_else(|| {
            ViewError::PreconditionFailed("no rendering context for the contour view".into())
        })?;
        Ok(Self {
            surface: Some(surface),
            scene: ContourScene::new(),
            viewport,
            zoom_history: Vec::new(),
            magnifier,
            cursor: None,
            uploaded_revision: None,
        })
    }

    pub fn scene(&self) -> &ContourScene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut ContourScene {
        &mut self.scene
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    pub fn is_destroyed(&self) -> bool {
        self.surface.is_none()
    }

    /// Remember the current window and switch to a new one
    pub fn push_zoom(&mut self, x: (f64, f64), y: (f64, f64)) -> Result<()> {
        let next = self.viewport.set_domain(x, y)?;
        self.zoom_history.push(self.viewport);
        self.viewport = next;
        Ok(())
    }

    /// Return to the previous window; false when the history is empty
    pub fn pop_zoom(&mut self) -> bool {
        match self.zoom_history.pop() {
            Some(v) => {
                // keep the current surface size
                let (w, h) = self.viewport.device_size();
                self.viewport = v.resize(w, h);
                true
            }
            None => false,
        }
    }

    pub fn zoom_depth(&self) -> usize {
        self.zoom_history.len()
    }

    pub fn set_cursor(&mut self, cursor: Option<egui::Pos2>) {
        self.cursor = cursor;
    }

    pub fn magnifier(&self) -> Magnifier {
        self.magnifier
    }

    pub fn set_magnifier(&mut self, magnifier: Magnifier) {
        self.magnifier = magnifier;
    }

    /// Inset for the current cursor, if any
    pub fn inset(&self) -> Option<Inset> {
        self.cursor.and_then(|c| self.magnifier.inset(&self.viewport, c))
    }

    /// Main pass, then the magnifier pass when a cursor is set
    pub fn draw(&mut self) -> Result<()> {
        let inset = self.inset();
        let surface = self.surface.as_mut().ok_or_else(|| {
            ViewError::PreconditionFailed("contour compositor used after destroy".into())
        })?;
        if self.uploaded_revision != Some(self.scene.revision()) {
            surface.upload_vertices(self.scene.vertices())?;
            self.uploaded_revision = Some(self.scene.revision());
        }
        if self.viewport.is_degenerate() {
            log::debug!("contour view degenerate, skipping draw");
            return Ok(());
        }
        surface.restrict(None)?;
        draw_pass(surface, &self.scene, &self.viewport)?;

        if let Some(inset) = inset {
            surface.restrict(Some(inset.rect))?;
            surface.clear(inset.rect, INSET_CLEAR)?;
            draw_pass(surface, &self.scene, &inset.viewport)?;
            surface.restrict(None)?;
        }
        Ok(())
    }

    /// Release GPU objects. Later draws fail.
    pub fn destroy(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            surface.release();
            log::info!("Contour compositor destroyed");
        }
    }
}

/// Draw every visible spectrum in order: positive then negative, levels
/// from the floor up, one closed strip per polygon.
fn draw_pass<S: ContourSurface>(surface: &mut S, scene: &ContourScene, viewport: &Viewport) -> Result<()> {
    let (_, _, w, h) = viewport.plot_area();
    for spectrum in scene.ordered().filter(|s| s.visible) {
        let camera = Camera2D::derive(
            viewport,
            |x| spectrum.x_calibration.domain_to_index(x),
            |y| spectrum.y_calibration.domain_to_index(y),
        );
        surface.set_transform(&camera.clip_matrix(w, h))?;
        for layer in spectrum.layers() {
            let ragged = layer.ragged()?;
            for level in layer.floor_index..ragged.level_count() {
                let Some(color) = layer.colors.get(level) else {
                    continue;
                };
                surface.set_color(*color)?;
                for (first, count) in ragged.draws(level) {
                    surface.draw_closed_strip(layer.vertex_offset + first, count)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::scene::tests::squares;
    use crate::data::spectrum::AxisCalibration;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Upload(usize),
        Clear(PixelRect),
        Restrict(Option<PixelRect>),
        Transform,
        Color([f32; 4]),
        Draw(usize, usize),
        Release,
    }

    #[derive(Default)]
    struct Recording {
        calls: Vec<Call>,
    }

    impl ContourSurface for Recording {
        fn upload_vertices(&mut self, vertices: &[f32]) -> Result<()> {
            self.calls.push(Call::Upload(vertices.len()));
            Ok(())
        }
        fn clear(&mut self, rect: PixelRect, _rgba: [f32; 4]) -> Result<()> {
            self.calls.push(Call::Clear(rect));
            Ok(())
        }
        fn restrict(&mut self, rect: Option<PixelRect>) -> Result<()> {
            self.calls.push(Call::Restrict(rect));
            Ok(())
        }
        fn set_transform(&mut self, _matrix: &[f32; 9]) -> Result<()> {
            self.calls.push(Call::Transform);
            Ok(())
        }
        fn set_color(&mut self, rgba: [f32; 4]) -> Result<()> {
            self.calls.push(Call::Color(rgba));
            Ok(())
        }
        fn draw_closed_strip(&mut self, first: usize, count: usize) -> Result<()> {
            self.calls.push(Call::Draw(first, count));
            Ok(())
        }
        fn release(&mut self) {
            self.calls.push(Call::Release);
        }
    }

    fn draws(c: &ContourCompositor<Recording>) -> Vec<(usize, usize)> {
        c.surface()
            .unwrap()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Draw(f, n) => Some((*f, *n)),
                _ => None,
            })
            .collect()
    }

    fn compositor() -> ContourCompositor<Recording> {
        let viewport = Viewport::new(400.0, 400.0)
            .set_domain((0.0, 10.0), (0.0, 10.0))
            .unwrap()
            .with_orientation(true, true);
        ContourCompositor::new(Some(Recording::default()), viewport, Magnifier::default()).unwrap()
    }

    fn cal() -> AxisCalibration {
        AxisCalibration::new(10.0, -0.1).unwrap()
    }

    #[test]
    fn test_missing_surface_is_fatal() {
        let v = Viewport::new(10.0, 10.0);
        let err = ContourCompositor::<Recording>::new(None, v, Magnifier::default()).err();
        assert!(matches!(err, Some(ViewError::PreconditionFailed(_))));
    }

    #[test]
    fn test_csr_levels_drive_draw_calls() {
        let mut c = compositor();
        let positive = LayerInput {
            vertices: vec![[0.0, 0.0]; 16],
            polygon_length: vec![0, 3, 6, 8, 14, 16],
            level_length: vec![0, 3, 5],
            colors: vec![[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]],
            floor_index: 0,
        };
        c.scene_mut()
            .push("a", cal(), cal(), positive, LayerInput::default())
            .unwrap();
        c.draw().unwrap();
        assert_eq!(draws(&c), vec![(0, 3), (3, 3), (6, 2), (8, 6), (14, 2)]);
        let calls = &c.surface().unwrap().calls;
        assert_eq!(calls[0], Call::Upload(32));
    }

    #[test]
    fn test_floor_visibility_and_order() {
        let mut c = compositor();
        let scene = c.scene_mut();
        scene.push("a", cal(), cal(), squares(3, 50.0, 50.0), squares(1, 50.0, 50.0)).unwrap();
        scene.push("b", cal(), cal(), squares(1, 20.0, 20.0), LayerInput::default()).unwrap();
        scene.set_floor(0, 2).unwrap();
        c.draw().unwrap();
        // a: positive level 2 only (negative has 1 level, below floor); then b
        assert_eq!(draws(&c), vec![(8, 4), (16, 4)]);

        let mut c = compositor();
        let scene = c.scene_mut();
        scene.push("a", cal(), cal(), squares(1, 50.0, 50.0), LayerInput::default()).unwrap();
        scene.push("b", cal(), cal(), squares(1, 20.0, 20.0), LayerInput::default()).unwrap();
        scene.set_order(vec![1, 0]).unwrap();
        scene.set_visible(0, false).unwrap();
        c.draw().unwrap();
        assert_eq!(draws(&c), vec![(4, 4)]);
    }

    #[test]
    fn test_magnifier_pass_is_scissored_and_cleared() {
        let mut c = compositor();
        c.scene_mut()
            .push("a", cal(), cal(), squares(1, 50.0, 50.0), LayerInput::default())
            .unwrap();
        c.set_cursor(Some(egui::pos2(200.0, 200.0)));
        let inset = c.inset().unwrap();
        c.draw().unwrap();
        let calls = &c.surface().unwrap().calls;
        let clear_at = calls.iter().position(|x| *x == Call::Clear(inset.rect)).unwrap();
        assert_eq!(calls[clear_at - 1], Call::Restrict(Some(inset.rect)));
        assert_eq!(calls.last(), Some(&Call::Restrict(None)));
        assert_eq!(draws(&c).len(), 2);
    }

    #[test]
    fn test_upload_only_when_scene_changes() {
        let mut c = compositor();
        c.scene_mut()
            .push("a", cal(), cal(), squares(1, 50.0, 50.0), LayerInput::default())
            .unwrap();
        c.draw().unwrap();
        c.draw().unwrap();
        let uploads = c
            .surface()
            .unwrap()
            .calls
            .iter()
            .filter(|x| matches!(x, Call::Upload(_)))
            .count();
        assert_eq!(uploads, 1);
    }

    #[test]
    fn test_draw_after_destroy_fails() {
        let mut c = compositor();
        c.destroy();
        assert!(c.is_destroyed());
        assert!(matches!(c.draw(), Err(ViewError::PreconditionFailed(_))));
    }

    #[test]
    fn test_zoom_history_round_trip() {
        let mut c = compositor();
        let start = *c.viewport();
        c.push_zoom((2.0, 4.0), (3.0, 5.0)).unwrap();
        c.push_zoom((2.5, 3.0), (3.5, 4.0)).unwrap();
        assert_eq!(c.zoom_depth(), 2);
        assert!(c.pop_zoom());
        assert!(c.pop_zoom());
        assert_eq!(*c.viewport(), start);
        assert!(!c.pop_zoom());
    }
}
