/// Contour scene: every spectrum's pre-tessellated polygons in one shared
/// vertex buffer, plus per-spectrum calibration, visibility and ordering.

use crate::contour::ragged::{Offsets, Ragged};
use crate::data::spectrum::AxisCalibration;
use crate::error::{Result, ViewError};

/// Polygons of one sign for one spectrum
#[derive(Debug, Clone, PartialEq)]
pub struct ContourLayer {
    /// First vertex of this layer in the shared buffer
    pub vertex_offset: usize,
    pub polygons: Offsets,
    pub levels: Offsets,
    /// RGBA per level
    pub colors: Vec<[f32; 4]>,
    /// Levels below this index are not drawn
    pub floor_index: usize,
}

impl ContourLayer {
    pub fn ragged(&self) -> Result<Ragged<'_>> {
        Ragged::new(&self.levels, &self.polygons)
    }

    pub fn vertex_count(&self) -> usize {
        self.polygons.total()
    }
}

/// Collaborator output for one sign: vertices in point-index space
#[derive(Debug, Clone, Default)]
pub struct LayerInput {
    pub vertices: Vec<[f32; 2]>,
    /// Cumulative vertex counts per polygon, leading 0
    pub polygon_length: Vec<usize>,
    /// Cumulative polygon counts per level, leading 0
    pub level_length: Vec<usize>,
    pub colors: Vec<[f32; 4]>,
    pub floor_index: usize,
}

#[derive(Debug, Clone)]
pub struct ContourSpectrum {
    pub name: String,
    pub x_calibration: AxisCalibration,
    pub y_calibration: AxisCalibration,
    pub positive: ContourLayer,
    pub negative: ContourLayer,
    pub visible: bool,
}

impl ContourSpectrum {
    pub fn layers(&self) -> [&ContourLayer; 2] {
        [&self.positive, &self.negative]
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContourScene {
    /// Interleaved x,y for every layer of every spectrum
    vertices: Vec<f32>,
    spectra: Vec<ContourSpectrum>,
    /// Draw order as indices into `spectra`
    order: Vec<usize>,
    /// Bumped whenever `vertices` changes
    revision: u64,
}

impl ContourScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn ingest(&mut self, input: LayerInput) -> Result<ContourLayer> {
        let polygons = Offsets::new(input.polygon_length)?;
        let levels = Offsets::new(input.level_length)?;
        Ragged::new(&levels, &polygons)?;
        if polygons.total() != input.vertices.len() {
            return Err(ViewError::InvalidArgument(format!(
                "polygons cover {} vertices, {} supplied",
                polygons.total(),
                input.vertices.len()
            )));
        }
        if input.colors.len() < levels.groups() {
            return Err(ViewError::InvalidArgument(format!(
                "{} levels but {} colors",
                levels.groups(),
                input.colors.len()
            )));
        }
        let vertex_offset = self.vertices.len() / 2;
        self.vertices
            .extend(input.vertices.iter().flat_map(|v| [v[0], v[1]]));
        Ok(ContourLayer {
            vertex_offset,
            polygons,
            levels,
            colors: input.colors,
            floor_index: input.floor_index,
        })
    }

    /// Append a spectrum on top of the stack. Returns its index.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        x_calibration: AxisCalibration,
        y_calibration: AxisCalibration,
        positive: LayerInput,
        negative: LayerInput,
    ) -> Result<usize> {
        let rollback = self.vertices.len();
        let layers = self
            .ingest(positive)
            .and_then(|p| Ok((p, self.ingest(negative)?)));
        let (positive, negative) = match layers {
            Ok(l) => l,
            Err(e) => {
                self.vertices.truncate(rollback);
                return Err(e);
            }
        };
        let index = self.spectra.len();
        let name = name.into();
        log::info!(
            "Contour spectrum '{}' added: {} + {} vertices",
            name,
            positive.vertex_count(),
            negative.vertex_count()
        );
        self.spectra.push(ContourSpectrum {
            name,
            x_calibration,
            y_calibration,
            positive,
            negative,
            visible: true,
        });
        self.order.push(index);
        self.revision += 1;
        Ok(index)
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }

    pub fn spectrum(&self, index: usize) -> Option<&ContourSpectrum> {
        self.spectra.get(index)
    }

    fn spectrum_mut(&mut self, index: usize) -> Result<&mut ContourSpectrum> {
        self.spectra
            .get_mut(index)
            .ok_or_else(|| ViewError::InvalidArgument(format!("no contour spectrum {}", index)))
    }

    /// Spectra in draw order, bottom first
    pub fn ordered(&self) -> impl Iterator<Item = &ContourSpectrum> {
        self.order.iter().filter_map(|&i| self.spectra.get(i))
    }

    /// Index of the topmost visible spectrum
    pub fn top_visible(&self) -> Option<usize> {
        self.order
            .iter()
            .rev()
            .copied()
            .find(|&i| self.spectra.get(i).is_some_and(|s| s.visible))
    }

    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.spectrum_mut(index)?.visible = visible;
        Ok(())
    }

    /// Hide levels below `floor` on both signs
    pub fn set_floor(&mut self, index: usize, floor: usize) -> Result<()> {
        let s = self.spectrum_mut(index)?;
        s.positive.floor_index = floor;
        s.negative.floor_index = floor;
        Ok(())
    }

    /// Move a spectrum along its axes by domain deltas
    pub fn shift_reference(&mut self, index: usize, dx: f64, dy: f64) -> Result<()> {
        crate::error::ensure_finite("reference dx", dx)?;
        crate::error::ensure_finite("reference dy", dy)?;
        let s = self.spectrum_mut(index)?;
        s.x_calibration = s.x_calibration.shifted(dx);
        s.y_calibration = s.y_calibration.shifted(dy);
        Ok(())
    }

    /// Replace the draw order; must be a permutation of all indices
    pub fn set_order(&mut self, order: Vec<usize>) -> Result<()> {
        let mut seen = vec![false; self.spectra.len()];
        for &i in &order {
            match seen.get_mut(i) {
                Some(s) if !*s => *s = true,
                _ => {
                    return Err(ViewError::InvalidArgument(format!(
                        "draw order {:?} is not a permutation",
                        order
                    )))
                }
            }
        }
        if order.len() != self.spectra.len() {
            return Err(ViewError::InvalidArgument(format!(
                "draw order has {} entries for {} spectra",
                order.len(),
                self.spectra.len()
            )));
        }
        self.order = order;
        Ok(())
    }

    /// Domain extent covered by all spectra's vertices: `(x_lo, x_hi, y_lo, y_hi)`
    pub fn domain_extent(&self) -> Option<(f64, f64, f64, f64)> {
        let mut acc: Option<(f64, f64, f64, f64)> = None;
        for s in &self.spectra {
            for layer in s.layers() {
                let start = layer.vertex_offset * 2;
                let end = start + layer.vertex_count() * 2;
                for v in self.vertices[start..end].chunks_exact(2) {
                    let x = s.x_calibration.index_to_domain(v[0] as f64);
                    let y = s.y_calibration.index_to_domain(v[1] as f64);
                    acc = Some(match acc {
                        None => (x, x, y, y),
                        Some((a, b, c, d)) => (a.min(x), b.max(x), c.min(y), d.max(y)),
                    });
                }
            }
        }
        acc
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Square contours around (cx, cy), one polygon per level
    pub(crate) fn squares(levels: usize, cx: f32, cy: f32) -> LayerInput {
        let mut vertices = Vec::new();
        for l in 0..levels {
            let r = 1.0 + l as f32;
            vertices.extend([[cx - r, cy - r], [cx + r, cy - r], [cx + r, cy + r], [cx - r, cy + r]]);
        }
        LayerInput {
            vertices,
            polygon_length: (0..=levels).map(|l| l * 4).collect(),
            level_length: (0..=levels).collect(),
            colors: vec![[0.1, 0.28, 0.5, 1.0]; levels],
            floor_index: 0,
        }
    }

    fn cal() -> AxisCalibration {
        AxisCalibration::new(10.0, -0.1).unwrap()
    }

    #[test]
    fn test_push_assigns_vertex_offsets() {
        let mut scene = ContourScene::new();
        scene.push("a", cal(), cal(), squares(2, 5.0, 5.0), squares(1, 5.0, 5.0)).unwrap();
        let b = scene.push("b", cal(), cal(), squares(1, 0.0, 0.0), LayerInput::default()).unwrap();
        let a = scene.spectrum(0).unwrap();
        assert_eq!(a.positive.vertex_offset, 0);
        assert_eq!(a.negative.vertex_offset, 8);
        assert_eq!(scene.spectrum(b).unwrap().positive.vertex_offset, 12);
        assert_eq!(scene.vertices().len(), 16 * 2);
        assert_eq!(scene.revision(), 2);
    }

    #[test]
    fn test_bad_input_leaves_scene_untouched() {
        let mut scene = ContourScene::new();
        let mut bad = squares(2, 0.0, 0.0);
        bad.polygon_length = vec![0, 4, 3];
        assert!(scene.push("x", cal(), cal(), squares(1, 0.0, 0.0), bad).is_err());
        assert!(scene.is_empty());
        assert!(scene.vertices().is_empty());

        let mut short = squares(2, 0.0, 0.0);
        short.colors.pop();
        assert!(scene.push("y", cal(), cal(), short, LayerInput::default()).is_err());
    }

    #[test]
    fn test_order_must_be_permutation() {
        let mut scene = ContourScene::new();
        for name in ["a", "b", "c"] {
            scene.push(name, cal(), cal(), squares(1, 0.0, 0.0), LayerInput::default()).unwrap();
        }
        assert!(scene.set_order(vec![0, 0, 1]).is_err());
        assert!(scene.set_order(vec![0, 1]).is_err());
        scene.set_order(vec![2, 0, 1]).unwrap();
        let names: Vec<&str> = scene.ordered().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(scene.top_visible(), Some(1));
        scene.set_visible(1, false).unwrap();
        assert_eq!(scene.top_visible(), Some(0));
    }

    #[test]
    fn test_shift_reference_moves_extent() {
        let mut scene = ContourScene::new();
        scene.push("a", cal(), cal(), squares(1, 50.0, 50.0), LayerInput::default()).unwrap();
        let (x0, x1, _, _) = scene.domain_extent().unwrap();
        scene.shift_reference(0, 0.5, 0.0).unwrap();
        let (x0s, x1s, _, _) = scene.domain_extent().unwrap();
        assert!((x0s - x0 - 0.5).abs() < 1e-9);
        assert!((x1s - x1 - 0.5).abs() < 1e-9);
        assert!(scene.shift_reference(3, 0.1, 0.0).is_err());
    }
}
