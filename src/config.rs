/// Viewer configuration : interaction tuning and rendering defaults
///
/// Loaded from a JSON file when one is supplied; every field falls back to
/// its default so partial files are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewError};
use crate::view::viewport::Margins;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Maximum rendered points per trace. `None` derives the cap from the
    /// plot width (`lod_points_per_pixel` points per device pixel).
    pub lod_cap: Option<usize>,
    pub lod_points_per_pixel: f64,
    /// Pointer travel (px) below which a press/release counts as a click
    pub click_threshold_px: f32,
    /// Peak labels closer than this to the plot edge are culled
    pub label_edge_margin_px: f32,
    /// Labels show only when the visible span is below this many median peak widths
    pub label_width_multiple: f64,
    /// Grab radius around a peak marker
    pub marker_hit_radius_px: f32,
    pub wheel_zoom_in: f64,
    pub wheel_zoom_out: f64,
    /// Phase nudge per wheel notch with Shift (radians, ~1°)
    pub phase_step_coarse: f64,
    /// Phase nudge per wheel notch with Ctrl (radians, ~0.1°)
    pub phase_step_fine: f64,
    /// Vertical scale multiplier per Alt+wheel notch
    pub scale_step: f64,
    pub magnifier_factor: f64,
    /// Inset edge length as a fraction of the canvas
    pub magnifier_size: f64,
    /// Smallest domain span handed to coordinate transforms
    pub min_domain_span: f64,
    pub margins: Margins,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            lod_cap: None,
            lod_points_per_pixel: 2.0,
            click_threshold_px: 3.0,
            label_edge_margin_px: 20.0,
            label_width_multiple: 100.0,
            marker_hit_radius_px: 6.0,
            wheel_zoom_in: 0.9,
            wheel_zoom_out: 1.1,
            phase_step_coarse: 0.0175,
            phase_step_fine: 0.00175,
            scale_step: 1.01,
            magnifier_factor: 4.0,
            magnifier_size: 0.1,
            min_domain_span: 1e-9,
            margins: Margins {
                top: 10.0,
                right: 10.0,
                bottom: 40.0,
                left: 70.0,
            },
        }
    }
}

impl ViewerConfig {
    /// Read a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        log::info!("Loaded viewer config from {}", path.display());
        Ok(config)
    }

    /// Reject values the renderers cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.magnifier_size > 0.0 && self.magnifier_size <= 0.3) {
            return Err(ViewError::InvalidArgument(format!(
                "magnifier_size must be in (0, 0.3], got {}",
                self.magnifier_size
            )));
        }
        if !(self.magnifier_factor.is_finite() && self.magnifier_factor > 0.0) {
            return Err(ViewError::InvalidArgument(format!(
                "magnifier_factor must be positive, got {}",
                self.magnifier_factor
            )));
        }
        Ok(())
    }

    /// Load from `NMR_VIEW_CONFIG` if set, defaults otherwise.
    /// A broken file is reported and ignored rather than aborting startup.
    pub fn from_env() -> Self {
        match std::env::var_os("NMR_VIEW_CONFIG") {
            Some(path) => Self::load(Path::new(&path)).unwrap_or_else(|e| {
                log::warn!("Ignoring config {:?}: {}", path, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Effective LOD cap for a plot of the given pixel width
    pub fn lod_cap_for_width(&self, plot_width: f64) -> usize {
        self.lod_cap
            .unwrap_or_else(|| (plot_width.max(1.0) * self.lod_points_per_pixel).ceil() as usize)
            .max(2)
    }
}
