use serde::{Deserialize, Serialize};

use crate::data::series::SampleSeries;
use crate::error::{ensure_finite, Result, ViewError};

/// Linear point-index ↔ domain mapping for one spectral dimension.
///
/// `domain = start + index * step + reference`. The reference offset is the
/// user-applied shift; `start` and `step` come from the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisCalibration {
    pub start: f64,
    pub step: f64,
    pub reference: f64,
}

impl AxisCalibration {
    pub fn new(start: f64, step: f64) -> Result<Self> {
        ensure_finite("domain_start", start)?;
        ensure_finite("domain_step", step)?;
        if step == 0.0 {
            return Err(ViewError::InvalidArgument("domain_step must be non-zero".into()));
        }
        Ok(Self {
            start,
            step,
            reference: 0.0,
        })
    }

    /// Convert a (fractional) point index to a domain value
    pub fn index_to_domain(&self, index: f64) -> f64 {
        self.start + index * self.step + self.reference
    }

    /// Convert a domain value to a fractional point index
    pub fn domain_to_index(&self, x: f64) -> f64 {
        (x - self.start - self.reference) / self.step
    }

    pub fn shifted(&self, delta: f64) -> Self {
        Self {
            reference: self.reference + delta,
            ..*self
        }
    }
}

/// A decoded 1D spectrum as handed over by the file layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spectrum {
    pub n_points: usize,
    pub domain_start: f64,
    pub domain_step: f64,
    pub amplitude: Vec<f64>,
    /// Present only for complex (phasable) data
    pub imaginary_amplitude: Option<Vec<f64>>,
    pub spectral_max: f64,
}

impl Spectrum {
    pub fn new(
        domain_start: f64,
        domain_step: f64,
        amplitude: Vec<f64>,
        imaginary_amplitude: Option<Vec<f64>>,
    ) -> Result<Self> {
        AxisCalibration::new(domain_start, domain_step)?;
        if let Some(im) = &imaginary_amplitude {
            if im.len() != amplitude.len() {
                return Err(ViewError::InvalidArgument(format!(
                    "imaginary length {} does not match real length {}",
                    im.len(),
                    amplitude.len()
                )));
            }
        }
        let spectral_max = amplitude.iter().map(|v| v.abs()).fold(0.0f64, f64::max);
        Ok(Self {
            n_points: amplitude.len(),
            domain_start,
            domain_step,
            amplitude,
            imaginary_amplitude,
            spectral_max,
        })
    }

    pub fn calibration(&self) -> AxisCalibration {
        AxisCalibration {
            start: self.domain_start,
            step: self.domain_step,
            reference: 0.0,
        }
    }

    pub fn index_to_domain(&self, index: usize) -> f64 {
        self.domain_start + index as f64 * self.domain_step
    }

    /// Domain values of every point
    pub fn domain_axis(&self) -> Vec<f64> {
        (0..self.n_points).map(|i| self.index_to_domain(i)).collect()
    }

    pub fn is_complex(&self) -> bool {
        self.imaginary_amplitude.is_some()
    }

    /// Columnar series view of the spectrum, ready for the renderer
    pub fn to_series(&self) -> Result<SampleSeries> {
        SampleSeries::new(
            self.domain_axis(),
            self.amplitude.clone(),
            self.imaginary_amplitude.clone(),
        )
    }
}
