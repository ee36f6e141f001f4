/// Synthetic data for the viewer binary.
///
/// The 1D data is a free induction decay with a few decaying lines, a
/// deliberate zero-order phase error and a DC offset, handed to the compute
/// worker for its FFT. The 2D data is a set of Gaussian cross peaks whose
/// contours are exact ellipses, spaced by a logarithmic level ladder.

use std::f64::consts::PI;

use egui::Color32;

use crate::contour::LayerInput;
use crate::data::spectrum::{AxisCalibration, Spectrum};
use crate::error::Result;
use crate::gui::theme::level_colors;

pub const FID_POINTS: usize = 8192;
pub const SWEEP_PPM: f64 = 12.0;
pub const CARRIER_PPM: f64 = 4.75;
/// Zero-order phase error baked into the FID (radians)
pub const PHASE_ERROR: f64 = 0.6;

const LEVELS: usize = 10;
const LEVEL_FACTOR: f64 = 1.5;
const SEGMENTS: usize = 64;

/// `(ppm, amplitude, decay in points)`
const LINES: [(f64, f64, f64); 6] = [
    (7.26, 1.0, 900.0),
    (7.21, 0.8, 900.0),
    (3.71, 2.4, 700.0),
    (2.05, 3.0, 1100.0),
    (1.26, 2.2, 800.0),
    (0.90, 1.4, 800.0),
];

/// Real and imaginary FID
pub fn synthetic_fid(n: usize, phase_error: f64) -> (Vec<f64>, Vec<f64>) {
    let mut re = vec![0.0; n];
    let mut im = vec![0.0; n];
    for &(ppm, amplitude, decay) in &LINES {
        let f = (ppm - CARRIER_PPM) / SWEEP_PPM;
        for k in 0..n {
            let env = amplitude * (-(k as f64) / decay).exp();
            let arg = 2.0 * PI * f * k as f64 + phase_error;
            re[k] += env * arg.cos();
            im[k] += env * arg.sin();
        }
    }
    if let Some(first) = re.first_mut() {
        // DC offset; shows up as a flat baseline after the transform
        *first += 40.0;
    }
    (re, im)
}

/// Calibrate FFT output (highest frequency first) onto the ppm axis
pub fn spectrum_from_fft(re: Vec<f64>, im: Vec<f64>) -> Result<Spectrum> {
    let n = re.len().max(1) as f64;
    let step = SWEEP_PPM / n;
    Spectrum::new(CARRIER_PPM + 0.5 * SWEEP_PPM - step, -step, re, Some(im))
}

/// Gaussian cross peak in point-index units. Negative heights feed the
/// negative layer.
#[derive(Debug, Clone, Copy)]
pub struct CrossPeak {
    pub x: f64,
    pub y: f64,
    pub sx: f64,
    pub sy: f64,
    pub height: f64,
}

/// `count` levels from `base` upwards, each `factor` times the last
pub fn log_levels(base: f64, factor: f64, count: usize) -> Vec<f64> {
    (0..count).map(|k| base * factor.powi(k as i32)).collect()
}

/// Contour polygons of `peaks` at `levels`, grouped by level
pub fn contour_layer(peaks: &[CrossPeak], levels: &[f64], colors: Vec<[f32; 4]>) -> LayerInput {
    let mut vertices = Vec::new();
    let mut polygon_offsets = vec![0];
    let mut level_offsets = vec![0];
    for &level in levels {
        for p in peaks {
            let h = p.height.abs();
            if h <= level {
                continue;
            }
            let r = (2.0 * (h / level).ln()).sqrt();
            vertices.extend((0..SEGMENTS).map(|s| {
                let t = 2.0 * PI * s as f64 / SEGMENTS as f64;
                [(p.x + r * p.sx * t.cos()) as f32, (p.y + r * p.sy * t.sin()) as f32]
            }));
            polygon_offsets.push(vertices.len());
        }
        level_offsets.push(polygon_offsets.len() - 1);
    }
    LayerInput {
        vertices,
        polygon_length: polygon_offsets,
        level_length: level_offsets,
        colors,
        floor_index: 0,
    }
}

/// One demo 2D spectrum ready for [`crate::contour::ContourScene::push`]
pub struct DemoContour {
    pub name: String,
    pub x_calibration: AxisCalibration,
    pub y_calibration: AxisCalibration,
    pub positive: LayerInput,
    pub negative: LayerInput,
}

/// Two overlaid HSQC-like spectra, the second slightly offset
pub fn demo_contours(positive: Color32, negative: Color32, overlay: Color32) -> Result<Vec<DemoContour>> {
    let x_cal = AxisCalibration::new(10.0, -10.0 / 512.0)?;
    let y_cal = AxisCalibration::new(140.0, -140.0 / 256.0)?;
    let levels = log_levels(0.05, LEVEL_FACTOR, LEVELS);

    let cross = |ppm_x: f64, ppm_y: f64, height: f64| CrossPeak {
        x: x_cal.domain_to_index(ppm_x),
        y: y_cal.domain_to_index(ppm_y),
        sx: 3.0,
        sy: 2.0,
        height,
    };
    let first_pos = [
        cross(7.24, 128.5, 1.0),
        cross(3.71, 61.2, 2.5),
        cross(1.26, 18.4, 3.5),
        cross(0.90, 14.1, 2.0),
    ];
    let first_neg = [cross(2.05, 30.8, -1.8), cross(4.12, 45.0, -0.9)];
    let second_pos = [cross(7.10, 126.0, 0.8), cross(3.55, 58.7, 1.6), cross(1.40, 21.0, 2.1)];

    Ok(vec![
        DemoContour {
            name: "HSQC".into(),
            x_calibration: x_cal,
            y_calibration: y_cal,
            positive: contour_layer(&first_pos, &levels, level_colors(positive, LEVELS)),
            negative: contour_layer(&first_neg, &levels, level_colors(negative, LEVELS)),
        },
        DemoContour {
            name: "HSQC (reference)".into(),
            x_calibration: x_cal,
            y_calibration: y_cal,
            positive: contour_layer(&second_pos, &levels, level_colors(overlay, LEVELS)),
            negative: LayerInput::default(),
        },
    ])
}
