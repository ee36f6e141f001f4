/// Numerical kernels behind the compute worker.
///
/// The renderer only depends on the [`Kernels`] call contract; the built-in
/// set is a plain implementation good enough to drive the viewer.

use num_complex::Complex;
use rustfft::FftPlanner;

use crate::data::peaks::Peak;
use crate::data::series::SampleSeries;
use crate::error::{Result, ViewError};

/// Peak-picking parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickParams {
    /// Fraction of the maximum intensity a peak must exceed (0–1)
    pub threshold_fraction: f64,
    /// Minimum index distance between accepted peaks
    pub min_distance: usize,
}

impl Default for PickParams {
    fn default() -> Self {
        Self {
            threshold_fraction: 0.05,
            min_distance: 5,
        }
    }
}

pub trait Kernels: Send + 'static {
    /// Complex FFT into spectrum order (highest frequency first)
    fn fft(&self, re: &[f64], im: &[f64]) -> Result<(Vec<f64>, Vec<f64>)>;
    fn pick_peaks(&self, series: &SampleSeries, params: PickParams) -> Result<Vec<Peak>>;
    fn estimate_baseline(&self, values: &[f64]) -> Result<Vec<f64>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinKernels;

pub fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

impl Kernels for BuiltinKernels {
    fn fft(&self, re: &[f64], im: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        if re.is_empty() {
            return Err(ViewError::EmptyInput("no points to transform".into()));
        }
        if im.len() != re.len() {
            return Err(ViewError::InvalidArgument(format!(
                "real/imaginary lengths differ ({} vs {})",
                re.len(),
                im.len()
            )));
        }
        let size = next_power_of_two(re.len());
        let mut buffer: Vec<Complex<f64>> = re
            .iter()
            .zip(im)
            .map(|(&r, &i)| Complex::new(r, i))
            .collect();
        buffer.resize(size, Complex::new(0.0, 0.0));
        // first-point correction
        buffer[0] *= 0.5;

        let mut planner = FftPlanner::new();
        planner.plan_fft_forward(size).process(&mut buffer);

        // swap halves so 0 Hz is centred, then put high frequency first
        buffer.rotate_left(size / 2);
        buffer.reverse();
        Ok((
            buffer.iter().map(|c| c.re).collect(),
            buffer.iter().map(|c| c.im).collect(),
        ))
    }

    fn pick_peaks(&self, series: &SampleSeries, params: PickParams) -> Result<Vec<Peak>> {
        let y = series.y();
        let x = series.x();
        let n = y.len();
        if n < 3 {
            return Ok(Vec::new());
        }
        let max_val = y.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if max_val <= 0.0 {
            return Ok(Vec::new());
        }
        let threshold = max_val * params.threshold_fraction;

        let mut candidates: Vec<(usize, f64)> = (1..n - 1)
            .filter(|&i| y[i] > threshold && y[i] >= y[i - 1] && y[i] >= y[i + 1])
            .map(|i| (i, y[i]))
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut selected: Vec<usize> = Vec::new();
        for &(idx, _) in &candidates {
            if selected.iter().all(|&s| idx.abs_diff(s) > params.min_distance) {
                selected.push(idx);
            }
        }
        selected.sort_unstable();

        let step = (x[1] - x[0]).abs();
        Ok(selected
            .into_iter()
            .enumerate()
            .map(|(id, i)| {
                let half = y[i] * 0.5;
                let left = (0..i).rev().find(|&j| y[j] < half).map_or(i, |j| i - j);
                let right = (i + 1..n).find(|&j| y[j] < half).map_or(n - 1 - i, |j| j - i);
                Peak {
                    // half width at half maximum, crossing taken half a point in
                    gamma: (0.5 * (left + right) as f64 - 0.5).max(0.5) * step,
                    ..Peak::new(id, x[i], y[i])
                }
            })
            .collect())
    }

    fn estimate_baseline(&self, values: &[f64]) -> Result<Vec<f64>> {
        let n = values.len();
        if n == 0 {
            return Err(ViewError::EmptyInput("no points for baseline".into()));
        }
        // mean of the outer 10% on each side, joined linearly
        let edge = ((n as f64 * 0.1) as usize).max(1);
        let left = values[..edge].iter().sum::<f64>() / edge as f64;
        let right = values[n - edge..].iter().sum::<f64>() / edge as f64;
        Ok((0..n)
            .map(|i| left + (right - left) * i as f64 / n as f64)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lorentzian(n: usize, centre: f64, hwhm: f64, height: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let d = (i as f64 - centre) / hwhm;
                height / (1.0 + d * d)
            })
            .collect()
    }

    #[test]
    fn test_fft_of_decaying_cosine_peaks_once() {
        let n = 256;
        let fid_re: Vec<f64> = (0..n)
            .map(|t| (-(t as f64) / 40.0).exp() * (0.5 * t as f64).cos())
            .collect();
        let fid_im: Vec<f64> = (0..n)
            .map(|t| (-(t as f64) / 40.0).exp() * (0.5 * t as f64).sin())
            .collect();
        let (re, im) = BuiltinKernels.fft(&fid_re, &fid_im).unwrap();
        assert_eq!(re.len(), 256);
        assert_eq!(im.len(), 256);
        let (peak, _) = re
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        // positive frequency lands in the first half after reversal
        assert!(peak < 128);
    }

    #[test]
    fn test_fft_pads_to_power_of_two() {
        let (re, _) = BuiltinKernels.fft(&[1.0; 100], &[0.0; 100]).unwrap();
        assert_eq!(re.len(), 128);
        assert!(BuiltinKernels.fft(&[], &[]).is_err());
        assert!(BuiltinKernels.fft(&[1.0], &[]).is_err());
    }

    #[test]
    fn test_pick_peaks_finds_two_lines_with_widths() {
        let mut y = lorentzian(400, 100.0, 4.0, 10.0);
        for (v, w) in y.iter_mut().zip(lorentzian(400, 300.0, 4.0, 5.0)) {
            *v += w;
        }
        let series = SampleSeries::from_uniform(10.0, -0.025, y, None).unwrap();
        let peaks = BuiltinKernels.pick_peaks(&series, PickParams::default()).unwrap();
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].identity_index, 0);
        assert!((peaks[0].domain_x - 7.5).abs() < 1e-9);
        assert!((peaks[1].domain_x - 2.5).abs() < 1e-9);
        // hwhm ≈ 4 points of 0.025
        assert!((peaks[0].gamma - 0.1).abs() < 0.03);
    }

    #[test]
    fn test_baseline_is_edge_mean_line() {
        let values: Vec<f64> = (0..100).map(|i| 2.0 + i as f64 * 0.01).collect();
        let b = BuiltinKernels.estimate_baseline(&values).unwrap();
        assert_eq!(b.len(), 100);
        assert!((b[0] - 2.045).abs() < 1e-9);
        assert!(b[99] > b[0]);
        assert!(BuiltinKernels.estimate_baseline(&[]).is_err());
    }
}
