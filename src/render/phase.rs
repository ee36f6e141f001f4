/// Real-time phase correction over an immutable original.
///
/// Every preview is recomputed from the stored original so repeated
/// adjustments never accumulate rounding. Only [`PhaseCorrector::commit`]
/// replaces the original.

use crate::data::series::SampleSeries;
use crate::error::{ensure_finite, Result, ViewError};

/// Current correction angles in radians
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseState {
    /// Phase at the first point
    pub phase0: f64,
    /// Phase at the last point
    pub phase1: f64,
    /// Pivot as a fraction of the point count, if set
    pub anchor: Option<f64>,
}

impl PhaseState {
    /// Angle applied at index fraction `frac`
    pub fn angle_at(&self, frac: f64) -> f64 {
        self.phase0 + (self.phase1 - self.phase0) * frac
    }

    pub fn is_zero(&self) -> bool {
        self.phase0 == 0.0 && self.phase1 == 0.0
    }
}

/// Phase-rotate a complex series.
///
/// `theta_i = phase0 + (phase1 - phase0) * i / N`, then
/// `y' = y cos + z sin` and `z' = z cos - y sin`.
pub fn apply_phase(original: &SampleSeries, phase0: f64, phase1: f64) -> Result<SampleSeries> {
    ensure_finite("phase0", phase0)?;
    ensure_finite("phase1", phase1)?;
    let im = original.z().ok_or_else(|| {
        ViewError::InvalidArgument("phase correction needs an imaginary part".into())
    })?;
    let re = original.y();
    let n = re.len();
    let mut y = Vec::with_capacity(n);
    let mut z = Vec::with_capacity(n);
    for i in 0..n {
        let theta = phase0 + (phase1 - phase0) * i as f64 / n as f64;
        let (sin, cos) = theta.sin_cos();
        y.push(re[i] * cos + im[i] * sin);
        z.push(im[i] * cos - re[i] * sin);
    }
    original.with_values(y, Some(z))
}

/// Holds the original series, the working preview and the pending angles
#[derive(Debug, Clone)]
pub struct PhaseCorrector {
    original: SampleSeries,
    working: SampleSeries,
    state: PhaseState,
}

impl PhaseCorrector {
    pub fn new(original: SampleSeries) -> Result<Self> {
        if !original.has_imaginary() {
            return Err(ViewError::InvalidArgument(
                "phase correction needs an imaginary part".into(),
            ));
        }
        Ok(Self {
            working: original.clone(),
            original,
            state: PhaseState::default(),
        })
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    pub fn original(&self) -> &SampleSeries {
        &self.original
    }

    /// Latest corrected series
    pub fn working(&self) -> &SampleSeries {
        &self.working
    }

    pub fn is_dirty(&self) -> bool {
        !self.state.is_zero()
    }

    /// Set both angles and recompute the preview from the original
    pub fn set(&mut self, phase0: f64, phase1: f64) -> Result<&SampleSeries> {
        self.working = apply_phase(&self.original, phase0, phase1)?;
        self.state.phase0 = phase0;
        self.state.phase1 = phase1;
        Ok(&self.working)
    }

    /// Incremental adjustment.
    ///
    /// Without an anchor both ends move by `delta`. With an anchor the angle
    /// at the anchor is held and the slope changes by `delta`.
    pub fn nudge(&mut self, delta: f64) -> Result<&SampleSeries> {
        ensure_finite("phase delta", delta)?;
        let (p0, p1) = match self.state.anchor {
            None => (self.state.phase0 + delta, self.state.phase1 + delta),
            Some(a) => {
                let held = self.state.angle_at(a);
                let slope = self.state.phase1 - self.state.phase0 + delta;
                let p0 = held - slope * a;
                (p0, p0 + slope)
            }
        };
        self.set(p0, p1)
    }

    pub fn set_anchor(&mut self, fraction: f64) -> Result<()> {
        ensure_finite("anchor", fraction)?;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ViewError::InvalidArgument(format!(
                "anchor fraction {} outside 0..=1",
                fraction
            )));
        }
        self.state.anchor = Some(fraction);
        Ok(())
    }

    pub fn clear_anchor(&mut self) {
        self.state.anchor = None;
    }

    /// Make the working series the new original and zero the angles.
    /// Returns the angles that were committed.
    pub fn commit(&mut self) -> PhaseState {
        let committed = self.state;
        self.original = self.working.clone();
        self.state.phase0 = 0.0;
        self.state.phase1 = 0.0;
        log::info!(
            "Phase committed: ph0={:.4} rad, ph1={:.4} rad",
            committed.phase0,
            committed.phase1
        );
        committed
    }

    /// Drop uncommitted changes
    pub fn discard(&mut self) {
        self.working = self.original.clone();
        self.state.phase0 = 0.0;
        self.state.phase1 = 0.0;
    }

    /// Replace the original outright, e.g. after a baseline subtraction
    pub fn reset(&mut self, original: SampleSeries) -> Result<()> {
        *self = Self {
            state: PhaseState {
                anchor: self.state.anchor,
                ..PhaseState::default()
            },
            ..Self::new(original)?
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn complex(n: usize) -> SampleSeries {
        let y = (0..n).map(|i| (i as f64 * 0.3).cos()).collect();
        let z = (0..n).map(|i| (i as f64 * 0.3).sin()).collect();
        SampleSeries::from_uniform(0.0, 1.0, y, Some(z)).unwrap()
    }

    #[test]
    fn test_quarter_turn_of_imaginary_unit() {
        let s = SampleSeries::from_uniform(0.0, 1.0, vec![0.0], Some(vec![1.0])).unwrap();
        let out = apply_phase(&s, FRAC_PI_2, FRAC_PI_2).unwrap();
        assert!((out.y()[0] - 1.0).abs() < 1e-12);
        assert!(out.z().unwrap()[0].abs() < 1e-12);
    }

    #[test]
    fn test_zero_phase_is_identity() {
        let s = complex(64);
        let out = apply_phase(&s, 0.0, 0.0).unwrap();
        assert_eq!(out, s);
    }

    #[test]
    fn test_zero_phase_leaves_real_points_untouched() {
        let s = SampleSeries::from_uniform(0.0, 1.0, vec![1.0, 2.0, 3.0, 4.0], Some(vec![0.0; 4])).unwrap();
        let out = apply_phase(&s, 0.0, 0.0).unwrap();
        assert_eq!(out.y(), &[1.0, 2.0, 3.0, 4.0][..]);
        assert!(out.z().unwrap().iter().all(|&v| v == 0.0));
        assert_eq!(out.z().unwrap().len(), 4);
    }

    #[test]
    fn test_repeated_set_is_idempotent() {
        let mut pc = PhaseCorrector::new(complex(128)).unwrap();
        let first = pc.set(0.4, -1.1).unwrap().clone();
        pc.set(2.0, 0.3).unwrap();
        let again = pc.set(0.4, -1.1).unwrap();
        assert_eq!(&first, again);
    }

    #[test]
    fn test_real_only_and_non_finite_rejected() {
        let real = SampleSeries::from_uniform(0.0, 1.0, vec![1.0; 4], None).unwrap();
        assert!(matches!(PhaseCorrector::new(real.clone()), Err(ViewError::InvalidArgument(_))));
        assert!(apply_phase(&real, 0.1, 0.1).is_err());
        assert!(apply_phase(&complex(4), f64::INFINITY, 0.0).is_err());
    }

    #[test]
    fn test_nudge_with_anchor_holds_pivot_angle() {
        let mut pc = PhaseCorrector::new(complex(32)).unwrap();
        pc.set(0.2, 0.6).unwrap();
        pc.set_anchor(0.25).unwrap();
        let before = pc.state().angle_at(0.25);
        pc.nudge(0.0175).unwrap();
        let after = pc.state();
        assert!((after.angle_at(0.25) - before).abs() < 1e-12);
        assert!(((after.phase1 - after.phase0) - 0.4175).abs() < 1e-12);
    }

    #[test]
    fn test_nudge_without_anchor_is_zero_order() {
        let mut pc = PhaseCorrector::new(complex(32)).unwrap();
        pc.nudge(0.5).unwrap();
        assert_eq!(pc.state().phase0, 0.5);
        assert_eq!(pc.state().phase1, 0.5);
    }

    #[test]
    fn test_commit_rebases_and_discard_restores() {
        let mut pc = PhaseCorrector::new(complex(16)).unwrap();
        let phased = pc.set(1.0, 1.0).unwrap().clone();
        let committed = pc.commit();
        assert_eq!(committed.phase0, 1.0);
        assert!(!pc.is_dirty());
        assert_eq!(pc.original(), &phased);

        pc.set(0.3, 0.3).unwrap();
        pc.discard();
        assert_eq!(pc.working(), &phased);
        assert!(pc.set_anchor(1.5).is_err());
    }
}
