/// Peak records shared between compute collaborators and the overlay.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, Result, ViewError};

/// A picked or fitted peak. `sigma` and `gamma` are in domain units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub domain_x: f64,
    pub intensity: f64,
    /// Stable id; never renumbered once assigned
    pub identity_index: usize,
    pub sigma: f64,
    pub gamma: f64,
    /// Baseline offset under the peak, in intensity units
    pub background: f64,
}

impl Peak {
    pub fn new(identity_index: usize, domain_x: f64, intensity: f64) -> Self {
        Self {
            domain_x,
            intensity,
            identity_index,
            sigma: 0.0,
            gamma: 0.0,
            background: 0.0,
        }
    }

    /// Display width used by the label policy
    pub fn width(&self) -> f64 {
        (self.sigma + self.gamma) * 2.5
    }

    /// Pseudo-Voigt line shape at `x`, mixing by the share of `gamma` in the
    /// total width. A zero-width peak is a single spike at its position.
    pub fn profile_at(&self, x: f64) -> f64 {
        let d = x - self.domain_x;
        let total = self.sigma + self.gamma;
        if total <= 0.0 {
            return self.background + if d == 0.0 { self.intensity } else { 0.0 };
        }
        let eta = self.gamma / total;
        let lorentz = if self.gamma > 0.0 {
            let g2 = self.gamma * self.gamma;
            g2 / (d * d + g2)
        } else {
            0.0
        };
        let gauss = if self.sigma > 0.0 {
            (-0.5 * (d / self.sigma).powi(2)).exp()
        } else {
            0.0
        };
        self.background + self.intensity * (eta * lorentz + (1.0 - eta) * gauss)
    }
}

/// Sum of every peak's profile sampled at `xs`
pub fn simulate(peaks: &[Peak], xs: &[f64]) -> Vec<f64> {
    xs.iter()
        .map(|&x| peaks.iter().map(|p| p.profile_at(x) - p.background).sum())
        .collect()
}

/// Median with the two middle values averaged for even counts
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    })
}

/// Cloneable handle to a shared peak list.
///
/// Every clone sees the same records. Each [`PeakCollection::update`] is a
/// single atomic write; concurrent writers resolve last-writer-wins.
#[derive(Debug, Clone, Default)]
pub struct PeakCollection {
    inner: Arc<RwLock<Vec<Peak>>>,
}

impl PeakCollection {
    pub fn new(peaks: Vec<Peak>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(peaks)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Peak>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Peak>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of the current records
    pub fn snapshot(&self) -> Vec<Peak> {
        self.read().clone()
    }

    pub fn get(&self, identity_index: usize) -> Option<Peak> {
        self.read()
            .iter()
            .find(|p| p.identity_index == identity_index)
            .cloned()
    }

    /// Move a peak. The identity index is preserved.
    pub fn update(&self, identity_index: usize, domain_x: f64, intensity: f64) -> Result<()> {
        ensure_finite("domain_x", domain_x)?;
        ensure_finite("intensity", intensity)?;
        let mut peaks = self.write();
        let peak = peaks
            .iter_mut()
            .find(|p| p.identity_index == identity_index)
            .ok_or_else(|| {
                ViewError::InvalidArgument(format!("no peak with identity {}", identity_index))
            })?;
        peak.domain_x = domain_x;
        peak.intensity = intensity;
        Ok(())
    }

    /// Drop one record. The remaining peaks keep their identities and order.
    pub fn remove(&self, identity_index: usize) -> Result<Peak> {
        let mut peaks = self.write();
        let at = peaks
            .iter()
            .position(|p| p.identity_index == identity_index)
            .ok_or_else(|| {
                ViewError::InvalidArgument(format!("no peak with identity {}", identity_index))
            })?;
        Ok(peaks.remove(at))
    }

    /// Median of `(sigma + gamma) * 2.5` over all peaks
    pub fn median_width(&self) -> Result<f64> {
        let mut widths: Vec<f64> = self.read().iter().map(Peak::width).collect();
        median(&mut widths).ok_or_else(|| ViewError::EmptyInput("peak collection is empty".into()))
    }

    /// True when both handles share storage
    pub fn same_as(&self, other: &PeakCollection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
