/// Columnar sample storage and the non-copying views handed to the renderer.

use std::ops::Range;

use crate::error::{Result, ViewError};

/// Ordering of a series' x column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increasing,
    Decreasing,
}

/// Ordered `(x, y[, z])` samples stored as separate columns.
///
/// `x` is strictly monotonic. `z` carries the imaginary part of complex data.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSeries {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Option<Vec<f64>>,
    direction: Direction,
}

impl SampleSeries {
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Option<Vec<f64>>) -> Result<Self> {
        if x.len() != y.len() || z.as_ref().is_some_and(|z| z.len() != x.len()) {
            return Err(ViewError::InvalidArgument(format!(
                "column lengths differ (x={}, y={}, z={:?})",
                x.len(),
                y.len(),
                z.as_ref().map(Vec::len)
            )));
        }
        if let Some(bad) = x.iter().position(|v| !v.is_finite()) {
            return Err(ViewError::InvalidArgument(format!(
                "x[{}] is not finite",
                bad
            )));
        }
        let direction = match (x.first(), x.get(1)) {
            (Some(a), Some(b)) if b < a => Direction::Decreasing,
            _ => Direction::Increasing,
        };
        let monotonic = x.windows(2).all(|w| match direction {
            Direction::Increasing => w[1] > w[0],
            Direction::Decreasing => w[1] < w[0],
        });
        if !monotonic {
            return Err(ViewError::PreconditionFailed(
                "x must be strictly monotonic".into(),
            ));
        }
        Ok(Self { x, y, z, direction })
    }

    /// Uniformly sampled series `x_i = start + i * step`
    pub fn from_uniform(start: f64, step: f64, y: Vec<f64>, z: Option<Vec<f64>>) -> Result<Self> {
        let x = (0..y.len()).map(|i| start + i as f64 * step).collect();
        Self::new(x, y, z)
    }

    /// Same x column with replacement values
    pub fn with_values(&self, y: Vec<f64>, z: Option<Vec<f64>>) -> Result<Self> {
        if y.len() != self.x.len() || z.as_ref().is_some_and(|z| z.len() != self.x.len()) {
            return Err(ViewError::InvalidArgument(format!(
                "replacement length {} does not match series length {}",
                y.len(),
                self.x.len()
            )));
        }
        Ok(Self {
            x: self.x.clone(),
            y,
            z,
            direction: self.direction,
        })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn z(&self) -> Option<&[f64]> {
        self.z.as_deref()
    }

    pub fn has_imaginary(&self) -> bool {
        self.z.is_some()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Smallest and largest x
    pub fn x_extent(&self) -> Option<(f64, f64)> {
        let (a, b) = (*self.x.first()?, *self.x.last()?);
        Some(if a <= b { (a, b) } else { (b, a) })
    }

    pub fn y_extent(&self) -> Option<(f64, f64)> {
        self.y.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Index range whose x lies inside `[lo, hi]`, found by binary search
    pub fn index_range(&self, lo: f64, hi: f64) -> Range<usize> {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        match self.direction {
            Direction::Increasing => {
                let start = self.x.partition_point(|&v| v < lo);
                let end = self.x.partition_point(|&v| v <= hi);
                start..end.max(start)
            }
            Direction::Decreasing => {
                let start = self.x.partition_point(|&v| v > hi);
                let end = self.x.partition_point(|&v| v >= lo);
                start..end.max(start)
            }
        }
    }

    pub fn view(&self, range: Range<usize>, stride: usize) -> SeriesView<'_> {
        let end = range.end.min(self.len());
        SeriesView {
            series: self,
            start: range.start.min(end),
            end,
            stride: stride.max(1),
        }
    }

    pub fn full_view(&self) -> SeriesView<'_> {
        self.view(0..self.len(), 1)
    }
}

/// Strided window over a [`SampleSeries`]; never copies the columns.
#[derive(Debug, Clone, Copy)]
pub struct SeriesView<'a> {
    series: &'a SampleSeries,
    start: usize,
    end: usize,
    stride: usize,
}

impl<'a> SeriesView<'a> {
    pub fn len(&self) -> usize {
        if self.end <= self.start {
            0
        } else {
            (self.end - self.start).div_ceil(self.stride)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn series(&self) -> &'a SampleSeries {
        self.series
    }

    /// Indices into the owning series
    pub fn indices(&self) -> impl Iterator<Item = usize> + 'a {
        (self.start..self.end).step_by(self.stride)
    }

    pub fn points(&self) -> impl Iterator<Item = [f64; 2]> + 'a {
        let series = self.series;
        self.indices().map(move |i| [series.x[i], series.y[i]])
    }

    pub fn get(&self, k: usize) -> Option<[f64; 2]> {
        if k >= self.len() {
            return None;
        }
        let i = self.start + k * self.stride;
        Some([self.series.x[i], self.series.y[i]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> SampleSeries {
        SampleSeries::from_uniform(0.0, 1.0, (0..n).map(|i| i as f64).collect(), None).unwrap()
    }

    #[test]
    fn test_non_monotonic_rejected() {
        let err = SampleSeries::new(vec![0.0, 2.0, 1.0], vec![0.0; 3], None).unwrap_err();
        assert!(matches!(err, ViewError::PreconditionFailed(_)));
        let err = SampleSeries::new(vec![0.0, 0.0], vec![0.0; 2], None).unwrap_err();
        assert!(matches!(err, ViewError::PreconditionFailed(_)));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(SampleSeries::new(vec![0.0, 1.0], vec![0.0], None).is_err());
        assert!(SampleSeries::new(vec![0.0, 1.0], vec![0.0; 2], Some(vec![0.0])).is_err());
    }

    #[test]
    fn test_index_range_increasing() {
        let s = ramp(10);
        assert_eq!(s.index_range(2.5, 6.0), 3..7);
        assert_eq!(s.index_range(6.0, 2.5), 3..7);
        assert_eq!(s.index_range(20.0, 30.0), 10..10);
    }

    #[test]
    fn test_index_range_decreasing() {
        let s = SampleSeries::from_uniform(10.0, -1.0, vec![0.0; 11], None).unwrap();
        assert_eq!(s.direction(), Direction::Decreasing);
        // x = 10, 9, ... 0
        assert_eq!(s.index_range(3.0, 7.5), 3..8);
    }

    #[test]
    fn test_view_stride_and_points() {
        let s = ramp(10);
        let v = s.view(1..8, 3);
        assert_eq!(v.len(), 3);
        let xs: Vec<f64> = v.points().map(|p| p[0]).collect();
        assert_eq!(xs, vec![1.0, 4.0, 7.0]);
        assert_eq!(v.get(2), Some([7.0, 7.0]));
        assert_eq!(v.get(3), None);
    }

    #[test]
    fn test_empty_series_is_valid() {
        let s = SampleSeries::new(Vec::new(), Vec::new(), None).unwrap();
        assert!(s.is_empty());
        assert!(s.full_view().is_empty());
        assert_eq!(s.x_extent(), None);
    }
}
