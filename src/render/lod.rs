/// Level-of-detail decimation for 1D traces.

use crate::data::series::{SampleSeries, SeriesView};
use crate::error::{Result, ViewError};
use crate::view::viewport::Span;

/// Largest stride the decimator will use. Past this, output may exceed the cap.
pub const MAX_STRIDE: usize = 4;

/// Points of `series` inside `window`, thinned to roughly `cap` points.
///
/// Keeps every `step`-th point starting from the first in-window sample,
/// with `step = min(ceil(count / cap), MAX_STRIDE)`.
pub fn decimate<'a>(series: &'a SampleSeries, window: Span, cap: usize) -> Result<SeriesView<'a>> {
    if cap == 0 {
        return Err(ViewError::InvalidArgument("decimation cap must be positive".into()));
    }
    let range = series.index_range(window.lo, window.hi);
    let count = range.len();
    let step = if count > cap {
        count.div_ceil(cap).min(MAX_STRIDE)
    } else {
        1
    };
    let view = series.view(range, step);
    log::debug!(
        "decimate: {} in window, stride {}, {} kept",
        count,
        step,
        view.len()
    );
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(n: usize) -> SampleSeries {
        SampleSeries::from_uniform(0.0, 1.0, vec![0.0; n], None).unwrap()
    }

    #[test]
    fn test_stride_clamped_to_four() {
        let s = uniform(100_000);
        let v = decimate(&s, Span::new(-1.0, 1e6), 10_000).unwrap();
        assert_eq!(v.stride(), 4);
        assert_eq!(v.len(), 25_000);
        assert_eq!(v.get(0), Some([0.0, 0.0]));
    }

    #[test]
    fn test_under_cap_is_untouched() {
        let s = uniform(50);
        let v = decimate(&s, Span::new(10.0, 19.0), 100).unwrap();
        assert_eq!(v.stride(), 1);
        assert_eq!(v.len(), 10);
        assert_eq!(v.get(0).map(|p| p[0]), Some(10.0));
    }

    #[test]
    fn test_output_is_ordered_subset_within_cap() {
        let s = SampleSeries::from_uniform(10.0, -0.001, vec![1.0; 9_000], None).unwrap();
        let window = Span::new(2.0, 8.0);
        let v = decimate(&s, window, 2_500).unwrap();
        assert!(v.len() <= 2_500);
        let xs: Vec<f64> = v.points().map(|p| p[0]).collect();
        assert!(xs.windows(2).all(|w| w[1] < w[0]));
        assert!(xs.iter().all(|x| window.contains(*x)));
        let first_in_window = s.index_range(window.lo, window.hi).start;
        assert_eq!(xs[0], s.x()[first_in_window]);
    }

    #[test]
    fn test_zero_cap_rejected() {
        let s = uniform(4);
        assert!(matches!(
            decimate(&s, Span::new(0.0, 3.0), 0),
            Err(ViewError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_window_outside_data_is_empty() {
        let s = uniform(4);
        assert!(decimate(&s, Span::new(100.0, 200.0), 10).unwrap().is_empty());
    }
}
