/// Axis tick generation for the plot frames.
///
/// Steps follow the 1-2-5 ladder at any decade so narrow zooms still get
/// readable labels.

/// Smallest 1-2-5 step that yields at most `target_ticks` intervals over `range`
pub fn nice_step(range: f64, target_ticks: usize) -> f64 {
    let range = range.abs();
    if !range.is_finite() || range == 0.0 || target_ticks == 0 {
        return 1.0;
    }
    let raw_step = range / target_ticks as f64;
    let decade = 10f64.powf(raw_step.log10().floor());
    for &mult in &[1.0, 2.0, 5.0, 10.0] {
        let step = mult * decade;
        if step >= raw_step {
            return step;
        }
    }
    10.0 * decade
}

/// Tick positions in `lo..=hi` (either order), ascending
pub fn ticks(lo: f64, hi: f64, max_ticks: usize) -> Vec<f64> {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    if !(hi - lo).is_finite() || hi <= lo {
        return Vec::new();
    }
    let step = nice_step(hi - lo, max_ticks);
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|k| k as f64 * step).collect()
}

/// Number of decimals needed to tell ticks `step` apart
pub fn label_precision(step: f64) -> usize {
    if step >= 1.0 || step <= 0.0 {
        0
    } else {
        (-step.log10().floor()) as usize
    }
}

pub fn format_tick(value: f64, step: f64) -> String {
    // avoid "-0.0"
    let value = if value.abs() < step * 1e-9 { 0.0 } else { value };
    format!("{:.*}", label_precision(step), value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nice_step_ppm_ranges() {
        assert_eq!(nice_step(10.0, 10), 1.0);
        assert_eq!(nice_step(12.0, 10), 2.0);
        assert!((nice_step(0.3, 10) - 0.05).abs() < 1e-12);
        assert_eq!(nice_step(200.0, 10), 20.0);
    }

    #[test]
    fn test_ticks_cover_reversed_range() {
        let t = ticks(10.0, 0.0, 10);
        assert_eq!(t.len(), 11);
        assert_eq!(t[0], 0.0);
        assert_eq!(t[10], 10.0);
    }

    #[test]
    fn test_ticks_empty_for_degenerate_range() {
        assert!(ticks(1.0, 1.0, 10).is_empty());
        assert!(ticks(f64::NAN, 1.0, 10).is_empty());
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(7.25, 0.05), "7.25");
        assert_eq!(format_tick(-1e-12, 0.5), "0.0");
        assert_eq!(format_tick(120.0, 20.0), "120");
    }
}
