//! Linear interpolation resampling for decoded channels.

use num_traits::ToPrimitive;

/// Resamples `samples` by `ratio` (target rate divided by source rate).
///
/// The input is taken to lie on the axis `0, 1, .., len - 1`. Output points
/// are placed at `0, 1/ratio, 2/ratio, ..` for as long as they stay below
/// `len`. Each point is linearly interpolated between the two input samples
/// around it. Points past the last input sample take its value, there is no
/// extrapolation. Values are truncated toward zero and saturate at the
/// bounds of `i16`, the range of a short encoded file.
///
/// An empty input or a ratio that is not a positive finite number gives an
/// empty output.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn resample<T: ToPrimitive + Copy>(samples: &[T], ratio: f64) -> Vec<i16> {
    if samples.is_empty() || !ratio.is_finite() || ratio <= 0.0 {
        return Vec::new();
    }

    let values: Vec<f64> = samples
        .iter()
        .map(|s| s.to_f64().unwrap_or(f64::NAN))
        .collect();
    let step = 1.0 / ratio;
    let len = values.len() as f64;
    #[allow(clippy::cast_sign_loss)]
    let n_points = (len / step).ceil() as usize;

    // `as` truncates toward zero and saturates, NaN becomes 0
    (0..n_points)
        .map(|i| interpolate(&values, i as f64 * step) as i16)
        .collect()
}

fn interpolate(values: &[f64], x: f64) -> f64 {
    let last = values.len() - 1;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let left = x.floor() as usize;
    if left >= last {
        return values[last];
    }
    let frac = x - x.floor();
    values[left] + (values[left + 1] - values[left]) * frac
}
