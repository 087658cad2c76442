use crate::library::model::MAX_RELATIVE_INTENSITY;
use crate::library::Compound;
use crate::matcher::visible;

/// Draw the expected peaks of `compound` as a stick spectrum to lay over a
/// measurement.
///
/// Each visible peak becomes baseline → apex → baseline at
/// `w − half_width, w, w + half_width`. The baseline sits at `spectrum_min`
/// and an intensity-5 apex reaches `spectrum_max`. Single baseline points at
/// both ends of `axis` make the curve span the whole plot. An empty axis
/// gives an empty series; no visible peaks gives only the two end points.
pub fn render(
    compound: &Compound,
    axis: &[f64],
    spectrum_min: f64,
    spectrum_max: f64,
    peak_half_width: f64,
) -> Vec<(f64, f64)> {
    let (Some(&first), Some(&last)) = (axis.first(), axis.last()) else {
        return Vec::new();
    };
    let (lo, hi) = if first <= last { (first, last) } else { (last, first) };
    let baseline = spectrum_min;
    let range = spectrum_max - spectrum_min;
    let half_width = peak_half_width.abs();

    let mut peaks: Vec<(f64, u8)> = compound
        .peaks
        .iter()
        .filter(|p| visible(p, axis))
        .map(|p| (p.wavenumber, p.intensity))
        .collect();
    peaks.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut series = Vec::with_capacity(peaks.len() * 3 + 2);
    series.push((lo, baseline));
    for (wavenumber, intensity) in peaks {
        let apex = baseline + f64::from(intensity) * range / f64::from(MAX_RELATIVE_INTENSITY);
        series.push(((wavenumber - half_width).max(lo), baseline));
        series.push((wavenumber, apex));
        series.push(((wavenumber + half_width).min(hi), baseline));
    }
    series.push((hi, baseline));
    series
}
