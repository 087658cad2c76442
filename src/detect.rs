use log::debug;

use crate::error::CalibrationError;
use crate::matcher::refine;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Bounds and noise floor for peak detection.
///
/// The peak-count bounds are policy, not physics: a reference measurement
/// yielding too few peaks is underexposed, too many is noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub min_peaks_found: usize,
    pub max_peaks_found: usize,
    /// Prominence floor as a fraction of the spectrum's dynamic range.
    pub min_relative_prominence: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            min_peaks_found: 4,
            max_peaks_found: 50,
            min_relative_prominence: 0.02,
        }
    }
}

/// Narrowest accepted peak, in units of the instrument FWHM.
const MIN_WIDTH_FWHM: f64 = 0.5;
/// Broadest accepted peak, in units of the instrument FWHM.
const MAX_WIDTH_FWHM: f64 = 2.0;

// ---------------------------------------------------------------------------
// DetectedPeak
// ---------------------------------------------------------------------------

/// A peak found in a measured spectrum, refined to sub-pixel position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedPeak {
    /// Index of the apex sample.
    pub pixel: usize,
    /// Refined position on the axis the detector was given (cm⁻¹).
    pub wavenumber: f64,
    /// Refined apex height.
    pub intensity: f64,
}

// ---------------------------------------------------------------------------
// PeakDetector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct PeakDetector {
    config: DetectorConfig,
}

impl PeakDetector {
    pub fn new(config: DetectorConfig) -> Self {
        PeakDetector { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Find the peaks of `spectrum` plausibly caused by real Raman lines.
    ///
    /// `fwhm` is the instrument resolution in axis units; it is converted into
    /// samples using the mean axis spacing, and only peaks whose width at half
    /// prominence lies between 0.5 and 2 FWHM are kept. Results are ordered by
    /// pixel.
    pub fn detect(
        &self,
        spectrum: &[f64],
        axis: &[f64],
        fwhm: f64,
    ) -> Result<Vec<DetectedPeak>, CalibrationError> {
        let fwhm_samples = fwhm_in_samples(spectrum, axis, fwhm)?;
        let min_width = MIN_WIDTH_FWHM * fwhm_samples;
        let max_width = MAX_WIDTH_FWHM * fwhm_samples;

        let lo = spectrum.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = spectrum.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_prominence = self.config.min_relative_prominence * (hi - lo);

        let mut peaks = Vec::new();
        for pixel in local_maxima(spectrum) {
            let (prominence, left_base, right_base) = prominence(spectrum, pixel);
            if prominence <= 0.0 || prominence < min_prominence {
                continue;
            }
            let width = width_at_half_prominence(spectrum, pixel, prominence, left_base, right_base);
            if width < min_width || width > max_width {
                debug!(
                    "pixel {pixel}: width {width:.2} samples outside [{min_width:.2}, {max_width:.2}]"
                );
                continue;
            }
            let (wavenumber, intensity) = refine(pixel, axis, spectrum);
            peaks.push(DetectedPeak {
                pixel,
                wavenumber,
                intensity,
            });
        }

        debug!(
            "detected {} peaks (fwhm {fwhm:.2} = {fwhm_samples:.2} samples, prominence floor {min_prominence:.3})",
            peaks.len()
        );

        let found = peaks.len();
        if found > self.config.max_peaks_found {
            return Err(CalibrationError::ExcessiveNoise {
                found,
                max: self.config.max_peaks_found,
            });
        }
        if found < self.config.min_peaks_found {
            return Err(CalibrationError::InsufficientSignal {
                found,
                min: self.config.min_peaks_found,
            });
        }
        Ok(peaks)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate the inputs and express `fwhm` as a number of samples.
fn fwhm_in_samples(spectrum: &[f64], axis: &[f64], fwhm: f64) -> Result<f64, CalibrationError> {
    if spectrum.len() != axis.len() {
        return Err(CalibrationError::MalformedSpectrum(format!(
            "{} intensities but {} axis values",
            spectrum.len(),
            axis.len()
        )));
    }
    let n = axis.len();
    if n < 3 {
        return Err(CalibrationError::MalformedSpectrum(format!(
            "{n} samples is too few to find peaks"
        )));
    }
    if spectrum.iter().chain(axis).any(|v| !v.is_finite()) {
        return Err(CalibrationError::MalformedSpectrum(
            "non-finite sample".to_string(),
        ));
    }
    if !(fwhm.is_finite() && fwhm > 0.0) {
        return Err(CalibrationError::MalformedSpectrum(format!(
            "resolution {fwhm} is not a positive width"
        )));
    }
    let spacing = (axis[n - 1] - axis[0]).abs() / (n - 1) as f64;
    if spacing <= 0.0 {
        return Err(CalibrationError::MalformedSpectrum(
            "axis spans zero width".to_string(),
        ));
    }
    Ok(fwhm / spacing)
}

/// Interior local maxima. A flat top resolves to its middle sample.
fn local_maxima(y: &[f64]) -> Vec<usize> {
    let n = y.len();
    let mut maxima = Vec::new();
    if n < 3 {
        return maxima;
    }
    let last = n - 1;
    let mut i = 1;
    while i < last {
        if y[i - 1] < y[i] {
            let mut ahead = i + 1;
            while ahead < last && y[ahead] == y[i] {
                ahead += 1;
            }
            if y[ahead] < y[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Topographic prominence of the maximum at `peak`.
///
/// Returns `(prominence, left_base, right_base)`. Each base is the lowest
/// sample reached walking outward before a taller sample or the edge.
fn prominence(y: &[f64], peak: usize) -> (f64, usize, usize) {
    let top = y[peak];

    let mut left_min = top;
    let mut left_base = peak;
    let mut i = peak;
    while i > 0 {
        i -= 1;
        if y[i] > top {
            break;
        }
        if y[i] < left_min {
            left_min = y[i];
            left_base = i;
        }
    }

    let mut right_min = top;
    let mut right_base = peak;
    let mut i = peak;
    while i + 1 < y.len() {
        i += 1;
        if y[i] > top {
            break;
        }
        if y[i] < right_min {
            right_min = y[i];
            right_base = i;
        }
    }

    (top - left_min.max(right_min), left_base, right_base)
}

/// Width in samples where the peak crosses half its prominence, with linear
/// interpolation between samples.
fn width_at_half_prominence(
    y: &[f64],
    peak: usize,
    prominence: f64,
    left_base: usize,
    right_base: usize,
) -> f64 {
    let height = y[peak] - 0.5 * prominence;

    let mut i = peak;
    while left_base < i && height < y[i] {
        i -= 1;
    }
    let mut left = i as f64;
    if y[i] < height {
        left += (height - y[i]) / (y[i + 1] - y[i]);
    }

    let mut i = peak;
    while i < right_base && height < y[i] {
        i += 1;
    }
    let mut right = i as f64;
    if y[i] < height {
        right -= (height - y[i]) / (y[i - 1] - y[i]);
    }

    right - left
}
