use log::debug;

use crate::detect::DetectedPeak;
use crate::error::{CalibrationError, Phase, Rejection};
use crate::library::{Compound, Peak};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherConfig {
    /// Largest |expected − measured| accepted as the same line (cm⁻¹).
    pub max_shift_threshold: f64,
    /// Fewest accepted matches that make a valid correction.
    pub min_matched_peaks: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            max_shift_threshold: 20.0,
            min_matched_peaks: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Whether `peak` lies strictly inside the range spanned by `axis`.
pub fn visible(peak: &Peak, axis: &[f64]) -> bool {
    let (Some(&first), Some(&last)) = (axis.first(), axis.last()) else {
        return false;
    };
    let (lo, hi) = if first <= last { (first, last) } else { (last, first) };
    lo < peak.wavenumber && peak.wavenumber < hi
}

/// Index into `detected` of the peak closest to `target`.
///
/// Ties go to the lower pixel index.
pub fn nearest(detected: &[DetectedPeak], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, peak) in detected.iter().enumerate() {
        let distance = (peak.wavenumber - target).abs();
        best = match best {
            None => Some((idx, distance)),
            Some((b, d)) if distance < d || (distance == d && peak.pixel < detected[b].pixel) => {
                Some((idx, distance))
            }
            keep => keep,
        };
    }
    best.map(|(idx, _)| idx)
}

/// Sub-pixel position and height of the maximum near `pixel`.
///
/// Fits a parabola through the sample and its two neighbours; an integer
/// index is biased by up to half a sample, which at coarse resolution is
/// larger than the match tolerance. The fractional offset is mapped through
/// the local axis spacing, so non-uniform axes are handled. Edge pixels and
/// flat neighbourhoods return the raw sample.
///
/// # Panics
///
/// If `pixel` is out of bounds for `axis` or `spectrum`.
pub fn refine(pixel: usize, axis: &[f64], spectrum: &[f64]) -> (f64, f64) {
    let raw = (axis[pixel], spectrum[pixel]);
    let n = axis.len().min(spectrum.len());
    if pixel == 0 || pixel + 1 >= n {
        return raw;
    }

    let (y0, y1, y2) = (spectrum[pixel - 1], spectrum[pixel], spectrum[pixel + 1]);
    let denom = y0 - 2.0 * y1 + y2;
    if denom.abs() < f64::EPSILON * y1.abs().max(1.0) {
        return raw;
    }
    let delta = (0.5 * (y0 - y2) / denom).clamp(-1.0, 1.0);

    let step = if delta >= 0.0 {
        axis[pixel + 1] - axis[pixel]
    } else {
        axis[pixel] - axis[pixel - 1]
    };
    let wavenumber = axis[pixel] + delta * step;
    let intensity = y1 - 0.25 * (y0 - y2) * delta;
    (wavenumber, intensity)
}

/// The offset that must be added to the axis to move `measured` onto
/// `expected`.
pub fn shift(expected: f64, measured: f64) -> f64 {
    expected - measured
}

// ---------------------------------------------------------------------------
// Match results
// ---------------------------------------------------------------------------

/// One accepted pairing of a library peak with a detected peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakMatch {
    pub expected: f64,
    pub measured: f64,
    pub shift: f64,
    pub pixel: usize,
    pub primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    /// Accepted matches, in compound order.
    pub matches: Vec<PeakMatch>,
    /// Library peaks inside the axis range.
    pub visible_count: usize,
}

impl MatchReport {
    pub fn matched_count(&self) -> usize {
        self.matches.len()
    }

    /// Unweighted mean of the accepted shifts.
    ///
    /// An accepted report always holds at least one match; an empty one
    /// averages to zero.
    pub fn mean_shift(&self) -> f64 {
        if self.matches.is_empty() {
            return 0.0;
        }
        let total: f64 = self.matches.iter().map(|m| m.shift).sum();
        total / self.matches.len() as f64
    }
}

// ---------------------------------------------------------------------------
// PeakMatcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct PeakMatcher {
    config: MatcherConfig,
}

impl PeakMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        PeakMatcher { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Pair every visible peak of `compound` with its nearest detected peak.
    ///
    /// Peaks are examined in compound order. A rejected primary peak stops
    /// the run at once; rejected secondary peaks are skipped. Assignment is
    /// not one-to-one: two library peaks may claim the same detected peak.
    pub fn match_compound(
        &self,
        compound: &Compound,
        detected: &[DetectedPeak],
        axis: &[f64],
    ) -> Result<MatchReport, Rejection> {
        let threshold = self.config.max_shift_threshold;
        let mut report = MatchReport::default();

        for peak in &compound.peaks {
            if !visible(peak, axis) {
                continue;
            }
            report.visible_count += 1;

            let candidate = nearest(detected, peak.wavenumber).map(|idx| &detected[idx]);
            let accepted = candidate
                .map(|d| (d, shift(peak.wavenumber, d.wavenumber)))
                .filter(|(_, s)| s.abs() <= threshold);

            match accepted {
                Some((d, s)) => {
                    debug!(
                        "{}: {:.2} matched {:.2} at pixel {} (shift {s:+.3})",
                        compound.name, peak.wavenumber, d.wavenumber, d.pixel
                    );
                    report.matches.push(PeakMatch {
                        expected: peak.wavenumber,
                        measured: d.wavenumber,
                        shift: s,
                        pixel: d.pixel,
                        primary: peak.primary,
                    });
                }
                None if peak.primary => {
                    let s = candidate
                        .map(|d| shift(peak.wavenumber, d.wavenumber))
                        .unwrap_or(f64::INFINITY);
                    return Err(Rejection {
                        kind: CalibrationError::PrimaryPeakUnmatched {
                            wavenumber: peak.wavenumber,
                            shift: s,
                            threshold,
                        },
                        phase: Phase::Matching,
                        matched_count: report.matched_count(),
                        visible_count: report.visible_count,
                    });
                }
                None => {
                    debug!(
                        "{}: {:.2} has no detected peak within {threshold}",
                        compound.name, peak.wavenumber
                    );
                }
            }
        }

        let required = self.config.min_matched_peaks.max(1);
        if report.matched_count() < required {
            return Err(Rejection {
                kind: CalibrationError::InsufficientMatches {
                    matched: report.matched_count(),
                    required,
                },
                phase: Phase::Matching,
                matched_count: report.matched_count(),
                visible_count: report.visible_count,
            });
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detected(positions: &[f64]) -> Vec<DetectedPeak> {
        positions
            .iter()
            .enumerate()
            .map(|(pixel, &wavenumber)| DetectedPeak {
                pixel,
                wavenumber,
                intensity: 1.0,
            })
            .collect()
    }

    fn compound(positions: &[f64]) -> Compound {
        Compound::new("test", positions.iter().map(|&w| Peak::new(w)).collect())
    }

    const AXIS: [f64; 2] = [0.0, 4000.0];

    #[test]
    fn visibility_is_strict() {
        let axis = [100.0, 200.0, 300.0];
        assert!(visible(&Peak::new(150.0), &axis));
        assert!(!visible(&Peak::new(100.0), &axis));
        assert!(!visible(&Peak::new(300.0), &axis));
        assert!(!visible(&Peak::new(50.0), &axis));
        assert!(!visible(&Peak::new(150.0), &[]));
    }

    #[test]
    fn nearest_breaks_ties_by_pixel() {
        let peaks = vec![
            DetectedPeak { pixel: 9, wavenumber: 110.0, intensity: 1.0 },
            DetectedPeak { pixel: 3, wavenumber: 90.0, intensity: 1.0 },
            DetectedPeak { pixel: 20, wavenumber: 300.0, intensity: 1.0 },
        ];
        assert_eq!(nearest(&peaks, 100.0), Some(1));
        assert_eq!(nearest(&peaks, 290.0), Some(2));
        assert_eq!(nearest(&[], 100.0), None);
    }

    #[test]
    fn refine_centered_peak_is_exact() {
        let axis = [10.0, 12.0, 14.0, 16.0, 18.0];
        let y = [0.0, 1.0, 3.0, 1.0, 0.0];
        let (w, h) = refine(2, &axis, &y);
        assert_eq!(w, 14.0);
        assert_eq!(h, 3.0);
    }

    #[test]
    fn refine_symmetric_pair_lands_on_midpoint() {
        let axis = [10.0, 12.0, 14.0, 16.0, 18.0, 20.0];
        let y = [0.0, 1.0, 3.0, 3.0, 1.0, 0.0];
        let (w, _) = refine(2, &axis, &y);
        assert!((w - 15.0).abs() < 1e-12, "{w}");
        let (w, _) = refine(3, &axis, &y);
        assert!((w - 15.0).abs() < 1e-12, "{w}");
    }

    #[test]
    fn refine_edges_and_flat_tops_return_raw_sample() {
        let axis = [10.0, 12.0, 14.0];
        assert_eq!(refine(0, &axis, &[5.0, 1.0, 0.0]), (10.0, 5.0));
        assert_eq!(refine(2, &axis, &[0.0, 1.0, 5.0]), (14.0, 5.0));
        assert_eq!(refine(1, &axis, &[2.0, 2.0, 2.0]), (12.0, 2.0));
    }

    #[test]
    fn shift_is_expected_minus_measured() {
        assert_eq!(shift(1001.4, 999.4), 2.0);
        assert_eq!(shift(100.0, 103.0), -3.0);
    }

    #[test]
    fn mean_of_shifts_is_unweighted() {
        let matcher = PeakMatcher::new(MatcherConfig {
            min_matched_peaks: 3,
            ..MatcherConfig::default()
        });
        let report = matcher
            .match_compound(
                &compound(&[100.0, 200.0, 300.0]),
                &detected(&[98.0, 203.0, 299.0]),
                &AXIS,
            )
            .unwrap();
        let shifts: Vec<f64> = report.matches.iter().map(|m| m.shift).collect();
        assert_eq!(shifts, vec![2.0, -3.0, 1.0]);
        assert_eq!(report.mean_shift(), 0.0);
        assert_eq!(MatchReport::default().mean_shift(), 0.0);
    }

    #[test]
    fn rejected_secondary_counts_as_visible_only() {
        let report = PeakMatcher::default()
            .match_compound(
                &compound(&[500.0, 1000.0, 1500.0, 2000.0, 2500.0]),
                &detected(&[501.0, 1001.0, 1501.0, 2001.0, 2560.0]),
                &AXIS,
            )
            .unwrap();
        assert_eq!(report.visible_count, 5);
        assert_eq!(report.matched_count(), 4);
    }

    #[test]
    fn minimum_match_boundary() {
        let positions = [500.0, 1000.0, 1500.0, 2000.0];
        let matcher = PeakMatcher::default();

        let ok = matcher
            .match_compound(&compound(&positions), &detected(&positions), &AXIS)
            .unwrap();
        assert_eq!(ok.matched_count(), 4);

        let err = matcher
            .match_compound(
                &compound(&positions),
                &detected(&[500.0, 1000.0, 1500.0, 2100.0]),
                &AXIS,
            )
            .unwrap_err();
        assert_eq!(
            err.kind,
            CalibrationError::InsufficientMatches { matched: 3, required: 4 }
        );
        assert_eq!((err.matched_count, err.visible_count), (3, 4));
    }

    #[test]
    fn primary_peak_dominates() {
        let mut peaks: Vec<Peak> = (1..=10).map(|i| Peak::new(i as f64 * 200.0)).collect();
        peaks.push(Peak::new(2500.0).primary());
        let compound = Compound::new("test", peaks);

        let mut positions: Vec<f64> = (1..=10).map(|i| i as f64 * 200.0 + 1.0).collect();
        positions.push(2530.0);

        let err = PeakMatcher::default()
            .match_compound(&compound, &detected(&positions), &AXIS)
            .unwrap_err();
        match err.kind {
            CalibrationError::PrimaryPeakUnmatched { wavenumber, shift, .. } => {
                assert_eq!(wavenumber, 2500.0);
                assert_eq!(shift, -30.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.matched_count, 10);
        assert_eq!(err.visible_count, 11);
    }

    #[test]
    fn primary_abort_stops_before_later_peaks() {
        let compound = Compound::new(
            "test",
            vec![
                Peak::new(500.0).primary(),
                Peak::new(1000.0),
                Peak::new(1500.0),
            ],
        );
        let err = PeakMatcher::default()
            .match_compound(&compound, &detected(&[600.0, 1000.0, 1500.0]), &AXIS)
            .unwrap_err();
        assert_eq!((err.matched_count, err.visible_count), (0, 1));
    }

    #[test]
    fn invisible_peaks_are_not_counted() {
        let positions = [500.0, 1000.0, 1500.0, 2000.0];
        let mut library_peaks = positions.to_vec();
        library_peaks.push(5000.0);
        let report = PeakMatcher::default()
            .match_compound(&compound(&library_peaks), &detected(&positions), &AXIS)
            .unwrap();
        assert_eq!(report.visible_count, 4);
        assert_eq!(report.matched_count(), 4);
    }

    #[test]
    fn invisible_primary_is_not_mandatory() {
        let compound = Compound::new(
            "test",
            vec![
                Peak::new(4500.0).primary(),
                Peak::new(500.0),
                Peak::new(1000.0),
                Peak::new(1500.0),
                Peak::new(2000.0),
            ],
        );
        let report = PeakMatcher::default()
            .match_compound(
                &compound,
                &detected(&[500.0, 1000.0, 1500.0, 2000.0]),
                &AXIS,
            )
            .unwrap();
        assert_eq!(report.visible_count, 4);
    }

    #[test]
    fn close_library_peaks_may_share_a_detected_peak() {
        // Two expected lines 6 cm⁻¹ apart, only one resolved in the data:
        // both claim it.
        let compound = compound(&[500.0, 1000.0, 1500.0, 2923.8, 2929.8]);
        let report = PeakMatcher::default()
            .match_compound(
                &compound,
                &detected(&[500.0, 1000.0, 1500.0, 2926.0]),
                &AXIS,
            )
            .unwrap();
        assert_eq!(report.matched_count(), 5);
        let pixels: Vec<usize> = report.matches.iter().map(|m| m.pixel).collect();
        assert_eq!(pixels[3], pixels[4]);
    }
}
