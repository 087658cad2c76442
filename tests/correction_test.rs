//! End-to-end behaviour of the correction engine on synthetic spectra.

use proptest::prelude::*;

use wavecal::matcher::refine;
use wavecal::overlay;
use wavecal::{
    CalibrationError, Compound, CorrectionEngine, DetectorConfig, DeviceState, EngineConfig,
    Library, MatcherConfig, Peak, PeakDetector, Phase,
};

const FWHM: f64 = 10.0;

/// 200 → 3200 cm⁻¹ at 2 cm⁻¹ per pixel.
fn axis() -> Vec<f64> {
    (0..1501).map(|i| 200.0 + i as f64 * 2.0).collect()
}

fn gaussians(axis: &[f64], centers: &[f64], fwhm: f64) -> Vec<f64> {
    let sigma = fwhm / (8.0_f64.ln() * 2.0).sqrt();
    axis.iter()
        .map(|&x| {
            centers
                .iter()
                .map(|&c| (-(x - c).powi(2) / (2.0 * sigma * sigma)).exp())
                .sum()
        })
        .collect()
}

fn compound(positions: &[f64]) -> Compound {
    Compound::new("synthetic", positions.iter().map(|&w| Peak::new(w)).collect())
}

const LINES: [f64; 5] = [500.0, 1000.0, 1500.0, 2000.0, 2500.0];

#[test]
fn test_replace_not_accumulate() {
    let x = axis();
    let measured: Vec<f64> = LINES.iter().map(|w| w - 8.0).collect();
    let y = gaussians(&x, &measured, FWHM);
    let engine = CorrectionEngine::default();
    let reference = compound(&LINES);

    let first = engine.run(Some(&reference), &y, &x, FWHM, 0.0).unwrap();
    let second = engine.run(Some(&reference), &y, &x, FWHM, 0.0).unwrap();
    assert_eq!(first.value, second.value);
    assert!((first.value - 8.0).abs() < 1e-9);

    // Through a device: calibrate, clear, calibrate again on the live axis.
    let library = Library::from_compounds([reference]);
    let mut device = DeviceState::new("WP-00042", FWHM);
    device.selected_compound = Some("synthetic".into());

    device.calibrate(&engine, &library, &y, &x).unwrap();
    let applied = device.correction();
    let live = device.corrected_axis(&x);
    device.calibrate(&engine, &library, &y, &live).unwrap();
    assert_eq!(device.correction(), 0.0);
    device.calibrate(&engine, &library, &y, &x).unwrap();
    assert_eq!(device.correction(), applied);
}

#[test]
fn test_matching_uses_uncorrected_axis() {
    // A correction already baked into the axis must not leak into the next
    // computation; with previous ≠ 0 the engine clears instead.
    let x = axis();
    let y = gaussians(&x, &LINES, FWHM);
    let shifted: Vec<f64> = x.iter().map(|w| w + 5.0).collect();
    let report = CorrectionEngine::default()
        .run(Some(&compound(&LINES)), &y, &shifted, FWHM, 5.0)
        .unwrap();
    assert!(report.cleared);
    assert_eq!(report.value, 0.0);
}

#[test]
fn test_min_matched_boundary() {
    let x = axis();
    let reference = compound(&LINES);
    let engine = CorrectionEngine::default();

    // Four lines on target, the fifth 60 cm⁻¹ away: exactly the minimum.
    let y = gaussians(&x, &[500.0, 1000.0, 1500.0, 2000.0, 2560.0], FWHM);
    let report = engine.run(Some(&reference), &y, &x, FWHM, 0.0).unwrap();
    assert_eq!(report.matched_count, 4);
    assert_eq!(report.visible_count, 5);

    // One fewer.
    let y = gaussians(&x, &[500.0, 1000.0, 1500.0, 2060.0, 2560.0], FWHM);
    let err = engine.run(Some(&reference), &y, &x, FWHM, 0.0).unwrap_err();
    assert_eq!(
        err.kind,
        CalibrationError::InsufficientMatches { matched: 3, required: 4 }
    );
    assert_eq!(err.phase, Phase::Matching);
    assert_eq!((err.matched_count, err.visible_count), (3, 5));
}

#[test]
fn test_primary_peak_dominance() {
    let x = axis();
    let secondaries: Vec<f64> = (0..10).map(|k| 400.0 + k as f64 * 200.0).collect();
    let mut peaks: Vec<Peak> = secondaries.iter().map(|&w| Peak::new(w)).collect();
    peaks.push(Peak::new(2500.0).primary());
    let reference = Compound::new("synthetic", peaks);

    let mut measured = secondaries.clone();
    measured.push(2530.0);
    let y = gaussians(&x, &measured, FWHM);

    let err = CorrectionEngine::default()
        .run(Some(&reference), &y, &x, FWHM, 0.0)
        .unwrap_err();
    assert!(
        matches!(
            err.kind,
            CalibrationError::PrimaryPeakUnmatched { wavenumber, .. } if wavenumber == 2500.0
        ),
        "{err}"
    );
    assert_eq!(err.matched_count, 10);
}

#[test]
fn test_visibility_exclusion() {
    let x = axis();
    let y = gaussians(&x, &LINES, FWHM);
    let mut positions = LINES.to_vec();
    positions.extend([150.0, 3500.0, 200.0]);

    let report = CorrectionEngine::default()
        .run(Some(&compound(&positions)), &y, &x, FWHM, 0.0)
        .unwrap();
    assert_eq!(report.visible_count, 5);
    assert_eq!(report.matched_count, 5);
}

#[test]
fn test_averaging_correctness() {
    let x: Vec<f64> = (0..351).map(|i| 50.0 + i as f64).collect();
    let y = gaussians(&x, &[98.0, 203.0, 299.0], 6.0);
    let engine = CorrectionEngine::new(EngineConfig {
        detector: DetectorConfig {
            min_peaks_found: 3,
            ..DetectorConfig::default()
        },
        matcher: MatcherConfig {
            min_matched_peaks: 3,
            ..MatcherConfig::default()
        },
    });

    let report = engine
        .run(Some(&compound(&[100.0, 200.0, 300.0])), &y, &x, 6.0, 0.0)
        .unwrap();
    let shifts: Vec<f64> = report.matches.iter().map(|m| m.shift).collect();
    assert_eq!(shifts, vec![2.0, -3.0, 1.0]);
    assert_eq!(report.value, 0.0);
}

#[test]
fn test_subpixel_refinement() {
    let x = axis();

    // Centred on pixel 150 (500 cm⁻¹).
    let y = gaussians(&x, &[500.0], FWHM);
    let (w, _) = refine(150, &x, &y);
    assert_eq!(w, 500.0);

    // Half way between 500 and 502: two equal samples.
    let y = gaussians(&x, &[501.0], FWHM);
    assert_eq!(y[150], y[151]);
    let (w, _) = refine(150, &x, &y);
    assert!((w - 501.0).abs() < 1e-9, "{w}");
}

#[test]
fn test_detector_finds_between_sample_peaks() {
    let x = axis();
    let centers = [501.0, 1001.0, 1501.0, 2001.0];
    let y = gaussians(&x, &centers, FWHM);
    let peaks = PeakDetector::default().detect(&y, &x, FWHM).unwrap();
    assert_eq!(peaks.len(), 4);
    for (peak, center) in peaks.iter().zip(centers) {
        assert!((peak.wavenumber - center).abs() < 1e-9, "{peak:?}");
    }
}

#[test]
fn test_overlay_safety() {
    let x = axis();
    let empty = Compound::new("empty", Vec::new());
    assert_eq!(
        overlay::render(&empty, &x, 0.0, 1.0, 2.0),
        vec![(200.0, 0.0), (3200.0, 0.0)]
    );

    let outside = compound(&[50.0, 3300.0, 5000.0]);
    assert_eq!(
        overlay::render(&outside, &x, -1.0, 1.0, 2.0),
        vec![(200.0, -1.0), (3200.0, -1.0)]
    );
    assert!(overlay::render(&outside, &[], 0.0, 1.0, 2.0).is_empty());
}

proptest! {
    /// Any existing correction is cleared, whatever the spectrum holds.
    #[test]
    fn test_toggle_clears(
        previous in (-100.0f64..100.0).prop_filter("non-zero", |v| *v != 0.0),
        spectrum in prop::collection::vec(any::<f64>(), 0..64),
    ) {
        let x: Vec<f64> = (0..spectrum.len()).map(|i| 200.0 + i as f64).collect();
        let report = CorrectionEngine::default()
            .run(Some(&compound(&LINES)), &spectrum, &x, FWHM, previous)
            .unwrap();
        prop_assert!(report.cleared);
        prop_assert_eq!(report.value, 0.0);
    }
}
