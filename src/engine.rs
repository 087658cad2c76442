use log::{debug, info, warn};

use crate::detect::{DetectorConfig, PeakDetector};
use crate::error::{CalibrationError, Phase, Rejection};
use crate::library::Compound;
use crate::matcher::{visible, MatcherConfig, PeakMatch, PeakMatcher};

// ---------------------------------------------------------------------------
// Configuration and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineConfig {
    pub detector: DetectorConfig,
    pub matcher: MatcherConfig,
}

/// Outcome of an accepted run.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionReport {
    /// The new correction (cm⁻¹). Replaces, never adds to, the previous one.
    pub value: f64,
    pub matched_count: usize,
    pub visible_count: usize,
    /// Peaks the detector accepted on the uncorrected axis.
    pub detected_count: usize,
    pub matches: Vec<PeakMatch>,
    /// True when the run only cleared an existing correction.
    pub cleared: bool,
}

impl CorrectionReport {
    fn cleared() -> Self {
        CorrectionReport {
            value: 0.0,
            matched_count: 0,
            visible_count: 0,
            detected_count: 0,
            matches: Vec::new(),
            cleared: true,
        }
    }
}

/// `axis` with a previously applied correction taken back out.
pub fn uncorrected_axis(axis: &[f64], previous_correction: f64) -> Vec<f64> {
    axis.iter().map(|&w| w - previous_correction).collect()
}

// ---------------------------------------------------------------------------
// CorrectionEngine
// ---------------------------------------------------------------------------

/// Turns one measurement of a reference compound into a scalar axis
/// correction.
///
/// The engine holds only configuration. Each `run` is a pure function of its
/// arguments; applying the result to a device is the caller's job.
#[derive(Debug, Clone, Default)]
pub struct CorrectionEngine {
    detector: PeakDetector,
    matcher: PeakMatcher,
}

impl CorrectionEngine {
    pub fn new(config: EngineConfig) -> Self {
        CorrectionEngine {
            detector: PeakDetector::new(config.detector),
            matcher: PeakMatcher::new(config.matcher),
        }
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            detector: *self.detector.config(),
            matcher: *self.matcher.config(),
        }
    }

    /// Compute a fresh correction from `spectrum` measured on `axis`.
    ///
    /// `axis` may already include `previous_correction`; it is subtracted
    /// before anything is matched. A non-zero `previous_correction` makes
    /// the run a plain "clear" that returns zero without looking at the
    /// spectrum, so recalibrating is always clear-then-run.
    ///
    /// Failures leave the caller's correction untouched and carry the
    /// matched/visible counts reached so far.
    pub fn run(
        &self,
        compound: Option<&Compound>,
        spectrum: &[f64],
        axis: &[f64],
        fwhm: f64,
        previous_correction: f64,
    ) -> Result<CorrectionReport, Rejection> {
        let axis = uncorrected_axis(axis, previous_correction);

        if previous_correction != 0.0 {
            info!("clearing wavenumber correction of {previous_correction:+.3} cm⁻¹");
            return Ok(CorrectionReport::cleared());
        }

        let compound = compound
            .ok_or_else(|| Rejection::early(CalibrationError::NoCompoundSelected, Phase::Idle))?;
        if !compound.is_usable() {
            return Err(Rejection::early(
                CalibrationError::EmptyCompound(compound.name.clone()),
                Phase::Idle,
            ));
        }

        let visible_count = compound.peaks.iter().filter(|p| visible(p, &axis)).count();

        debug!("{}: {}", compound.name, Phase::Detecting);
        let detected = self.detector.detect(spectrum, &axis, fwhm).map_err(|kind| {
            reject(Rejection {
                visible_count,
                ..Rejection::early(kind, Phase::Detecting)
            })
        })?;

        debug!("{}: {} against {} peaks", compound.name, Phase::Matching, detected.len());
        let report = self
            .matcher
            .match_compound(compound, &detected, &axis)
            .map_err(reject)?;

        let value = report.mean_shift();

        info!(
            "{}: {} correction {value:+.3} cm⁻¹ from {}/{} peaks",
            compound.name,
            Phase::Accepted,
            report.matched_count(),
            report.visible_count
        );
        Ok(CorrectionReport {
            value,
            matched_count: report.matched_count(),
            visible_count: report.visible_count,
            detected_count: detected.len(),
            matches: report.matches,
            cleared: false,
        })
    }
}

fn reject(rejection: Rejection) -> Rejection {
    warn!("{}: {rejection}", Phase::Rejected);
    rejection
}
