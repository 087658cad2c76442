use log::info;

use crate::engine::{CorrectionEngine, CorrectionReport};
use crate::error::Rejection;
use crate::library::Library;

// ---------------------------------------------------------------------------
// Per-device session state
// ---------------------------------------------------------------------------

/// Session state of one connected spectrometer.
///
/// `correction` is only written through [`DeviceState::calibrate`] and the
/// reset/restore methods below; taking
/// `&mut self` keeps runs against the same device serialised.
#[derive(Debug, Clone)]
pub struct DeviceState {
    /// Serial number / identifier of the spectrometer.
    pub serial: String,

    /// Estimated optical resolution, cm⁻¹.
    pub fwhm: f64,

    /// Reference compound chosen for calibration (persisted elsewhere).
    pub selected_compound: Option<String>,

    /// Current wavenumber correction (cm⁻¹); zero when none is applied.
    correction: f64,

    /// Result / error message of the last run, shown to the operator.
    pub status_message: Option<String>,
}

impl DeviceState {
    pub fn new(serial: impl Into<String>, fwhm: f64) -> Self {
        Self {
            serial: serial.into(),
            fwhm,
            selected_compound: None,
            correction: 0.0,
            status_message: None,
        }
    }

    pub fn correction(&self) -> f64 {
        self.correction
    }

    /// Apply the current correction to a raw (uncorrected) axis.
    pub fn corrected_axis(&self, raw_axis: &[f64]) -> Vec<f64> {
        raw_axis.iter().map(|&w| w + self.correction).collect()
    }

    /// Run the engine on a measurement taken on the device's live (already
    /// corrected) axis, and apply the outcome.
    ///
    /// With a correction in place this clears it; otherwise a fresh
    /// correction is computed. A rejection leaves the correction unchanged.
    pub fn calibrate(
        &mut self,
        engine: &CorrectionEngine,
        library: &Library,
        spectrum: &[f64],
        axis: &[f64],
    ) -> Result<CorrectionReport, Rejection> {
        let compound = self.selected_compound.as_deref().and_then(|name| library.get(name));
        let outcome = engine.run(compound, spectrum, axis, self.fwhm, self.correction);

        match &outcome {
            Ok(report) if report.cleared => {
                self.correction = 0.0;
                self.status_message = Some("wavenumber correction cleared".to_string());
                info!("{}: correction cleared", self.serial);
            }
            Ok(report) => {
                self.correction = report.value;
                self.status_message = Some(format!(
                    "wavenumber correction {:+.2} cm⁻¹ ({}/{} peaks matched)",
                    report.value, report.matched_count, report.visible_count
                ));
                info!("{}: correction now {:+.3} cm⁻¹", self.serial, report.value);
            }
            Err(rejection) => {
                self.status_message = Some(format!("calibration failed: {rejection}"));
            }
        }
        outcome
    }

    /// Reinstate a correction persisted from an earlier session.
    pub fn restore_correction(&mut self, correction: f64) {
        self.correction = correction;
    }

    /// Drop the correction at the operator's request.
    pub fn reset_correction(&mut self) {
        self.correction = 0.0;
        self.status_message = None;
    }

    /// A (re)connected device starts without a correction.
    pub fn reconnect(&mut self) {
        info!("{}: reconnected, correction reset", self.serial);
        self.reset_correction();
    }
}
