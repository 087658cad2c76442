//! Wavenumber-axis correction for Raman spectrometers.
//!
//! A measurement of a reference compound (ASTM E1840) is compared with the
//! compound's known peak positions and a single additive offset for the
//! wavenumber axis is computed:
//!
//! ```text
//!  Library ──► Compound ─┐
//!                        ├─► PeakMatcher ─► mean shift ─► DeviceState.correction
//!  spectrum ─► PeakDetector ┘
//! ```
//!
//! [`engine::CorrectionEngine`] is the entry point; [`overlay::render`] draws
//! the expected peaks for display.

pub mod config;
pub mod data;
pub mod detect;
pub mod engine;
pub mod error;
pub mod library;
pub mod matcher;
pub mod overlay;
pub mod state;

pub use detect::{DetectedPeak, DetectorConfig, PeakDetector};
pub use engine::{CorrectionEngine, CorrectionReport, EngineConfig};
pub use error::{CalibrationError, Phase, Rejection};
pub use library::{Compound, Library, Peak};
pub use matcher::{MatcherConfig, PeakMatch, PeakMatcher};
pub use state::DeviceState;
