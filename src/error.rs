use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// CalibrationError – every way a correction run or library load can fail
// ---------------------------------------------------------------------------

/// Failure kinds surfaced by the library, the detector and the matcher.
///
/// None of these are retried internally. Messages carry a hint the operator
/// can act on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    /// The compound library could not be read or parsed.
    #[error("compound library unusable: {0}")]
    Load(String),

    #[error(
        "only {found} peaks found (need at least {min}); increase integration time or laser power"
    )]
    InsufficientSignal { found: usize, min: usize },

    #[error(
        "{found} peaks found (at most {max} allowed); sample too peaky or too noisy, try averaging more scans"
    )]
    ExcessiveNoise { found: usize, max: usize },

    #[error(
        "primary peak at {wavenumber:.2} cm⁻¹ unmatched (shift {shift:+.2} cm⁻¹ exceeds {threshold:.2}); check the sample is the selected compound"
    )]
    PrimaryPeakUnmatched {
        wavenumber: f64,
        shift: f64,
        threshold: f64,
    },

    #[error("only {matched} peaks matched (need at least {required}); check sample and compound")]
    InsufficientMatches { matched: usize, required: usize },

    #[error("no reference compound selected")]
    NoCompoundSelected,

    #[error("compound '{0}' has no peaks")]
    EmptyCompound(String),

    #[error("malformed spectrum: {0}")]
    MalformedSpectrum(String),
}

// ---------------------------------------------------------------------------
// Phase – where in a run the engine was when it stopped
// ---------------------------------------------------------------------------

/// Engine phases: `Idle → Detecting → Matching → {Accepted | Rejected} → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Detecting,
    Matching,
    Accepted,
    Rejected,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Detecting => "detecting",
            Phase::Matching => "matching",
            Phase::Accepted => "accepted",
            Phase::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Rejection – a failed run, with the diagnostics the operator sees
// ---------------------------------------------------------------------------

/// A rejected correction run.
///
/// Counts are reported even on failure so the caller can show
/// "3 of 7 peaks matched" next to the reason.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} [{matched_count}/{visible_count} peaks matched while {phase}]")]
pub struct Rejection {
    #[source]
    pub kind: CalibrationError,
    /// Phase the run was in when it stopped.
    pub phase: Phase,
    pub matched_count: usize,
    pub visible_count: usize,
}

impl Rejection {
    /// A rejection raised before any expected peak was examined.
    pub fn early(kind: CalibrationError, phase: Phase) -> Self {
        Rejection {
            kind,
            phase,
            matched_count: 0,
            visible_count: 0,
        }
    }
}
