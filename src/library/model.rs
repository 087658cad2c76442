use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Peak – one expected line of a reference compound
// ---------------------------------------------------------------------------

/// Highest relative intensity a library peak may carry.
pub const MAX_RELATIVE_INTENSITY: u8 = 5;

/// An expected Raman line of a reference compound.
#[derive(Debug, Clone, PartialEq)]
pub struct Peak {
    /// Expected position (cm⁻¹).
    pub wavenumber: f64,
    /// Relative display height, 1–5.
    pub intensity: u8,
    /// A primary peak must match for the calibration to be valid.
    pub primary: bool,
}

impl Peak {
    pub fn new(wavenumber: f64) -> Self {
        Peak {
            wavenumber,
            intensity: MAX_RELATIVE_INTENSITY,
            primary: false,
        }
    }

    pub fn with_intensity(mut self, intensity: u8) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Compound – a named, ordered list of peaks
// ---------------------------------------------------------------------------

/// A reference compound. Peaks keep the order of the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    pub name: String,
    pub peaks: Vec<Peak>,
}

impl Compound {
    pub fn new(name: impl Into<String>, peaks: Vec<Peak>) -> Self {
        Compound {
            name: name.into(),
            peaks,
        }
    }

    /// Whether the compound has at least one peak to match against.
    pub fn is_usable(&self) -> bool {
        !self.peaks.is_empty()
    }

    pub fn primary_peaks(&self) -> impl Iterator<Item = &Peak> {
        self.peaks.iter().filter(|p| p.primary)
    }
}

// ---------------------------------------------------------------------------
// Library – every compound loaded at startup
// ---------------------------------------------------------------------------

/// Immutable name → compound index.
#[derive(Debug, Clone, Default)]
pub struct Library {
    compounds: BTreeMap<String, Compound>,
}

impl Library {
    pub fn from_compounds(compounds: impl IntoIterator<Item = Compound>) -> Self {
        Library {
            compounds: compounds
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
        }
    }

    /// Compound names in sorted order.
    pub fn get_names(&self) -> Vec<&str> {
        self.compounds.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Compound> {
        self.compounds.get(name)
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Compound> {
        self.compounds.values()
    }
}
