use std::path::Path;

use log::debug;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::model::{Compound, Library, Peak, MAX_RELATIVE_INTENSITY};
use crate::error::CalibrationError;

/// Root key holding the compound collection.
const ROOT_KEY: &str = "Compounds";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the compound library from a JSON file.
pub fn load_file(path: &Path) -> Result<Library, CalibrationError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CalibrationError::Load(format!("reading {}: {e}", path.display())))?;
    from_str(&text)
}

/// Parse a compound library.
///
/// Expected schema:
///
/// ```json
/// {
///   "Compounds": {
///     "Cyclohexane": {
///       "801.3":  { "Intensity": 5, "Primary": true },
///       "1028.3": { "Intensity": 2 },
///       "2852.9": { "Ignore": true }
///     }
///   }
/// }
/// ```
///
/// Peak order follows the source file. Records with `"Ignore": true` are
/// dropped; any other record that cannot be read fails the whole load.
pub fn from_str(text: &str) -> Result<Library, CalibrationError> {
    let root: JsonValue = serde_json::from_str(text)
        .map_err(|e| CalibrationError::Load(format!("parsing JSON: {e}")))?;

    let compounds = root
        .get(ROOT_KEY)
        .ok_or_else(|| CalibrationError::Load(format!("missing '{ROOT_KEY}' key")))?
        .as_object()
        .ok_or_else(|| CalibrationError::Load(format!("'{ROOT_KEY}' is not an object")))?;

    let mut loaded = Vec::with_capacity(compounds.len());
    for (name, records) in compounds {
        loaded.push(parse_compound(name, records)?);
    }

    let library = Library::from_compounds(loaded);
    debug!("loaded {} reference compounds", library.len());
    Ok(library)
}

// ---------------------------------------------------------------------------
// Record parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PeakRecord {
    #[serde(default = "default_intensity")]
    intensity: u8,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    ignore: bool,
}

fn default_intensity() -> u8 {
    MAX_RELATIVE_INTENSITY
}

fn parse_compound(name: &str, records: &JsonValue) -> Result<Compound, CalibrationError> {
    let records = records
        .as_object()
        .ok_or_else(|| CalibrationError::Load(format!("compound '{name}' is not an object")))?;

    let mut peaks = Vec::with_capacity(records.len());
    for (key, value) in records {
        let wavenumber: f64 = key.trim().parse().map_err(|_| {
            CalibrationError::Load(format!("compound '{name}': '{key}' is not a wavenumber"))
        })?;
        if !wavenumber.is_finite() {
            return Err(CalibrationError::Load(format!(
                "compound '{name}': wavenumber '{key}' is not finite"
            )));
        }

        let record = PeakRecord::deserialize(value).map_err(|e| {
            CalibrationError::Load(format!("compound '{name}', peak {key}: {e}"))
        })?;
        if record.ignore {
            debug!("{name}: ignoring peak at {wavenumber} cm⁻¹");
            continue;
        }
        if !(1..=MAX_RELATIVE_INTENSITY).contains(&record.intensity) {
            return Err(CalibrationError::Load(format!(
                "compound '{name}', peak {key}: intensity {} outside 1-{MAX_RELATIVE_INTENSITY}",
                record.intensity
            )));
        }

        peaks.push(Peak {
            wavenumber,
            intensity: record.intensity,
            primary: record.primary,
        });
    }

    Ok(Compound::new(name, peaks))
}
