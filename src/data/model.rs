// ---------------------------------------------------------------------------
// Measurement – one acquired spectrum of a reference sample
// ---------------------------------------------------------------------------

/// A single processed spectrum as handed over by the acquisition side.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Wavenumber axis (x), cm⁻¹. May already include a correction.
    pub x: Vec<f64>,
    /// Intensity axis (y) – same length as `x`.
    pub y: Vec<f64>,
    /// Free-form label, e.g. device serial or sample name.
    pub label: Option<String>,
    /// Estimated optical resolution for this acquisition, cm⁻¹.
    pub fwhm: Option<f64>,
}

impl Measurement {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Measurement {
            x,
            y,
            label: None,
            fwhm: None,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// `(min, max)` intensity, or `None` for an empty spectrum.
    pub fn intensity_range(&self) -> Option<(f64, f64)> {
        if self.y.is_empty() {
            return None;
        }
        let min = self.y.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = self.y.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }

    /// Display name: the label, or `spectrum {idx}`.
    pub fn name(&self, idx: usize) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("spectrum {idx}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_range() {
        let m = Measurement::new(vec![1.0, 2.0, 3.0], vec![0.5, -1.0, 4.0]);
        assert_eq!(m.intensity_range(), Some((-1.0, 4.0)));
        assert_eq!(Measurement::new(vec![], vec![]).intensity_range(), None);
    }

    #[test]
    fn name_falls_back_to_index() {
        let mut m = Measurement::new(vec![], vec![]);
        assert_eq!(m.name(3), "spectrum 3");
        m.label = Some("WP-00123".into());
        assert_eq!(m.name(3), "WP-00123");
    }
}
