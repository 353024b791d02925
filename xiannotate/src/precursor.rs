use chemical_elements::PROTON;
use serde_json::{json, Value};

use crate::codec::{relative_error, to_ppm, PPM_UNIT};
use crate::error::AnnotationError;

/// The theoretical precursor m/z of `peptide_mass` plus the crosslinker mass,
/// if any, at `charge`.
pub fn calculated_mz(
    peptide_mass: f64,
    crosslinker_mass: Option<f64>,
    charge: i32,
) -> Result<f64, AnnotationError> {
    if charge < 1 {
        return Err(AnnotationError::InvalidPrecursorCharge(charge));
    }
    let mass = peptide_mass + crosslinker_mass.unwrap_or_default();
    Ok(mass / charge as f64 + PROTON)
}

/// `{tolerance, unit}` in ppm when the observed precursor m/z is known, an
/// empty string otherwise.
pub fn precursor_error(observed_mz: Option<f64>, calculated_mz: f64) -> Value {
    match observed_mz {
        Some(observed) => json!({
            "tolerance": to_ppm(relative_error(observed, calculated_mz)),
            "unit": PPM_UNIT,
        }),
        None => Value::String(String::new()),
    }
}
