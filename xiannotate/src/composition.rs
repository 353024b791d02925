//! Monoisotopic masses of elemental formulae such as `C2H3NO` or `H-2O-1`.
use std::collections::HashMap;
use std::sync::OnceLock;

use chemical_elements::{ChemicalComposition, ElementSpecification};
use regex::Regex;

use crate::error::AnnotationError;

fn element_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([A-Z][a-z]*)(-?\d*)").unwrap())
}

/// Compute the monoisotopic mass of `formula`.
///
/// Each element symbol may be followed by a signed count, defaulting to one.
/// Repeated symbols accumulate.
pub fn composition_mass(formula: &str) -> Result<f64, AnnotationError> {
    let err = || AnnotationError::MalformedComposition(formula.to_string());
    let formula_trimmed = formula.trim();
    if formula_trimmed.is_empty() {
        return Err(err());
    }

    let mut counts: Vec<(&str, i32)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut consumed = 0;
    for cap in element_pattern().captures_iter(formula_trimmed) {
        let (Some(whole), Some(symbol), Some(count)) = (cap.get(0), cap.get(1), cap.get(2)) else {
            return Err(err());
        };
        if whole.start() != consumed {
            return Err(err());
        }
        consumed = whole.end();
        let count: i32 = match count.as_str() {
            "" => 1,
            "-" => return Err(err()),
            c => c.parse().map_err(|_| err())?,
        };
        match index.get(symbol.as_str()) {
            Some(i) => counts[*i].1 += count,
            None => {
                index.insert(symbol.as_str(), counts.len());
                counts.push((symbol.as_str(), count));
            }
        }
    }
    if consumed != formula_trimmed.len() {
        return Err(err());
    }

    let mut composition = ChemicalComposition::new();
    for (symbol, count) in counts {
        let element = ElementSpecification::parse(symbol).map_err(|_| err())?;
        composition.set(element, count);
    }
    Ok(composition.mass())
}
