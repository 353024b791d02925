//! Conversions between the legacy and the structured request dialects: residue
//! token spelling, modified peptide syntaxes, tolerances, stub strings and
//! error units.
use std::fmt::Display;
use std::str::FromStr;
use std::sync::OnceLock;

use mzpeaks::Tolerance;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::CleavageStub;
use crate::error::AnnotationError;

pub const PPM_UNIT: &str = "ppm";

/// How a modification is attached to a residue when writing a modified peptide
/// sequence as text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModSyntax {
    /// Modification before the residue it modifies, e.g. `LAsdaK`
    #[default]
    ModX,
    /// Modification after the residue it modifies, e.g. `LAKsda`
    XMod,
}

impl ModSyntax {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ModX => "modX",
            Self::XMod => "Xmod",
        }
    }

    /// Split a peptide written in this syntax into one token per residue, each
    /// token carrying its modification.
    pub fn tokenize<'a>(&self, sequence: &'a str) -> Vec<&'a str> {
        static MODX_TOKEN: OnceLock<Regex> = OnceLock::new();
        static XMOD_TOKEN: OnceLock<Regex> = OnceLock::new();
        let pattern = match self {
            Self::ModX => MODX_TOKEN.get_or_init(|| Regex::new(r"[^A-Z]*[A-Z]").unwrap()),
            Self::XMod => XMOD_TOKEN.get_or_init(|| Regex::new(r"[A-Z][^A-Z\-]*").unwrap()),
        };
        pattern.find_iter(sequence).map(|m| m.as_str()).collect()
    }

    /// Move the residue letter of a specificity token written in the other
    /// syntax into the position this syntax expects.
    pub fn respell(&self, token: &str) -> String {
        match self {
            Self::ModX => rotate_left(token),
            Self::XMod => rotate_right(token),
        }
    }
}

impl Display for ModSyntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModSyntax {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "modX" => Ok(Self::ModX),
            "Xmod" => Ok(Self::XMod),
            _ => Err(AnnotationError::UnknownModSyntax(s.to_string())),
        }
    }
}

impl TryFrom<String> for ModSyntax {
    type Error = AnnotationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModSyntax> for String {
    fn from(value: ModSyntax) -> Self {
        value.as_str().to_string()
    }
}

fn rotate_left(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => {
            let mut rotated: String = chars.collect();
            rotated.push(first);
            rotated
        }
        None => String::new(),
    }
}

fn rotate_right(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next_back() {
        Some(last) => {
            let mut rotated = String::with_capacity(token.len());
            rotated.push(last);
            rotated.extend(chars);
            rotated
        }
        None => String::new(),
    }
}

/// Terminus keywords as spelled by the legacy dialect and the structured one.
const TERMINI: [(&str, &str); 2] = [("CTerm", "cterm"), ("NTerm", "nterm")];

/// Convert a legacy specificity token to its structured spelling.
///
/// Terminus keywords are lowercased, all other tokens have their leading
/// character moved to the end.
pub fn specificity_from_legacy(token: &str) -> String {
    for (legacy, canonical) in TERMINI {
        if token == legacy {
            return canonical.to_string();
        }
    }
    rotate_left(token)
}

/// The inverse of [`specificity_from_legacy`]
pub fn specificity_to_legacy(token: &str) -> String {
    for (legacy, canonical) in TERMINI {
        if token == canonical {
            return legacy.to_string();
        }
    }
    rotate_right(token)
}

/// Parse a tolerance written as `<value> <unit>`, with or without the
/// separating whitespace.
pub fn parse_tolerance(text: &str) -> Result<Tolerance, AnnotationError> {
    let err = || AnnotationError::MalformedTolerance(text.to_string());
    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(err)?;
    let (value, unit) = trimmed.split_at(split);
    let value: f64 = value.trim().parse().map_err(|_| err())?;
    match unit.trim().to_ascii_lowercase().as_str() {
        "ppm" => Ok(Tolerance::PPM(value)),
        "da" => Ok(Tolerance::Da(value)),
        _ => Err(err()),
    }
}

pub fn format_tolerance(tolerance: &Tolerance) -> String {
    match tolerance {
        Tolerance::PPM(value) => format!("{value:?} ppm"),
        Tolerance::Da(value) => format!("{value:?} Da"),
    }
}

pub fn relative_error(observed: f64, calculated: f64) -> f64 {
    (observed - calculated) / calculated
}

pub fn to_ppm(relative_error: f64) -> f64 {
    relative_error * 1e6
}

/// Decode a `<name>:<mass>:<pairs with>` stub string.
pub fn decode_stub(text: &str) -> Result<CleavageStub, AnnotationError> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 3 {
        return Err(AnnotationError::MalformedStub(text.to_string()));
    }
    let mass: f64 = parts[1]
        .parse()
        .map_err(|_| AnnotationError::MalformedStub(text.to_string()))?;
    Ok(CleavageStub {
        name: parts[0].to_string(),
        mass,
        pairs_with: parts[2].chars().map(String::from).collect(),
    })
}

pub fn encode_stub(stub: &CleavageStub) -> String {
    format!("{}:{}:{}", stub.name, float_repr(stub.mass), stub.pairs_with.concat())
}

/// Shortest round-trip decimal text for `value`. Integral values keep a
/// trailing `.0`; magnitudes below `1e-4` or from `1e16` up use exponent
/// notation with an explicit sign and at least two exponent digits.
pub fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    let scientific = format!("{value:e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if value < 0.0 { "-" } else { "" };
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();

    if (-4..16).contains(&exponent) {
        if exponent < 0 {
            let zeros = "0".repeat((-exponent - 1) as usize);
            format!("{sign}0.{zeros}{digits}")
        } else {
            let integral = exponent as usize + 1;
            if digits.len() <= integral {
                let zeros = "0".repeat(integral - digits.len());
                format!("{sign}{digits}{zeros}.0")
            } else {
                format!("{sign}{}.{}", &digits[..integral], &digits[integral..])
            }
        }
    } else {
        let exponent_sign = if exponent < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{sign}{lead}e{exponent_sign}{:02}", exponent.abs())
        } else {
            format!("{sign}{lead}.{rest}e{exponent_sign}{:02}", exponent.abs())
        }
    }
}

/// Combine the stub lists of both crosslinker arms, keeping the first arm's
/// order and appending unseen entries of the second arm.
pub fn merge_stub_arms(first: &[String], second: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(first.len() + second.len());
    for stub in first.iter().chain(second.iter()) {
        if !merged.contains(stub) {
            merged.push(stub.clone());
        }
    }
    merged
}
