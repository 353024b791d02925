use serde::{Deserialize, Deserializer};

pub const ANNOTATE_ROUTE: &str = "/xiAnnotator/annotate/FULL";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8084;
pub const DEFAULT_CORS_HEADERS: &str = "Content-Type";

/// The configuration file read from the working directory when present
pub const CONFIG_FILE_NAME: &str = "xiannotator.toml";
pub const ENV_PREFIX: &str = "XI2ANNOTATOR_";

pub const VERSION: &str = match option_env!("CARGO_PKG_VERSION") {
    Some(v) => v,
    None => "unknown",
};

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Read a switch that may arrive as a boolean, a number or free text. Only
/// `false` (in any case) and `0` turn it off.
pub(crate) fn lenient_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<FlagValue>::deserialize(deserializer)?;
    Ok(match value {
        None => false,
        Some(FlagValue::Bool(b)) => b,
        Some(FlagValue::Int(i)) => i != 0,
        Some(FlagValue::Float(f)) => f != 0.0,
        Some(FlagValue::Text(s)) => {
            let s = s.trim();
            !(s.eq_ignore_ascii_case("false") || s == "0")
        }
    })
}
