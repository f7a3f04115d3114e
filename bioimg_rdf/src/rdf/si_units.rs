use std::fmt::Display;
use std::sync::OnceLock;

use regex::Regex;

// SI unit grammar adapted from https://stackoverflow.com/a/3573731
const PREFIX: &str = "(Q|R|Y|Z|E|P|T|G|M|k|h|da|d|c|m|µ|n|p|f|a|z|y|r|q)";
const UNIT: &str = "(m|g|s|A|K|mol|cd|Hz|N|Pa|J|W|C|V|F|Ω|S|Wb|T|H|lm|lx|Bq|Gy|Sv|kat|l|L)";
const ANY_POWER: &str = r"(\^[+-]?[1-9]\d*)";
const POS_POWER: &str = r"(\^\+?[1-9]\d*)";

fn si_unit_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        let unit_ap = format!("{PREFIX}?{UNIT}{ANY_POWER}?");
        let unit_pp = format!("{PREFIX}?{UNIT}{POS_POWER}?");
        let pattern = format!("^{unit_ap}((·{unit_ap})|(/{unit_pp}))*$");
        Regex::new(&pattern).expect("SI unit grammar is a valid regex")
    })
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SiUnitParsingError {
    #[error("'{found}' does not match the SI unit grammar")]
    NoMatch { found: String },
}

/// An SI unit term like `mm`, `s^2` or `kg·m/s^2`. The characters `×`, `*`
/// and space are normalized to `·` before matching.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct SiUnit(String);

impl SiUnit {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SiUnit {
    type Error = SiUnitParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let normalized: String = value
            .chars()
            .map(|c| if matches!(c, '×' | '*' | ' ') { '·' } else { c })
            .collect();
        if si_unit_regex().is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(SiUnitParsingError::NoMatch { found: value })
        }
    }
}

impl TryFrom<&str> for SiUnit {
    type Error = SiUnitParsingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}

impl From<SiUnit> for String {
    fn from(value: SiUnit) -> Self {
        value.0
    }
}

impl Display for SiUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl_validate_from_string!(SiUnit, "value_error.si_unit");

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_si_units() {
        assert!(SiUnit::try_from("m").is_ok());
        assert!(SiUnit::try_from("mm").is_ok());
        assert!(SiUnit::try_from("kg·m/s^2").is_ok());
        assert_eq!(SiUnit::try_from("kg*m/s^2").unwrap().as_str(), "kg·m/s^2");
        assert!(SiUnit::try_from("parsecs").is_err());
        assert!(SiUnit::try_from("").is_err());
    }
}
