use serde::{Deserialize, Serialize};

// unit names from https://ngff.openmicroscopy.org/latest/#axes-md
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Copy, Clone, Hash)]
#[derive(strum::EnumString, strum::VariantNames, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SpaceUnit {
    Attometer,
    Angstrom,
    Centimeter,
    Decimeter,
    Exameter,
    Femtometer,
    Foot,
    Gigameter,
    Hectometer,
    Inch,
    Kilometer,
    Megameter,
    Meter,
    Micrometer,
    Mile,
    Millimeter,
    Nanometer,
    Parsec,
    Petameter,
    Picometer,
    Terameter,
    Yard,
    Yoctometer,
    Yottameter,
    Zeptometer,
    Zettameter,
}

impl crate::validation::Validate for SpaceUnit {
    fn validate(value: &crate::yaml::YamlValue, cx: &mut crate::validation::Validator) -> Option<Self> {
        use std::str::FromStr;
        let raw = <String as crate::validation::Validate>::validate(value, cx)?;
        match Self::from_str(&raw) {
            Ok(unit) => Some(unit),
            Err(_) => {
                cx.error("value_error.unit", format!("'{raw}' is not a valid space unit"));
                None
            }
        }
    }
}
