//! Thin pattern-matching layer over raw YAML values.
//!
//! All RDF content enters the engine as a `serde_yaml::Value`; every boundary
//! matches explicitly on the sum type instead of assuming a shape.

pub use serde_yaml::{Mapping, Number, Value as YamlValue};

/// Human readable name of a YAML value's shape, used in `type_error.*` messages.
pub fn kind_of(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "bool",
        YamlValue::Number(n) if n.is_f64() => "float",
        YamlValue::Number(_) => "int",
        YamlValue::String(_) => "string",
        YamlValue::Sequence(_) => "list",
        YamlValue::Mapping(_) => "map",
        YamlValue::Tagged(_) => "tagged",
    }
}

pub fn get<'v>(map: &'v Mapping, key: &str) -> Option<&'v YamlValue> {
    map.get(&YamlValue::String(key.to_owned()))
}

pub fn get_str<'v>(map: &'v Mapping, key: &str) -> Option<&'v str> {
    match get(map, key) {
        Some(YamlValue::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

pub fn insert(map: &mut Mapping, key: &str, value: YamlValue) {
    map.insert(YamlValue::String(key.to_owned()), value);
}

pub fn remove(map: &mut Mapping, key: &str) -> Option<YamlValue> {
    map.remove(&YamlValue::String(key.to_owned()))
}

/// Field names of a mapping; non-string keys are reported by the caller.
pub fn string_keys(map: &Mapping) -> impl Iterator<Item = &str> {
    map.keys().filter_map(|k| match k {
        YamlValue::String(s) => Some(s.as_str()),
        _ => None,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_kind_names() {
        let parsed: YamlValue = serde_yaml::from_str("{a: 1, b: [x], c: 1.5}").unwrap();
        let map = parsed.as_mapping().unwrap();
        assert_eq!(kind_of(get(map, "a").unwrap()), "int");
        assert_eq!(kind_of(get(map, "b").unwrap()), "list");
        assert_eq!(kind_of(get(map, "c").unwrap()), "float");
    }
}
