//! Format upgraders: pure, best-effort transformations of raw YAML data from
//! an older minor format version to the next, chained until the target is
//! reached. Upgraders never fail; anything they cannot fix is left for
//! validation to report.

pub mod generic;
pub mod model;

pub use generic::upgrade_generic_to_0_3;
pub use model::upgrade_model_to_0_5;

use crate::registry::ResourceType;
use crate::yaml::Mapping;

/// Upgrade `data` in place to the latest known minor version of its type.
/// Running this on already-latest data is a no-op.
pub fn upgrade_to_latest(data: &mut Mapping, resource_type: ResourceType) {
    match resource_type {
        ResourceType::Model => upgrade_model_to_0_5(data),
        _ => upgrade_generic_to_0_3(data),
    }
}

pub(crate) fn format_version_tuple(data: &Mapping) -> Option<(u32, u32, u32)> {
    let raw = crate::yaml::get_str(data, "format_version")?;
    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    let major = parts[0].parse().ok()?;
    let minor = parts[1].parse().ok()?;
    let patch = parts[2].parse().ok()?;
    Some((major, minor, patch))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::yaml::YamlValue;
    use indoc::indoc;

    #[test]
    fn test_upgrade_is_idempotent_on_latest() {
        let raw = indoc! {"
            format_version: 0.3.0
            type: dataset
            name: some dataset
            description: already in the latest generic format
            authors:
              - {name: Jane Doe}
            cite:
              - {text: paper, doi: 10.1234/5678}
            license: MIT
        "};
        let mut data: Mapping = serde_yaml::from_str(raw).unwrap();
        let before = data.clone();
        upgrade_to_latest(&mut data, crate::registry::ResourceType::Dataset);
        assert_eq!(before, data);

        // a second run over upgraded 0.2 data is a no-op as well
        let raw_old = indoc! {"
            format_version: 0.2.0
            type: dataset
            name: legacy/dataset
            authors: [Jane Doe]
            cite:
              - {text: paper, doi: 'https://doi.org/10.1234/5678'}
        "};
        let mut old: Mapping = serde_yaml::from_str(raw_old).unwrap();
        upgrade_to_latest(&mut old, crate::registry::ResourceType::Dataset);
        let once = old.clone();
        upgrade_to_latest(&mut old, crate::registry::ResourceType::Dataset);
        assert_eq!(once, old);
        assert_eq!(
            crate::yaml::get(&old, "format_version"),
            Some(&YamlValue::String("0.3.0".into()))
        );
    }
}
