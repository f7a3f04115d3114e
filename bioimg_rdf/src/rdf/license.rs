use std::fmt::Display;

/// Subset of the SPDX license list the reference data pins; ids outside this
/// table are accepted with an "unknown license" warning.
const KNOWN_LICENSE_IDS: &[&str] = &[
    "0BSD",
    "AAL",
    "AFL-1.1",
    "AFL-1.2",
    "AFL-2.0",
    "AFL-2.1",
    "AFL-3.0",
    "AGPL-1.0-only",
    "AGPL-1.0-or-later",
    "AGPL-3.0-only",
    "AGPL-3.0-or-later",
    "Apache-1.0",
    "Apache-1.1",
    "Apache-2.0",
    "Artistic-1.0",
    "Artistic-1.0-Perl",
    "Artistic-2.0",
    "BSD-1-Clause",
    "BSD-2-Clause",
    "BSD-2-Clause-Patent",
    "BSD-3-Clause",
    "BSD-3-Clause-Attribution",
    "BSD-3-Clause-Clear",
    "BSD-3-Clause-LBNL",
    "BSD-4-Clause",
    "BSD-4-Clause-Shortened",
    "BSL-1.0",
    "CC-BY-1.0",
    "CC-BY-2.0",
    "CC-BY-2.5",
    "CC-BY-3.0",
    "CC-BY-4.0",
    "CC-BY-NC-1.0",
    "CC-BY-NC-2.0",
    "CC-BY-NC-2.5",
    "CC-BY-NC-3.0",
    "CC-BY-NC-4.0",
    "CC-BY-NC-ND-3.0",
    "CC-BY-NC-ND-4.0",
    "CC-BY-NC-SA-3.0",
    "CC-BY-NC-SA-4.0",
    "CC-BY-ND-3.0",
    "CC-BY-ND-4.0",
    "CC-BY-SA-3.0",
    "CC-BY-SA-4.0",
    "CC-PDDC",
    "CC0-1.0",
    "CDDL-1.0",
    "CDDL-1.1",
    "CECILL-1.0",
    "CECILL-1.1",
    "CECILL-2.0",
    "CECILL-2.1",
    "CECILL-B",
    "CECILL-C",
    "ClArtistic",
    "EPL-1.0",
    "EPL-2.0",
    "EUPL-1.0",
    "EUPL-1.1",
    "EUPL-1.2",
    "GFDL-1.1-only",
    "GFDL-1.1-or-later",
    "GFDL-1.2-only",
    "GFDL-1.2-or-later",
    "GFDL-1.3-only",
    "GFDL-1.3-or-later",
    "GPL-1.0-only",
    "GPL-1.0-or-later",
    "GPL-2.0-only",
    "GPL-2.0-or-later",
    "GPL-3.0-only",
    "GPL-3.0-or-later",
    "ISC",
    "LGPL-2.0-only",
    "LGPL-2.0-or-later",
    "LGPL-2.1-only",
    "LGPL-2.1-or-later",
    "LGPL-3.0-only",
    "LGPL-3.0-or-later",
    "LPPL-1.3c",
    "MIT",
    "MIT-0",
    "MPL-1.0",
    "MPL-1.1",
    "MPL-2.0",
    "MS-PL",
    "MS-RL",
    "NCSA",
    "ODC-By-1.0",
    "ODbL-1.0",
    "OFL-1.0",
    "OFL-1.1",
    "OSL-1.0",
    "OSL-1.1",
    "OSL-2.0",
    "OSL-2.1",
    "OSL-3.0",
    "PDDL-1.0",
    "PSF-2.0",
    "Python-2.0",
    "Unlicense",
    "UPL-1.0",
    "Vim",
    "W3C",
    "WTFPL",
    "Zlib",
];

/// Deprecated SPDX ids, accepted with a warning.
const DEPRECATED_LICENSE_IDS: &[&str] = &[
    "AGPL-1.0",
    "AGPL-3.0",
    "BSD-2-Clause-FreeBSD",
    "BSD-2-Clause-NetBSD",
    "GFDL-1.1",
    "GFDL-1.2",
    "GFDL-1.3",
    "GPL-1.0",
    "GPL-1.0+",
    "GPL-2.0",
    "GPL-2.0+",
    "GPL-2.0-with-autoconf-exception",
    "GPL-2.0-with-classpath-exception",
    "GPL-3.0",
    "GPL-3.0+",
    "LGPL-2.0",
    "LGPL-2.0+",
    "LGPL-2.1",
    "LGPL-2.1+",
    "LGPL-3.0",
    "LGPL-3.0+",
    "Nunit",
    "StandardML-NJ",
    "eCos-2.0",
    "wxWindows",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LicenseStatus {
    Known,
    Deprecated,
    Unknown,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("License id may not be empty")]
pub struct EmptyLicenseIdError;

/// An SPDX license identifier, e.g. `MIT` or `CC-BY-4.0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct LicenseId(String);

impl LicenseId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn status(&self) -> LicenseStatus {
        if KNOWN_LICENSE_IDS.contains(&self.0.as_str()) {
            LicenseStatus::Known
        } else if DEPRECATED_LICENSE_IDS.contains(&self.0.as_str()) {
            LicenseStatus::Deprecated
        } else {
            LicenseStatus::Unknown
        }
    }
}

impl TryFrom<String> for LicenseId {
    type Error = EmptyLicenseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(EmptyLicenseIdError);
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for LicenseId {
    type Error = EmptyLicenseIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_owned())
    }
}

impl From<LicenseId> for String {
    fn from(value: LicenseId) -> Self {
        value.0
    }
}

impl Display for LicenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl crate::validation::Validate for LicenseId {
    fn validate(value: &crate::yaml::YamlValue, cx: &mut crate::validation::Validator) -> Option<Self> {
        use crate::validation::Severity;
        let raw = <String as crate::validation::Validate>::validate(value, cx)?;
        let id = match Self::try_from(raw) {
            Ok(id) => id,
            Err(err) => {
                cx.error("value_error.license", err.to_string());
                return None;
            }
        };
        match id.status() {
            LicenseStatus::Known => {}
            LicenseStatus::Deprecated => {
                cx.warn(
                    Severity::Warning,
                    format!("{id} is deprecated, see https://spdx.org/licenses/{id}.html"),
                );
            }
            LicenseStatus::Unknown => {
                cx.warn(
                    Severity::Warning,
                    format!("'{id}' is not a known SPDX license id"),
                );
            }
        }
        Some(id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_license_status() {
        assert_eq!(LicenseId::try_from("MIT").unwrap().status(), LicenseStatus::Known);
        assert_eq!(
            LicenseId::try_from("BSD-2-Clause-FreeBSD").unwrap().status(),
            LicenseStatus::Deprecated
        );
        assert_eq!(
            LicenseId::try_from("My-Custom-License").unwrap().status(),
            LicenseStatus::Unknown
        );
    }
}
