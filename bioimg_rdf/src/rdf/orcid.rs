use std::fmt::Display;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrcidParsingError {
    #[error("Expected 4 groups of 4 characters separated by '-', found '{found}'")]
    BadShape { found: String },
    #[error("Orcid may only contain digits (and a trailing 'X'): '{found}'")]
    BadCharacter { found: String },
    #[error("Checksum mismatch for '{found}'")]
    ChecksumMismatch { found: String },
}

/// An ORCID id in 4x4 hyphenated form, checked with ISO 7064 mod 11-2.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Orcid(String);

impl Orcid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Orcid {
    type Error = OrcidParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let groups: Vec<&str> = value.split('-').collect();
        if groups.len() != 4 || groups.iter().any(|g| g.chars().count() != 4) {
            return Err(OrcidParsingError::BadShape { found: value });
        }
        let digits: String = groups.concat();

        // ISO 7064 mod 11-2; the last character is the check digit, 'X'
        // standing for 10. Including the check digit the sum must equal 1.
        let mut check: u32 = 0;
        for (idx, c) in digits.chars().enumerate() {
            let digit = match c.to_digit(10) {
                Some(d) => d,
                None if idx == 15 && c == 'X' => 10,
                None => return Err(OrcidParsingError::BadCharacter { found: value }),
            };
            check = (2 * check + digit) % 11;
        }
        if check != 1 {
            return Err(OrcidParsingError::ChecksumMismatch { found: value });
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Orcid {
    type Error = OrcidParsingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}

impl From<Orcid> for String {
    fn from(value: Orcid) -> Self {
        value.0
    }
}

impl Display for Orcid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl_validate_from_string!(Orcid, "value_error.orcid");

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_valid_orcids() {
        // examples from the ORCID documentation
        assert!(Orcid::try_from("0000-0002-1825-0097").is_ok());
        assert!(Orcid::try_from("0000-0001-5109-3700").is_ok());
        assert!(Orcid::try_from("0000-0002-1694-233X").is_ok());
    }

    #[test]
    fn test_invalid_orcids() {
        assert!(Orcid::try_from("0000-0002-1825-0098").is_err());
        assert!(Orcid::try_from("0000-0002-18250-097").is_err());
        assert!(Orcid::try_from("not-an-orcid-at-all").is_err());
    }
}
