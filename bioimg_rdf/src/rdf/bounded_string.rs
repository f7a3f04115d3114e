use std::borrow::Borrow;
use std::fmt::Display;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoundedStringParsingError {
    #[error("Expected at least {min} characters, found {found}")]
    TooShort { min: usize, found: usize },
    #[error("Expected at most {max} characters, found {found}")]
    TooLong { max: usize, found: usize },
}

/// A string with an inclusive character-count range `MIN..=MAX`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct BoundedString<const MIN: usize, const MAX: usize>(String);

impl<const MIN: usize, const MAX: usize> BoundedString<MIN, MAX> {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const MIN: usize, const MAX: usize> TryFrom<String> for BoundedString<MIN, MAX> {
    type Error = BoundedStringParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let found = value.chars().count();
        if found < MIN {
            return Err(BoundedStringParsingError::TooShort { min: MIN, found });
        }
        if found > MAX {
            return Err(BoundedStringParsingError::TooLong { max: MAX, found });
        }
        Ok(Self(value))
    }
}

impl<const MIN: usize, const MAX: usize> TryFrom<&str> for BoundedString<MIN, MAX> {
    type Error = BoundedStringParsingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_owned())
    }
}

impl<const MIN: usize, const MAX: usize> From<BoundedString<MIN, MAX>> for String {
    fn from(value: BoundedString<MIN, MAX>) -> Self {
        value.0
    }
}

impl<const MIN: usize, const MAX: usize> Borrow<str> for BoundedString<MIN, MAX> {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl<const MIN: usize, const MAX: usize> Display for BoundedString<MIN, MAX> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<const MIN: usize, const MAX: usize> crate::validation::Validate for BoundedString<MIN, MAX> {
    fn validate(value: &crate::yaml::YamlValue, cx: &mut crate::validation::Validator) -> Option<Self> {
        let raw = <String as crate::validation::Validate>::validate(value, cx)?;
        match Self::try_from(raw) {
            Ok(bounded) => Some(bounded),
            Err(err) => {
                cx.error("value_error.str", err.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(BoundedString::<5, 64>::try_from("tiny").is_err());
        assert!(BoundedString::<5, 64>::try_from("long enough").is_ok());
        assert!(BoundedString::<0, 3>::try_from("abcd").is_err());
    }
}
