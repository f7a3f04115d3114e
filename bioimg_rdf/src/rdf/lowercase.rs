use std::borrow::Borrow;
use std::fmt::Display;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LowercaseParsingError<Inner: Display> {
    #[error("Expected all-lowercase string, found '{found}'")]
    NotLowercase { found: String },
    #[error(transparent)]
    Inner(Inner),
}

/// Wrapper enforcing that the inner constrained string is all-lowercase.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Lowercase<T>(T);

impl<T: Borrow<str>> Lowercase<T> {
    pub fn as_str(&self) -> &str {
        self.0.borrow()
    }
}

impl<T> TryFrom<String> for Lowercase<T>
where
    T: TryFrom<String> + Borrow<str>,
    T::Error: Display,
{
    type Error = LowercaseParsingError<T::Error>;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.chars().any(|c| c.is_uppercase()) {
            return Err(LowercaseParsingError::NotLowercase { found: value });
        }
        let inner = T::try_from(value).map_err(LowercaseParsingError::Inner)?;
        Ok(Self(inner))
    }
}

impl<T: Borrow<str>> Borrow<str> for Lowercase<T> {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

impl<T: Borrow<str>> Display for Lowercase<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.borrow())
    }
}
