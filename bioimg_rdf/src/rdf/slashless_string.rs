use std::borrow::Borrow;
use std::fmt::Display;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlashlessStringError<Inner: Display> {
    #[error("String must not start or end with '/': '{found}'")]
    BadSlashPosition { found: String },
    #[error(transparent)]
    Inner(Inner),
}

/// A constrained string that must not start or end with a slash.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SlashlessString<T>(T);

impl<T: Borrow<str>> SlashlessString<T> {
    pub fn as_str(&self) -> &str {
        self.0.borrow()
    }
}

impl<T> TryFrom<String> for SlashlessString<T>
where
    T: TryFrom<String> + Borrow<str>,
    T::Error: Display,
{
    type Error = SlashlessStringError<T::Error>;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.starts_with('/') || value.ends_with('/') {
            return Err(SlashlessStringError::BadSlashPosition { found: value });
        }
        let inner = T::try_from(value).map_err(SlashlessStringError::Inner)?;
        Ok(Self(inner))
    }
}

impl<T: Borrow<str>> Borrow<str> for SlashlessString<T> {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

impl<T: Borrow<str>> Display for SlashlessString<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.borrow())
    }
}
