use std::fmt::Display;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("List may not be empty")]
pub struct EmptyListError;

/// A list with at least one element.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<T>")]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct NonEmptyList<T>(Vec<T>);

impl<T> NonEmptyList<T> {
    pub fn of(first: T) -> Self {
        Self(vec![first])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn first(&self) -> &T {
        &self.0[0]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<T> {
        self.0
    }

    pub fn try_map<Out, Err>(&self, f: impl FnMut(&T) -> Result<Out, Err>) -> Result<NonEmptyList<Out>, Err> {
        let mapped: Vec<Out> = self.0.iter().map(f).collect::<Result<_, _>>()?;
        Ok(NonEmptyList(mapped))
    }

    pub fn map<Out>(&self, f: impl FnMut(&T) -> Out) -> NonEmptyList<Out> {
        NonEmptyList(self.0.iter().map(f).collect())
    }
}

impl<T> TryFrom<Vec<T>> for NonEmptyList<T> {
    type Error = EmptyListError;

    fn try_from(value: Vec<T>) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Err(EmptyListError)
        } else {
            Ok(Self(value))
        }
    }
}

impl<'l, T> IntoIterator for &'l NonEmptyList<T> {
    type Item = &'l T;
    type IntoIter = std::slice::Iter<'l, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T: Display> Display for NonEmptyList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (idx, item) in self.0.iter().enumerate() {
            if idx != 0 {
                write!(f, ", ")?;
            }
            item.fmt(f)?;
        }
        write!(f, "]")
    }
}

impl<T: crate::validation::Validate> crate::validation::Validate for NonEmptyList<T> {
    fn validate(value: &crate::yaml::YamlValue, cx: &mut crate::validation::Validator) -> Option<Self> {
        if let crate::yaml::YamlValue::Sequence(raw) = value {
            if raw.is_empty() {
                cx.error("value_error.min_length", "At least one entry is required");
                return None;
            }
        }
        let items = <Vec<T> as crate::validation::Validate>::validate(value, cx)?;
        // an empty result here means every entry failed to parse; those
        // failures are already recorded
        Self::try_from(items).ok()
    }
}
