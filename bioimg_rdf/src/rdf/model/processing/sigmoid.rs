use std::fmt::Display;

use crate::validation::Validator;
use crate::yaml::Mapping;

/// The logistic sigmoid function, a.k.a. expit function.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Sigmoid;

impl Sigmoid {
    pub(crate) fn validate_kwargs(kwargs: &Mapping, cx: &mut Validator) -> Option<Self> {
        cx.forbid_unknown(kwargs, &[]);
        Some(Self)
    }
}

impl Display for Sigmoid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sigmoid")
    }
}
