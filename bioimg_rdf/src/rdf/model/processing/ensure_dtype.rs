use std::fmt::Display;

use crate::rdf::model::data_type::DataType;
use crate::validation::Validator;
use crate::yaml::Mapping;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EnsureDtype {
    pub dtype: DataType,
}

impl EnsureDtype {
    pub(crate) fn validate_kwargs(kwargs: &Mapping, cx: &mut Validator) -> Option<Self> {
        cx.forbid_unknown(kwargs, &["dtype"]);
        let dtype = cx.required(kwargs, "dtype");
        Some(Self { dtype: dtype? })
    }
}

impl Display for EnsureDtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ensure {}", self.dtype)
    }
}
