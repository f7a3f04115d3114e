use std::fmt::Display;

use crate::rdf::model::tensor_id::AxisId;
use crate::validation::Validator;
use crate::yaml::Mapping;

/// The softmax function, applied along one axis.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Softmax {
    /// The axis to apply the softmax function along; defaults to 'channel'.
    pub axis: AxisId,
}

impl Softmax {
    pub(crate) fn validate_kwargs(kwargs: &Mapping, cx: &mut Validator) -> Option<Self> {
        cx.forbid_unknown(kwargs, &["axis"]);
        let axis = cx.optional_or_else(kwargs, "axis", || {
            AxisId::try_from("channel").expect("'channel' is a valid axis id")
        });
        if axis.is_batch() {
            cx.with("axis", |cx| {
                cx.error("value_error.identifier", "softmax may not be applied along the batch axis")
            });
        }
        Some(Self { axis })
    }
}

impl Display for Softmax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Softmax along {}", self.axis)
    }
}
