use std::fmt::Display;

use crate::validation::{Validate, Validator};
use crate::yaml::{Mapping, YamlValue};

use super::file_description::{FileDescr, Sha256};
use super::file_reference::FileReference;

/// A file attachment. Unlike most nodes, attachments keep unknown fields.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    pub source: FileReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub sha256: Option<Sha256>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl Attachment {
    pub fn file_descr(&self) -> FileDescr {
        FileDescr {
            source: self.source.clone(),
            sha256: self.sha256.clone(),
        }
    }
}

impl Display for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl Validate for Attachment {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        match value {
            YamlValue::String(_) => {
                let source = FileReference::validate(value, cx)?;
                let mut attachment = Attachment {
                    source,
                    sha256: None,
                    extra: Mapping::new(),
                };
                let mut descr = attachment.file_descr();
                descr.run_io_checks(cx);
                attachment.sha256 = descr.sha256;
                Some(attachment)
            }
            YamlValue::Mapping(map) => {
                let source: FileReference = cx.required(map, "source")?;
                let sha256: Option<Sha256> = cx.optional(map, "sha256");
                let mut extra = Mapping::new();
                for (key, val) in map.iter() {
                    let is_known = matches!(key, YamlValue::String(name) if name == "source" || name == "sha256");
                    if !is_known {
                        let _ = extra.insert(key.clone(), val.clone());
                    }
                }
                let mut attachment = Attachment { source, sha256, extra };
                let mut descr = attachment.file_descr();
                descr.run_io_checks(cx);
                attachment.sha256 = descr.sha256;
                Some(attachment)
            }
            other => {
                cx.type_error("map", other);
                None
            }
        }
    }
}
