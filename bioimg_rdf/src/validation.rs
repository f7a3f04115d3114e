//! The severity-aware validation engine.
//!
//! A [`Validator`] walks raw YAML data, tracking the current location path and
//! collecting diagnostics. Typed nodes implement [`Validate`]; constraints
//! within one node are evaluated non-short-circuiting so a single run surfaces
//! every issue. Severity-tagged checks are issued through [`Validator::warn`]:
//! a severity at or above the context's warning level is recorded as an error
//! of type `warning`, anything below as a plain warning entry.

use std::fmt::Display;

use crate::context::ValidationContext;
use crate::summary::{format_loc, ErrorEntry, Loc, LocKey, WarningEntry};
use crate::yaml::{self, Mapping, YamlValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Alert,
    Error,
}

impl Severity {
    pub fn level(self) -> u8 {
        match self {
            Severity::Info => 20,
            Severity::Warning => 30,
            Severity::Alert => 35,
            Severity::Error => 50,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Alert => "alert",
            Severity::Error => "error",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl serde::Serialize for Severity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}

pub trait Validate: Sized {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self>;
}

pub struct Validator<'c> {
    pub ctx: &'c ValidationContext,
    loc: Loc,
    errors: Vec<ErrorEntry>,
    warnings: Vec<WarningEntry>,
}

impl<'c> Validator<'c> {
    pub fn new(ctx: &'c ValidationContext) -> Self {
        Self {
            ctx,
            loc: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn loc(&self) -> &[LocKey] {
        &self.loc
    }

    pub fn into_diagnostics(self) -> (Vec<ErrorEntry>, Vec<WarningEntry>) {
        (self.errors, self.warnings)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Run `body` with `key` appended to the location path.
    pub fn with<T>(&mut self, key: impl Into<LocKey>, body: impl FnOnce(&mut Self) -> T) -> T {
        self.loc.push(key.into());
        let out = body(self);
        let _ = self.loc.pop();
        out
    }

    pub fn error(&mut self, kind: impl Into<String>, msg: impl Into<String>) {
        self.errors.push(ErrorEntry::new(self.loc.clone(), kind, msg));
    }

    pub fn error_at(&mut self, loc: Loc, kind: impl Into<String>, msg: impl Into<String>) {
        self.errors.push(ErrorEntry::new(loc, kind, msg));
    }

    pub fn io_error(&mut self, msg: impl Into<String>) {
        self.error("io_error", msg);
    }

    /// Issue a severity-tagged check result.
    pub fn warn(&mut self, severity: Severity, msg: impl Into<String>) {
        let msg = msg.into();
        if severity >= self.ctx.warning_level {
            let mut entry = ErrorEntry::new(self.loc.clone(), "warning", msg);
            entry.severity = Some(severity);
            self.errors.push(entry);
        } else {
            if self.ctx.log_warnings {
                tracing::warn!("{}: {}", format_loc(&self.loc), msg);
            }
            self.warnings.push(WarningEntry {
                loc: self.loc.clone(),
                msg,
                kind: "warning".into(),
                severity,
            });
        }
    }

    pub fn warn_at(&mut self, loc: Loc, severity: Severity, msg: impl Into<String>) {
        let msg = msg.into();
        if severity >= self.ctx.warning_level {
            let mut entry = ErrorEntry::new(loc, "warning", msg);
            entry.severity = Some(severity);
            self.errors.push(entry);
        } else {
            if self.ctx.log_warnings {
                tracing::warn!("{}: {}", format_loc(&loc), msg);
            }
            self.warnings.push(WarningEntry {
                loc,
                msg,
                kind: "warning".into(),
                severity,
            });
        }
    }

    pub fn type_error(&mut self, expected: &str, found: &YamlValue) {
        self.error(
            format!("type_error.{expected}"),
            format!("Expected {expected}, found {}", yaml::kind_of(found)),
        );
    }

    /// Validate a required field of `map`; its absence is a `missing` error.
    pub fn required<T: Validate>(&mut self, map: &Mapping, field: &'static str) -> Option<T> {
        match yaml::get(map, field) {
            None | Some(YamlValue::Null) => {
                self.with(field, |cx| cx.error("missing", format!("Field '{field}' is required")));
                None
            }
            Some(value) => self.with(field, |cx| T::validate(value, cx)),
        }
    }

    /// Validate an optional field; absent and `null` both mean `None`.
    pub fn optional<T: Validate>(&mut self, map: &Mapping, field: &'static str) -> Option<T> {
        match yaml::get(map, field) {
            None | Some(YamlValue::Null) => None,
            Some(value) => self.with(field, |cx| T::validate(value, cx)),
        }
    }

    pub fn optional_or<T: Validate>(&mut self, map: &Mapping, field: &'static str, default: T) -> T {
        self.optional(map, field).unwrap_or(default)
    }

    pub fn optional_or_else<T: Validate>(
        &mut self,
        map: &Mapping,
        field: &'static str,
        default: impl FnOnce() -> T,
    ) -> T {
        self.optional(map, field).unwrap_or_else(default)
    }

    /// Unknown fields are forbidden in most nodes (`attachments` and `config`
    /// style free-form nodes skip this check).
    pub fn forbid_unknown(&mut self, map: &Mapping, known: &[&str]) {
        for key in map.keys() {
            match key {
                YamlValue::String(name) => {
                    if !known.contains(&name.as_str()) {
                        self.with(name.clone(), |cx| {
                            cx.error("value_error.extra", format!("Unknown field '{name}'"))
                        });
                    }
                }
                other => self.error(
                    "type_error.str",
                    format!("Field names must be strings, found {}", yaml::kind_of(other)),
                ),
            }
        }
    }
}

impl Validate for String {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        match value {
            YamlValue::String(s) => Some(s.clone()),
            other => {
                cx.type_error("str", other);
                None
            }
        }
    }
}

impl Validate for bool {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        match value {
            YamlValue::Bool(b) => Some(*b),
            other => {
                cx.type_error("bool", other);
                None
            }
        }
    }
}

impl Validate for i64 {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        match value {
            YamlValue::Number(n) if n.is_i64() || n.is_u64() => n.as_i64().or_else(|| {
                cx.error("value_error.int", format!("Integer out of range: {n}"));
                None
            }),
            other => {
                cx.type_error("int", other);
                None
            }
        }
    }
}

impl Validate for usize {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let as_int = i64::validate(value, cx)?;
        match usize::try_from(as_int) {
            Ok(n) => Some(n),
            Err(_) => {
                cx.error("value_error.int", format!("Expected a non-negative integer, found {as_int}"));
                None
            }
        }
    }
}

impl Validate for u32 {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let as_int = i64::validate(value, cx)?;
        match u32::try_from(as_int) {
            Ok(n) => Some(n),
            Err(_) => {
                cx.error("value_error.int", format!("Integer out of range: {as_int}"));
                None
            }
        }
    }
}

impl Validate for f64 {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        match value {
            YamlValue::Number(n) => n.as_f64(),
            other => {
                cx.type_error("float", other);
                None
            }
        }
    }
}

impl Validate for f32 {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        f64::validate(value, cx).map(|v| v as f32)
    }
}

impl Validate for YamlValue {
    fn validate(value: &YamlValue, _cx: &mut Validator) -> Option<Self> {
        Some(value.clone())
    }
}

impl Validate for Mapping {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        match value {
            YamlValue::Mapping(map) => Some(map.clone()),
            other => {
                cx.type_error("map", other);
                None
            }
        }
    }
}

/// Item failures are recorded but do not fail the whole list; the node is
/// still constructed with the items that did parse so downstream cross-field
/// checks can run.
impl<T: Validate> Validate for Vec<T> {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        match value {
            YamlValue::Sequence(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    if let Some(parsed) = cx.with(idx, |cx| T::validate(item, cx)) {
                        out.push(parsed);
                    }
                }
                Some(out)
            }
            other => {
                cx.type_error("list", other);
                None
            }
        }
    }
}

/// Implements [`Validate`] for a type parsed from a YAML string via
/// `TryFrom<String>`, tagging failures with the given `value_error` slug.
#[macro_export]
macro_rules! impl_validate_from_string {
    ($target:ty, $slug:literal) => {
        impl $crate::validation::Validate for $target {
            fn validate(
                value: &$crate::yaml::YamlValue,
                cx: &mut $crate::validation::Validator,
            ) -> Option<Self> {
                let raw = <String as $crate::validation::Validate>::validate(value, cx)?;
                match <$target as TryFrom<String>>::try_from(raw) {
                    Ok(parsed) => Some(parsed),
                    Err(err) => {
                        cx.error($slug, err.to_string());
                        None
                    }
                }
            }
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::ValidationContext;

    #[test]
    fn test_field_helpers_aggregate_errors() {
        let ctx = ValidationContext::default();
        let mut cx = Validator::new(&ctx);
        let map: Mapping = serde_yaml::from_str("{name: 7, tags: [a, 3, c]}").unwrap();

        let name: Option<String> = cx.required(&map, "name");
        let missing: Option<String> = cx.required(&map, "description");
        let tags: Vec<String> = cx.optional_or(&map, "tags", Vec::new());

        assert!(name.is_none());
        assert!(missing.is_none());
        assert_eq!(tags, vec!["a".to_owned(), "c".to_owned()]);

        let (errors, warnings) = cx.into_diagnostics();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].kind, "type_error.str");
        assert_eq!(errors[1].kind, "missing");
        assert_eq!(crate::summary::format_loc(&errors[2].loc), "tags.1");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_warning_routing_by_level() {
        let mut ctx = ValidationContext::default();
        ctx.warning_level = Severity::Warning;
        let mut cx = Validator::new(&ctx);
        cx.warn(Severity::Info, "just so you know");
        cx.warn(Severity::Alert, "this one is serious");

        let (errors, warnings) = cx.into_diagnostics();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Info);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, "warning");
    }
}
