//! Structured record of a validation run: every error and warning with its
//! location path, plus the overall status.

use std::fmt::Display;

use crate::validation::Severity;

/// One step of a location path into the raw RDF data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocKey {
    Field(String),
    Index(usize),
}

impl From<&str> for LocKey {
    fn from(value: &str) -> Self {
        LocKey::Field(value.to_owned())
    }
}

impl From<String> for LocKey {
    fn from(value: String) -> Self {
        LocKey::Field(value)
    }
}

impl From<usize> for LocKey {
    fn from(value: usize) -> Self {
        LocKey::Index(value)
    }
}

impl serde::Serialize for LocKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LocKey::Field(name) => serializer.serialize_str(name),
            LocKey::Index(idx) => serializer.serialize_u64(*idx as u64),
        }
    }
}

impl Display for LocKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocKey::Field(name) => write!(f, "{name}"),
            LocKey::Index(idx) => write!(f, "{idx}"),
        }
    }
}

pub type Loc = Vec<LocKey>;

pub fn format_loc(loc: &[LocKey]) -> String {
    if loc.is_empty() {
        return ".".into();
    }
    let mut out = String::new();
    for (idx, key) in loc.iter().enumerate() {
        if idx != 0 {
            out.push('.');
        }
        out.push_str(&key.to_string());
    }
    out
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ErrorEntry {
    pub loc: Loc,
    pub msg: String,
    /// Machine readable error type, e.g. `missing`, `type_error.int`, `value_error.orcid`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
    /// Set for entries of type `warning`: the severity of the raised check.
    #[serde(skip)]
    pub severity: Option<Severity>,
}

impl ErrorEntry {
    pub fn new(loc: Loc, kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
            traceback: None,
            severity: None,
        }
    }

    pub fn into_warning(self) -> WarningEntry {
        WarningEntry {
            loc: self.loc,
            msg: self.msg,
            kind: self.kind,
            severity: self.severity.unwrap_or(Severity::Warning),
        }
    }
}

impl Display for ErrorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: [{}] {}", format_loc(&self.loc), self.kind, self.msg)
    }
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct WarningEntry {
    pub loc: Loc,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
}

impl Display for WarningEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: [{}] {}", format_loc(&self.loc), self.severity, self.msg)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Status {
    #[serde(rename = "passed")]
    Passed,
    #[serde(rename = "valid-format")]
    ValidFormat,
    #[serde(rename = "failed")]
    Failed,
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Passed => write!(f, "passed"),
            Status::ValidFormat => write!(f, "valid-format"),
            Status::Failed => write!(f, "failed"),
        }
    }
}

/// One validation step (e.g. "validate as model 0.5.3") with its diagnostics.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ValidationDetail {
    pub name: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub loc: Loc,
    pub errors: Vec<ErrorEntry>,
    pub warnings: Vec<WarningEntry>,
}

impl ValidationDetail {
    pub fn new(name: impl Into<String>, errors: Vec<ErrorEntry>, warnings: Vec<WarningEntry>) -> Self {
        let status = if errors.is_empty() { Status::Passed } else { Status::Failed };
        Self {
            name: name.into(),
            status,
            loc: Vec::new(),
            errors,
            warnings,
        }
    }
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ValidationSummary {
    pub name: String,
    pub source_name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub format_version: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub env: Vec<InstalledPackage>,
    pub details: Vec<ValidationDetail>,
}

impl ValidationSummary {
    pub fn new(
        source_name: impl Into<String>,
        resource_type: impl Into<String>,
        format_version: impl Into<String>,
    ) -> Self {
        Self {
            name: "bioimageio format validation".into(),
            source_name: source_name.into(),
            resource_type: resource_type.into(),
            format_version: format_version.into(),
            status: Status::Passed,
            id: None,
            env: vec![InstalledPackage {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
            }],
            details: Vec::new(),
        }
    }

    pub fn add_detail(&mut self, detail: ValidationDetail) {
        if detail.status == Status::Failed {
            self.status = Status::Failed;
        } else if self.status == Status::Passed && !detail.warnings.is_empty() {
            self.status = Status::ValidFormat;
        }
        self.details.push(detail);
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorEntry> {
        self.details.iter().flat_map(|d| d.errors.iter())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &WarningEntry> {
        self.details.iter().flat_map(|d| d.warnings.iter())
    }
}

impl Display for ValidationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} {} {}", self.status, self.resource_type, self.source_name)?;
        for detail in self.details.iter() {
            writeln!(f, "  {} {}", detail.status, detail.name)?;
            for error in detail.errors.iter() {
                writeln!(f, "    error   {error}")?;
            }
            for warning in detail.warnings.iter() {
                writeln!(f, "    warning {warning}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_aggregation() {
        let mut summary = ValidationSummary::new("in-memory", "model", "0.5.3");
        assert_eq!(summary.status, Status::Passed);

        summary.add_detail(ValidationDetail::new(
            "first",
            vec![],
            vec![WarningEntry {
                loc: vec!["license".into()],
                msg: "deprecated".into(),
                kind: "warning".into(),
                severity: Severity::Warning,
            }],
        ));
        assert_eq!(summary.status, Status::ValidFormat);

        summary.add_detail(ValidationDetail::new(
            "second",
            vec![ErrorEntry::new(
                vec!["authors".into(), 0.into()],
                "missing",
                "missing",
            )],
            vec![],
        ));
        assert_eq!(summary.status, Status::Failed);
    }

    #[test]
    fn test_format_loc() {
        let loc: Loc = vec!["inputs".into(), 0.into(), "axes".into(), 2.into(), "size".into()];
        assert_eq!(format_loc(&loc), "inputs.0.axes.2.size");
        assert_eq!(format_loc(&[]), ".");
    }
}
