pub mod yaml;
pub mod summary;
#[macro_use]
pub mod validation;
pub mod context;
pub mod rdf;
pub mod registry;
pub mod upgrade;
pub mod build;

pub use build::{build_description, AnyDescription, FormatSelector, LoadedDescription};
pub use context::{ArraySummary, IoCheckError, Root, SourceChecker, ValidationContext};
pub use registry::{get_schema, ResourceType, Schema};
pub use summary::{ErrorEntry, Loc, LocKey, Status, ValidationDetail, ValidationSummary, WarningEntry};
pub use validation::{Severity, Validate, Validator};
