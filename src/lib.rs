//! Case definitions for RVE micromechanics FE runs
//!
//! A case document is checked in two passes. The schema pass checks shape and
//! types field by field, the consistency pass checks the rules that span
//! fields. Every violation of both passes is reported together, and a [`Case`]
//! is only produced from a document without any. [`plan::build`] then resolves
//! materials, property requests and per-load-case boundary conditions into a
//! [`plan::CasePlan`].

pub mod assembler;
pub mod consistency;
pub mod datatypes;
pub mod error;
pub mod material;
pub mod plan;
pub mod property;
pub mod request;
pub mod schema;
pub mod settings;

use std::path::Path;

use json::JsonValue;
use tracing::{info, warn};

pub use datatypes::Case;
pub use error::{RveError, ValidationReport, Violation, ViolationKind};
pub use plan::CasePlan;
pub use settings::Settings;

use error::Rule;

/// Validates a parsed case document
///
/// # Arguments
/// * `document` - The parsed JSON document
/// * `settings` - Tool settings
///
/// # Returns
/// The typed case, or every violation found in the document
pub fn validate(document: &JsonValue, settings: &Settings) -> Result<Case, ValidationReport> {
    let (draft, mut violations) = schema::parse_document(document);
    violations.extend(consistency::check(&draft, settings));

    if !violations.is_empty() {
        return Err(ValidationReport::new(violations));
    }

    draft.into_case().ok_or_else(|| {
        ValidationReport::new(vec![Violation::new(
            "$",
            Rule::Required,
            "document is incomplete",
        )])
    })
}

/// Reads, validates and resolves one case document
///
/// # Arguments
/// * `path` - The case document
/// * `settings` - Tool settings
/// * `rve_lengths` - Optional RVE side lengths for the retained-node translation
///
/// # Returns
/// The case plan
pub fn process_file(
    path: &Path,
    settings: &Settings,
    rve_lengths: Option<[f64; 3]>,
) -> Result<CasePlan, RveError> {
    info!("reading {}", path.display());
    let document = schema::load_document(path)?;

    let case = match validate(&document, settings) {
        Ok(case) => case,
        Err(report) => {
            warn!("{}: {} violation(s)", path.display(), report.len());
            return Err(report.into());
        }
    };

    Ok(plan::build(&case, path, settings, rve_lengths)?)
}
