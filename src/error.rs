use std::fmt::Display;

use thiserror::Error;

/// Error category of a single violation, one per stage of the validation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    Structural,
    Discriminator,
    Consistency,
    UnresolvedMaterial,
    InconsistentRequest,
}

impl Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ViolationKind::Structural => "structural",
            ViolationKind::Discriminator => "discriminator",
            ViolationKind::Consistency => "consistency",
            ViolationKind::UnresolvedMaterial => "unresolved material",
            ViolationKind::InconsistentRequest => "inconsistent request",
        };

        write!(f, "{}", name)
    }
}

/// The rule a document broke. Each rule belongs to exactly one [`ViolationKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Required,
    Type,
    Range,
    Cardinality,
    Forbidden,
    Discriminator,
    LengthParity,
    Pattern,
    ImpossibleProperty,
    DuplicateProperty,
    DuplicateTensor,
    DegenerateTensor,
    DuplicateIndex,
    HookesLaw,
    MissingMeshFile,
    Unresolved,
    FreeComponentRequested,
}

impl Rule {
    pub fn kind(&self) -> ViolationKind {
        match self {
            Rule::Required | Rule::Type | Rule::Range | Rule::Cardinality | Rule::Forbidden => {
                ViolationKind::Structural
            }
            Rule::Discriminator => ViolationKind::Discriminator,
            Rule::LengthParity
            | Rule::Pattern
            | Rule::ImpossibleProperty
            | Rule::DuplicateProperty
            | Rule::DuplicateTensor
            | Rule::DegenerateTensor
            | Rule::DuplicateIndex
            | Rule::HookesLaw
            | Rule::MissingMeshFile => ViolationKind::Consistency,
            Rule::Unresolved => ViolationKind::UnresolvedMaterial,
            Rule::FreeComponentRequested => ViolationKind::InconsistentRequest,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::Type => "type",
            Rule::Range => "range",
            Rule::Cardinality => "cardinality",
            Rule::Forbidden => "forbidden",
            Rule::Discriminator => "discriminator",
            Rule::LengthParity => "length-parity",
            Rule::Pattern => "pattern",
            Rule::ImpossibleProperty => "impossible-property",
            Rule::DuplicateProperty => "duplicate-property",
            Rule::DuplicateTensor => "duplicate-tensor",
            Rule::DegenerateTensor => "degenerate-tensor",
            Rule::DuplicateIndex => "duplicate-index",
            Rule::HookesLaw => "hookes-law",
            Rule::MissingMeshFile => "missing-mesh-file",
            Rule::Unresolved => "unresolved-material",
            Rule::FreeComponentRequested => "free-component-requested",
        }
    }
}

/// One problem found in a case document
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Location inside the document, e.g. `loading.tensors[2][0][1]`
    pub path: String,
    pub rule: Rule,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, rule: Rule, message: impl Into<String>) -> Violation {
        Violation {
            path: path.into(),
            rule,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ViolationKind {
        self.rule.kind()
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} / {}] {}: {}",
            self.kind(),
            self.rule.name(),
            self.path,
            self.message
        )
    }
}

/// Every violation found in one document during one validation pass
#[derive(Debug, Clone, PartialEq, Default, Error)]
#[error("{} violation(s){}", .violations.len(), render_list(.violations))]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn new(violations: Vec<Violation>) -> ValidationReport {
        ValidationReport { violations }
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind() == kind).count()
    }

    pub fn has(&self, kind: ViolationKind) -> bool {
        self.count(kind) > 0
    }

    pub fn has_rule(&self, rule: Rule) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }

    /// Returns `value` when no violations were collected, the report otherwise
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationReport> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<Vec<Violation>> for ValidationReport {
    fn from(violations: Vec<Violation>) -> Self {
        ValidationReport::new(violations)
    }
}

fn render_list(violations: &[Violation]) -> String {
    violations.iter().map(|v| format!("\n  {v}")).collect()
}

#[derive(Debug, Error)]
pub enum RveError {
    #[error("Input error: {0}")]
    Input(String),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationReport),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Settings error: {0}")]
    Settings(String),
    #[error("Output error: {0}")]
    Output(String),
}
