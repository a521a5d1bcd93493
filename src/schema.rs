use std::path::Path;

use json::JsonValue;
use nalgebra::Vector3;
use tracing::{debug, warn};

use crate::{
    datatypes::{
        BoundaryConditions, Case, Loading, LoadingKind, Material, MaterialType, Mesh, Moduli,
        StrainTensor, Units, DEFAULT_ELEMENT_TYPE, DEFAULT_MAGNITUDE_MULTIPLIER,
    },
    error::{Rule, RveError, Violation},
    property::PropertyRequest,
};

/// Top-level keys a case document may carry
const KNOWN_KEYS: [&str; 9] = [
    "$schema",
    "caseId",
    "caseDescription",
    "units",
    "boundaryConditions",
    "loading",
    "materials",
    "mesh",
    "runnerOptions",
];

/// Poisson's ratio bounds, inclusive
pub const POISSON_MIN: f64 = -1.0;
pub const POISSON_MAX: f64 = 0.5;

/// Structurally valid parts of a case document. A section is `None` when it is
/// missing or failed its own shape checks; the violations say why.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub case_id: Option<u64>,
    pub description: Option<String>,
    pub units: Option<Units>,
    pub boundary_conditions: Option<BoundaryConditions>,
    pub loading: Option<LoadingDraft>,
    /// One slot per array entry so positions stay aligned with the document
    pub materials: Option<Vec<Option<Material>>>,
    pub mesh: Option<Mesh>,
    pub runner_options: Option<JsonValue>,
}

#[derive(Debug, Clone)]
pub struct LoadingDraft {
    pub kind: LoadingKind,
    /// One slot per array entry; `None` when that tensor is malformed
    pub tensors: Vec<Option<StrainTensor>>,
    pub magnitude_multiplier: Option<f64>,
    pub labels: Option<Vec<String>>,
    /// Raw tags; pattern checks happen in the consistency pass
    pub expected_properties: Vec<Vec<String>>,
}

#[derive(Clone, Copy)]
enum Bound {
    Positive,
    PoissonsRatio,
}

impl Bound {
    fn admits(&self, value: f64) -> bool {
        match self {
            Bound::Positive => value > 0.0,
            Bound::PoissonsRatio => (POISSON_MIN..=POISSON_MAX).contains(&value),
        }
    }

    fn describe(&self) -> String {
        match self {
            Bound::Positive => "must be strictly positive".to_owned(),
            Bound::PoissonsRatio => format!("must lie in [{}, {}]", POISSON_MIN, POISSON_MAX),
        }
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_owned()
    } else {
        format!("{parent}.{key}")
    }
}

fn describe_type(value: &JsonValue) -> &'static str {
    if value.is_null() {
        "null"
    } else if value.is_boolean() {
        "a boolean"
    } else if value.is_number() {
        "a number"
    } else if value.is_string() {
        "a string"
    } else if value.is_array() {
        "an array"
    } else {
        "an object"
    }
}

/// Collects violations while walking a document
#[derive(Default)]
struct Walker {
    violations: Vec<Violation>,
}

impl Walker {
    fn report(&mut self, path: impl Into<String>, rule: Rule, message: impl Into<String>) {
        self.violations.push(Violation::new(path, rule, message));
    }

    fn required<'a>(&mut self, parent: &'a JsonValue, key: &str, path: &str) -> Option<&'a JsonValue> {
        if !parent.has_key(key) || parent[key].is_null() {
            self.report(join(path, key), Rule::Required, "missing required field");
            return None;
        }
        Some(&parent[key])
    }

    fn optional<'a>(&self, parent: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
        if parent[key].is_null() {
            None
        } else {
            Some(&parent[key])
        }
    }

    fn object(&mut self, value: &JsonValue, path: &str) -> bool {
        if !value.is_object() {
            self.report(
                path,
                Rule::Type,
                format!("expected an object, found {}", describe_type(value)),
            );
            return false;
        }
        true
    }

    fn array<'a>(&mut self, value: &'a JsonValue, path: &str) -> Option<&'a [JsonValue]> {
        match value {
            JsonValue::Array(items) => Some(items.as_slice()),
            _ => {
                self.report(
                    path,
                    Rule::Type,
                    format!("expected an array, found {}", describe_type(value)),
                );
                None
            }
        }
    }

    fn string(&mut self, value: &JsonValue, path: &str) -> Option<String> {
        match value.as_str() {
            Some(s) => Some(s.to_owned()),
            None => {
                self.report(
                    path,
                    Rule::Type,
                    format!("expected a string, found {}", describe_type(value)),
                );
                None
            }
        }
    }

    fn number(&mut self, value: &JsonValue, path: &str) -> Option<f64> {
        let Some(number) = value.as_f64() else {
            self.report(
                path,
                Rule::Type,
                format!("expected a number, found {}", describe_type(value)),
            );
            return None;
        };
        if !number.is_finite() {
            self.report(path, Rule::Range, "number is not finite");
            return None;
        }
        Some(number)
    }

    fn integer(&mut self, value: &JsonValue, path: &str) -> Option<i64> {
        let number = self.number(value, path)?;
        if number.fract() != 0.0 || number.abs() > i64::MAX as f64 {
            self.report(path, Rule::Type, format!("expected an integer, found {number}"));
            return None;
        }
        Some(number as i64)
    }

    fn bounded(&mut self, value: &JsonValue, path: &str, bound: Bound) -> Option<f64> {
        let number = self.number(value, path)?;
        if !bound.admits(number) {
            self.report(path, Rule::Range, format!("{number} {}", bound.describe()));
            return None;
        }
        Some(number)
    }

    fn non_empty_string(&mut self, parent: &JsonValue, key: &str, path: &str) -> Option<String> {
        let field = join(path, key);
        let value = self.required(parent, key, path)?;
        let s = self.string(value, &field)?;
        if s.trim().is_empty() {
            self.report(field, Rule::Range, "must not be empty");
            return None;
        }
        Some(s)
    }

    /// Selects a `oneOf` branch from a string discriminator field
    fn discriminator<T>(
        &mut self,
        parent: &JsonValue,
        key: &str,
        path: &str,
        from_name: fn(&str) -> Option<T>,
        names: &[&str],
    ) -> Option<T> {
        let field = join(path, key);
        let value = &parent[key];

        let Some(name) = value.as_str() else {
            self.report(
                field,
                Rule::Discriminator,
                format!(
                    "{} selects no variant; expected one of: {}",
                    describe_type(value),
                    names.join(", ")
                ),
            );
            return None;
        };

        let variant = from_name(name);
        if variant.is_none() {
            self.report(
                field,
                Rule::Discriminator,
                format!("'{name}' matches no variant; expected one of: {}", names.join(", ")),
            );
        }
        variant
    }

    /// Fixed-length array of bounded numbers
    fn moduli(
        &mut self,
        parent: &JsonValue,
        key: &str,
        path: &str,
        len: usize,
        bound: Bound,
    ) -> Option<Vec<f64>> {
        let field = join(path, key);
        let items = self.required(parent, key, path)?;
        let items = self.array(items, &field)?;

        if items.len() != len {
            self.report(
                &field,
                Rule::Cardinality,
                format!("expected {len} value(s), found {}", items.len()),
            );
            return None;
        }

        let values: Vec<Option<f64>> = items
            .iter()
            .enumerate()
            .map(|(i, v)| self.bounded(v, &format!("{field}[{i}]"), bound))
            .collect();
        values.into_iter().collect()
    }

    fn units(&mut self, value: &JsonValue, path: &str) -> Option<Units> {
        if !self.object(value, path) {
            return None;
        }

        let mut label = |key: &str| {
            let field = join(path, key);
            self.required(value, key, path).and_then(|v| self.string(v, &field))
        };
        let length = label("length");
        let force = label("force");
        let pressure = label("pressure");

        Some(Units {
            length: length?,
            force: force?,
            pressure: pressure?,
        })
    }

    fn boundary_conditions(&mut self, value: &JsonValue, path: &str) -> Option<BoundaryConditions> {
        if !self.object(value, path) {
            return None;
        }
        self.discriminator(
            value,
            "kind",
            path,
            BoundaryConditions::from_name,
            &BoundaryConditions::VARIANTS.map(|v| v.name()),
        )
    }

    fn loading(&mut self, value: &JsonValue, path: &str) -> Option<LoadingDraft> {
        if !self.object(value, path) {
            return None;
        }

        let kind = self.discriminator(
            value,
            "kind",
            path,
            LoadingKind::from_name,
            &LoadingKind::VARIANTS.map(|v| v.name()),
        )?;

        match kind {
            LoadingKind::Tensor => self.tensor_loading(value, path),
        }
    }

    fn tensor_loading(&mut self, value: &JsonValue, path: &str) -> Option<LoadingDraft> {
        let tensors_path = join(path, "tensors");
        let tensors: Option<Vec<Option<StrainTensor>>> = self
            .required(value, "tensors", path)
            .and_then(|v| self.array(v, &tensors_path))
            .and_then(|items| {
                if items.is_empty() {
                    self.report(&tensors_path, Rule::Cardinality, "at least one tensor is required");
                    return None;
                }
                Some(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, t)| self.tensor(t, &format!("{tensors_path}[{i}]")))
                        .collect(),
                )
            });

        let multiplier_path = join(path, "magnitudeMultiplier");
        let magnitude_multiplier = match self.optional(value, "magnitudeMultiplier") {
            Some(m) => self.number(m, &multiplier_path),
            None => Some(DEFAULT_MAGNITUDE_MULTIPLIER),
        };

        let labels_path = join(path, "labels");
        let labels = self.optional(value, "labels").and_then(|l| {
            let items = self.array(l, &labels_path)?;
            let labels: Vec<Option<String>> = items
                .iter()
                .enumerate()
                .map(|(i, label)| self.string(label, &format!("{labels_path}[{i}]")))
                .collect();
            labels.into_iter().collect::<Option<Vec<String>>>()
        });

        let expected_path = join(path, "expectedProperties");
        let expected_properties = self
            .required(value, "expectedProperties", path)
            .and_then(|v| self.array(v, &expected_path))
            .and_then(|lists| {
                if lists.is_empty() {
                    self.report(&expected_path, Rule::Cardinality, "at least one property list is required");
                    return None;
                }
                let parsed: Vec<Option<Vec<String>>> = lists
                    .iter()
                    .enumerate()
                    .map(|(i, list)| self.tag_list(list, &format!("{expected_path}[{i}]")))
                    .collect();
                parsed.into_iter().collect::<Option<Vec<Vec<String>>>>()
            });

        Some(LoadingDraft {
            kind: LoadingKind::Tensor,
            tensors: tensors?,
            magnitude_multiplier,
            labels,
            expected_properties: expected_properties?,
        })
    }

    fn tensor(&mut self, value: &JsonValue, path: &str) -> Option<StrainTensor> {
        let rows = self.array(value, path)?;
        if rows.len() != 3 {
            self.report(
                path,
                Rule::Cardinality,
                format!("expected 3 rows, found {}", rows.len()),
            );
            return None;
        }

        let mut cells: [[Option<f64>; 3]; 3] = [[None; 3]; 3];
        let mut well_formed = true;

        for (i, row) in rows.iter().enumerate() {
            let row_path = format!("{path}[{i}]");
            let Some(row) = self.array(row, &row_path) else {
                well_formed = false;
                continue;
            };
            if row.len() != 3 {
                self.report(
                    &row_path,
                    Rule::Cardinality,
                    format!("expected 3 cells, found {}", row.len()),
                );
                well_formed = false;
                continue;
            }

            for (j, cell) in row.iter().enumerate() {
                let cell_path = format!("{row_path}[{j}]");
                if cell.is_null() {
                    continue;
                }
                if !cell.is_number() {
                    self.report(
                        cell_path,
                        Rule::Type,
                        format!("expected a number or null, found {}", describe_type(cell)),
                    );
                    well_formed = false;
                    continue;
                }
                match self.number(cell, &cell_path) {
                    Some(strain) => cells[i][j] = Some(strain),
                    None => well_formed = false,
                }
            }
        }

        if well_formed {
            Some(StrainTensor::from_rows(cells))
        } else {
            None
        }
    }

    fn tag_list(&mut self, value: &JsonValue, path: &str) -> Option<Vec<String>> {
        let items = self.array(value, path)?;
        if items.is_empty() {
            self.report(path, Rule::Cardinality, "property list must not be empty");
            return None;
        }
        let tags: Vec<Option<String>> = items
            .iter()
            .enumerate()
            .map(|(i, tag)| self.string(tag, &format!("{path}[{i}]")))
            .collect();
        tags.into_iter().collect()
    }

    fn materials(&mut self, value: &JsonValue, path: &str) -> Option<Vec<Option<Material>>> {
        let items = self.array(value, path)?;
        if items.is_empty() {
            self.report(path, Rule::Cardinality, "at least one material is required");
            return None;
        }
        Some(
            items
                .iter()
                .enumerate()
                .map(|(i, m)| self.material(m, &format!("{path}[{i}]")))
                .collect(),
        )
    }

    fn material(&mut self, value: &JsonValue, path: &str) -> Option<Material> {
        if !self.object(value, path) {
            return None;
        }

        let index_path = join(path, "materialIndex");
        let index = self
            .required(value, "materialIndex", path)
            .and_then(|v| self.integer(v, &index_path));

        let name_path = join(path, "materialName");
        let name = self
            .required(value, "materialName", path)
            .and_then(|v| self.string(v, &name_path));

        let density_path = join(path, "density");
        let density = match self.optional(value, "density") {
            Some(d) => self.bounded(d, &density_path, Bound::Positive).map(Some),
            None => Some(None),
        };

        let material_type = self.discriminator(
            value,
            "materialType",
            path,
            MaterialType::from_name,
            &MaterialType::VARIANTS.map(|v| v.name()),
        );

        let moduli = match material_type? {
            MaterialType::Isotropic => self.isotropic(value, path),
            MaterialType::Orthotropic => self.orthotropic(value, path),
            MaterialType::Anisotropic => Some(Moduli::Anisotropic),
        };

        Some(Material {
            index: index?,
            name: name?,
            moduli: moduli?,
            density: density?,
        })
    }

    fn isotropic(&mut self, value: &JsonValue, path: &str) -> Option<Moduli> {
        let elastic = self.moduli(value, "elasticModuli", path, 1, Bound::Positive);
        let poisson = self.moduli(value, "poissonsRatios", path, 1, Bound::PoissonsRatio);

        if value.has_key("shearModuli") {
            self.report(
                join(path, "shearModuli"),
                Rule::Forbidden,
                "isotropic materials derive their shear modulus and must not declare one",
            );
            return None;
        }

        Some(Moduli::Isotropic {
            elastic_modulus: elastic?[0],
            poissons_ratio: poisson?[0],
        })
    }

    fn orthotropic(&mut self, value: &JsonValue, path: &str) -> Option<Moduli> {
        let elastic = self.moduli(value, "elasticModuli", path, 3, Bound::Positive);
        let shear = self.moduli(value, "shearModuli", path, 3, Bound::Positive);
        let poisson = self.moduli(value, "poissonsRatios", path, 3, Bound::PoissonsRatio);

        Some(Moduli::Orthotropic {
            elastic_moduli: Vector3::from_vec(elastic?),
            shear_moduli: Vector3::from_vec(shear?),
            poissons_ratios: Vector3::from_vec(poisson?),
        })
    }

    fn mesh(&mut self, value: &JsonValue, path: &str) -> Option<Mesh> {
        if !self.object(value, path) {
            return None;
        }

        let element_type_path = join(path, "elementType");
        let element_type = match self.optional(value, "elementType") {
            Some(e) => self.string(e, &element_type_path),
            None => Some(DEFAULT_ELEMENT_TYPE.to_owned()),
        };
        let node_file = self.non_empty_string(value, "nodeFileRelativePath", path);
        let element_file = self.non_empty_string(value, "elementFileRelativePath", path);

        let csys_path = join(path, "csysFileRelativePath");
        let csys_file = match self.optional(value, "csysFileRelativePath") {
            Some(c) => self.string(c, &csys_path).map(Some),
            None => Some(None),
        };

        Some(Mesh {
            element_type: element_type?,
            node_file: node_file?,
            element_file: element_file?,
            csys_file: csys_file?,
        })
    }
}

/// Checks the shape of a case document
///
/// # Arguments
/// * `document` - The parsed document
///
/// # Returns
/// Every section that passed its own shape checks, and every structural or
/// discriminator violation found along the way
pub fn parse_document(document: &JsonValue) -> (Draft, Vec<Violation>) {
    let mut walker = Walker::default();
    let mut draft = Draft::default();

    if !walker.object(document, "$") {
        return (draft, walker.violations);
    }

    for (key, _) in document.entries() {
        if !KNOWN_KEYS.contains(&key) {
            warn!("ignoring unknown top-level key '{key}'");
        }
    }

    draft.case_id = walker
        .required(document, "caseId", "")
        .and_then(|v| walker.integer(v, "caseId"))
        .and_then(|id| {
            if id < 1 {
                walker.report("caseId", Rule::Range, format!("{id} must be a positive integer"));
                return None;
            }
            Some(id as u64)
        });

    draft.description = match walker.optional(document, "caseDescription") {
        Some(d) => walker.string(d, "caseDescription"),
        None => Some(String::new()),
    };

    draft.units = walker
        .required(document, "units", "")
        .and_then(|v| walker.units(v, "units"));

    draft.boundary_conditions = walker
        .required(document, "boundaryConditions", "")
        .and_then(|v| walker.boundary_conditions(v, "boundaryConditions"));

    draft.loading = walker
        .required(document, "loading", "")
        .and_then(|v| walker.loading(v, "loading"));

    draft.materials = walker
        .required(document, "materials", "")
        .and_then(|v| walker.materials(v, "materials"));

    draft.mesh = walker
        .required(document, "mesh", "")
        .and_then(|v| walker.mesh(v, "mesh"));

    draft.runner_options = walker.optional(document, "runnerOptions").and_then(|options| {
        if walker.object(options, "runnerOptions") {
            Some(options.clone())
        } else {
            None
        }
    });

    debug!(
        "schema pass finished with {} violation(s)",
        walker.violations.len()
    );

    (draft, walker.violations)
}

impl Draft {
    /// Builds the typed case once every check has passed. `None` if any section
    /// is missing or malformed.
    pub fn into_case(self) -> Option<Case> {
        let loading = self.loading?;

        let tensors: Option<Vec<StrainTensor>> = loading.tensors.into_iter().collect();
        let expected_properties: Option<Vec<Vec<PropertyRequest>>> = loading
            .expected_properties
            .iter()
            .map(|list| list.iter().map(|tag| tag.parse().ok()).collect())
            .collect();
        let materials: Option<Vec<Material>> = self.materials?.into_iter().collect();

        Some(Case {
            id: self.case_id?,
            description: self.description?,
            units: self.units?,
            boundary_conditions: self.boundary_conditions?,
            loading: Loading {
                kind: loading.kind,
                tensors: tensors?,
                magnitude_multiplier: loading.magnitude_multiplier?,
                labels: loading.labels,
                expected_properties: expected_properties?,
            },
            materials: materials?,
            mesh: self.mesh?,
            runner_options: self.runner_options,
        })
    }
}

/// Reads and parses a case document from disk
///
/// # Arguments
/// * `input_file` - The path to the input file
///
/// # Returns
/// A JsonValue object
pub fn load_document(input_file: &Path) -> Result<JsonValue, RveError> {
    let file_string = match std::fs::read_to_string(input_file) {
        Ok(f) => f,
        Err(err) => {
            return Err(RveError::Input(format!(
                "Unable to open input file {}: {err}",
                input_file.display()
            )))
        }
    };

    match json::parse(&file_string) {
        Ok(document) => Ok(document),
        Err(err) => Err(RveError::Input(format!(
            "Error in input file json {}: {err}",
            input_file.display()
        ))),
    }
}
