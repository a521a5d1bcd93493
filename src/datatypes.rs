use json::JsonValue;
use nalgebra::{Matrix3, Vector3};

use crate::property::PropertyRequest;

pub const DEFAULT_ELEMENT_TYPE: &str = "SOLID185";
pub const DEFAULT_MAGNITUDE_MULTIPLIER: f64 = 1.0;

/// Documentation-only unit labels. They have no numeric effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Units {
    pub length: String,
    pub force: String,
    pub pressure: String,
}

/// Strategy used to turn a strain tensor into RVE boundary constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryConditions {
    Okereke,
}

impl BoundaryConditions {
    pub const VARIANTS: [BoundaryConditions; 1] = [BoundaryConditions::Okereke];

    pub fn name(&self) -> &'static str {
        match self {
            BoundaryConditions::Okereke => "Okereke",
        }
    }

    pub fn from_name(name: &str) -> Option<BoundaryConditions> {
        Self::VARIANTS.into_iter().find(|v| v.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingKind {
    Tensor,
}

impl LoadingKind {
    pub const VARIANTS: [LoadingKind; 1] = [LoadingKind::Tensor];

    pub fn name(&self) -> &'static str {
        match self {
            LoadingKind::Tensor => "tensor",
        }
    }

    pub fn from_name(name: &str) -> Option<LoadingKind> {
        Self::VARIANTS.into_iter().find(|v| v.name() == name)
    }
}

/// A 3x3 strain specification. `None` marks a free (unconstrained) component,
/// which is never the same thing as a prescribed zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrainTensor(pub Matrix3<Option<f64>>);

impl StrainTensor {
    pub fn from_rows(rows: [[Option<f64>; 3]; 3]) -> StrainTensor {
        StrainTensor(Matrix3::from_fn(|i, j| rows[i][j]))
    }

    /// Zero-based cell access
    pub fn cell(&self, i: usize, j: usize) -> Option<f64> {
        self.0[(i, j)]
    }

    pub fn prescribed_count(&self) -> usize {
        self.0.iter().filter(|c| c.is_some()).count()
    }

    /// A tensor with no prescribed component at all
    pub fn is_degenerate(&self) -> bool {
        self.prescribed_count() == 0
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Array(
            (0..3)
                .map(|i| JsonValue::Array((0..3).map(|j| cell_to_json(self.cell(i, j))).collect()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loading {
    pub kind: LoadingKind,
    pub tensors: Vec<StrainTensor>,
    pub magnitude_multiplier: f64,
    /// As given in the document; see [`Loading::labels`] for the defaulted form
    pub labels: Option<Vec<String>>,
    pub expected_properties: Vec<Vec<PropertyRequest>>,
}

impl Loading {
    pub fn load_case_count(&self) -> usize {
        self.tensors.len()
    }

    /// One label per load case, positional defaults when none were given
    pub fn labels(&self) -> Vec<String> {
        match &self.labels {
            Some(labels) => labels.clone(),
            None => (0..self.tensors.len()).map(default_label).collect(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let mut loading = JsonValue::new_object();
        loading["kind"] = self.kind.name().into();
        loading["tensors"] = JsonValue::Array(self.tensors.iter().map(|t| t.to_json()).collect());
        loading["magnitudeMultiplier"] = self.magnitude_multiplier.into();
        if let Some(labels) = &self.labels {
            loading["labels"] = JsonValue::Array(labels.iter().map(|l| l.as_str().into()).collect());
        }
        loading["expectedProperties"] = JsonValue::Array(
            self.expected_properties
                .iter()
                .map(|list| JsonValue::Array(list.iter().map(|r| r.to_string().into()).collect()))
                .collect(),
        );
        loading
    }
}

fn cell_to_json(cell: Option<f64>) -> JsonValue {
    match cell {
        Some(value) => value.into(),
        None => JsonValue::Null,
    }
}

pub(crate) fn triplet_to_json(values: &Vector3<f64>) -> JsonValue {
    JsonValue::Array(values.iter().map(|v| (*v).into()).collect())
}

pub fn default_label(load_case: usize) -> String {
    format!("load case {}", load_case)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialType {
    Isotropic,
    Orthotropic,
    /// Accepted by the taxonomy, but no resolution rule exists yet
    Anisotropic,
}

impl MaterialType {
    pub const VARIANTS: [MaterialType; 3] = [
        MaterialType::Isotropic,
        MaterialType::Orthotropic,
        MaterialType::Anisotropic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MaterialType::Isotropic => "isotropic",
            MaterialType::Orthotropic => "orthotropic",
            MaterialType::Anisotropic => "anisotropic",
        }
    }

    pub fn from_name(name: &str) -> Option<MaterialType> {
        Self::VARIANTS.into_iter().find(|v| v.name() == name)
    }
}

/// Elastic constants in the shape declared by `materialType`
#[derive(Debug, Clone, PartialEq)]
pub enum Moduli {
    Isotropic {
        elastic_modulus: f64,
        poissons_ratio: f64,
    },
    /// Directions 1,2,3 for the elastic moduli; planes 1-2, 2-3, 3-1 for the
    /// shear moduli and Poisson's ratios.
    Orthotropic {
        elastic_moduli: Vector3<f64>,
        shear_moduli: Vector3<f64>,
        poissons_ratios: Vector3<f64>,
    },
    Anisotropic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub index: i64,
    pub name: String,
    pub moduli: Moduli,
    pub density: Option<f64>,
}

impl Material {
    pub fn material_type(&self) -> MaterialType {
        match self.moduli {
            Moduli::Isotropic { .. } => MaterialType::Isotropic,
            Moduli::Orthotropic { .. } => MaterialType::Orthotropic,
            Moduli::Anisotropic => MaterialType::Anisotropic,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let mut material = JsonValue::new_object();
        material["materialIndex"] = self.index.into();
        material["materialName"] = self.name.as_str().into();
        material["materialType"] = self.material_type().name().into();
        match &self.moduli {
            Moduli::Isotropic {
                elastic_modulus,
                poissons_ratio,
            } => {
                material["elasticModuli"] = JsonValue::Array(vec![(*elastic_modulus).into()]);
                material["poissonsRatios"] = JsonValue::Array(vec![(*poissons_ratio).into()]);
            }
            Moduli::Orthotropic {
                elastic_moduli,
                shear_moduli,
                poissons_ratios,
            } => {
                material["elasticModuli"] = triplet_to_json(elastic_moduli);
                material["shearModuli"] = triplet_to_json(shear_moduli);
                material["poissonsRatios"] = triplet_to_json(poissons_ratios);
            }
            Moduli::Anisotropic => {}
        }
        if let Some(density) = self.density {
            material["density"] = density.into();
        }
        material
    }
}

/// References to the externally produced mesh files. Paths are kept exactly as
/// written; they are never opened here.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub element_type: String,
    pub node_file: String,
    pub element_file: String,
    pub csys_file: Option<String>,
}

impl Mesh {
    pub fn to_json(&self) -> JsonValue {
        let mut mesh = JsonValue::new_object();
        mesh["elementType"] = self.element_type.as_str().into();
        mesh["nodeFileRelativePath"] = self.node_file.as_str().into();
        mesh["elementFileRelativePath"] = self.element_file.as_str().into();
        if let Some(csys) = &self.csys_file {
            mesh["csysFileRelativePath"] = csys.as_str().into();
        }
        mesh
    }
}

/// A validated test case. Built once from a document and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub id: u64,
    pub description: String,
    pub units: Units,
    pub boundary_conditions: BoundaryConditions,
    pub loading: Loading,
    pub materials: Vec<Material>,
    pub mesh: Mesh,
    /// Opaque key/value configuration for the job runner
    pub runner_options: Option<JsonValue>,
}

impl Case {
    /// Renders the case back into document form, with schema defaults filled in
    pub fn to_json(&self) -> JsonValue {
        let mut units = JsonValue::new_object();
        units["length"] = self.units.length.as_str().into();
        units["force"] = self.units.force.as_str().into();
        units["pressure"] = self.units.pressure.as_str().into();

        let mut boundary_conditions = JsonValue::new_object();
        boundary_conditions["kind"] = self.boundary_conditions.name().into();

        let mut case = JsonValue::new_object();
        case["caseId"] = self.id.into();
        case["caseDescription"] = self.description.as_str().into();
        case["units"] = units;
        case["boundaryConditions"] = boundary_conditions;
        case["loading"] = self.loading.to_json();
        case["materials"] = JsonValue::Array(self.materials.iter().map(|m| m.to_json()).collect());
        case["mesh"] = self.mesh.to_json();
        if let Some(options) = &self.runner_options {
            case["runnerOptions"] = options.clone();
        }
        case
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_is_not_prescribed_zero() {
        let tensor = StrainTensor::from_rows([
            [Some(1.0), Some(0.0), Some(0.0)],
            [Some(0.0), None, Some(0.0)],
            [Some(0.0), Some(0.0), None],
        ]);

        assert_eq!(tensor.cell(0, 1), Some(0.0));
        assert_eq!(tensor.cell(1, 1), None);
        assert_eq!(tensor.prescribed_count(), 7);
        assert!(!tensor.is_degenerate());
        assert!(StrainTensor::from_rows([[None; 3]; 3]).is_degenerate());
    }

    #[test]
    fn tensor_serializes_row_major_with_nulls() {
        let tensor = StrainTensor::from_rows([
            [Some(1.0), Some(0.0), Some(0.0)],
            [Some(2.0), None, Some(0.0)],
            [Some(0.0), Some(0.0), None],
        ]);

        assert_eq!(tensor.to_json().dump(), "[[1,0,0],[2,null,0],[0,0,null]]");
    }

    #[test]
    fn default_labels_are_positional() {
        let loading = Loading {
            kind: LoadingKind::Tensor,
            tensors: vec![StrainTensor::from_rows([[Some(1.0); 3]; 3]); 3],
            magnitude_multiplier: DEFAULT_MAGNITUDE_MULTIPLIER,
            labels: None,
            expected_properties: vec![vec![PropertyRequest::All]],
        };

        assert_eq!(loading.labels(), ["load case 0", "load case 1", "load case 2"]);
        assert!(!loading.to_json().has_key("labels"));
    }

    #[test]
    fn discriminator_names_round_trip() {
        for kind in MaterialType::VARIANTS {
            assert_eq!(MaterialType::from_name(kind.name()), Some(kind));
        }
        assert_eq!(BoundaryConditions::from_name("Okereke"), Some(BoundaryConditions::Okereke));
        assert_eq!(BoundaryConditions::from_name("okereke"), None);
        assert_eq!(LoadingKind::from_name("displacement"), None);
    }
}
