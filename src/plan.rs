use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use json::JsonValue;
use tracing::{debug, info};

use crate::{
    assembler::{self, BoundaryConditionSpec, NodalConstraint},
    datatypes::{Case, Units},
    error::{Rule, RveError, ValidationReport, Violation},
    material::{self, ResolvedMaterial},
    request::{self, TagList},
    settings::Settings,
};

/// Mesh references with paths resolved against the case document directory
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPlan {
    pub element_type: String,
    pub node_file: PathBuf,
    pub element_file: PathBuf,
    pub csys_file: Option<PathBuf>,
}

/// Everything the solver needs for one load case
#[derive(Debug, Clone, PartialEq)]
pub struct LoadCasePlan {
    /// Position in `loading.tensors`
    pub index: usize,
    pub label: String,
    pub boundary_conditions: BoundaryConditionSpec,
    /// Shared with the other load cases when the document gave a single list
    pub properties: TagList,
    /// Only present when RVE side lengths were supplied
    pub retained_nodes: Option<Vec<NodalConstraint>>,
}

/// A fully resolved case, ready to hand to the mesh and solver collaborators
#[derive(Debug, Clone, PartialEq)]
pub struct CasePlan {
    pub case_id: u64,
    pub description: String,
    pub source: PathBuf,
    pub units: Units,
    pub materials: BTreeMap<i64, ResolvedMaterial>,
    pub mesh: MeshPlan,
    /// `runnerOptions` merged over the configured runner defaults
    pub runner_options: JsonValue,
    pub load_cases: Vec<LoadCasePlan>,
}

fn base_dir(source: &Path) -> &Path {
    source.parent().unwrap_or(Path::new(""))
}

/// Merges document runner options over the configured defaults. Only
/// `run_location` is interpreted; it is resolved against the document
/// directory. Every other key passes through untouched.
fn runner_options(case: &Case, settings: &Settings, base: &Path) -> JsonValue {
    let mut options = settings.runner.to_json();

    if let Some(overrides) = &case.runner_options {
        for (key, value) in overrides.entries() {
            options[key] = value.clone();
        }
    }

    if let Some(run_location) = options["run_location"].as_str() {
        let resolved = base.join(run_location).display().to_string();
        options["run_location"] = resolved.into();
    }

    options
}

/// Resolves a validated case into its execution plan
///
/// # Arguments
/// * `case` - A validated case
/// * `source` - Path of the document the case was read from
/// * `settings` - Runner defaults, and whether mesh files must exist
/// * `rve_lengths` - RVE side lengths; when given, every load case also
///   carries its retained-node constraints
///
/// # Returns
/// The case plan, or the violations that prevent resolving it
pub fn build(
    case: &Case,
    source: &Path,
    settings: &Settings,
    rve_lengths: Option<[f64; 3]>,
) -> Result<CasePlan, ValidationReport> {
    let base = base_dir(source);
    let mut violations: Vec<Violation> = Vec::new();

    let mut materials: BTreeMap<i64, ResolvedMaterial> = BTreeMap::new();
    for (i, m) in case.materials.iter().enumerate() {
        match material::resolve(m) {
            Ok(resolved) => {
                materials.insert(resolved.index, resolved);
            }
            Err(err) => violations.push(Violation::new(
                format!("materials[{i}].materialType"),
                Rule::Unresolved,
                err.to_string(),
            )),
        }
    }

    let load_case_count = case.loading.load_case_count();
    let tag_lists = match request::resolve(&case.loading.expected_properties, load_case_count) {
        Ok(tag_lists) => tag_lists,
        Err(mut errs) => {
            violations.append(&mut errs);
            Vec::new()
        }
    };

    let mesh = MeshPlan {
        element_type: case.mesh.element_type.clone(),
        node_file: base.join(&case.mesh.node_file),
        element_file: base.join(&case.mesh.element_file),
        csys_file: case.mesh.csys_file.as_ref().map(|csys| base.join(csys)),
    };

    if settings.check_mesh {
        violations.extend(mesh.missing_files());
    }

    if !violations.is_empty() {
        return Err(ValidationReport::new(violations));
    }

    let load_cases: Vec<LoadCasePlan> = case
        .loading
        .tensors
        .iter()
        .zip(case.loading.labels())
        .zip(tag_lists)
        .enumerate()
        .map(|(index, ((tensor, label), properties))| {
            let boundary_conditions = assembler::assemble(
                tensor,
                case.loading.magnitude_multiplier,
                case.boundary_conditions,
            );
            debug!(
                "case {} load case {index} '{label}': {} prescribed, {} properties",
                case.id,
                boundary_conditions.prescribed_count(),
                properties.len()
            );
            let retained_nodes =
                rve_lengths.map(|lengths| boundary_conditions.retained_node_constraints(lengths));

            LoadCasePlan {
                index,
                label,
                boundary_conditions,
                properties,
                retained_nodes,
            }
        })
        .collect();

    info!(
        "case {}: {} load case(s), {} material(s)",
        case.id,
        load_cases.len(),
        materials.len()
    );

    Ok(CasePlan {
        case_id: case.id,
        description: case.description.clone(),
        source: source.to_path_buf(),
        units: case.units.clone(),
        materials,
        mesh,
        runner_options: runner_options(case, settings, base),
        load_cases,
    })
}

impl MeshPlan {
    /// One violation per resolved mesh path that does not exist. The files
    /// themselves are not opened.
    pub fn missing_files(&self) -> Vec<Violation> {
        let mut files: Vec<(&str, &Path)> = vec![
            ("node", self.node_file.as_path()),
            ("element", self.element_file.as_path()),
        ];
        if let Some(csys) = &self.csys_file {
            files.push(("csys", csys.as_path()));
        }

        files
            .into_iter()
            .filter(|(_, path)| !path.exists())
            .map(|(kind, path)| {
                Violation::new(
                    format!("mesh.{kind}FileRelativePath"),
                    Rule::MissingMeshFile,
                    format!("{} could not be found", path.display()),
                )
            })
            .collect()
    }
}

impl LoadCasePlan {
    pub fn to_json(&self) -> JsonValue {
        let mut load_case = JsonValue::new_object();
        load_case["index"] = self.index.into();
        load_case["label"] = self.label.as_str().into();
        load_case["boundaryConditions"] = self.boundary_conditions.to_json();
        load_case["expectedProperties"] =
            JsonValue::Array(self.properties.iter().map(|t| t.to_string().into()).collect());
        if let Some(constraints) = &self.retained_nodes {
            load_case["retainedNodes"] =
                JsonValue::Array(constraints.iter().map(|c| c.to_json()).collect());
        }
        load_case
    }
}

impl CasePlan {
    pub fn to_json(&self) -> JsonValue {
        let mut units = JsonValue::new_object();
        units["length"] = self.units.length.as_str().into();
        units["force"] = self.units.force.as_str().into();
        units["pressure"] = self.units.pressure.as_str().into();

        let mut mesh = JsonValue::new_object();
        mesh["elementType"] = self.mesh.element_type.as_str().into();
        mesh["nodeFile"] = self.mesh.node_file.display().to_string().into();
        mesh["elementFile"] = self.mesh.element_file.display().to_string().into();
        if let Some(csys) = &self.mesh.csys_file {
            mesh["csysFile"] = csys.display().to_string().into();
        }

        let mut plan = JsonValue::new_object();
        plan["caseId"] = self.case_id.into();
        plan["caseDescription"] = self.description.as_str().into();
        plan["source"] = self.source.display().to_string().into();
        plan["units"] = units;
        plan["materials"] = JsonValue::Array(self.materials.values().map(|m| m.to_json()).collect());
        plan["mesh"] = mesh;
        plan["runnerOptions"] = self.runner_options.clone();
        plan["loadCases"] = JsonValue::Array(self.load_cases.iter().map(|l| l.to_json()).collect());
        plan
    }

    /// Output file name, `<document stem>_<caseId>.plan.json`
    pub fn file_name(&self) -> String {
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "case".to_owned());
        format!("{stem}_{}.plan.json", self.case_id)
    }

    /// Writes the plan as pretty-printed JSON into `dir`
    ///
    /// # Arguments
    /// * `dir` - Output directory, created if missing
    ///
    /// # Returns
    /// The path of the written file
    pub fn write(&self, dir: &Path) -> Result<PathBuf, RveError> {
        if let Err(err) = std::fs::create_dir_all(dir) {
            return Err(RveError::Output(format!(
                "Failed to create output directory {}: {err}",
                dir.display()
            )));
        }

        let output = dir.join(self.file_name());
        if let Err(err) = std::fs::write(&output, self.to_json().pretty(2)) {
            return Err(RveError::Output(format!(
                "Failed to write {}: {err}",
                output.display()
            )));
        }

        info!("wrote plan to {}", output.display());
        Ok(output)
    }
}
