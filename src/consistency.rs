use std::collections::HashMap;

use tracing::debug;

use crate::{
    assembler,
    datatypes::{Material, Moduli},
    error::{Rule, Violation},
    material,
    property::{PropertyRequest, TagError},
    request,
    schema::{Draft, LoadingDraft, POISSON_MIN},
    settings::Settings,
};

/// Runs every cross-field rule over whatever survived the schema pass
///
/// Sections that failed their own shape checks are skipped; the rules that
/// can still run do, so one pass reports as much as possible.
///
/// # Arguments
/// * `draft` - Output of [`crate::schema::parse_document`]
/// * `settings` - Supplies the Hooke's law tolerance
///
/// # Returns
/// Consistency, unresolved-material and inconsistent-request violations
pub fn check(draft: &Draft, settings: &Settings) -> Vec<Violation> {
    let mut violations: Vec<Violation> = Vec::new();

    if let Some(loading) = &draft.loading {
        violations.extend(check_loading(loading));
    }
    if let Some(materials) = &draft.materials {
        violations.extend(check_materials(materials, settings.hooke_tolerance));
    }

    debug!("consistency pass finished with {} violation(s)", violations.len());
    violations
}

fn check_loading(loading: &LoadingDraft) -> Vec<Violation> {
    let mut violations: Vec<Violation> = Vec::new();
    let load_cases = loading.tensors.len();

    if let Some(labels) = &loading.labels {
        if labels.len() != load_cases {
            violations.push(Violation::new(
                "loading.labels",
                Rule::LengthParity,
                format!(
                    "{} labels given for {} tensors",
                    labels.len(),
                    load_cases
                ),
            ));
        }
    }

    let lists = loading.expected_properties.len();
    let parity = lists == 1 || lists == load_cases;
    if !parity {
        violations.push(Violation::new(
            "loading.expectedProperties",
            Rule::LengthParity,
            format!(
                "{lists} property lists given for {load_cases} load cases; expected 1 or {load_cases}"
            ),
        ));
    }

    violations.extend(check_tensors(loading));

    let (requests, mut tag_violations) = parse_requests(&loading.expected_properties);
    let tags_parsed = tag_violations.is_empty();
    violations.append(&mut tag_violations);

    if !(parity && tags_parsed) {
        return violations;
    }

    match request::resolve(&requests, load_cases) {
        Ok(tag_lists) => {
            for (k, (tensor, tags)) in loading.tensors.iter().zip(&tag_lists).enumerate() {
                if let Some(tensor) = tensor {
                    violations.extend(assembler::check_requests(k, tensor, tags));
                }
            }
        }
        Err(mut errs) => violations.append(&mut errs),
    }

    violations
}

fn check_tensors(loading: &LoadingDraft) -> Vec<Violation> {
    let mut violations: Vec<Violation> = Vec::new();

    for (k, tensor) in loading.tensors.iter().enumerate() {
        let Some(tensor) = tensor else {
            continue;
        };

        if tensor.is_degenerate() {
            violations.push(Violation::new(
                format!("loading.tensors[{k}]"),
                Rule::DegenerateTensor,
                "every component is free; at least one must be prescribed",
            ));
        }

        let earlier = loading.tensors[..k]
            .iter()
            .position(|other| other.as_ref() == Some(tensor));
        if let Some(first) = earlier {
            violations.push(Violation::new(
                format!("loading.tensors[{k}]"),
                Rule::DuplicateTensor,
                format!("identical to loading.tensors[{first}]"),
            ));
        }
    }

    violations
}

fn parse_requests(lists: &[Vec<String>]) -> (Vec<Vec<PropertyRequest>>, Vec<Violation>) {
    let mut violations: Vec<Violation> = Vec::new();
    let mut parsed: Vec<Vec<PropertyRequest>> = Vec::with_capacity(lists.len());

    for (i, list) in lists.iter().enumerate() {
        let mut requests: Vec<PropertyRequest> = Vec::with_capacity(list.len());
        for (k, raw) in list.iter().enumerate() {
            let path = format!("loading.expectedProperties[{i}][{k}]");
            match raw.parse::<PropertyRequest>() {
                Ok(r) => requests.push(r),
                Err(TagError::Pattern) => violations.push(Violation::new(
                    path,
                    Rule::Pattern,
                    format!("'{raw}' is not a property tag (E, G or v followed by two of 1-3, or 'all')"),
                )),
                Err(TagError::Impossible) => violations.push(Violation::new(
                    path,
                    Rule::ImpossibleProperty,
                    format!("'{raw}' names no elastic constant"),
                )),
            }
        }
        parsed.push(requests);
    }

    (parsed, violations)
}

fn check_materials(materials: &[Option<Material>], hooke_tolerance: f64) -> Vec<Violation> {
    let mut violations: Vec<Violation> = Vec::new();
    let mut first_seen: HashMap<i64, usize> = HashMap::new();

    for (i, material) in materials.iter().enumerate() {
        let Some(material) = material else {
            continue;
        };
        let path = format!("materials[{i}]");

        if material.index < 1 {
            violations.push(Violation::new(
                format!("{path}.materialIndex"),
                Rule::Range,
                format!("{} must be at least 1", material.index),
            ));
        } else if let Some(first) = first_seen.get(&material.index) {
            violations.push(Violation::new(
                format!("{path}.materialIndex"),
                Rule::DuplicateIndex,
                format!(
                    "materialIndex {} is already used by materials[{first}]",
                    material.index
                ),
            ));
        } else {
            first_seen.insert(material.index, i);
        }

        if let Moduli::Isotropic { poissons_ratio, .. } = material.moduli {
            if poissons_ratio <= POISSON_MIN {
                violations.push(Violation::new(
                    format!("{path}.poissonsRatios[0]"),
                    Rule::HookesLaw,
                    format!("v = {poissons_ratio} leaves G = E/(2(1+v)) unbounded"),
                ));
            }
        }

        if let Some(deviation) = material::hookes_law_deviation(material) {
            // NaN when 1 + v = 0
            if deviation.is_nan() || deviation > hooke_tolerance {
                let message = if deviation.is_finite() {
                    format!(
                        "constant moduli describe an isotropic solid, but G deviates from E/(2(1+v)) by {:.3}%",
                        deviation * 100.0
                    )
                } else {
                    "constant moduli describe an isotropic solid, but v = -1 leaves E/(2(1+v)) undefined"
                        .to_owned()
                };
                violations.push(Violation::new(
                    format!("{path}.shearModuli"),
                    Rule::HookesLaw,
                    message,
                ));
            }
        }

        if let Err(err) = material::resolve(material) {
            violations.push(Violation::new(
                format!("{path}.materialType"),
                Rule::Unresolved,
                err.to_string(),
            ));
        }
    }

    violations
}
