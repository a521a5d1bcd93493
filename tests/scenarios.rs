use std::path::Path;
use std::sync::Arc;

use json::JsonValue;
use rvecase::{
    assembler::{self, Component},
    datatypes::BoundaryConditions,
    error::Rule,
    plan,
    property::ALL_PROPERTIES,
    Settings, ViolationKind,
};

const FIBER_RVE: &str = include_str!("../cases/fiber_rve.json");

fn fiber_rve() -> JsonValue {
    json::parse(FIBER_RVE).unwrap()
}

fn unit_tensors(n: usize) -> JsonValue {
    let mut tensors = JsonValue::new_array();
    for k in 0..n {
        let mut tensor = json::parse("[[0, 0, 0], [0, 0, 0], [0, 0, 0]]").unwrap();
        tensor[k / 3][k % 3] = 1.into();
        tensors.push(tensor).unwrap();
    }
    tensors
}

#[test]
fn fixture_document_is_valid() {
    let case = rvecase::validate(&fiber_rve(), &Settings::default()).unwrap();

    assert_eq!(case.id, 1);
    assert_eq!(case.boundary_conditions, BoundaryConditions::Okereke);
    assert_eq!(case.loading.load_case_count(), 6);
    assert_eq!(case.materials.len(), 2);
    assert_eq!(case.loading.labels()[3], "g12");
}

#[test]
fn six_tensors_without_labels_get_positional_labels() {
    let mut document = fiber_rve();
    document["loading"].remove("labels");

    let case = rvecase::validate(&document, &Settings::default()).unwrap();
    let expected: Vec<String> = (0..6).map(|i| format!("load case {i}")).collect();
    assert_eq!(case.loading.labels(), expected);

    let plan = plan::build(&case, Path::new("rve.json"), &Settings::default(), None).unwrap();
    let labels: Vec<&str> = plan.load_cases.iter().map(|l| l.label.as_str()).collect();
    assert_eq!(labels, expected);
}

#[test]
fn wildcard_broadcast_resolves_both_load_cases_to_the_full_set() {
    let mut document = fiber_rve();
    document["loading"]["tensors"] = json::parse(
        "[[[1, 0, 0], [0, 1, 0], [0, 0, 1]], [[2, 0, 0], [0, 2, 0], [0, 0, 2]]]",
    )
    .unwrap();
    document["loading"].remove("labels");
    document["loading"]["expectedProperties"] = json::parse(r#"[["all"]]"#).unwrap();

    let case = rvecase::validate(&document, &Settings::default()).unwrap();
    let plan = plan::build(&case, Path::new("rve.json"), &Settings::default(), None).unwrap();

    assert_eq!(plan.load_cases.len(), 2);
    for load_case in &plan.load_cases {
        assert_eq!(&*load_case.properties, ALL_PROPERTIES.as_slice());
    }
    assert!(Arc::ptr_eq(
        &plan.load_cases[0].properties,
        &plan.load_cases[1].properties
    ));
}

#[test]
fn isotropic_shear_modulus_is_derived() {
    let mut document = fiber_rve();
    document["materials"][0]["elasticModuli"] = json::parse("[1.31e6]").unwrap();
    document["materials"][0]["poissonsRatios"] = json::parse("[0.43]").unwrap();

    let case = rvecase::validate(&document, &Settings::default()).unwrap();
    let plan = plan::build(&case, Path::new("rve.json"), &Settings::default(), None).unwrap();

    for g in plan.materials[&1].shear_moduli.iter() {
        assert!((g - 458_041.96).abs() < 0.01, "{g}");
    }
}

#[test]
fn free_components_stay_free_after_scaling() {
    let case = rvecase::validate(&fiber_rve(), &Settings::default()).unwrap();
    let spec = assembler::assemble(
        &case.loading.tensors[0],
        case.loading.magnitude_multiplier,
        case.boundary_conditions,
    );

    for i in 0..3 {
        for j in 0..3 {
            let expected = match (i, j) {
                (0, 0) => Component::Prescribed(0.001),
                (1, 1) | (2, 2) => Component::Free,
                _ => Component::Prescribed(0.0),
            };
            assert_eq!(spec.component(i, j), expected, "({i},{j})");
        }
    }
}

#[test]
fn label_count_mismatch_fails_without_partial_output() {
    let mut document = fiber_rve();
    document["loading"]["labels"] = json::parse(r#"["first", "second"]"#).unwrap();

    let report = rvecase::validate(&document, &Settings::default()).unwrap_err();
    assert!(report.has(ViolationKind::Consistency));
    assert!(report.has_rule(Rule::LengthParity));
    assert_eq!(report.violations()[0].path, "loading.labels");
}

#[test]
fn duplicate_material_index_fails_even_when_materials_are_valid() {
    let mut document = fiber_rve();
    document["materials"][1]["materialIndex"] = 1.into();

    let report = rvecase::validate(&document, &Settings::default()).unwrap_err();
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].rule, Rule::DuplicateIndex);
    assert_eq!(report.violations()[0].kind(), ViolationKind::Consistency);
}

#[test]
fn every_violation_is_reported_in_one_pass() {
    let mut document = fiber_rve();
    document.remove("units");
    document["loading"]["tensors"][2][0][1] = "0".into();
    document["materials"][1]["poissonsRatios"] = json::parse("[0.2, 0.7, 0.2]").unwrap();
    document["materials"][0]["materialType"] = "plastic".into();
    document["loading"]["expectedProperties"][3] = json::parse(r#"["G21", "G11"]"#).unwrap();

    let report = rvecase::validate(&document, &Settings::default()).unwrap_err();
    let paths: Vec<&str> = report.violations().iter().map(|v| v.path.as_str()).collect();

    assert!(paths.contains(&"units"));
    assert!(paths.contains(&"loading.tensors[2][0][1]"));
    assert!(paths.contains(&"materials[1].poissonsRatios[1]"));
    assert!(paths.contains(&"materials[0].materialType"));
    assert!(paths.contains(&"loading.expectedProperties[3][1]"));
    assert!(report.has(ViolationKind::Structural));
    assert!(report.has(ViolationKind::Discriminator));
    assert!(report.has(ViolationKind::Consistency));
}

#[test]
fn anisotropic_materials_fail_closed() {
    let mut document = fiber_rve();
    document["materials"][1]["materialType"] = "anisotropic".into();

    let report = rvecase::validate(&document, &Settings::default()).unwrap_err();
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].kind(), ViolationKind::UnresolvedMaterial);
}

#[test]
fn requesting_a_property_of_a_free_direction_is_inconsistent() {
    let mut document = fiber_rve();
    document["loading"]["expectedProperties"][0] = json::parse(r#"["E11", "E22"]"#).unwrap();

    let report = rvecase::validate(&document, &Settings::default()).unwrap_err();
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].path, "loading.tensors[0][1][1]");
    assert_eq!(
        report.violations()[0].kind(),
        ViolationKind::InconsistentRequest
    );
}

#[test]
fn per_case_lists_must_match_tensor_count() {
    let mut document = fiber_rve();
    document["loading"]["tensors"] = unit_tensors(7);
    document["loading"].remove("labels");

    let report = rvecase::validate(&document, &Settings::default()).unwrap_err();
    assert!(report
        .violations()
        .iter()
        .any(|v| v.path == "loading.expectedProperties" && v.rule == Rule::LengthParity));
}

#[test]
fn magnitude_multiplier_defaults_to_one() {
    let mut document = fiber_rve();
    document["loading"].remove("magnitudeMultiplier");

    let case = rvecase::validate(&document, &Settings::default()).unwrap();
    let spec = assembler::assemble(
        &case.loading.tensors[1],
        case.loading.magnitude_multiplier,
        case.boundary_conditions,
    );
    assert_eq!(spec.component(1, 1), Component::Prescribed(1.0));
}

#[test]
fn poisson_of_minus_one_never_reaches_the_plan() {
    let mut document = fiber_rve();
    document["materials"][0]["poissonsRatios"] = json::parse("[-1.0]").unwrap();

    let report = rvecase::validate(&document, &Settings::default()).unwrap_err();
    assert_eq!(report.len(), 1);
    assert_eq!(report.violations()[0].rule, Rule::HookesLaw);
    assert_eq!(report.violations()[0].path, "materials[0].poissonsRatios[0]");
}
