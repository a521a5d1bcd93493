use std::fmt::Display;

use json::JsonValue;
use nalgebra::Matrix3;

use crate::{
    datatypes::{BoundaryConditions, StrainTensor},
    error::{Rule, Violation},
    property::PropertyTag,
};

/// Displacement degrees of freedom per node
pub const DOF: usize = 3;
/// Corner nodes N0..N3 through which the Okereke strategy imposes strain
pub const RETAINED_NODES: usize = 4;

/// Constraint state of one strain component
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Component {
    /// Applied value, already scaled by the magnitude multiplier
    Prescribed(f64),
    Free,
}

impl Component {
    pub fn value(&self) -> Option<f64> {
        match self {
            Component::Prescribed(v) => Some(*v),
            Component::Free => None,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Component::Free)
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Component::Prescribed(v) => write!(f, "{}", v),
            Component::Free => write!(f, "free"),
        }
    }
}

/// Abstract boundary condition of one load case: every tensor position mapped
/// to prescribed or free, keyed by the strategy that will realize it
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryConditionSpec {
    pub strategy: BoundaryConditions,
    pub components: Matrix3<Component>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dof {
    Ux,
    Uy,
    Uz,
}

impl Dof {
    pub const AXES: [Dof; DOF] = [Dof::Ux, Dof::Uy, Dof::Uz];

    pub fn name(&self) -> &'static str {
        match self {
            Dof::Ux => "UX",
            Dof::Uy => "UY",
            Dof::Uz => "UZ",
        }
    }
}

/// A displacement imposed on one retained corner node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodalConstraint {
    /// Retained node number, 0..RETAINED_NODES
    pub node: usize,
    pub dof: Dof,
    pub displacement: f64,
}

impl NodalConstraint {
    pub fn to_json(&self) -> JsonValue {
        let mut constraint = JsonValue::new_object();
        constraint["node"] = format!("N{}", self.node).into();
        constraint["dof"] = self.dof.name().into();
        constraint["displacement"] = self.displacement.into();
        constraint
    }
}

/// Builds the boundary-condition specification of one load case
///
/// Each of the nine positions is handled on its own. The tensor is taken
/// literally: off-diagonal pairs are not mirrored.
///
/// # Arguments
/// * `tensor` - The strain tensor of the load case
/// * `magnitude_multiplier` - Case-wide scale applied to prescribed values
/// * `strategy` - The active boundary-condition strategy
///
/// # Returns
/// The per-component prescribed/free map
pub fn assemble(
    tensor: &StrainTensor,
    magnitude_multiplier: f64,
    strategy: BoundaryConditions,
) -> BoundaryConditionSpec {
    match strategy {
        BoundaryConditions::Okereke => BoundaryConditionSpec {
            strategy,
            components: component_map(tensor, magnitude_multiplier),
        },
    }
}

fn component_map(tensor: &StrainTensor, magnitude_multiplier: f64) -> Matrix3<Component> {
    Matrix3::from_fn(|i, j| match tensor.cell(i, j) {
        Some(strain) => Component::Prescribed(strain * magnitude_multiplier),
        None => Component::Free,
    })
}

/// Reports every requested property that depends on a diagonal strain the
/// load case leaves free
///
/// # Arguments
/// * `load_case` - Position of the tensor in `loading.tensors`
/// * `tensor` - The strain tensor of that load case
/// * `tags` - The resolved property tags of that load case
pub fn check_requests(load_case: usize, tensor: &StrainTensor, tags: &[PropertyTag]) -> Vec<Violation> {
    let mut violations: Vec<Violation> = Vec::new();

    for tag in tags {
        let Some(d) = tag.required_diagonal() else {
            continue;
        };
        if tensor.cell(d, d).is_none() {
            violations.push(Violation::new(
                format!("loading.tensors[{load_case}][{d}][{d}]"),
                Rule::FreeComponentRequested,
                format!(
                    "{tag} is requested for load case {load_case} but strain component ({n},{n}) is free",
                    n = d + 1
                ),
            ));
        }
    }

    violations
}

impl BoundaryConditionSpec {
    /// Zero-based component access
    pub fn component(&self, i: usize, j: usize) -> Component {
        self.components[(i, j)]
    }

    /// Splits the positions into prescribed `(i, j, value)` and free `(i, j)`,
    /// both in row-major order
    pub fn partition(&self) -> (Vec<(usize, usize, f64)>, Vec<(usize, usize)>) {
        let mut prescribed: Vec<(usize, usize, f64)> = Vec::new();
        let mut free: Vec<(usize, usize)> = Vec::new();

        for i in 0..DOF {
            for j in 0..DOF {
                match self.component(i, j) {
                    Component::Prescribed(value) => prescribed.push((i, j, value)),
                    Component::Free => free.push((i, j)),
                }
            }
        }

        (prescribed, free)
    }

    pub fn prescribed_count(&self) -> usize {
        self.components.iter().filter(|c| !c.is_free()).count()
    }

    /// Translates the component map into displacements on the retained corner
    /// nodes of an RVE with the given side lengths
    ///
    /// N0 is pinned in every DOF. Row `i` of the map drives node N(i+1): a
    /// prescribed component (i, j) becomes a displacement along axis `j` of
    /// `value * lengths[i]`. Free components impose nothing.
    ///
    /// # Arguments
    /// * `lengths` - RVE side lengths along axes 1, 2 and 3
    pub fn retained_node_constraints(&self, lengths: [f64; 3]) -> Vec<NodalConstraint> {
        match self.strategy {
            BoundaryConditions::Okereke => {
                let mut constraints: Vec<NodalConstraint> = Dof::AXES
                    .iter()
                    .map(|dof| NodalConstraint {
                        node: 0,
                        dof: *dof,
                        displacement: 0.0,
                    })
                    .collect();

                let (prescribed, _) = self.partition();
                for (i, j, strain) in prescribed {
                    constraints.push(NodalConstraint {
                        node: i + 1,
                        dof: Dof::AXES[j],
                        displacement: strain * lengths[i],
                    });
                }

                constraints
            }
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let mut spec = JsonValue::new_object();
        spec["strategy"] = self.strategy.name().into();
        spec["components"] = JsonValue::Array(
            (0..DOF)
                .map(|i| {
                    JsonValue::Array(
                        (0..DOF)
                            .map(|j| match self.component(i, j) {
                                Component::Prescribed(v) => v.into(),
                                Component::Free => "free".into(),
                            })
                            .collect(),
                    )
                })
                .collect(),
        );
        spec
    }
}
