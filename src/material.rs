use json::JsonValue;
use nalgebra::Vector3;
use thiserror::Error;

use crate::datatypes::{triplet_to_json, Material, MaterialType, Moduli};

/// A material expressed as a full orthotropic elastic-property set, whatever its
/// declared type
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMaterial {
    pub index: i64,
    pub name: String,
    /// E1, E2, E3
    pub elastic_moduli: Vector3<f64>,
    /// G12, G23, G31
    pub shear_moduli: Vector3<f64>,
    /// v12, v23, v31
    pub poissons_ratios: Vector3<f64>,
    pub density: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("material {index} ({name}) is declared {} but no resolution rule exists for that type", .material_type.name())]
pub struct UnresolvedMaterial {
    pub index: i64,
    pub name: String,
    pub material_type: MaterialType,
}

/// Shear modulus of an isotropic solid, `E / (2 (1 + v))`
pub fn isotropic_shear_modulus(elastic_modulus: f64, poissons_ratio: f64) -> f64 {
    elastic_modulus / (2.0 * (1.0 + poissons_ratio))
}

/// Normalizes a material into its canonical orthotropic form
///
/// # Arguments
/// * `material` - A structurally valid material
///
/// # Returns
/// The orthotropic property set, or an error for types without a resolution rule
pub fn resolve(material: &Material) -> Result<ResolvedMaterial, UnresolvedMaterial> {
    let (elastic_moduli, shear_moduli, poissons_ratios) = match &material.moduli {
        Moduli::Isotropic {
            elastic_modulus,
            poissons_ratio,
        } => (
            Vector3::repeat(*elastic_modulus),
            Vector3::repeat(isotropic_shear_modulus(*elastic_modulus, *poissons_ratio)),
            Vector3::repeat(*poissons_ratio),
        ),
        Moduli::Orthotropic {
            elastic_moduli,
            shear_moduli,
            poissons_ratios,
        } => (*elastic_moduli, *shear_moduli, *poissons_ratios),
        Moduli::Anisotropic => {
            return Err(UnresolvedMaterial {
                index: material.index,
                name: material.name.clone(),
                material_type: material.material_type(),
            })
        }
    };

    Ok(ResolvedMaterial {
        index: material.index,
        name: material.name.clone(),
        elastic_moduli,
        shear_moduli,
        poissons_ratios,
        density: material.density,
    })
}

/// Relative deviation from Hooke's law for an orthotropic material whose
/// triplets are each constant, i.e. an isotropic material written out in
/// orthotropic form. `None` for every other material.
pub fn hookes_law_deviation(material: &Material) -> Option<f64> {
    let Moduli::Orthotropic {
        elastic_moduli,
        shear_moduli,
        poissons_ratios,
    } = &material.moduli
    else {
        return None;
    };

    let constant = |v: &Vector3<f64>| v.iter().all(|x| *x == v[0]);
    if !(constant(elastic_moduli) && constant(shear_moduli) && constant(poissons_ratios)) {
        return None;
    }

    let expected = isotropic_shear_modulus(elastic_moduli[0], poissons_ratios[0]);
    Some(((shear_moduli[0] - expected) / expected).abs())
}

impl ResolvedMaterial {
    /// The resolved set written back as an orthotropic material
    pub fn to_material(&self) -> Material {
        Material {
            index: self.index,
            name: self.name.clone(),
            moduli: Moduli::Orthotropic {
                elastic_moduli: self.elastic_moduli,
                shear_moduli: self.shear_moduli,
                poissons_ratios: self.poissons_ratios,
            },
            density: self.density,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let mut material = JsonValue::new_object();
        material["materialIndex"] = self.index.into();
        material["materialName"] = self.name.as_str().into();
        material["elasticModuli"] = triplet_to_json(&self.elastic_moduli);
        material["shearModuli"] = triplet_to_json(&self.shear_moduli);
        material["poissonsRatios"] = triplet_to_json(&self.poissons_ratios);
        if let Some(density) = self.density {
            material["density"] = density.into();
        }
        material
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isotropic(e: f64, v: f64) -> Material {
        Material {
            index: 1,
            name: "matrix".to_owned(),
            moduli: Moduli::Isotropic {
                elastic_modulus: e,
                poissons_ratio: v,
            },
            density: None,
        }
    }

    #[test]
    fn isotropic_expands_to_three_directions() {
        let resolved = resolve(&isotropic(1.31e6, 0.43)).unwrap();

        assert_eq!(resolved.elastic_moduli, Vector3::repeat(1.31e6));
        assert_eq!(resolved.poissons_ratios, Vector3::repeat(0.43));
        for g in resolved.shear_moduli.iter() {
            assert!((g - 458_041.958_041_958).abs() < 1e-6, "{g}");
        }
    }

    #[test]
    fn orthotropic_passes_through_in_declared_order() {
        let material = Material {
            index: 2,
            name: "fiber".to_owned(),
            moduli: Moduli::Orthotropic {
                elastic_moduli: Vector3::new(230e3, 15e3, 14e3),
                shear_moduli: Vector3::new(15e3, 7e3, 16e3),
                poissons_ratios: Vector3::new(0.2, 0.07, 0.21),
            },
            density: Some(1.8e-9),
        };

        let resolved = resolve(&material).unwrap();
        assert_eq!(resolved.elastic_moduli, Vector3::new(230e3, 15e3, 14e3));
        assert_eq!(resolved.shear_moduli, Vector3::new(15e3, 7e3, 16e3));
        assert_eq!(resolved.poissons_ratios, Vector3::new(0.2, 0.07, 0.21));
        assert_eq!(resolved.density, Some(1.8e-9));
        assert_eq!(resolved.to_material(), material);
    }

    #[test]
    fn anisotropic_fails_closed() {
        let material = Material {
            index: 4,
            name: "weave".to_owned(),
            moduli: Moduli::Anisotropic,
            density: None,
        };

        let err = resolve(&material).unwrap_err();
        assert_eq!(err.material_type, MaterialType::Anisotropic);
        assert!(err.to_string().contains("anisotropic"));
    }

    #[test]
    fn hookes_law_only_applies_to_constant_triplets() {
        assert_eq!(hookes_law_deviation(&isotropic(1e3, 0.25)), None);

        let disguised = resolve(&isotropic(1e3, 0.25)).unwrap().to_material();
        assert!(hookes_law_deviation(&disguised).unwrap() < 1e-12);

        let mut wrong = disguised.clone();
        if let Moduli::Orthotropic { shear_moduli, .. } = &mut wrong.moduli {
            *shear_moduli = Vector3::repeat(500.0);
        }
        assert!((hookes_law_deviation(&wrong).unwrap() - 0.25).abs() < 1e-12);
    }
}
