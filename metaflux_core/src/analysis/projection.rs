//! Placement of reaction fluxes in a 3D scene
//!
//! Each subsystem gets a sector of a cylinder around the z axis, the height of a reaction is
//! its signed log flux. Placement is deterministic, the same fluxes always give the same scene.
use std::f64::consts::TAU;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::metabolic_model::model::Model;
use crate::utils::numeric::sanitize_float;

/// Subsystem of reactions without one
pub const OTHER_SUBSYSTEM: &str = "Other";

const RADIUS: f64 = 5.0;
/// Ring offsets cycled through by the reactions of a subsystem
const RING_OFFSETS: [f64; 5] = [0.0, 0.25, -0.25, 0.5, -0.5];
/// Angle added each time the rings of a subsystem are used up
const ANGLE_STEP: f64 = 0.04;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluxProjection {
    pub id: String,
    pub name: Option<String>,
    pub subsystem: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Flux magnitude
    pub value: f64,
}

/// Place every flux of a reaction in `model`, other ids are skipped
///
/// Sectors follow the order in which subsystems first appear in the model. Reactions without a
/// subsystem are put at angle 0.
pub fn project_fluxes(model: &Model, fluxes: &IndexMap<String, f64>) -> Vec<FluxProjection> {
    let subsystems: IndexSet<&str> = model
        .reactions
        .values()
        .filter_map(|r| r.subsystem.as_deref())
        .collect();
    let sector = TAU / subsystems.len().max(1) as f64;
    let mut placed: IndexMap<String, usize> = IndexMap::new();

    let mut projections = Vec::with_capacity(fluxes.len());
    for (id, flux) in fluxes {
        let Some(reaction) = model.reactions.get(id) else {
            continue;
        };
        let flux = sanitize_float(*flux);
        let subsystem = reaction
            .subsystem
            .clone()
            .unwrap_or_else(|| OTHER_SUBSYSTEM.to_string());
        let base_angle = subsystems
            .get_index_of(subsystem.as_str())
            .map_or(0.0, |i| i as f64 * sector);

        let count = placed.entry(subsystem.clone()).or_insert(0);
        let k = *count;
        *count += 1;
        let radius = RADIUS + RING_OFFSETS[k % RING_OFFSETS.len()];
        let angle = base_angle + ANGLE_STEP * (k / RING_OFFSETS.len()) as f64;

        projections.push(FluxProjection {
            id: id.clone(),
            name: reaction.name.clone(),
            subsystem,
            x: radius * angle.cos(),
            y: radius * angle.sin(),
            z: flux.abs().ln_1p().copysign(flux),
            value: flux.abs(),
        });
    }
    projections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_models::toy_model_path;

    fn fluxes(values: &[(&str, f64)]) -> IndexMap<String, f64> {
        values.iter().map(|(id, v)| (id.to_string(), *v)).collect()
    }

    #[test]
    fn heights_are_signed_log_fluxes() {
        let model = Model::read_json(toy_model_path()).unwrap();
        let points = project_fluxes(
            &model,
            &fluxes(&[("PDH", 20.0), ("EX_glc__D_e", -10.0), ("LDH", 0.0), ("NOPE", 3.0)]),
        );
        assert_eq!(points.len(), 3);
        assert!((points[0].z - 21f64.ln()).abs() < 1e-12);
        assert!((points[1].z + 11f64.ln()).abs() < 1e-12);
        assert_eq!(points[1].value, 10.0);
        assert_eq!(points[2].z, 0.0);
        assert_eq!(points[0].subsystem, "Glycolysis/Gluconeogenesis");
        assert_eq!(points[0].name.as_deref(), Some("Pyruvate dehydrogenase"));
    }

    #[test]
    fn subsystems_get_their_own_sector() {
        let model = Model::read_json(toy_model_path()).unwrap();
        let all: IndexMap<String, f64> =
            model.reactions.keys().map(|id| (id.clone(), 1.0)).collect();
        let points = project_fluxes(&model, &all);
        assert_eq!(points.len(), model.reactions.len());
        // five subsystems, glycolysis is the third to appear
        let sector = TAU / 5.0;
        for point in points.iter().filter(|p| p.subsystem == "Glycolysis/Gluconeogenesis") {
            let radius = point.x.hypot(point.y);
            assert!((4.5..=5.5).contains(&radius));
            assert!((point.y.atan2(point.x) - 2.0 * sector).abs() < 0.1);
        }
        // repeated calls place reactions identically
        assert_eq!(project_fluxes(&model, &all), points);
        // reactions of one subsystem don't overlap
        let transport: Vec<(f64, f64)> = points
            .iter()
            .filter(|p| p.subsystem == "Transport")
            .map(|p| (p.x, p.y))
            .collect();
        for (i, a) in transport.iter().enumerate() {
            for b in &transport[i + 1..] {
                assert!((a.0 - b.0).hypot(a.1 - b.1) > 1e-6);
            }
        }
    }

    #[test]
    fn reactions_without_subsystem() {
        let mut model = Model::read_json(toy_model_path()).unwrap();
        model.reactions["LDH"].subsystem = None;
        let points = project_fluxes(&model, &fluxes(&[("LDH", 2.0)]));
        assert_eq!(points[0].subsystem, OTHER_SUBSYSTEM);
        assert!((points[0].x - 5.0).abs() < 1e-12);
        assert!(points[0].y.abs() < 1e-12);
    }
}
