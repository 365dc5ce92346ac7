//=========================================================================
// Shader Light List
//=========================================================================
//
// Nearest-first light list for renderers that upload lights as uniforms
// instead of sampling the trail-light texture.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::config::MAX_LIGHT_LEVEL;
use crate::core::emitters::EmitterRegistry;
use crate::core::math::{Rgb, Vec3};

//=== ShaderLight =========================================================

/// One light in uniform-upload form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaderLight {
    /// Cell center in world space.
    pub position: Vec3,
    pub color: Rgb,
    /// Decayed brightness normalized to [0, 1].
    pub intensity: f32,
}

/// Returns up to `max_lights` emitters within `max_distance` of `viewer`,
/// closest first.
pub fn nearest_lights(
    registry: &EmitterRegistry,
    viewer: Vec3,
    max_lights: usize,
    max_distance: f64,
) -> Vec<ShaderLight> {
    let max_dist_sq = max_distance * max_distance;

    let mut in_range: Vec<(f64, ShaderLight)> = registry
        .iter()
        .filter_map(|emitter| {
            let position = emitter.cell().center();
            let dist_sq = position.distance_squared(viewer);
            (dist_sq <= max_dist_sq).then(|| {
                let light = ShaderLight {
                    position,
                    color: emitter.color(),
                    intensity: f32::from(emitter.current_brightness())
                        / f32::from(MAX_LIGHT_LEVEL),
                };
                (dist_sq, light)
            })
        })
        .collect();

    in_range.sort_by(|a, b| a.0.total_cmp(&b.0));
    in_range
        .into_iter()
        .take(max_lights)
        .map(|(_, light)| light)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::CellPos;

    #[test]
    fn sorted_and_limited() {
        let mut registry = EmitterRegistry::default();
        for x in [8, 2, 5, 1] {
            registry.add(CellPos::new(x, 0, 0), Rgb::GREEN, 15, 20);
        }

        let lights = nearest_lights(&registry, Vec3::new(0.5, 0.5, 0.5), 3, 100.0);

        let xs: Vec<f64> = lights.iter().map(|l| l.position.x).collect();
        assert_eq!(xs, vec![1.5, 2.5, 5.5]);
        assert_eq!(lights[0].intensity, 1.0);
    }

    #[test]
    fn distance_cutoff() {
        let mut registry = EmitterRegistry::default();
        registry.add(CellPos::new(50, 0, 0), Rgb::GREEN, 15, 20);

        assert!(nearest_lights(&registry, Vec3::ZERO, 8, 10.0).is_empty());
    }
}
