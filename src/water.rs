//! Water classification and the ghost-seeded ocean flood fill.

use crate::config::Params;
use crate::mesh::TriangleMesh;
use crate::noise::Noise;

/// Octave weights for the coastline noise, scales 1,2,4,8,16.
const FBM_WEIGHTS: [f32; 5] = [0.5, 0.4, 0.3, 0.2, 0.1];

#[inline]
fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Weighted multi-octave noise in [-1,1]; each octave reads its own channel.
pub fn fbm_noise(noise: &Noise, nx: f32, ny: f32) -> f32 {
    let mut sum = 0.0;
    let mut total = 0.0;
    for (octave, &weight) in FBM_WEIGHTS.iter().enumerate() {
        let frequency = (1u32 << octave) as f32;
        sum += weight * noise.noise2d(nx * frequency, ny * frequency, octave as u32);
        total += weight;
    }
    sum / total
}

/// Noise-based water predicate. Ghost and boundary regions are always water;
/// elsewhere `round` pulls the coastline toward a circle and `inflate`
/// weakens the radial falloff.
pub fn assign_water(r_water: &mut [bool], mesh: &TriangleMesh, noise: &Noise, params: &Params) {
    for r in 0..mesh.num_regions() as i32 {
        if mesh.is_ghost_region(r) || mesh.is_boundary_region(r) {
            r_water[r as usize] = true;
        } else {
            let [x, y] = mesh.region_pos(r);
            let nx = (x - 500.0) / 500.0;
            let ny = (y - 500.0) / 500.0;
            let d2 = nx * nx + ny * ny;
            let n = mix(fbm_noise(noise, nx, ny), 0.5, params.water_round);
            r_water[r as usize] = n - (1.0 - params.water_inflate) * d2 < 0.0;
        }
    }
}

/// Flood fill from the ghost region: ocean = water reachable through water.
pub fn assign_ocean(r_ocean: &mut [bool], mesh: &TriangleMesh, r_water: &[bool]) {
    r_ocean.fill(false);
    let ghost = mesh.ghost_region();
    r_ocean[ghost as usize] = true;
    let mut stack = vec![ghost];
    let mut neighbors = Vec::new();
    while let Some(r) = stack.pop() {
        mesh.region_regions(r, &mut neighbors);
        for &n in &neighbors {
            if r_water[n as usize] && !r_ocean[n as usize] {
                r_ocean[n as usize] = true;
                stack.push(n);
            }
        }
    }
}
