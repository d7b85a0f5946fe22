//! Triangle and region elevation: coast detection, the BFS mode driven by
//! ocean classification, the constraint-painted mode driven by a low-res
//! elevation grid, and the mountain precomputation both feed from.

use std::collections::VecDeque;

use rayon::prelude::*;

use crate::config::Constraints;
use crate::mesh::TriangleMesh;
use crate::noise::Noise;
use crate::rng::Rng;

/// Noise channels 0..4 belong to the water fbm; the precomputed octaves get
/// their own block.
const PRECALC_CHANNEL_BASE: u32 = 8;

/// (scale, offset) per precomputed octave, sampled in normalized coords.
const PRECALC_OCTAVES: [(f32, f32); 5] =
    [(1.0, 0.0), (2.0, 5.0), (4.0, 7.0), (8.0, 9.0), (16.0, 15.0)];

/// Triangles with both an ocean and a non-ocean corner. Scanning only the
/// ocean→land orientation lists each such triangle exactly once.
pub fn find_coasts_t(mesh: &TriangleMesh, r_ocean: &[bool]) -> Vec<i32> {
    let mut coasts = Vec::new();
    for s in 0..mesh.num_sides() as i32 {
        let r0 = mesh.begin_region(s);
        let r1 = mesh.end_region(s);
        if r_ocean[r0 as usize] && !r_ocean[r1 as usize] {
            coasts.push(mesh.inner_triangle(s));
        }
    }
    coasts
}

/// BFS elevation: distance from the coast, normalized per class so land
/// rises to +1 and ocean floors at -1.
pub fn assign_t_elevation_from_coast(
    t_elevation: &mut [f32],
    mesh: &TriangleMesh,
    r_ocean: &[bool],
    coasts_t: &[i32],
) {
    let num_t = mesh.num_triangles();
    let t_ocean: Vec<bool> = (0..num_t)
        .map(|t| {
            mesh.triangle_regions(t as i32)
                .iter()
                .all(|&r| r_ocean[r as usize])
        })
        .collect();

    let mut distance = vec![-1i32; num_t];
    let mut queue = VecDeque::new();
    for &t in coasts_t {
        if distance[t as usize] == -1 {
            distance[t as usize] = 0;
            queue.push_back(t);
        }
    }
    let mut max_land = 1i32;
    let mut max_ocean = 1i32;
    while let Some(t) = queue.pop_front() {
        for neighbor in mesh.triangle_triangles(t) {
            if distance[neighbor as usize] == -1 {
                let d = distance[t as usize] + 1;
                distance[neighbor as usize] = d;
                if t_ocean[neighbor as usize] {
                    max_ocean = max_ocean.max(d);
                } else {
                    max_land = max_land.max(d);
                }
                queue.push_back(neighbor);
            }
        }
    }

    for t in 0..num_t {
        let d = distance[t].max(0) as f32;
        t_elevation[t] = if t_ocean[t] {
            -d / max_ocean as f32
        } else {
            d / max_land as f32
        };
    }
}

/// Bernoulli peak sample over solid triangles, probability spacing²/density.
pub fn choose_mountain_peaks(
    mesh: &TriangleMesh,
    spacing: f32,
    density: f32,
    rng: &mut Rng,
) -> Vec<i32> {
    let p = (spacing * spacing / density).min(1.0);
    let mut peaks = Vec::new();
    for t in 0..mesh.num_solid_triangles() as i32 {
        if rng.next_f32() < p {
            peaks.push(t);
        }
    }
    peaks
}

/// Multi-source BFS from the peaks, accumulating the crossed side's arc
/// length. Sides touching the ghost region have no geometry; they step by
/// `spacing`. Unreached triangles keep -1.
pub fn mountain_distance(mesh: &TriangleMesh, peaks_t: &[i32], spacing: f32) -> Vec<f32> {
    let mut distance = vec![-1.0f32; mesh.num_triangles()];
    let mut queue = VecDeque::with_capacity(peaks_t.len());
    for &t in peaks_t {
        distance[t as usize] = 0.0;
        queue.push_back(t);
    }
    while let Some(t) = queue.pop_front() {
        for s in mesh.triangle_sides(t) {
            let neighbor = mesh.outer_triangle(s);
            if distance[neighbor as usize] < 0.0 {
                let step = if mesh.is_ghost_region(mesh.begin_region(s))
                    || mesh.is_ghost_region(mesh.end_region(s))
                {
                    spacing
                } else {
                    mesh.side_length(s)
                };
                distance[neighbor as usize] = distance[t as usize] + step;
                queue.push_back(neighbor);
            }
        }
    }
    distance
}

/// Per-triangle noise octaves, evaluated once so the elevation blend never
/// calls the noise function in its inner loop.
pub fn precalculate_noise(noise: &Noise, mesh: &TriangleMesh) -> [Vec<f32>; 5] {
    let num_t = mesh.num_triangles();
    std::array::from_fn(|k| {
        let (scale, offset) = PRECALC_OCTAVES[k];
        let channel = PRECALC_CHANNEL_BASE + k as u32;
        (0..num_t)
            .into_par_iter()
            .map(|t| {
                let [x, y] = mesh.triangle_pos(t as i32);
                let nx = (x - 500.0) / 500.0;
                let ny = (y - 500.0) / 500.0;
                noise.noise2d(scale * nx + offset, scale * ny + offset, channel)
            })
            .collect()
    })
}

/// Constraint-painted elevation. Paints the grid onto triangles, pins the
/// coast band to exactly zero, then blends hills against mountains on land
/// and deepens water. Returns the coastal triangle list.
pub fn assign_t_elevation_painted(
    t_elevation: &mut [f32],
    mesh: &TriangleMesh,
    constraints: &Constraints,
    t_noise: &[Vec<f32>; 5],
    t_mountain_distance: &[f32],
    mountain_slope: f32,
) -> Vec<i32> {
    let num_t = mesh.num_triangles();

    for t in 0..num_t {
        let [x, y] = mesh.triangle_pos(t as i32);
        let mut e = constraints.sample(x / 1000.0, y / 1000.0);
        if e == 0.0 {
            e = 0.001; // keep the sign unambiguous
        }
        t_elevation[t] = e;
    }

    // Coastal set from the painted signs, before any are overwritten.
    let mut coasts = Vec::new();
    for t in 0..num_t as i32 {
        if mesh.is_ghost_triangle(t) {
            continue;
        }
        let mut ocean_neighbors = 0;
        for neighbor in mesh.triangle_triangles(t) {
            if t_elevation[neighbor as usize] < 0.0 {
                ocean_neighbors += 1;
            }
        }
        if (1..3).contains(&ocean_neighbors) {
            coasts.push(t);
        }
    }
    for &t in &coasts {
        t_elevation[t as usize] = 0.0;
    }
    for t in mesh.num_solid_triangles()..num_t {
        t_elevation[t] = 0.0;
    }

    for t in 0..num_t {
        let e = t_elevation[t];
        if e > 0.0 {
            let noisiness = 1.0 - 0.5 * (1.0 + t_noise[0][t]);
            let eh = ((1.0 + noisiness * t_noise[4][t] + (1.0 - noisiness) * t_noise[2][t])
                / 50.0)
                .max(0.01);
            let em = (1.0 - (mountain_slope / 1000.0) * t_mountain_distance[t]).max(0.01);
            let weight = e * e;
            t_elevation[t] = ((1.0 - weight) * eh + weight * em).clamp(-1.0, 1.0);
        } else if e < 0.0 {
            t_elevation[t] = (e * (2.0 + t_noise[1][t])).clamp(-1.0, 1.0);
        }
    }

    coasts
}

/// Region elevation = mean of the incident triangles. With `derive_water`
/// the water flag is recomputed from the triangle signs (painted mode);
/// either way a water region never keeps a non-negative mean.
pub fn assign_r_elevation(
    r_elevation: &mut [f32],
    r_water: &mut [bool],
    mesh: &TriangleMesh,
    t_elevation: &[f32],
    derive_water: bool,
) {
    let mut triangles = Vec::new();
    for r in 0..mesh.num_regions() as i32 {
        mesh.region_triangles(r, &mut triangles);
        let mut sum = 0.0;
        let mut any_negative = false;
        for &t in &triangles {
            sum += t_elevation[t as usize];
            if t_elevation[t as usize] < 0.0 {
                any_negative = true;
            }
        }
        let mean = if triangles.is_empty() {
            0.0
        } else {
            sum / triangles.len() as f32
        };
        if derive_water {
            r_water[r as usize] = any_negative || mesh.is_ghost_region(r);
        }
        r_elevation[r as usize] = if r_water[r as usize] && mean >= 0.0 {
            -0.001
        } else {
            mean
        };
    }
}
