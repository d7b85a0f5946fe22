//! Procedural terrain generation on a triangle–polygon dual mesh.
//!
//! The mesh is built once from a point set (boundary ring + interior
//! sample) and closed with ghost elements; the generator then fills dense
//! per-element fields: water/ocean classification, elevation, moisture and
//! rainfall, downslope routing, and river flow.

pub mod climate;
pub mod config;
pub mod elevation;
pub mod hydrology;
pub mod mesh;
pub mod noise;
pub mod rng;
pub mod water;

use std::time::Instant;

use config::{Constraints, Params};
use mesh::TriangleMesh;
use noise::Noise;
use rng::Rng;

pub struct Timing {
    pub name: &'static str,
    pub ms: f64,
}

/// A generated map: the mesh plus every scalar field, all buffers sized at
/// construction and reused across re-runs.
pub struct Map {
    mesh: TriangleMesh,
    params: Params,
    noise: Noise,

    // Precomputed once per (seed, spacing): mountain structure and the
    // noise octaves the painted elevation blend reads.
    pub peak_t: Vec<i32>,
    pub t_mountain_distance: Vec<f32>,
    t_noise: [Vec<f32>; 5],

    // Wind order cache, rebuilt only when the angle changes.
    wind_order_r: Vec<i32>,
    wind_sort_key: Vec<f32>,
    cached_wind_angle: f32,

    // Region fields
    pub r_water: Vec<bool>,
    pub r_ocean: Vec<bool>,
    pub r_elevation: Vec<f32>,
    pub r_humidity: Vec<f32>,
    pub r_rainfall: Vec<f32>,

    // Triangle / side fields
    pub t_elevation: Vec<f32>,
    pub t_moisture: Vec<f32>,
    pub t_downslope_s: Vec<i32>,
    pub order_t: Vec<i32>,
    pub t_flow: Vec<f32>,
    pub s_flow: Vec<f32>,
    pub coast_t: Vec<i32>,
}

impl Map {
    pub fn new(mesh: TriangleMesh, params: Params) -> Self {
        let noise = Noise::new(params.seed);
        let mut rng = Rng::new(params.seed);
        let peak_t =
            elevation::choose_mountain_peaks(&mesh, params.spacing, params.mountain_density, &mut rng);
        if peak_t.is_empty() {
            log::debug!("no mountain peaks chosen; mountain profile stays flat");
        }
        let t_mountain_distance = elevation::mountain_distance(&mesh, &peak_t, params.spacing);
        let t_noise = elevation::precalculate_noise(&noise, &mesh);

        let num_r = mesh.num_regions();
        let num_t = mesh.num_triangles();
        let num_s = mesh.num_sides();
        Self {
            mesh,
            params,
            noise,
            peak_t,
            t_mountain_distance,
            t_noise,
            wind_order_r: Vec::new(),
            wind_sort_key: Vec::new(),
            cached_wind_angle: f32::NAN,
            r_water: vec![false; num_r],
            r_ocean: vec![false; num_r],
            r_elevation: vec![0.0; num_r],
            r_humidity: vec![0.0; num_r],
            r_rainfall: vec![0.0; num_r],
            t_elevation: vec![0.0; num_t],
            t_moisture: vec![0.0; num_t],
            t_downslope_s: vec![hydrology::UNREACHED; num_t],
            order_t: Vec::with_capacity(num_t),
            t_flow: vec![0.0; num_t],
            s_flow: vec![0.0; num_s],
            coast_t: Vec::new(),
        }
    }

    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Water, ocean, coast, and elevation for both triangles and regions.
    ///
    /// Without constraints the coastline comes from the noise predicate and
    /// elevation from coast distance; with a painted grid the grid drives
    /// elevation and the water classes are derived from its signs.
    pub fn assign_elevation(&mut self, constraints: Option<&Constraints>) {
        match constraints {
            None => {
                water::assign_water(&mut self.r_water, &self.mesh, &self.noise, &self.params);
                water::assign_ocean(&mut self.r_ocean, &self.mesh, &self.r_water);
                self.coast_t = elevation::find_coasts_t(&self.mesh, &self.r_ocean);
                elevation::assign_t_elevation_from_coast(
                    &mut self.t_elevation,
                    &self.mesh,
                    &self.r_ocean,
                    &self.coast_t,
                );
                elevation::assign_r_elevation(
                    &mut self.r_elevation,
                    &mut self.r_water,
                    &self.mesh,
                    &self.t_elevation,
                    false,
                );
            }
            Some(constraints) => {
                self.coast_t = elevation::assign_t_elevation_painted(
                    &mut self.t_elevation,
                    &self.mesh,
                    constraints,
                    &self.t_noise,
                    &self.t_mountain_distance,
                    self.params.mountain_slope,
                );
                elevation::assign_r_elevation(
                    &mut self.r_elevation,
                    &mut self.r_water,
                    &self.mesh,
                    &self.t_elevation,
                    true,
                );
                water::assign_ocean(&mut self.r_ocean, &self.mesh, &self.r_water);
            }
        }
    }

    /// Wind-ordered humidity and rainfall. The wind order survives across
    /// runs until the angle changes.
    pub fn assign_rainfall(&mut self, wind_angle_deg: f32) {
        if self.cached_wind_angle.to_bits() != wind_angle_deg.to_bits() {
            let (order, key) = climate::wind_order(&self.mesh, wind_angle_deg);
            self.wind_order_r = order;
            self.wind_sort_key = key;
            self.cached_wind_angle = wind_angle_deg;
        }
        climate::assign_moisture(
            &mut self.r_humidity,
            &mut self.r_rainfall,
            &self.mesh,
            &self.wind_order_r,
            &self.wind_sort_key,
            &self.r_elevation,
        );
    }

    /// Downslope routing and flow accumulation.
    pub fn assign_rivers(&mut self) {
        hydrology::assign_downslope(
            &mut self.t_downslope_s,
            &mut self.order_t,
            &self.mesh,
            &self.t_elevation,
        );
        hydrology::assign_flow(
            &mut self.s_flow,
            &mut self.t_flow,
            &mut self.t_moisture,
            &mut self.t_elevation,
            &self.mesh,
            &self.r_rainfall,
            &self.order_t,
            &self.t_downslope_s,
        );
    }

    /// Run the whole pipeline, returning per-stage timings.
    pub fn generate(&mut self, constraints: Option<&Constraints>) -> Vec<Timing> {
        let mut timings = Vec::new();
        let total = Instant::now();

        let t = Instant::now();
        self.assign_elevation(constraints);
        timings.push(Timing {
            name: "elevation",
            ms: t.elapsed().as_secs_f64() * 1000.0,
        });

        let t = Instant::now();
        let wind_angle = self.params.wind_angle_deg;
        self.assign_rainfall(wind_angle);
        timings.push(Timing {
            name: "rainfall",
            ms: t.elapsed().as_secs_f64() * 1000.0,
        });

        let t = Instant::now();
        self.assign_rivers();
        timings.push(Timing {
            name: "rivers",
            ms: t.elapsed().as_secs_f64() * 1000.0,
        });

        timings.push(Timing {
            name: "TOTAL",
            ms: total.elapsed().as_secs_f64() * 1000.0,
        });
        timings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::boundary::{Bounds, boundary_points};
    use mesh::points::interior_points;

    fn standard_map(spacing: f32, seed: u32) -> Map {
        let (mut pts, _) = boundary_points(&Bounds::STANDARD, spacing as f64);
        let num_boundary = pts.len();
        pts.extend(interior_points(
            &Bounds::STANDARD,
            spacing as f64,
            &mut Rng::new(seed),
        ));
        let mesh = TriangleMesh::from_points(pts, num_boundary).unwrap();
        let params = Params {
            seed,
            spacing,
            ..Params::default()
        };
        Map::new(mesh, params)
    }

    fn snapshot(map: &Map) -> (Vec<f32>, Vec<f32>, Vec<f32>, Vec<i32>, Vec<f32>) {
        (
            map.t_elevation.clone(),
            map.r_elevation.clone(),
            map.r_rainfall.clone(),
            map.t_downslope_s.clone(),
            map.t_flow.clone(),
        )
    }

    #[test]
    fn pipeline_is_idempotent() {
        let mut map = standard_map(40.0, 7);
        map.generate(None);
        let first = snapshot(&map);
        map.generate(None);
        let second = snapshot(&map);
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
        assert_eq!(first.2, second.2);
        assert_eq!(first.3, second.3);
        assert_eq!(first.4, second.4);
    }

    #[test]
    fn wind_change_only_touches_downstream_fields() {
        let mut map = standard_map(40.0, 7);
        map.generate(None);
        let elevation = map.t_elevation.clone();
        let coasts = map.coast_t.clone();
        let peaks = map.peak_t.clone();
        let mountain = map.t_mountain_distance.clone();

        map.assign_rainfall(90.0);
        map.assign_rivers();

        assert_eq!(map.t_elevation, elevation);
        assert_eq!(map.coast_t, coasts);
        assert_eq!(map.peak_t, peaks);
        assert_eq!(map.t_mountain_distance, mountain);
    }

    #[test]
    fn flow_conserves_runoff_at_the_roots() {
        let mut map = standard_map(40.0, 7);
        map.generate(None);

        // Total root inflow equals total land generation.
        let mut roots_total = 0.0f64;
        let mut generated = 0.0f64;
        for t in 0..map.mesh.num_triangles() as i32 {
            let e = map.t_elevation[t as usize];
            if e >= 0.0 {
                generated += 0.2 * (map.t_moisture[t as usize] as f64).powi(2);
            }
            let s = map.t_downslope_s[t as usize];
            let is_root = s == -1 && e >= 0.0;
            // Land whose parent hop was rejected (parent under water) also
            // terminates its accumulation.
            let drains_to_water = s >= 0
                && map.t_elevation[mesh::triangle_of(map.mesh.opposite(s)) as usize] < 0.0;
            if is_root || drains_to_water {
                roots_total += map.t_flow[t as usize] as f64;
            }
        }
        let relative = (roots_total - generated).abs() / generated.max(1e-9);
        assert!(
            relative < 1e-3,
            "roots {roots_total} vs generated {generated}"
        );
    }

    #[test]
    fn painted_mode_fills_every_output() {
        let mut map = standard_map(40.0, 11);
        // Ocean ring, land center.
        let size = 16u32;
        let mut values = vec![-80i8; (size * size) as usize];
        for gy in 4..12u32 {
            for gx in 4..12u32 {
                values[(gy * size + gx) as usize] = 70;
            }
        }
        let constraints = Constraints::new(size, values);
        map.generate(Some(&constraints));

        assert!(!map.coast_t.is_empty());
        assert!(map.order_t.len() == map.mesh.num_triangles());
        assert!(map.r_ocean.iter().any(|&o| o));
        assert!(map.r_ocean[map.mesh.ghost_region() as usize]);
        // Water classification and region elevation agree in sign, and
        // ocean stays inside the water set.
        for r in 0..map.mesh.num_regions() as i32 {
            assert_eq!(
                map.r_water[r as usize],
                map.r_elevation[r as usize] < 0.0,
                "region {r} sign disagrees with its water flag"
            );
            if map.r_ocean[r as usize] {
                assert!(map.r_water[r as usize]);
            }
        }
        assert!(map.t_flow.iter().any(|&f| f > 0.0));
    }

    #[test]
    fn default_spacing_pipeline_completes() {
        // The default spacing builds a hull ring far larger than the solid
        // circulation cap; the ocean flood and region averaging circulate
        // the ghost region through it, so the full pipeline must pass.
        let mut map = standard_map(Params::default().spacing, 3);
        map.generate(None);
        assert_eq!(map.order_t.len(), map.mesh.num_triangles());
        assert!(map.r_ocean.iter().any(|&o| o));
        assert!(map.t_flow.iter().any(|&f| f > 0.0));
    }

    #[test]
    fn noise_mode_fills_every_output() {
        let mut map = standard_map(30.0, 5);
        map.generate(None);
        assert!(!map.coast_t.is_empty());
        assert_eq!(map.order_t.len(), map.mesh.num_triangles());
        assert!(map.r_ocean.iter().any(|&o| o));
        assert!(map.t_flow.iter().any(|&f| f > 0.0));
        assert!(map.r_rainfall.iter().any(|&m| m > 0.0));
        for &e in &map.t_elevation {
            assert!((-1.0..=1.0).contains(&e));
        }
    }
}
