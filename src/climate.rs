//! Wind-ordered moisture transport. Regions are processed strictly upwind
//! first, so one sweep replaces a fixed-point iteration: every region reads
//! fully-computed humidity from its upwind neighbors.

use crate::mesh::TriangleMesh;

/// Fraction of carried humidity deposited as rain at each hop.
const RAIN_FRACTION: f32 = 0.9;
/// Evaporation gain per unit of water depth.
const EVAPORATION: f32 = 0.5;
/// Fraction of excess humidity converted to rain when forced over terrain.
const OROGRAPHIC_FRACTION: f32 = 0.5;

/// Solid regions sorted by their projection onto the wind direction
/// (upwind first), plus the projection key per region. Ties break by index
/// so the order is fully deterministic.
pub fn wind_order(mesh: &TriangleMesh, wind_angle_deg: f32) -> (Vec<i32>, Vec<f32>) {
    let theta = wind_angle_deg.to_radians();
    let (wx, wy) = (theta.cos(), theta.sin());
    let num_solid = mesh.num_solid_regions();
    let mut sort_key = vec![0.0f32; mesh.num_regions()];
    for r in 0..num_solid {
        let [x, y] = mesh.region_pos(r as i32);
        sort_key[r] = x * wx + y * wy;
    }
    let mut order: Vec<i32> = (0..num_solid as i32).collect();
    order.sort_unstable_by(|&a, &b| {
        sort_key[a as usize]
            .total_cmp(&sort_key[b as usize])
            .then(a.cmp(&b))
    });
    (order, sort_key)
}

/// One downwind sweep: average upwind humidity, rain out a fraction, add
/// boundary inflow and evaporation, then convert orographic excess.
pub fn assign_moisture(
    r_humidity: &mut [f32],
    r_rainfall: &mut [f32],
    mesh: &TriangleMesh,
    order: &[i32],
    sort_key: &[f32],
    r_elevation: &[f32],
) {
    r_humidity.fill(0.0);
    r_rainfall.fill(0.0);
    let mut neighbors = Vec::new();
    for &r in order {
        mesh.region_regions(r, &mut neighbors);
        let mut sum = 0.0;
        let mut count = 0u32;
        for &n in &neighbors {
            if mesh.is_ghost_region(n) {
                continue; // the ghost has no position, hence no sort key
            }
            if sort_key[n as usize] < sort_key[r as usize] {
                sum += r_humidity[n as usize];
                count += 1;
            }
        }
        let upwind = if count > 0 { sum / count as f32 } else { 0.0 };

        let mut moisture = upwind;
        let mut rainfall = RAIN_FRACTION * upwind;
        if mesh.is_boundary_region(r) {
            moisture = 1.0;
        }
        let elevation = r_elevation[r as usize];
        if elevation < 0.0 {
            moisture += EVAPORATION * -elevation;
        }
        let ceiling = 1.0 - elevation;
        if moisture > ceiling {
            let orographic = OROGRAPHIC_FRACTION * (moisture - ceiling);
            rainfall += orographic;
            moisture -= orographic;
        }
        r_rainfall[r as usize] = rainfall;
        r_humidity[r as usize] = moisture;
    }
}
