//! Drainage: a priority expansion from the ocean assigns every land triangle
//! its downslope side, and a reverse pre-order pass accumulates flow along
//! the resulting forest.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rayon::prelude::*;

use crate::mesh::{self, TriangleMesh};

/// Downslope sentinel for triangles the expansion never reached.
pub const UNREACHED: i32 = -999;

/// Local runoff is `FLOW_FACTOR * moisture²` per land triangle.
const FLOW_FACTOR: f32 = 0.2;

/// Min-heap entry: lowest elevation pops first, insertion order breaks ties
/// so runs are reproducible.
struct QueueItem {
    priority: f32,
    seq: u32,
    t: i32,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed on both keys: BinaryHeap is a max-heap.
        other
            .priority
            .total_cmp(&self.priority)
            .then(other.seq.cmp(&self.seq))
    }
}

/// Ocean-seeded priority expansion. Seeds (every triangle at or below sea
/// level, plus ghosts) get downslope -1; each land triangle gets the side
/// leading down to the neighbor that reached it first. `order_t` records the
/// drainage forest in pre-order: seeds first, then land, parents always
/// before children.
pub fn assign_downslope(
    t_downslope_s: &mut [i32],
    order_t: &mut Vec<i32>,
    mesh: &TriangleMesh,
    t_elevation: &[f32],
) {
    t_downslope_s.fill(UNREACHED);
    order_t.clear();
    let mut queue = BinaryHeap::new();
    let mut seq = 0u32;

    for t in 0..mesh.num_triangles() as i32 {
        if t_elevation[t as usize] <= 0.0 || mesh.is_ghost_triangle(t) {
            t_downslope_s[t as usize] = -1;
            order_t.push(t);
            queue.push(QueueItem {
                priority: t_elevation[t as usize],
                seq,
                t,
            });
            seq += 1;
        }
    }

    while let Some(QueueItem { t, .. }) = queue.pop() {
        for s in mesh.triangle_sides(t) {
            let neighbor = mesh.outer_triangle(s);
            if t_elevation[neighbor as usize] >= 0.0
                && t_downslope_s[neighbor as usize] == UNREACHED
            {
                // The paired side points from the neighbor down to us.
                t_downslope_s[neighbor as usize] = mesh.opposite(s);
                order_t.push(neighbor);
                queue.push(QueueItem {
                    priority: t_elevation[neighbor as usize],
                    seq,
                    t: neighbor,
                });
                seq += 1;
            }
        }
    }

    if order_t.len() < mesh.num_triangles() {
        log::debug!(
            "{} triangles unreached by downslope routing",
            mesh.num_triangles() - order_t.len()
        );
    }
}

/// Flow accumulation in reverse pre-order. Also lowers any trunk triangle
/// above its tributary; routing is already fixed, so flattening closed
/// basins here cannot change the tree.
pub fn assign_flow(
    s_flow: &mut [f32],
    t_flow: &mut [f32],
    t_moisture: &mut [f32],
    t_elevation: &mut [f32],
    mesh: &TriangleMesh,
    r_rainfall: &[f32],
    order_t: &[i32],
    t_downslope_s: &[i32],
) {
    t_moisture
        .par_iter_mut()
        .enumerate()
        .for_each(|(t, moisture)| {
            let [ra, rb, rc] = mesh.triangle_regions(t as i32);
            *moisture = (r_rainfall[ra as usize] + r_rainfall[rb as usize]
                + r_rainfall[rc as usize])
                / 3.0;
        });

    s_flow.fill(0.0);
    for t in 0..t_flow.len() {
        t_flow[t] = if t_elevation[t] >= 0.0 {
            FLOW_FACTOR * t_moisture[t] * t_moisture[t]
        } else {
            0.0
        };
    }

    for &t1 in order_t.iter().rev() {
        let s = t_downslope_s[t1 as usize];
        if s < 0 {
            continue;
        }
        let t2 = mesh::triangle_of(mesh.opposite(s));
        if t_elevation[t2 as usize] >= 0.0 {
            t_flow[t2 as usize] += t_flow[t1 as usize];
            s_flow[s as usize] += t_flow[t1 as usize];
            if t_elevation[t2 as usize] > t_elevation[t1 as usize] {
                t_elevation[t2 as usize] = t_elevation[t1 as usize];
            }
        }
    }
}
