//! Interior point sampling: one jittered point per spacing-sized cell, which
//! gives blue-noise-like coverage without the O(n²) rejection loop.

use super::boundary::Bounds;
use crate::rng::Rng;

/// Fraction of a cell a point may wander from its center.
const JITTER: f64 = 0.45;

/// Deterministic interior sample of the rectangle, leaving a one-spacing
/// margin so interior points never collide with the boundary rings.
pub fn interior_points(bounds: &Bounds, spacing: f64, rng: &mut Rng) -> Vec<[f64; 2]> {
    let margin = spacing;
    let left = bounds.left + margin;
    let top = bounds.top + margin;
    let width = (bounds.width - 2.0 * margin).max(0.0);
    let height = (bounds.height - 2.0 * margin).max(0.0);

    let cols = (width / spacing).floor() as usize;
    let rows = (height / spacing).floor() as usize;

    let mut out = Vec::with_capacity(cols * rows);
    for gy in 0..rows {
        for gx in 0..cols {
            let jx = rng.range_f32(-JITTER as f32, JITTER as f32) as f64;
            let jy = rng.range_f32(-JITTER as f32, JITTER as f32) as f64;
            let x = left + (gx as f64 + 0.5 + jx) * spacing;
            let y = top + (gy as f64 + 0.5 + jy) * spacing;
            out.push([x, y]);
        }
    }
    out
}
