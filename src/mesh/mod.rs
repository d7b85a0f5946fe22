//! Dual mesh: a planar triangulation and its polygon dual in flat index
//! arrays. Sides are directed half-edges in triangle-major order (sides
//! `3t, 3t+1, 3t+2` belong to triangle `t`); ghost elements close the hull
//! so every side has an opposite and every circulation is cyclic.

pub mod boundary;
pub mod ghost;
pub mod points;

use thiserror::Error;

/// Degree bound for solid-region circulation; exceeding it means a corrupt
/// mesh. The ghost region is exempt: its degree is the hull length, which
/// grows with the mesh, so it is bounded by the total side count instead.
pub const MAX_REGION_DEGREE: usize = 100;

/// How far ghost triangle centers sit outside the hull, in map units.
const GHOST_OFFSET: f32 = 10.0;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("side array length {0} is not a multiple of 3")]
    SideCount(usize),
    #[error("triangle and halfedge arrays differ in length ({triangles} vs {halfedges})")]
    LengthMismatch { triangles: usize, halfedges: usize },
    #[error("side {side} references region {region}, but only {num_regions} regions exist")]
    RegionOutOfRange {
        side: usize,
        region: i32,
        num_regions: usize,
    },
    #[error("side {side} references opposite {opposite} outside 0..{num_sides}")]
    OppositeOutOfRange {
        side: usize,
        opposite: i32,
        num_sides: usize,
    },
    #[error("halfedge involution broken at side {0}")]
    BrokenInvolution(i32),
    #[error("region {0} circulation did not close")]
    CirculationStuck(i32),
    #[error("triangulation produced no triangles from {0} points")]
    EmptyTriangulation(usize),
}

/// Next side within the same triangle (3t → 3t+1 → 3t+2 → 3t).
#[inline]
pub fn next_side(s: i32) -> i32 {
    if s % 3 == 2 { s - 2 } else { s + 1 }
}

/// Previous side within the same triangle.
#[inline]
pub fn prev_side(s: i32) -> i32 {
    if s % 3 == 0 { s + 2 } else { s - 1 }
}

/// The triangle a side belongs to.
#[inline]
pub fn triangle_of(s: i32) -> i32 {
    s / 3
}

/// Immutable dual mesh. All index arrays are `i32`; `-1` never appears in a
/// constructed mesh (ghost closure pairs every side).
#[derive(Debug)]
pub struct TriangleMesh {
    /// Side -> region the side starts from.
    triangles: Vec<i32>,
    /// Side -> opposite side.
    halfedges: Vec<i32>,
    /// Region -> one incoming side (`end_region(entry) == r`), or -1 for a
    /// region no triangle references.
    entry_side: Vec<i32>,
    r_pos: Vec<[f32; 2]>,
    t_pos: Vec<[f32; 2]>,
    num_solid_sides: usize,
    num_boundary_regions: usize,
}

impl TriangleMesh {
    pub(crate) fn build(
        points: Vec<[f64; 2]>,
        num_boundary_regions: usize,
        closed: ghost::ClosedTriangulation,
    ) -> Self {
        let ghost::ClosedTriangulation {
            triangles,
            halfedges,
            num_solid_sides,
        } = closed;
        assert!(num_boundary_regions <= points.len());

        let mut r_pos: Vec<[f32; 2]> = points
            .iter()
            .map(|p| [p[0] as f32, p[1] as f32])
            .collect();
        // Ghost region coordinates are a sentinel; the solid centroid keeps
        // them finite but no stage reads them (predicates gate all uses).
        let n = r_pos.len().max(1) as f32;
        let cx = r_pos.iter().map(|p| p[0]).sum::<f32>() / n;
        let cy = r_pos.iter().map(|p| p[1]).sum::<f32>() / n;
        r_pos.push([cx, cy]);

        let num_regions = r_pos.len();
        let mut entry_side = vec![-1i32; num_regions];
        for s in 0..triangles.len() as i32 {
            let end = triangles[next_side(s) as usize];
            if entry_side[end as usize] == -1 || halfedges[s as usize] == -1 {
                entry_side[end as usize] = s;
            }
        }

        let num_triangles = triangles.len() / 3;
        let num_solid_triangles = num_solid_sides / 3;
        let mut t_pos = vec![[0.0f32; 2]; num_triangles];
        for t in 0..num_solid_triangles {
            let a = r_pos[triangles[3 * t] as usize];
            let b = r_pos[triangles[3 * t + 1] as usize];
            let c = r_pos[triangles[3 * t + 2] as usize];
            t_pos[t] = [(a[0] + b[0] + c[0]) / 3.0, (a[1] + b[1] + c[1]) / 3.0];
        }
        // Ghost triangles sit just past the hull side they pair with.
        for t in num_solid_triangles..num_triangles {
            let s0 = (3 * t) as i32;
            let a = r_pos[triangles[s0 as usize] as usize];
            let b = r_pos[triangles[next_side(s0) as usize] as usize];
            let mid = [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0];
            let inner = t_pos[triangle_of(halfedges[s0 as usize]) as usize];
            let edge = [b[0] - a[0], b[1] - a[1]];
            let len = (edge[0] * edge[0] + edge[1] * edge[1]).sqrt().max(1e-6);
            let mut normal = [edge[1] / len, -edge[0] / len];
            if normal[0] * (mid[0] - inner[0]) + normal[1] * (mid[1] - inner[1]) < 0.0 {
                normal = [-normal[0], -normal[1]];
            }
            t_pos[t] = [
                mid[0] + GHOST_OFFSET * normal[0],
                mid[1] + GHOST_OFFSET * normal[1],
            ];
        }

        let mesh = Self {
            triangles,
            halfedges,
            entry_side,
            r_pos,
            t_pos,
            num_solid_sides,
            num_boundary_regions,
        };
        mesh.warn_skinny_triangles();
        mesh
    }

    // --- sizes ---

    #[inline]
    pub fn num_sides(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn num_solid_sides(&self) -> usize {
        self.num_solid_sides
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len() / 3
    }

    #[inline]
    pub fn num_solid_triangles(&self) -> usize {
        self.num_solid_sides / 3
    }

    #[inline]
    pub fn num_regions(&self) -> usize {
        self.r_pos.len()
    }

    #[inline]
    pub fn num_solid_regions(&self) -> usize {
        self.r_pos.len() - 1
    }

    #[inline]
    pub fn num_boundary_regions(&self) -> usize {
        self.num_boundary_regions
    }

    // --- side traversal ---

    /// Region the side starts from.
    #[inline]
    pub fn begin_region(&self, s: i32) -> i32 {
        self.triangles[s as usize]
    }

    /// Region the side points to.
    #[inline]
    pub fn end_region(&self, s: i32) -> i32 {
        self.triangles[next_side(s) as usize]
    }

    /// The paired half-edge going the other way.
    #[inline]
    pub fn opposite(&self, s: i32) -> i32 {
        self.halfedges[s as usize]
    }

    #[inline]
    pub fn inner_triangle(&self, s: i32) -> i32 {
        triangle_of(s)
    }

    /// Triangle on the far side of `s`.
    #[inline]
    pub fn outer_triangle(&self, s: i32) -> i32 {
        triangle_of(self.halfedges[s as usize])
    }

    /// One incoming side of the region (circulation start).
    #[inline]
    pub fn entry_side(&self, r: i32) -> i32 {
        self.entry_side[r as usize]
    }

    // --- positions ---

    #[inline]
    pub fn region_pos(&self, r: i32) -> [f32; 2] {
        self.r_pos[r as usize]
    }

    #[inline]
    pub fn triangle_pos(&self, t: i32) -> [f32; 2] {
        self.t_pos[t as usize]
    }

    /// Length of the side's primal edge (between its two regions). Only
    /// meaningful when neither endpoint is the ghost region.
    #[inline]
    pub fn side_length(&self, s: i32) -> f32 {
        let a = self.r_pos[self.begin_region(s) as usize];
        let b = self.r_pos[self.end_region(s) as usize];
        ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
    }

    // --- predicates ---

    #[inline]
    pub fn is_ghost_side(&self, s: i32) -> bool {
        s as usize >= self.num_solid_sides
    }

    #[inline]
    pub fn is_ghost_triangle(&self, t: i32) -> bool {
        self.is_ghost_side(3 * t)
    }

    #[inline]
    pub fn is_ghost_region(&self, r: i32) -> bool {
        r as usize == self.r_pos.len() - 1
    }

    #[inline]
    pub fn ghost_region(&self) -> i32 {
        (self.r_pos.len() - 1) as i32
    }

    #[inline]
    pub fn is_boundary_region(&self, r: i32) -> bool {
        (r as usize) < self.num_boundary_regions
    }

    #[inline]
    pub fn is_boundary_side(&self, s: i32) -> bool {
        self.is_ghost_side(s) && s % 3 == 0
    }

    // --- triangle circulation (fixed degree 3) ---

    pub fn triangle_sides(&self, t: i32) -> [i32; 3] {
        [3 * t, 3 * t + 1, 3 * t + 2]
    }

    pub fn triangle_regions(&self, t: i32) -> [i32; 3] {
        let s = (3 * t) as usize;
        [
            self.triangles[s],
            self.triangles[s + 1],
            self.triangles[s + 2],
        ]
    }

    pub fn triangle_triangles(&self, t: i32) -> [i32; 3] {
        [
            self.outer_triangle(3 * t),
            self.outer_triangle(3 * t + 1),
            self.outer_triangle(3 * t + 2),
        ]
    }

    // --- region circulation (caller-owned buffers) ---

    /// Incoming sides of `r`, CCW, each exactly once.
    pub fn region_sides(&self, r: i32, out: &mut Vec<i32>) {
        out.clear();
        let start = self.entry_side[r as usize];
        if start == -1 {
            return;
        }
        let cap = self.circulation_cap(r);
        let mut incoming = start;
        loop {
            out.push(incoming);
            assert!(
                out.len() <= cap,
                "region {r} circulation exceeded {cap} sides; mesh is corrupt"
            );
            let outgoing = next_side(incoming);
            incoming = self.halfedges[outgoing as usize];
            if incoming == -1 || incoming == start {
                break;
            }
        }
    }

    /// A solid region's degree is small; the ghost region's degree is the
    /// whole hull ring, so only a full wrap counts as corruption.
    #[inline]
    fn circulation_cap(&self, r: i32) -> usize {
        if self.is_ghost_region(r) {
            self.num_sides()
        } else {
            MAX_REGION_DEGREE
        }
    }

    /// Neighbor regions of `r`, CCW.
    pub fn region_regions(&self, r: i32, out: &mut Vec<i32>) {
        self.region_sides(r, out);
        for s in out.iter_mut() {
            *s = self.triangles[*s as usize];
        }
    }

    /// Triangles incident to `r`, CCW.
    pub fn region_triangles(&self, r: i32, out: &mut Vec<i32>) {
        self.region_sides(r, out);
        for s in out.iter_mut() {
            *s = triangle_of(*s);
        }
    }

    // --- validation ---

    /// Full structural check. Not called on hot paths; construction already
    /// validated the raw input arrays.
    pub fn validate(&self) -> Result<(), MeshError> {
        let num_sides = self.num_sides();
        for s in 0..num_sides as i32 {
            let o = self.halfedges[s as usize];
            if o < 0 || o as usize >= num_sides {
                return Err(MeshError::OppositeOutOfRange {
                    side: s as usize,
                    opposite: o,
                    num_sides,
                });
            }
            if o == s || self.halfedges[o as usize] != s {
                return Err(MeshError::BrokenInvolution(s));
            }
            // The two halves of an edge must join the same two regions.
            if self.begin_region(o) != self.end_region(s)
                || self.end_region(o) != self.begin_region(s)
            {
                return Err(MeshError::BrokenInvolution(s));
            }
        }

        // Every side is the incoming side of exactly one region circulation.
        let mut visited = vec![false; num_sides];
        for r in 0..self.num_regions() as i32 {
            let start = self.entry_side[r as usize];
            if start == -1 {
                continue;
            }
            let cap = self.circulation_cap(r);
            let mut incoming = start;
            for step in 0.. {
                if step >= cap {
                    return Err(MeshError::CirculationStuck(r));
                }
                if self.end_region(incoming) != r || visited[incoming as usize] {
                    return Err(MeshError::CirculationStuck(r));
                }
                visited[incoming as usize] = true;
                let outgoing = next_side(incoming);
                incoming = self.halfedges[outgoing as usize];
                if incoming == start {
                    break;
                }
            }
        }
        if let Some(s) = visited.iter().position(|&v| !v) {
            return Err(MeshError::CirculationStuck(self.end_region(s as i32)));
        }
        Ok(())
    }

    fn warn_skinny_triangles(&self) {
        let mut skinny = 0usize;
        for t in 0..self.num_solid_triangles() as i32 {
            let [ra, rb, rc] = self.triangle_regions(t);
            let a = self.r_pos[ra as usize];
            let b = self.r_pos[rb as usize];
            let c = self.r_pos[rc as usize];
            let ab = [b[0] - a[0], b[1] - a[1]];
            let ac = [c[0] - a[0], c[1] - a[1]];
            let cross = (ab[0] * ac[1] - ab[1] * ac[0]).abs();
            let longest_sq = (ab[0] * ab[0] + ab[1] * ab[1])
                .max(ac[0] * ac[0] + ac[1] * ac[1])
                .max((b[0] - c[0]).powi(2) + (b[1] - c[1]).powi(2));
            if longest_sq > 0.0 && cross / longest_sq < 0.005 {
                skinny += 1;
            }
        }
        if skinny > 0 {
            log::warn!("{skinny} skinny triangles in mesh");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_mesh() -> TriangleMesh {
        let points = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        TriangleMesh::from_points(points, 0).unwrap()
    }

    #[test]
    fn side_arithmetic_wraps_within_triangle() {
        assert_eq!(next_side(3), 4);
        assert_eq!(next_side(4), 5);
        assert_eq!(next_side(5), 3);
        assert_eq!(prev_side(3), 5);
        assert_eq!(prev_side(5), 4);
        assert_eq!(triangle_of(7), 2);
    }

    #[test]
    fn square_closes_with_four_ghost_triangles() {
        let mesh = square_mesh();
        // 2 solid triangles + one ghost per hull side.
        assert_eq!(mesh.num_solid_triangles(), 2);
        assert_eq!(mesh.num_triangles(), 6);
        assert_eq!(mesh.num_sides(), 18);
        assert_eq!(mesh.num_regions(), 5);
        assert_eq!(mesh.num_solid_regions(), 4);
        assert!(mesh.is_ghost_region(4));
    }

    #[test]
    fn opposite_is_an_involution() {
        let mesh = square_mesh();
        for s in 0..mesh.num_sides() as i32 {
            let o = mesh.opposite(s);
            assert!(o >= 0, "side {s} left unpaired");
            assert_ne!(o, s);
            assert_eq!(mesh.opposite(o), s);
        }
    }

    #[test]
    fn halves_join_the_same_regions() {
        let mesh = square_mesh();
        for s in 0..mesh.num_sides() as i32 {
            let o = mesh.opposite(s);
            assert_eq!(mesh.begin_region(o), mesh.end_region(s));
            assert_eq!(mesh.end_region(o), mesh.begin_region(s));
            assert_eq!(mesh.end_region(s), mesh.begin_region(next_side(s)));
        }
    }

    #[test]
    fn ghost_triangles_have_ghost_third_corner() {
        let mesh = square_mesh();
        for t in mesh.num_solid_triangles() as i32..mesh.num_triangles() as i32 {
            assert!(mesh.is_ghost_triangle(t));
            let regions = mesh.triangle_regions(t);
            assert!(mesh.is_ghost_region(regions[2]));
            assert!(!mesh.is_ghost_region(regions[0]));
            assert!(!mesh.is_ghost_region(regions[1]));
        }
    }

    #[test]
    fn region_circulation_visits_each_incident_side_once() {
        let mesh = square_mesh();
        let mut buf = Vec::new();
        let mut total = 0;
        for r in 0..mesh.num_regions() as i32 {
            mesh.region_sides(r, &mut buf);
            for &s in &buf {
                assert_eq!(mesh.end_region(s), r);
            }
            let mut sorted = buf.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), buf.len(), "region {r} revisited a side");
            total += buf.len();
        }
        assert_eq!(total, mesh.num_sides());
    }

    #[test]
    fn solid_centroids_average_region_positions() {
        let mesh = square_mesh();
        for t in 0..mesh.num_solid_triangles() as i32 {
            let [ra, rb, rc] = mesh.triangle_regions(t);
            let a = mesh.region_pos(ra);
            let b = mesh.region_pos(rb);
            let c = mesh.region_pos(rc);
            let pos = mesh.triangle_pos(t);
            assert!((pos[0] - (a[0] + b[0] + c[0]) / 3.0).abs() < 1e-6);
            assert!((pos[1] - (a[1] + b[1] + c[1]) / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn ghost_triangles_sit_outside_the_hull() {
        let mesh = square_mesh();
        for t in mesh.num_solid_triangles() as i32..mesh.num_triangles() as i32 {
            let [x, y] = mesh.triangle_pos(t);
            // Unit square: anything well outside [0,1]² qualifies.
            assert!(
                x < -1.0 || x > 2.0 || y < -1.0 || y > 2.0,
                "ghost triangle {t} at ({x},{y}) is not outside the hull"
            );
        }
    }

    #[test]
    fn validate_accepts_constructed_mesh() {
        square_mesh().validate().unwrap();
    }

    #[test]
    fn long_hull_ghost_circulation_is_legitimate() {
        // At spacing 10 the hull ring is several hundred sides; the ghost
        // region's degree equals that ring and must not trip the solid cap.
        let (mut pts, _) = boundary::boundary_points(&boundary::Bounds::STANDARD, 10.0);
        let num_boundary = pts.len();
        pts.extend(points::interior_points(
            &boundary::Bounds::STANDARD,
            10.0,
            &mut crate::rng::Rng::new(2),
        ));
        let mesh = TriangleMesh::from_points(pts, num_boundary).unwrap();

        let num_ghost_triangles = mesh.num_triangles() - mesh.num_solid_triangles();
        assert!(num_ghost_triangles > MAX_REGION_DEGREE);

        let mut sides = Vec::new();
        mesh.region_sides(mesh.ghost_region(), &mut sides);
        assert_eq!(sides.len(), num_ghost_triangles);
        for &s in &sides {
            assert_eq!(mesh.end_region(s), mesh.ghost_region());
        }
        mesh.validate().unwrap();
    }

    #[test]
    fn boundary_region_flags_follow_point_order() {
        let points = vec![
            [0.0, 0.0],
            [10.0, 0.0],
            [10.0, 10.0],
            [0.0, 10.0],
            [5.0, 5.0],
        ];
        let mesh = TriangleMesh::from_points(points, 4).unwrap();
        for r in 0..4 {
            assert!(mesh.is_boundary_region(r));
        }
        assert!(!mesh.is_boundary_region(4));
    }
}
