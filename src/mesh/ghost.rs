//! Hull closure: pairs every unpaired half-edge with a ghost triangle so the
//! mesh has no boundary cases, plus the adapter feeding `delaunator` output
//! into the builder.

use delaunator::{EMPTY, Point, triangulate};

use super::{MeshError, TriangleMesh, next_side};

/// Triangulation arrays after ghost closure. Sides `num_solid_sides..` are
/// ghost sides.
pub(crate) struct ClosedTriangulation {
    pub triangles: Vec<i32>,
    pub halfedges: Vec<i32>,
    pub num_solid_sides: usize,
}

fn validate_input(
    num_regions: usize,
    triangles: &[i32],
    halfedges: &[i32],
) -> Result<(), MeshError> {
    if triangles.len() % 3 != 0 {
        return Err(MeshError::SideCount(triangles.len()));
    }
    if triangles.len() != halfedges.len() {
        return Err(MeshError::LengthMismatch {
            triangles: triangles.len(),
            halfedges: halfedges.len(),
        });
    }
    for (side, &region) in triangles.iter().enumerate() {
        if region < 0 || region as usize >= num_regions {
            return Err(MeshError::RegionOutOfRange {
                side,
                region,
                num_regions,
            });
        }
    }
    for (side, &opposite) in halfedges.iter().enumerate() {
        if opposite == -1 {
            continue;
        }
        if opposite < 0 || opposite as usize >= halfedges.len() {
            return Err(MeshError::OppositeOutOfRange {
                side,
                opposite,
                num_sides: halfedges.len(),
            });
        }
        if opposite as usize == side || halfedges[opposite as usize] != side as i32 {
            return Err(MeshError::BrokenInvolution(side as i32));
        }
    }
    Ok(())
}

/// Walk the hull and append one ghost triangle per unpaired side. Side 0 of
/// each ghost triangle pairs with its hull side, side 1 wraps the hull, and
/// side 2 chains to the next ghost triangle's side 1.
pub(crate) fn close_hull(
    num_solid_regions: usize,
    mut triangles: Vec<i32>,
    mut halfedges: Vec<i32>,
) -> ClosedTriangulation {
    let old_len = triangles.len();
    let ghost_r = num_solid_regions as i32;

    let mut unpaired_of_region = vec![-1i32; num_solid_regions];
    let mut num_unpaired = 0usize;
    let mut first_unpaired = -1i32;
    for s in 0..old_len {
        if halfedges[s] == -1 {
            num_unpaired += 1;
            unpaired_of_region[triangles[s] as usize] = s as i32;
            if first_unpaired == -1 {
                first_unpaired = s as i32;
            }
        }
    }
    if num_unpaired == 0 {
        return ClosedTriangulation {
            triangles,
            halfedges,
            num_solid_sides: old_len,
        };
    }

    triangles.resize(old_len + 3 * num_unpaired, -1);
    halfedges.resize(old_len + 3 * num_unpaired, -1);

    let mut s = first_unpaired;
    for i in 0..num_unpaired {
        let s_ghost = (old_len + 3 * i) as i32;
        let end_r = triangles[next_side(s) as usize];

        halfedges[s as usize] = s_ghost;
        halfedges[s_ghost as usize] = s;
        triangles[s_ghost as usize] = end_r;
        triangles[(s_ghost + 1) as usize] = triangles[s as usize];
        triangles[(s_ghost + 2) as usize] = ghost_r;

        let k = (old_len + (3 * i + 4) % (3 * num_unpaired)) as i32;
        halfedges[(s_ghost + 2) as usize] = k;
        halfedges[k as usize] = s_ghost + 2;

        s = unpaired_of_region[end_r as usize];
    }

    ClosedTriangulation {
        triangles,
        halfedges,
        num_solid_sides: old_len,
    }
}

impl TriangleMesh {
    /// Build a mesh from raw triangulator output (`-1` marks hull sides).
    /// The first `num_boundary_regions` points are flagged as boundary.
    pub fn from_triangulation(
        points: Vec<[f64; 2]>,
        num_boundary_regions: usize,
        triangles: Vec<i32>,
        halfedges: Vec<i32>,
    ) -> Result<Self, MeshError> {
        validate_input(points.len(), &triangles, &halfedges)?;
        let closed = close_hull(points.len(), triangles, halfedges);
        Ok(Self::build(points, num_boundary_regions, closed))
    }

    /// Triangulate the points with `delaunator` and build the closed mesh.
    pub fn from_points(
        points: Vec<[f64; 2]>,
        num_boundary_regions: usize,
    ) -> Result<Self, MeshError> {
        let sites: Vec<Point> = points.iter().map(|p| Point { x: p[0], y: p[1] }).collect();
        let triangulation = triangulate(&sites);
        if triangulation.triangles.is_empty() {
            return Err(MeshError::EmptyTriangulation(points.len()));
        }
        let triangles: Vec<i32> = triangulation.triangles.iter().map(|&v| v as i32).collect();
        let halfedges: Vec<i32> = triangulation
            .halfedges
            .iter()
            .map(|&v| if v == EMPTY { -1 } else { v as i32 })
            .collect();
        Self::from_triangulation(points, num_boundary_regions, triangles, halfedges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ghost_count_matches_hull_sides() {
        // A single triangle has three hull sides.
        let points = vec![[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]];
        let mesh = TriangleMesh::from_points(points, 0).unwrap();
        assert_eq!(mesh.num_solid_triangles(), 1);
        assert_eq!(mesh.num_triangles(), 4);
        mesh.validate().unwrap();
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = TriangleMesh::from_triangulation(
            vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            0,
            vec![0, 1, 2],
            vec![-1, -1],
        )
        .unwrap_err();
        assert!(matches!(err, MeshError::LengthMismatch { .. }));
    }

    #[test]
    fn rejects_out_of_range_region() {
        let err = TriangleMesh::from_triangulation(
            vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            0,
            vec![0, 1, 7],
            vec![-1, -1, -1],
        )
        .unwrap_err();
        assert!(matches!(err, MeshError::RegionOutOfRange { .. }));
    }

    #[test]
    fn rejects_broken_involution() {
        let err = TriangleMesh::from_triangulation(
            vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            0,
            vec![0, 1, 2],
            vec![1, -1, -1],
        )
        .unwrap_err();
        assert!(matches!(err, MeshError::BrokenInvolution(_)));
    }

    #[test]
    fn closure_pairs_every_ghost_side() {
        let points = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let mesh = TriangleMesh::from_points(points, 0).unwrap();
        for t in mesh.num_solid_triangles() as i32..mesh.num_triangles() as i32 {
            for s in mesh.triangle_sides(t) {
                assert!(mesh.opposite(s) >= 0);
            }
        }
    }
}
