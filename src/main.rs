use polymap::config::Params;
use polymap::mesh::TriangleMesh;
use polymap::mesh::boundary::{Bounds, boundary_points};
use polymap::mesh::points::interior_points;
use polymap::rng::Rng;
use polymap::Map;

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    let seed: u32 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(42);
    let spacing: f32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10.0);

    let params = Params {
        seed,
        spacing,
        ..Params::default()
    };

    let bounds = Bounds::STANDARD;
    let (mut points, _) = boundary_points(&bounds, spacing as f64);
    let num_boundary = points.len();
    points.extend(interior_points(
        &bounds,
        spacing as f64,
        &mut Rng::new(seed),
    ));

    eprintln!(
        "Generating map with seed={} spacing={} ({} points, {} boundary)",
        seed,
        spacing,
        points.len(),
        num_boundary
    );

    let mesh = TriangleMesh::from_points(points, num_boundary).expect("mesh construction failed");
    eprintln!(
        "mesh: {} regions, {} triangles ({} ghost), {} sides",
        mesh.num_regions(),
        mesh.num_triangles(),
        mesh.num_triangles() - mesh.num_solid_triangles(),
        mesh.num_sides()
    );

    let mut map = Map::new(mesh, params);
    let timings = map.generate(None);

    eprintln!("\nTimings:");
    for t in &timings {
        eprintln!("  {:12} {:8.1} ms", t.name, t.ms);
    }

    let mesh = map.mesh();
    let land = (0..mesh.num_solid_regions())
        .filter(|&r| !map.r_water[r])
        .count();
    let max_flow = map.s_flow.iter().cloned().fold(0.0f32, f32::max);
    let river_sides = map.s_flow.iter().filter(|&&f| f > 0.1).count();
    eprintln!(
        "\nland {:.1}% of {} regions | {} coast triangles | {} peaks | max flow {:.2} | {} river sides",
        100.0 * land as f64 / mesh.num_solid_regions() as f64,
        mesh.num_solid_regions(),
        map.coast_t.len(),
        map.peak_t.len(),
        max_flow,
        river_sides
    );
}
