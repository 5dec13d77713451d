//! Benchmarks for MVC flip repair.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use convexuv::algo::parameterize::{
    color_faces, repair_flips, triangulate_convex_hull, MvcOptions, Preconditioner, UVMap,
};
use convexuv::prelude::*;
use nalgebra::{Point2, Point3};

/// L-shaped grid patch: an `n x n` grid with the upper right quadrant
/// removed, so the UV border has a reflex corner and the hull has gaps.
fn create_l_patch(n: usize) -> HalfEdgeMesh {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n * 2);

    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point3::new(i as f64, j as f64, 0.0));
        }
    }

    let half = n / 2;
    for j in 0..n {
        for i in 0..n {
            if i >= half && j >= half {
                continue;
            }
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;

            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    build_from_triangles(&vertices, &faces).unwrap()
}

/// Planar UVs with one interior vertex dragged across its neighbors.
fn folded_uvs(mesh: &HalfEdgeMesh, n: usize) -> UVMap {
    let mut uv = UVMap::new(
        mesh.vertex_ids()
            .map(|v| {
                let p = mesh.position(v);
                Point2::new(p.x, p.y)
            })
            .collect(),
    );
    let q = n / 4;
    let v = VertexId::new(q * (n + 1) + q);
    let p = uv.get(v);
    uv.set(v, Point2::new(p.x + 1.5, p.y + 0.3));
    uv
}

fn bench_hull_triangulation(c: &mut Criterion) {
    let n = 40;
    let mesh = create_l_patch(n);
    let uv = folded_uvs(&mesh, n);
    let border = mesh.longest_boundary_loop().unwrap();

    c.bench_function("triangulate_convex_hull_l40", |b| {
        b.iter(|| {
            let gap = triangulate_convex_hull(&mesh, border, &uv).unwrap();
            color_faces(&gap).gap_faces(&gap).count()
        });
    });
}

fn bench_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("repair_flips");
    group.sample_size(20);

    for &n in &[20usize, 40] {
        let mesh = create_l_patch(n);
        let uv = folded_uvs(&mesh, n);

        for (name, options) in [
            ("ilu0_parallel", MvcOptions::default()),
            ("ilu0_sequential", MvcOptions::default().sequential()),
            (
                "jacobi_parallel",
                MvcOptions::default().with_preconditioner(Preconditioner::Jacobi),
            ),
        ] {
            group.bench_with_input(BenchmarkId::new(name, n), &n, |b, _| {
                b.iter(|| {
                    let mut repaired = uv.clone();
                    repair_flips(&mesh, &mut repaired, &options).unwrap();
                    repaired
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_hull_triangulation, bench_repair);
criterion_main!(benches);
