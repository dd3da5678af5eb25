use criterion::{black_box, criterion_group, criterion_main, Criterion};

use glam::{Vec2, Vec3};
use tilerast::{MeshBuffer, PixelShader, Renderer};

/// A fan of large overlapping triangles in NDC, enough to exercise binning,
/// the hierarchical walk and the depth test.
fn fan_mesh(triangles: usize) -> MeshBuffer {
    let mut mesh = MeshBuffer::new();
    let center = mesh.push_vertex(Vec3::new(0.0, 0.0, 0.5), Vec3::Z, Vec2::ZERO);
    let rim: Vec<u32> = (0..=triangles)
        .map(|i| {
            let a = i as f32 / triangles as f32 * std::f32::consts::TAU;
            let z = 0.3 + 0.4 * (i as f32 / triangles as f32);
            mesh.push_vertex(Vec3::new(0.9 * a.cos(), 0.9 * a.sin(), z), Vec3::Z, Vec2::ZERO)
        })
        .collect();
    for i in 0..triangles {
        mesh.push_triangle([center, rim[i], rim[i + 1]], 0);
    }
    mesh
}

fn fill_rate(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill rate");

    let mesh = fan_mesh(256);

    for (name, msaa) in [("1x", 0u32), ("4x", 2u32)] {
        let mut renderer = Renderer::new(720, 720).unwrap();
        renderer.set_msaa(msaa).unwrap();
        renderer.set_back_face_culling(false);
        renderer.set_pixel_shader(PixelShader::Lambertian);

        group.bench_function(name, |b| {
            b.iter(|| {
                renderer.render_mesh(&mesh);
                black_box(renderer.back_buffer());
            })
        });
    }

    group.finish();
}

criterion_group!(benches, fill_rate);
criterion_main!(benches);
