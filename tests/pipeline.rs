//! End-to-end pipeline tests: geometry goes in as NDC-space meshes, pixels
//! come out of the resolved backbuffer.

use glam::{Mat4, Vec2, Vec3};

use tilerast::{raster_matrix, MeshBuffer, PixelShader, Renderer, TextureSlot};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

/// NDC position that lands exactly on the given pixel coordinate under the
/// standard raster matrix for a `size`-square framebuffer.
fn ndc(px: f32, py: f32, z: f32, size: f32) -> Vec3 {
    Vec3::new(px / (size / 2.0) - 1.0, 1.0 - py / (size / 2.0), z)
}

fn pixel(r: &Renderer, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * r.width() + x) * 4) as usize;
    let b = r.back_buffer();
    [b[i], b[i + 1], b[i + 2], b[i + 3]]
}

fn screen_tri_mesh(points: [(f32, f32); 3], z: f32, size: f32) -> MeshBuffer {
    let mut mesh = MeshBuffer::new();
    let ids = points.map(|(x, y)| {
        mesh.push_vertex(ndc(x, y, z, size), Vec3::Z, Vec2::ZERO)
    });
    mesh.push_triangle(ids, 0);
    mesh
}

fn white_renderer(size: u32) -> Renderer {
    let mut r = Renderer::new(size, size).unwrap();
    r.set_back_face_culling(false);
    r.set_pixel_shader(PixelShader::Solid(Vec3::ONE));
    r
}

// A single white triangle, no multisampling.
#[test]
fn single_triangle_flat_coverage() {
    let mut r = white_renderer(256);
    let mesh = screen_tri_mesh([(64.0, 64.0), (192.0, 64.0), (128.0, 192.0)], 0.5, 256.0);
    r.render_mesh(&mesh);

    assert_eq!(pixel(&r, 128, 100), WHITE);
    assert_eq!(pixel(&r, 32, 32), BLACK);
    // The top-left vertex pixel is covered (its center is inside, and the
    // top/left boundary edges are fill edges).
    assert_eq!(pixel(&r, 64, 64), WHITE);
    // Just outside the top edge stays background.
    assert_eq!(pixel(&r, 128, 63), BLACK);
}

// The same triangle at 4x MSAA.
#[test]
fn msaa4_partial_coverage_on_the_edge() {
    let mut r = white_renderer(256);
    r.set_msaa(2).unwrap();
    let mesh = screen_tri_mesh([(64.0, 64.0), (192.0, 64.0), (128.0, 192.0)], 0.5, 256.0);
    r.render_mesh(&mesh);

    // Strictly interior pixels match the single-sample render.
    assert_eq!(pixel(&r, 128, 100), WHITE);
    assert_eq!(pixel(&r, 32, 32), BLACK);
    // Pixel (96, 128) sits exactly on the left edge: 3 of the 4 standard
    // sample positions are inside.
    let edge = pixel(&r, 96, 128);
    assert!(
        (191..=193).contains(&edge[0]),
        "edge pixel should be ~3/4 covered, got {edge:?}"
    );
    assert_eq!(edge[0], edge[1]);
    assert_eq!(edge[1], edge[2]);
}

// The nearer of two overlapping triangles wins the depth test,
// independent of submission order.
#[test]
fn overlap_resolves_to_the_near_triangle() {
    let mut r = Renderer::new(64, 64).unwrap();
    r.set_back_face_culling(false);
    r.set_pixel_shader(PixelShader::LambertianAlbedo);
    r.set_light_dir(Vec3::Z);

    let mut mesh = MeshBuffer::new();
    mesh.textures = vec![
        TextureSlot::solid([255, 0, 0, 255]),
        TextureSlot::solid([0, 255, 0, 255]),
    ];
    // Far red triangle first, near green second, both over the center.
    let far = [(8.0, 8.0), (56.0, 8.0), (32.0, 56.0)].map(|(x, y)| ndc(x, y, 0.8, 64.0));
    let near = [(8.0, 12.0), (56.0, 12.0), (32.0, 60.0)].map(|(x, y)| ndc(x, y, 0.2, 64.0));
    let f = far.map(|p| mesh.push_vertex(p, Vec3::Z, Vec2::ZERO));
    mesh.push_triangle(f, 0);
    let n = near.map(|p| mesh.push_vertex(p, Vec3::Z, Vec2::ZERO));
    mesh.push_triangle(n, 1);
    r.render_mesh(&mesh);

    let overlap = pixel(&r, 32, 30);
    assert!(overlap[1] > 150, "overlap should be green, got {overlap:?}");
    assert!(overlap[0] < 30, "red should lose the depth test, got {overlap:?}");
}

fn unit_cube() -> MeshBuffer {
    let mut mesh = MeshBuffer::new();
    // (center, u, v) per face with u x v pointing outward; corners wound
    // counter-clockwise seen from outside.
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::new(0.0, 0.0, 0.5), Vec3::X, Vec3::Y),
        (Vec3::new(0.0, 0.0, -0.5), Vec3::Y, Vec3::X),
        (Vec3::new(0.5, 0.0, 0.0), Vec3::Y, Vec3::Z),
        (Vec3::new(-0.5, 0.0, 0.0), Vec3::Z, Vec3::Y),
        (Vec3::new(0.0, 0.5, 0.0), Vec3::Z, Vec3::X),
        (Vec3::new(0.0, -0.5, 0.0), Vec3::X, Vec3::Z),
    ];
    for (center, u, v) in faces {
        let normal = u.cross(v);
        let corners = [
            center - u * 0.5 - v * 0.5,
            center + u * 0.5 - v * 0.5,
            center + u * 0.5 + v * 0.5,
            center - u * 0.5 + v * 0.5,
        ];
        let ids = corners.map(|p| mesh.push_vertex(p, normal, Vec2::ZERO));
        mesh.push_triangle([ids[0], ids[1], ids[2]], 0);
        mesh.push_triangle([ids[0], ids[2], ids[3]], 0);
    }
    mesh
}

// Perspective cube with back-face culling and 8x MSAA.
#[test]
fn perspective_cube_has_antialiased_silhouette() {
    let mut r = Renderer::new(128, 128).unwrap();
    r.set_msaa(3).unwrap();
    r.set_pixel_shader(PixelShader::Solid(Vec3::ONE));
    let mv = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
    r.set_transform(mv, proj, raster_matrix(128, 128)).unwrap();
    r.render_mesh(&unit_cube());

    assert_eq!(pixel(&r, 64, 64), WHITE);
    assert_eq!(pixel(&r, 2, 2), BLACK);
    assert_eq!(pixel(&r, 125, 125), BLACK);

    // Somewhere along the silhouette a pixel is partially covered.
    let partial = (0..128 * 128).any(|i| {
        let v = r.back_buffer()[i * 4];
        v != 0 && v != 255
    });
    assert!(partial, "8x MSAA should leave partially-covered silhouette pixels");
}

// Culling on and off agree on the cube interior: back faces lose the depth
// test anyway.
#[test]
fn culled_and_unculled_cubes_share_the_interior() {
    let mut images = Vec::new();
    for culling in [true, false] {
        let mut r = Renderer::new(64, 64).unwrap();
        r.set_back_face_culling(culling);
        r.set_pixel_shader(PixelShader::Solid(Vec3::ONE));
        let mv = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        r.set_transform(mv, proj, raster_matrix(64, 64)).unwrap();
        r.render_mesh(&unit_cube());
        images.push(r.back_buffer().to_vec());
    }
    assert_eq!(images[0], images[1]);
}

// At 2x MSAA a triangle covering only sample 0 resolves to half
// foreground, half background.
#[test]
fn msaa2_single_sample_coverage_resolves_to_half() {
    let mut r = white_renderer(64);
    r.set_msaa(1).unwrap();
    // Covers the (0.75, 0.75) standard sample of pixel (10, 10) and nothing
    // else.
    let mesh = screen_tri_mesh([(10.6, 10.6), (10.95, 10.6), (10.75, 10.95)], 0.5, 64.0);
    r.render_mesh(&mesh);

    let px = pixel(&r, 10, 10);
    assert!(
        (127..=129).contains(&px[0]),
        "expected half coverage, got {px:?}"
    );
    // The neighbours stay untouched.
    assert_eq!(pixel(&r, 9, 10), BLACK);
    assert_eq!(pixel(&r, 11, 10), BLACK);
}

// Wholly behind the near plane renders nothing.
#[test]
fn triangle_behind_near_plane_leaves_clear_color() {
    let mut r = white_renderer(64);
    r.set_clear_color([10, 20, 30, 255]);
    let mesh = screen_tri_mesh([(8.0, 8.0), (56.0, 8.0), (32.0, 56.0)], -0.5, 64.0);
    r.render_mesh(&mesh);

    for y in 0..64 {
        for x in 0..64 {
            assert_eq!(pixel(&r, x, y), [10, 20, 30, 255]);
        }
    }
}

// A triangle fully outside the viewport contributes nothing either.
#[test]
fn offscreen_triangle_contributes_no_fragments() {
    let mut r = white_renderer(64);
    let mesh = screen_tri_mesh([(100.0, 8.0), (150.0, 8.0), (120.0, 50.0)], 0.5, 64.0);
    r.render_mesh(&mesh);
    assert!(r.back_buffer().chunks_exact(4).all(|px| px == BLACK));
}

// Rendering twice with identical state is bitwise deterministic.
#[test]
fn repeated_renders_are_bitwise_identical() {
    let mesh = screen_tri_mesh([(13.7, 9.2), (55.1, 21.8), (24.4, 58.9)], 0.3, 64.0);
    let mut r = white_renderer(64);
    r.set_msaa(2).unwrap();
    r.render_mesh(&mesh);
    let first = r.back_buffer().to_vec();
    r.render_mesh(&mesh);
    assert_eq!(first, r.back_buffer());
}

// With culling disabled, winding is invisible to the output.
#[test]
fn reversed_winding_renders_identically_without_culling() {
    let mesh = screen_tri_mesh([(8.0, 8.0), (56.0, 8.0), (32.0, 56.0)], 0.5, 64.0);
    let reversed = mesh.reversed_winding();

    let mut a = white_renderer(64);
    a.render_mesh(&mesh);
    let mut b = white_renderer(64);
    b.render_mesh(&reversed);
    assert_eq!(a.back_buffer(), b.back_buffer());
}

// A mesh straddling the right clip plane keeps its on-screen half.
#[test]
fn clipped_triangle_keeps_its_visible_part() {
    let mut r = white_renderer(64);
    // Extends past the right edge of NDC.
    let mut mesh = MeshBuffer::new();
    let ids = [
        Vec3::new(0.0, -0.5, 0.5),
        Vec3::new(1.5, 0.0, 0.5),
        Vec3::new(0.0, 0.5, 0.5),
    ]
    .map(|p| mesh.push_vertex(p, Vec3::Z, Vec2::ZERO));
    mesh.push_triangle(ids, 0);
    r.render_mesh(&mesh);

    // Interior on the visible side.
    assert_eq!(pixel(&r, 40, 32), WHITE);
    // The clipped-off part never wraps anywhere.
    assert_eq!(pixel(&r, 2, 32), BLACK);
}

// MSAA smooths an edge that single-sampling aliases.
#[test]
fn msaa_reduces_silhouette_aliasing() {
    let tri = [(5.0, 5.0), (58.9, 17.3), (20.0, 60.0)];
    let mut aliased = white_renderer(64);
    aliased.render_mesh(&screen_tri_mesh(tri, 0.5, 64.0));
    let mut smooth = white_renderer(64);
    smooth.set_msaa(2).unwrap();
    smooth.render_mesh(&screen_tri_mesh(tri, 0.5, 64.0));

    let partials = |r: &Renderer| {
        r.back_buffer()
            .chunks_exact(4)
            .filter(|px| px[0] != 0 && px[0] != 255)
            .count()
    };
    assert_eq!(partials(&aliased), 0);
    assert!(partials(&smooth) > 0);
}
