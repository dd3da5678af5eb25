use glam::{Vec2, Vec3, Vec4};
use rayon::prelude::*;

use crate::mesh::Mesh;
use crate::state::RenderState;

/// A mesh vertex as consumed by the vertex processor.
#[derive(Clone, Copy, Debug)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

/// Vertex shader output. `pos` stays in raw clip space until triangle setup;
/// the clipper interpolates it linearly, which only works pre-divide.
/// `inv_w` is written once where the vertex is produced: here for source
/// vertices, in the clipper for vertices it generates.
#[derive(Clone, Copy, Debug)]
pub struct ProjectedVertex {
    pub pos: Vec4,
    pub inv_w: f32,
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl ProjectedVertex {
    pub fn from_clip(pos: Vec4, position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        ProjectedVertex {
            pos,
            inv_w: if pos.w != 0.0 { 1.0 / pos.w } else { 0.0 },
            position,
            normal,
            uv,
        }
    }
}

/// The fixed vertex shader: project by the model-view-projection matrix and
/// pass model-space attributes through.
#[inline]
pub fn shade_vertex(state: &RenderState, v: Vertex) -> ProjectedVertex {
    let clip = state.model_view_proj * v.position.extend(1.0);
    ProjectedVertex::from_clip(clip, v.position, v.normal, v.uv)
}

/// Vertex processing stage: data-parallel over the mesh's vertex buffer.
pub fn process_vertices<M: Mesh + Sync>(state: &RenderState, mesh: &M) -> Vec<ProjectedVertex> {
    (0..mesh.vertex_count())
        .into_par_iter()
        .map(|i| {
            shade_vertex(
                state,
                Vertex {
                    position: mesh.position(i),
                    normal: mesh.normal(i),
                    uv: mesh.tex_coord(i),
                },
            )
        })
        .collect()
}
