use glam::{Vec2, Vec3};

use crate::texture::TextureSlot;

/// Read-only mesh interface consumed by the pipeline. Loaders live outside
/// the crate; anything that can answer these queries can be rendered.
pub trait Mesh {
    fn vertex_count(&self) -> usize;
    fn position(&self, i: usize) -> Vec3;
    fn normal(&self, i: usize) -> Vec3;
    fn tex_coord(&self, i: usize) -> Vec2;

    fn triangle_count(&self) -> usize;
    fn index(&self, i: usize) -> [u32; 3];
    /// Texture slot used by triangle `i`. Out-of-range ids are clamped to 0
    /// at sample time.
    fn texture_id(&self, i: usize) -> u32;

    fn textures(&self) -> &[TextureSlot];
}

/// INVARIANT: positions, normals and uvs have the same length; indices and
/// texture_ids have the same length.
#[derive(Clone, Default)]
pub struct MeshBuffer {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<[u32; 3]>,
    pub texture_ids: Vec<u32>,
    pub textures: Vec<TextureSlot>,
}

impl MeshBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3, uv: Vec2) -> u32 {
        let id = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        self.uvs.push(uv);
        id
    }

    pub fn push_triangle(&mut self, indices: [u32; 3], texture_id: u32) {
        self.indices.push(indices);
        self.texture_ids.push(texture_id);
    }

    /// Same mesh with every triangle's winding reversed.
    pub fn reversed_winding(&self) -> MeshBuffer {
        let mut out = self.clone();
        for tri in &mut out.indices {
            tri.swap(1, 2);
        }
        out
    }
}

impl Mesh for MeshBuffer {
    fn vertex_count(&self) -> usize {
        debug_assert_eq!(self.positions.len(), self.normals.len());
        debug_assert_eq!(self.positions.len(), self.uvs.len());
        self.positions.len()
    }

    #[inline]
    fn position(&self, i: usize) -> Vec3 {
        self.positions[i]
    }

    #[inline]
    fn normal(&self, i: usize) -> Vec3 {
        self.normals[i]
    }

    #[inline]
    fn tex_coord(&self, i: usize) -> Vec2 {
        self.uvs[i]
    }

    fn triangle_count(&self) -> usize {
        debug_assert_eq!(self.indices.len(), self.texture_ids.len());
        self.indices.len()
    }

    #[inline]
    fn index(&self, i: usize) -> [u32; 3] {
        self.indices[i]
    }

    #[inline]
    fn texture_id(&self, i: usize) -> u32 {
        self.texture_ids[i]
    }

    fn textures(&self) -> &[TextureSlot] {
        &self.textures
    }
}
