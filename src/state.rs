use glam::{Mat4, Vec3};

/// Highest multisample level the pipeline accepts: level 4 is 16 samples.
/// Coverage masks are sized for a hard ceiling of 32 samples per pixel.
pub const MAX_MSAA_LEVEL: u32 = 4;
pub const MAX_SAMPLES: usize = 32;

/// All per-frame rendering configuration, owned by the renderer and handed to
/// the pipeline stages as a shared read-only view. Mutating it mid-frame is
/// impossible by construction: the stage entry points borrow it immutably.
#[derive(Clone, Debug)]
pub struct RenderState {
    pub model_view: Mat4,
    pub model_view_inv: Mat4,
    pub proj: Mat4,
    pub model_view_proj: Mat4,
    /// NDC → screen. See [`crate::math::raster_matrix`].
    pub raster: Mat4,
    /// log2 of the sample count, 0..=4.
    pub multi_sample_level: u32,
    pub hierarchical_rasterize: bool,
    pub back_face_culling: bool,
    pub front_counter_clockwise: bool,
    pub depth_test: bool,
    pub clear_color: [u8; 4],
    /// Direction towards the light, used by the default shaders.
    pub light_dir: Vec3,
    pub frame_count: u64,
}

impl RenderState {
    pub fn new(width: u32, height: u32) -> Self {
        RenderState {
            model_view: Mat4::IDENTITY,
            model_view_inv: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            model_view_proj: Mat4::IDENTITY,
            raster: crate::math::raster_matrix(width, height),
            multi_sample_level: 0,
            hierarchical_rasterize: true,
            back_face_culling: true,
            front_counter_clockwise: true,
            depth_test: true,
            clear_color: [0, 0, 0, 255],
            light_dir: Vec3::new(-1.0, 1.0, -1.0).normalize(),
            frame_count: 0,
        }
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        1 << self.multi_sample_level
    }

    /// Camera position in model space, for the shaders' eye vector.
    #[inline]
    pub fn eye_pos(&self) -> Vec3 {
        self.model_view_inv.transform_point3(Vec3::ZERO)
    }
}

/// Per-frame pipeline counters, merged across workers and logged at debug
/// level once the frame completes.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    pub triangles_in: usize,
    pub trivially_rejected: usize,
    pub clipped: usize,
    pub backfaces_culled: usize,
    pub degenerate_dropped: usize,
    pub raster_triangles: usize,
    pub tile_refs: usize,
    pub quad_fragments: usize,
}

impl FrameStats {
    pub fn merge(&mut self, other: FrameStats) {
        self.triangles_in += other.triangles_in;
        self.trivially_rejected += other.trivially_rejected;
        self.clipped += other.clipped;
        self.backfaces_culled += other.backfaces_culled;
        self.degenerate_dropped += other.degenerate_dropped;
        self.raster_triangles += other.raster_triangles;
        self.tile_refs += other.tile_refs;
        self.quad_fragments += other.quad_fragments;
    }
}

impl std::fmt::Display for FrameStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let &FrameStats {
            triangles_in,
            trivially_rejected,
            clipped,
            backfaces_culled,
            degenerate_dropped,
            raster_triangles,
            tile_refs,
            quad_fragments,
        } = self;
        write!(
            f,
            "{triangles_in} tris in, {trivially_rejected} rejected, {clipped} clipped, \
             {backfaces_culled} backface, {degenerate_dropped} degenerate, \
             {raster_triangles} rasterized, {tile_refs} tile refs, {quad_fragments} quads"
        )
    }
}
