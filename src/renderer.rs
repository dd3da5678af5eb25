use std::path::PathBuf;

use glam::{Mat4, Vec3};
use log::{debug, warn};
use rayon::prelude::*;

use crate::config::RendererConfig;
use crate::framebuffer::{self, FrameBuffer};
use crate::mesh::Mesh;
use crate::shaders::{self, PixelShader};
use crate::state::{FrameStats, RenderState, MAX_MSAA_LEVEL};
use crate::tile::{self, TileGrid};
use crate::RenderError;
use crate::{clip, raster, vertex};

/// The renderer façade: owns the render state, the tile grid with its
/// per-sample storage, and the resolved framebuffer. A frame is a fixed
/// sequence of fork-join stages; every stage completes before the next one
/// starts, which is the only synchronization the sharing discipline needs.
pub struct Renderer {
    state: RenderState,
    grid: TileGrid,
    fb: FrameBuffer,
    shader: PixelShader,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::ZeroSizeFramebuffer { width, height });
        }
        let state = RenderState::new(width, height);
        Ok(Renderer {
            grid: TileGrid::new(width, height, state.sample_count()),
            fb: FrameBuffer::new(width, height),
            state,
            shader: PixelShader::Lambertian,
        })
    }

    pub fn from_config(config: &RendererConfig) -> Result<Self, RenderError> {
        let mut renderer = Renderer::new(config.width, config.height)?;
        renderer.set_msaa(config.msaa_level)?;
        renderer.state.hierarchical_rasterize = config.hierarchical_rasterize;
        renderer.state.back_face_culling = config.back_face_culling;
        renderer.state.front_counter_clockwise = config.front_counter_clockwise;
        renderer.state.depth_test = config.depth_test;
        renderer.state.clear_color = config.clear_color;
        Ok(renderer)
    }

    /// Rebuild the tile grid and framebuffer for a new size. Transforms and
    /// switches are preserved; the raster matrix is rebuilt for the new
    /// viewport.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::ZeroSizeFramebuffer { width, height });
        }
        self.grid = TileGrid::new(width, height, self.state.sample_count());
        self.fb = FrameBuffer::new(width, height);
        self.state.raster = crate::math::raster_matrix(width, height);
        Ok(())
    }

    /// Set the camera chain. The model-view inverse is cached here, once,
    /// for the shaders' eye position.
    pub fn set_transform(&mut self, model_view: Mat4, proj: Mat4, raster: Mat4) -> Result<(), RenderError> {
        let det = model_view.determinant();
        if !det.is_finite() || det == 0.0 {
            return Err(RenderError::SingularModelView);
        }
        self.state.model_view = model_view;
        self.state.model_view_inv = model_view.inverse();
        self.state.proj = proj;
        self.state.model_view_proj = proj * model_view;
        self.state.raster = raster;
        Ok(())
    }

    /// Set the multisample level (log2 of the sample count, 0..=4) and
    /// rebuild the per-tile sample storage for it.
    pub fn set_msaa(&mut self, level: u32) -> Result<(), RenderError> {
        if level > MAX_MSAA_LEVEL {
            return Err(RenderError::UnsupportedMsaaLevel(level));
        }
        self.state.multi_sample_level = level;
        self.grid = TileGrid::new(self.fb.width(), self.fb.height(), self.state.sample_count());
        Ok(())
    }

    pub fn set_pixel_shader(&mut self, shader: PixelShader) {
        self.shader = shader;
    }

    pub fn set_clear_color(&mut self, color: [u8; 4]) {
        self.state.clear_color = color;
    }

    pub fn set_light_dir(&mut self, dir: Vec3) {
        self.state.light_dir = dir.normalize();
    }

    pub fn set_depth_test(&mut self, on: bool) {
        self.state.depth_test = on;
    }

    pub fn set_back_face_culling(&mut self, on: bool) {
        self.state.back_face_culling = on;
    }

    pub fn set_front_counter_clockwise(&mut self, ccw: bool) {
        self.state.front_counter_clockwise = ccw;
    }

    pub fn set_hierarchical_rasterize(&mut self, on: bool) {
        self.state.hierarchical_rasterize = on;
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn width(&self) -> u32 {
        self.fb.width()
    }

    pub fn height(&self) -> u32 {
        self.fb.height()
    }

    /// Resolved RGBA8 backbuffer, row-major, top-left origin.
    pub fn back_buffer(&self) -> &[u8] {
        self.fb.as_bytes()
    }

    /// Bytes of per-sample color + depth storage; scales with the sample
    /// count.
    pub fn sample_buffer_bytes(&self) -> usize {
        self.grid.sample_buffer_bytes()
    }

    pub fn frame_count(&self) -> u64 {
        self.state.frame_count
    }

    /// Run the full pipeline once:
    /// clear → VS → clip → bin → raster → shade → update → resolve.
    pub fn render_mesh<M: Mesh + Sync>(&mut self, mesh: &M) {
        let state = &self.state;
        let (width, height) = (self.fb.width(), self.fb.height());
        let mut stats = FrameStats::default();

        let texture_count = mesh.textures().len();
        if texture_count > 0 {
            let out_of_range = (0..mesh.triangle_count())
                .any(|i| mesh.texture_id(i) as usize >= texture_count);
            if out_of_range {
                warn!("mesh references texture ids past the slot table; clamping to 0");
            }
        }

        // Clear
        let clear_color = state.clear_color;
        self.grid
            .tiles
            .par_iter_mut()
            .for_each(|tile| tile.clear(clear_color));

        // Vertex processing
        let base = vertex::process_vertices(state, mesh);

        // Clip + triangle setup, sharded over the worker pool
        let worker_count = rayon::current_num_threads();
        let workers = clip::clip_triangles(state, &base, mesh, width, height, worker_count);
        for w in &workers {
            stats.merge(w.stats);
        }

        // Binning: each worker fills its own per-tile lists
        let binned: Vec<(Vec<Vec<tile::TriangleRef>>, FrameStats)> = workers
            .par_iter()
            .map(|w| {
                let mut bin_stats = FrameStats::default();
                let bins = tile::bin_worker(&w.tris, &self.grid, &mut bin_stats);
                (bins, bin_stats)
            })
            .collect();
        let mut bins = Vec::with_capacity(binned.len());
        for (b, s) in binned {
            bins.push(b);
            stats.merge(s);
        }

        // Rasterization, one task per tile
        let samples = framebuffer::sample_positions(state.multi_sample_level);
        let raster_stats = self
            .grid
            .tiles
            .par_iter_mut()
            .map(|tile| raster::rasterize_tile(tile, &bins, &workers, state, samples))
            .reduce(FrameStats::default, |mut a, b| {
                a.merge(b);
                a
            });
        stats.merge(raster_stats);

        // Fragment shading, quad-parallel over all tiles' fragments
        let results = shaders::shade_fragments(
            &self.grid,
            &base,
            &workers,
            mesh.textures(),
            state,
            &self.shader,
        );

        // Framebuffer update: scatter shaded quads under their coverage
        let counts: Vec<usize> = self.grid.tiles.iter().map(|t| t.frags.len()).collect();
        let mut chunks = Vec::with_capacity(counts.len());
        let mut rest = results.as_slice();
        for count in counts {
            let (head, tail) = rest.split_at(count);
            chunks.push(head);
            rest = tail;
        }
        let sample_count = state.sample_count();
        self.grid
            .tiles
            .par_iter_mut()
            .zip(chunks.into_par_iter())
            .for_each(|(tile, shaded)| framebuffer::update_tile(tile, shaded, sample_count));

        // Resolve
        self.fb.resolve(&self.grid);

        self.state.frame_count += 1;
        debug!("frame {}: {}", self.state.frame_count, stats);
    }

    /// Dump the resolved frame as `Frames/Frame<NNNNN>.bmp` (24-bit,
    /// uncompressed). A failure here never affects the next frame; the
    /// caller decides whether to log or bail.
    pub fn dump_frame(&self) -> Result<PathBuf, RenderError> {
        let dir = PathBuf::from("Frames");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("Frame{:05}.bmp", self.state.frame_count));

        let rgba = self.fb.as_bytes();
        let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
        for px in rgba.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
        image::save_buffer(
            &path,
            &rgb,
            self.fb.width(),
            self.fb.height(),
            image::ColorType::Rgb8,
        )?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_framebuffer_is_rejected() {
        assert!(matches!(
            Renderer::new(0, 64),
            Err(RenderError::ZeroSizeFramebuffer { .. })
        ));
        let mut r = Renderer::new(64, 64).unwrap();
        assert!(r.resize(64, 0).is_err());
    }

    #[test]
    fn msaa_level_is_validated() {
        let mut r = Renderer::new(64, 64).unwrap();
        for level in 0..=4 {
            assert!(r.set_msaa(level).is_ok());
        }
        assert!(matches!(
            r.set_msaa(5),
            Err(RenderError::UnsupportedMsaaLevel(5))
        ));
    }

    #[test]
    fn singular_model_view_is_rejected() {
        let mut r = Renderer::new(64, 64).unwrap();
        let err = r.set_transform(Mat4::ZERO, Mat4::IDENTITY, Mat4::IDENTITY);
        assert!(matches!(err, Err(RenderError::SingularModelView)));
    }

    #[test]
    fn msaa_doubles_sample_memory_per_level() {
        let mut r = Renderer::new(128, 128).unwrap();
        let base = r.sample_buffer_bytes();
        for level in 1..=4u32 {
            r.set_msaa(level).unwrap();
            assert_eq!(r.sample_buffer_bytes(), base << level);
        }
    }

    #[test]
    fn resize_preserves_state_switches() {
        let mut r = Renderer::new(64, 64).unwrap();
        r.set_depth_test(false);
        r.set_msaa(2).unwrap();
        r.resize(128, 128).unwrap();
        assert!(!r.state().depth_test);
        assert_eq!(r.state().sample_count(), 4);
        assert_eq!(r.back_buffer().len(), 128 * 128 * 4);
    }
}
