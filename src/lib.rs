//! A tiled, multi-sample software rasterizer.
//!
//! Indexed triangle meshes go in, a resolved RGBA8 framebuffer comes out.
//! The pipeline is data-parallel at every stage: vertices, clipped triangle
//! ranges, screen tiles and 2x2 pixel quads, with a fork-join barrier
//! between stages. Coverage and depth are evaluated per sample with
//! fixed-point edge functions; shading runs once per quad, 4-wide.

#![feature(portable_simd)]

pub mod clip;
pub mod config;
pub mod fragment;
pub mod framebuffer;
pub mod math;
pub mod mesh;
pub mod raster;
pub mod renderer;
pub mod shaders;
pub mod simd_config;
pub mod state;
pub mod texture;
pub mod tile;
pub mod triangle;
pub mod vertex;

use thiserror::Error;

pub use config::RendererConfig;
pub use math::raster_matrix;
pub use mesh::{Mesh, MeshBuffer};
pub use renderer::Renderer;
pub use shaders::PixelShader;
pub use state::{FrameStats, RenderState};
pub use texture::{Filter, TextureSlot};
pub use vertex::Vertex;

/// Errors surfaced by the boundary calls. Steady-state rendering never
/// fails: degenerate geometry is dropped silently and out-of-range texture
/// ids clamp.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("framebuffer must be nonzero-sized, got {width}x{height}")]
    ZeroSizeFramebuffer { width: u32, height: u32 },
    #[error("unsupported multisample level {0}, expected 0..=4")]
    UnsupportedMsaaLevel(u32),
    #[error("model-view matrix is singular")]
    SingularModelView,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("frame dump failed: {0}")]
    Image(#[from] image::ImageError),
}
