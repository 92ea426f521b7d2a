//! Particle-system building blocks for OpenGL via [glow].
//!
//! This crate provides the GPU plumbing of a particle visualization demo:
//!
//! - **Procedural lookup textures**: [`HlsTexture`] color ramps,
//!   [`SigmaTexture`] gaussian kernels, [`RandomTexture`] unit-vector
//!   noise, and caller-supplied [`PaletteTexture`] data, plus the
//!   [`math::gaussian_map`] point-sprite falloff map.
//! - **Vertex buffers**: [`VertexBuffer`] streams CPU-staged particle
//!   data into a circular GPU buffer; [`MappedVertexBuffer`] writes
//!   through persistently mapped storage.
//! - **Transform feedback**: [`TransformFeedback`] captures simulation
//!   draw output back into a vertex buffer and reports primitives
//!   written.
//!
//! Shader programs are external collaborators: the caller compiles and
//! binds them and sets their uniforms; this crate supplies the textures,
//! buffers, and draw calls around them.
//!
//! # Safety
//!
//! All GL-calling methods are `unsafe` because they issue raw GL calls
//! and require a valid, current OpenGL context. Each GL resource type has
//! a `destroy` method that must run against that same context.
//!
//! [glow]: https://docs.rs/glow

mod buffer;
mod error;
mod feedback;
pub mod math;
mod textures;

pub use buffer::{MappedVertexBuffer, VertexBuffer, COMPONENTS_PER_ATTRIBUTE};
pub use error::{check_gl_error, gl_error_name};
pub use feedback::TransformFeedback;
pub use textures::{
    HlsTexture, PaletteTexture, RandomTexture, SigmaTexture, Texture1d, TextureView,
};

/// Convert a byte or element count to the `i32` the GL API expects.
///
/// # Panics
///
/// Panics if `value > i32::MAX`. In practice, this is unreachable for
/// normal buffer and texture sizes.
pub(crate) fn gl_size(value: usize) -> i32 {
    i32::try_from(value).expect("size exceeds i32::MAX")
}
