//! Procedural one-dimensional lookup textures for particle rendering:
//! HLS color ramps, gaussian kernels, random-vector noise, and palettes.
//!
//! GL ES (and therefore glow) has no 1D texture target, so every lookup
//! texture is stored as a `size` by 1 `TEXTURE_2D`; shaders sample it
//! along S with a constant T.

use glam::{IVec2, Vec2, Vec3};
use glow::{HasContext, PixelUnpackData};
use rand::Rng;
use std::sync::Arc;

use crate::error::check_gl_error;
use crate::gl_size;
use crate::math::{gaussian_kernel, hls_to_rgb, random_vector};

/// GL internal format for RGB32F textures, pre-cast to the `i32` that
/// `tex_image_2d` expects.
#[expect(clippy::cast_possible_wrap)]
const RGB32F_INTERNAL_FORMAT: i32 = glow::RGB32F as i32;

/// GL internal format for R32F textures.
#[expect(clippy::cast_possible_wrap)]
const R32F_INTERNAL_FORMAT: i32 = glow::R32F as i32;

/// Shared core for the lookup-texture generators: owns the texture name
/// and its size, and (re)creates the name with NEAREST filtering and
/// REPEAT wrapping.
pub struct Texture1d {
    gl: Arc<glow::Context>,
    texture: Option<glow::Texture>,
    size: usize,
}

impl Texture1d {
    fn new(gl: Arc<glow::Context>) -> Self {
        Self {
            gl,
            texture: None,
            size: 0,
        }
    }

    /// Delete any previous texture name and create a fresh one with the
    /// lookup-texture sampling parameters, leaving it bound.
    unsafe fn recreate(&mut self) -> Result<(), String> {
        let gl = &self.gl;
        unsafe {
            if let Some(old) = self.texture.take() {
                gl.delete_texture(old);
                check_gl_error(gl, "lookup texture delete");
            }
            let texture = gl.create_texture()?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            #[expect(clippy::cast_possible_wrap)]
            {
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MAG_FILTER,
                    glow::NEAREST as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MIN_FILTER,
                    glow::NEAREST as i32,
                );
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            }
            self.texture = Some(texture);
        }
        Ok(())
    }

    /// Upload `size` texels of pixel data into the bound texture.
    unsafe fn upload(
        &mut self,
        internal_format: i32,
        format: u32,
        ty: u32,
        bytes: &[u8],
        size: usize,
    ) {
        let gl = &self.gl;
        unsafe {
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal_format,
                gl_size(size),
                1,
                0,
                format,
                ty,
                PixelUnpackData::Slice(Some(bytes)),
            );
            gl.bind_texture(glow::TEXTURE_2D, None);
            check_gl_error(gl, "lookup texture upload");
        }
        self.size = size;
    }

    /// The GL texture name, once built.
    #[must_use]
    pub fn handle(&self) -> Option<glow::Texture> {
        self.texture
    }

    /// Texel count of the last build.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    unsafe fn destroy(&self) {
        if let Some(texture) = self.texture {
            unsafe { self.gl.delete_texture(texture) };
        }
    }
}

/// A full-hue HLS color ramp, uploaded as `RGB32F`.
///
/// Texel `i` of `size` is `hls_to_rgb((i / size, 0.5, 0.99))`.
pub struct HlsTexture {
    base: Texture1d,
}

impl HlsTexture {
    /// Create the generator without any GPU resources.
    #[must_use]
    pub fn new(gl: Arc<glow::Context>) -> Self {
        Self {
            base: Texture1d::new(gl),
        }
    }

    /// Build (or rebuild) the ramp with `size` texels.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns an error if texture creation fails.
    #[expect(clippy::cast_precision_loss)]
    pub unsafe fn build(&mut self, size: usize) -> Result<(), String> {
        unsafe { self.base.recreate()? };

        let texels: Vec<Vec3> = (0..size)
            .map(|i| hls_to_rgb(Vec3::new(i as f32 / size as f32, 0.5, 0.99)))
            .collect();
        unsafe {
            self.base.upload(
                RGB32F_INTERNAL_FORMAT,
                glow::RGB,
                glow::FLOAT,
                bytemuck::cast_slice(&texels),
                size,
            );
        }
        Ok(())
    }

    /// The GL texture name, once built.
    #[must_use]
    pub fn handle(&self) -> Option<glow::Texture> {
        self.base.handle()
    }

    /// Texel count of the last build.
    #[must_use]
    pub fn size(&self) -> usize {
        self.base.size()
    }

    /// Delete the texture.
    ///
    /// # Safety
    ///
    /// Must be called with the same GL context used at creation, exactly
    /// once, before the context is dropped.
    pub unsafe fn destroy(&self) {
        unsafe { self.base.destroy() };
    }
}

/// A 1D gaussian kernel texture (`R32F`) whose sigma can be changed
/// without reallocating the storage.
pub struct SigmaTexture {
    base: Texture1d,
}

impl SigmaTexture {
    /// Create the generator without any GPU resources.
    #[must_use]
    pub fn new(gl: Arc<glow::Context>) -> Self {
        Self {
            base: Texture1d::new(gl),
        }
    }

    /// Allocate `size` texels of `R32F` storage and fill them with the
    /// kernel for `sigma`.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns an error if texture creation fails.
    pub unsafe fn build(&mut self, size: usize, sigma: f32) -> Result<(), String> {
        unsafe {
            self.base.recreate()?;
            let gl = &self.base.gl;
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                R32F_INTERNAL_FORMAT,
                gl_size(size),
                1,
                0,
                glow::RED,
                glow::FLOAT,
                PixelUnpackData::Slice(None),
            );
            gl.bind_texture(glow::TEXTURE_2D, None);
            self.base.size = size;
            self.rebuild(sigma);
        }
        Ok(())
    }

    /// Re-sample the kernel for a new `sigma` into the existing storage.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context and a prior successful
    /// [`build`](Self::build).
    pub unsafe fn rebuild(&mut self, sigma: f32) {
        let kernel = gaussian_kernel(self.base.size, sigma);
        let gl = &self.base.gl;
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, self.base.texture);
            gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                0,
                0,
                gl_size(self.base.size),
                1,
                glow::RED,
                glow::FLOAT,
                PixelUnpackData::Slice(Some(bytemuck::cast_slice(&kernel))),
            );
            gl.bind_texture(glow::TEXTURE_2D, None);
            check_gl_error(gl, "gaussian kernel rebuild");
        }
    }

    /// The GL texture name, once built.
    #[must_use]
    pub fn handle(&self) -> Option<glow::Texture> {
        self.base.handle()
    }

    /// Texel count of the last build.
    #[must_use]
    pub fn size(&self) -> usize {
        self.base.size()
    }

    /// Delete the texture.
    ///
    /// # Safety
    ///
    /// Must be called with the same GL context used at creation, exactly
    /// once, before the context is dropped.
    pub unsafe fn destroy(&self) {
        unsafe { self.base.destroy() };
    }
}

/// A noise texture of random unit vectors remapped into `[0, 1]`,
/// uploaded as `RGB32F`.
pub struct RandomTexture {
    base: Texture1d,
}

impl RandomTexture {
    /// Create the generator without any GPU resources.
    #[must_use]
    pub fn new(gl: Arc<glow::Context>) -> Self {
        Self {
            base: Texture1d::new(gl),
        }
    }

    /// Build (or rebuild) the noise texture with `size` texels drawn from
    /// `rng`. Each texel is `(random_vector + 1) * 0.5`.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns an error if texture creation fails.
    pub unsafe fn build<R: Rng + ?Sized>(
        &mut self,
        size: usize,
        rng: &mut R,
    ) -> Result<(), String> {
        unsafe { self.base.recreate()? };

        let texels: Vec<Vec3> = (0..size)
            .map(|_| (random_vector(rng) + Vec3::ONE) * 0.5)
            .collect();
        unsafe {
            self.base.upload(
                RGB32F_INTERNAL_FORMAT,
                glow::RGB,
                glow::FLOAT,
                bytemuck::cast_slice(&texels),
                size,
            );
        }
        Ok(())
    }

    /// The GL texture name, once built.
    #[must_use]
    pub fn handle(&self) -> Option<glow::Texture> {
        self.base.handle()
    }

    /// Texel count of the last build.
    #[must_use]
    pub fn size(&self) -> usize {
        self.base.size()
    }

    /// Delete the texture.
    ///
    /// # Safety
    ///
    /// Must be called with the same GL context used at creation, exactly
    /// once, before the context is dropped.
    pub unsafe fn destroy(&self) {
        unsafe { self.base.destroy() };
    }
}

/// A palette lookup texture built from caller-supplied RGB data,
/// uploaded as `RGB32F`.
pub struct PaletteTexture {
    base: Texture1d,
}

impl PaletteTexture {
    /// Create the generator without any GPU resources.
    #[must_use]
    pub fn new(gl: Arc<glow::Context>) -> Self {
        Self {
            base: Texture1d::new(gl),
        }
    }

    /// Build the palette from `u8` RGB triplets; GL normalizes the bytes
    /// into the float store.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns an error if texture creation fails.
    ///
    /// # Panics
    ///
    /// Panics if `data` is not a whole number of RGB triplets.
    pub unsafe fn build_u8(&mut self, data: &[u8]) -> Result<(), String> {
        assert_eq!(data.len() % 3, 0, "palette data must be RGB triplets");
        unsafe {
            self.base.recreate()?;
            self.base.upload(
                RGB32F_INTERNAL_FORMAT,
                glow::RGB,
                glow::UNSIGNED_BYTE,
                data,
                data.len() / 3,
            );
        }
        Ok(())
    }

    /// Build the palette from float RGB texels.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns an error if texture creation fails.
    pub unsafe fn build_f32(&mut self, data: &[Vec3]) -> Result<(), String> {
        unsafe {
            self.base.recreate()?;
            self.base.upload(
                RGB32F_INTERNAL_FORMAT,
                glow::RGB,
                glow::FLOAT,
                bytemuck::cast_slice(data),
                data.len(),
            );
        }
        Ok(())
    }

    /// The GL texture name, once built.
    #[must_use]
    pub fn handle(&self) -> Option<glow::Texture> {
        self.base.handle()
    }

    /// Texel count of the last build.
    #[must_use]
    pub fn size(&self) -> usize {
        self.base.size()
    }

    /// Delete the texture.
    ///
    /// # Safety
    ///
    /// Must be called with the same GL context used at creation, exactly
    /// once, before the context is dropped.
    pub unsafe fn destroy(&self) {
        unsafe { self.base.destroy() };
    }
}

/// Viewport math for rendering particles into a reduced-size texture:
/// tracks the window size, the reduction factor, and the derived
/// inverse-size and aspect vectors. No GL calls.
#[derive(Debug, Clone, Copy)]
pub struct TextureView {
    tex_size: IVec2,
    win_size: IVec2,
    reduction: f32,
    tex_inv_size: Vec2,
    aspect: Vec2,
}

impl TextureView {
    /// Create a view over a `width` by `height` target with the given
    /// reduction factor.
    #[must_use]
    pub fn new(width: i32, height: i32, reduction: f32) -> Self {
        let mut view = Self {
            tex_size: IVec2::new(width, height),
            win_size: IVec2::ZERO,
            reduction,
            tex_inv_size: Vec2::ZERO,
            aspect: Vec2::ONE,
        };
        view.on_reshape(width, height);
        view
    }

    /// Recompute the derived vectors for a new window size.
    #[expect(clippy::cast_precision_loss)]
    pub fn on_reshape(&mut self, width: i32, height: i32) {
        self.win_size = IVec2::new(width, height);
        self.tex_inv_size = Vec2::new(1.0 / width as f32, 1.0 / height as f32) / self.reduction;
        self.aspect = if width < height {
            Vec2::new(1.0, height as f32 / width as f32)
        } else {
            Vec2::new(width as f32 / height as f32, 1.0)
        };
    }

    /// Change the reduction factor and recompute the derived vectors.
    pub fn set_reduction(&mut self, reduction: f32) {
        self.reduction = reduction;
        self.on_reshape(self.win_size.x, self.win_size.y);
    }

    /// The texture target size.
    #[must_use]
    pub fn tex_size(&self) -> IVec2 {
        self.tex_size
    }

    /// The current window size.
    #[must_use]
    pub fn win_size(&self) -> IVec2 {
        self.win_size
    }

    /// The current reduction factor.
    #[must_use]
    pub fn reduction(&self) -> f32 {
        self.reduction
    }

    /// `1 / windowSize / reduction`, for texel addressing in shaders.
    #[must_use]
    pub fn tex_inv_size(&self) -> Vec2 {
        self.tex_inv_size
    }

    /// The window aspect vector: `(1, h/w)` in portrait, `(w/h, 1)` in
    /// landscape.
    #[must_use]
    pub fn aspect(&self) -> Vec2 {
        self.aspect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_f32_eq(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}",
        );
    }

    #[test]
    fn landscape_aspect_scales_x() {
        let view = TextureView::new(1920, 1080, 1.0);
        assert_f32_eq(view.aspect().x, 1920.0 / 1080.0);
        assert_f32_eq(view.aspect().y, 1.0);
    }

    #[test]
    fn portrait_aspect_scales_y() {
        let view = TextureView::new(1080, 1920, 1.0);
        assert_f32_eq(view.aspect().x, 1.0);
        assert_f32_eq(view.aspect().y, 1920.0 / 1080.0);
    }

    #[test]
    fn reduction_divides_inverse_size() {
        let mut view = TextureView::new(800, 400, 1.0);
        assert_f32_eq(view.tex_inv_size().x, 1.0 / 800.0);
        assert_f32_eq(view.tex_inv_size().y, 1.0 / 400.0);

        view.set_reduction(2.0);
        assert_f32_eq(view.tex_inv_size().x, 1.0 / 1600.0);
        assert_f32_eq(view.tex_inv_size().y, 1.0 / 800.0);
    }

    #[test]
    fn reshape_updates_window_but_not_texture_size() {
        let mut view = TextureView::new(512, 512, 1.0);
        view.on_reshape(1024, 256);
        assert_eq!(view.win_size(), IVec2::new(1024, 256));
        assert_eq!(view.tex_size(), IVec2::new(512, 512));
        assert_f32_eq(view.aspect().x, 4.0);
    }
}
