//! Transform-feedback helper for GPU-side particle simulation.
//!
//! The caller binds a program with streamout varyings, then brackets its
//! draw calls with [`TransformFeedback::begin`] and
//! [`TransformFeedback::end`] to capture the emitted vertices into a
//! [`VertexBuffer`].

use glow::HasContext;
use std::sync::Arc;

use crate::buffer::VertexBuffer;

/// Captures draw output into a vertex buffer via transform feedback,
/// reporting the number of primitives written.
pub struct TransformFeedback {
    gl: Arc<glow::Context>,
    query: glow::Query,
    discard: bool,
    active: bool,
}

impl TransformFeedback {
    /// Create the helper and its primitives-written query object.
    ///
    /// Rasterizer discard defaults to on: simulation passes normally skip
    /// fragment processing entirely.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns an error if query creation fails.
    pub unsafe fn new(gl: Arc<glow::Context>) -> Result<Self, String> {
        let query = unsafe { gl.create_query()? };
        Ok(Self {
            gl,
            query,
            discard: true,
            active: false,
        })
    }

    /// Start capturing into `buffer` at feedback binding point 0, using
    /// the buffer's draw primitive as the feedback primitive mode.
    ///
    /// Does nothing if a capture is already active on this helper.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context, with a program whose
    /// feedback varyings match the buffer layout about to be bound.
    pub unsafe fn begin(&mut self, buffer: &VertexBuffer) {
        if self.active {
            return;
        }
        self.active = true;

        let gl = &self.gl;
        unsafe {
            buffer.bind_to_feedback(0);
            gl.begin_transform_feedback(buffer.primitive());
            if self.discard {
                gl.enable(glow::RASTERIZER_DISCARD);
            }
            gl.begin_query(glow::TRANSFORM_FEEDBACK_PRIMITIVES_WRITTEN, self.query);
        }
    }

    /// Stop capturing and return the number of primitives written, or
    /// `None` if no capture was active.
    ///
    /// Blocks on the query result.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    pub unsafe fn end(&mut self) -> Option<u32> {
        if !self.active {
            return None;
        }
        self.active = false;

        let gl = &self.gl;
        unsafe {
            if self.discard {
                gl.disable(glow::RASTERIZER_DISCARD);
            }
            gl.end_transform_feedback();
            gl.end_query(glow::TRANSFORM_FEEDBACK_PRIMITIVES_WRITTEN);
            Some(gl.get_query_parameter_u32(self.query, glow::QUERY_RESULT))
        }
    }

    /// Enable or disable rasterizer discard for subsequent captures.
    pub fn set_discard(&mut self, discard: bool) {
        self.discard = discard;
    }

    /// Whether a capture is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Delete the query object.
    ///
    /// # Safety
    ///
    /// Must be called with the same GL context used at creation, exactly
    /// once, before the context is dropped.
    pub unsafe fn destroy(&self) {
        unsafe { self.gl.delete_query(self.query) };
    }
}
