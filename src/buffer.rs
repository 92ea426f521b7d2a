//! Vertex-buffer abstraction over GL buffer objects and vertex arrays.
//!
//! Vertices are interleaved float attributes, each attribute a `vec4`.
//! [`VertexBuffer`] stages vertex data on the CPU and streams it into a
//! circular GPU buffer; [`MappedVertexBuffer`] writes through a
//! persistently mapped store instead.

use glow::HasContext;
use std::sync::Arc;

use crate::error::check_gl_error;
use crate::gl_size;

/// Float components per vertex attribute (every attribute is a `vec4`).
pub const COMPONENTS_PER_ATTRIBUTE: usize = 4;

/// A contiguous run of vertices inside the circular buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    /// First vertex index of the run.
    pub start: usize,
    /// Number of vertices in the run.
    pub len: usize,
}

/// Split a streaming write of `n_vtx` vertices against a circular buffer
/// of `capacity` vertices, given the running uploaded-vertex counter.
///
/// Returns the first run, the wrapped-around second run (if the write
/// crosses the end of the buffer), and whether the write reached or passed
/// the end.
pub(crate) fn split_stream(
    uploaded: u64,
    n_vtx: usize,
    capacity: usize,
) -> (Span, Option<Span>, bool) {
    #[expect(clippy::cast_possible_truncation)]
    let offset = (uploaded % capacity as u64) as usize;
    let wrapped = offset + n_vtx >= capacity;

    if offset + n_vtx > capacity {
        let tail = capacity - offset;
        (
            Span {
                start: offset,
                len: tail,
            },
            Some(Span {
                start: 0,
                len: n_vtx - tail,
            }),
            wrapped,
        )
    } else {
        (
            Span {
                start: offset,
                len: n_vtx,
            },
            None,
            wrapped,
        )
    }
}

/// Shared VAO/VBO state for both buffer flavors.
struct BufferCore {
    gl: Arc<glow::Context>,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    primitive: u32,
    attributes_per_vertex: usize,
    bytes_per_vertex: usize,
    uploaded: u64,
}

impl BufferCore {
    unsafe fn new(
        gl: Arc<glow::Context>,
        primitive: u32,
        attributes_per_vertex: usize,
    ) -> Result<Self, String> {
        let (vao, vbo) = unsafe { (gl.create_vertex_array()?, gl.create_buffer()?) };
        Ok(Self {
            gl,
            vao,
            vbo,
            primitive,
            attributes_per_vertex,
            bytes_per_vertex: attributes_per_vertex
                * COMPONENTS_PER_ATTRIBUTE
                * std::mem::size_of::<f32>(),
            uploaded: 0,
        })
    }

    /// Configure one interleaved `vec4` float attribute per slot.
    unsafe fn configure_attributes(&self) {
        let gl = &self.gl;
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            for i in 0..self.attributes_per_vertex {
                #[expect(clippy::cast_possible_truncation)]
                let index = i as u32;
                gl.enable_vertex_attrib_array(index);
                gl.vertex_attrib_pointer_f32(
                    index,
                    #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                    {
                        COMPONENTS_PER_ATTRIBUTE as i32
                    },
                    glow::FLOAT,
                    false,
                    gl_size(self.bytes_per_vertex),
                    gl_size(i * COMPONENTS_PER_ATTRIBUTE * std::mem::size_of::<f32>()),
                );
            }
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            check_gl_error(gl, "vertex attribute setup");
        }
    }

    unsafe fn draw(&self, max_vertices: u64) {
        let gl = &self.gl;
        let count = self.uploaded.min(max_vertices);
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.draw_arrays(
                self.primitive,
                0,
                i32::try_from(count).expect("draw count exceeds i32::MAX"),
            );
            gl.bind_vertex_array(None);
            check_gl_error(gl, "draw");
        }
    }

    unsafe fn draw_range(&self, first: usize, count: usize) {
        let gl = &self.gl;
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.draw_arrays(self.primitive, gl_size(first), gl_size(count));
            gl.bind_vertex_array(None);
        }
    }

    unsafe fn bind_to_feedback(&self, index: u32) {
        let gl = &self.gl;
        #[expect(clippy::cast_possible_truncation)]
        let byte_len = self.uploaded as usize * self.bytes_per_vertex;
        unsafe {
            gl.bind_buffer_range(
                glow::TRANSFORM_FEEDBACK_BUFFER,
                index,
                Some(self.vbo),
                0,
                gl_size(byte_len),
            );
        }
    }

    unsafe fn destroy(&self) {
        let gl = &self.gl;
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
        }
    }
}

/// A vertex buffer with a CPU staging store and dynamic GPU storage.
///
/// Particle data is written into [`staging_mut`](Self::staging_mut) and
/// then streamed to the GPU, either wholesale
/// ([`upload_all`](Self::upload_all)) or as a circular stream of sub-range
/// writes ([`upload_stream`](Self::upload_stream)).
pub struct VertexBuffer {
    core: BufferCore,
    staging: Vec<f32>,
    staging_vertices: usize,
}

impl VertexBuffer {
    /// Create the VAO and VBO for a buffer drawing `primitive` (for
    /// example [`glow::POINTS`]), staging up to `staging_vertices`
    /// vertices of `attributes_per_vertex` `vec4` attributes each.
    ///
    /// GPU storage is allocated separately by
    /// [`init_storage`](Self::init_storage).
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns an error if GL object creation fails.
    pub unsafe fn new(
        gl: Arc<glow::Context>,
        primitive: u32,
        staging_vertices: usize,
        attributes_per_vertex: usize,
    ) -> Result<Self, String> {
        Ok(Self {
            core: unsafe { BufferCore::new(gl, primitive, attributes_per_vertex)? },
            staging: Vec::new(),
            staging_vertices,
        })
    }

    /// Allocate GPU storage for `capacity` vertices (`DYNAMIC_DRAW`), size
    /// the CPU staging store, and configure the vertex attributes.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    pub unsafe fn init_storage(&mut self, capacity: usize) {
        let gl = &self.core.gl;
        self.staging = vec![
            0.0;
            self.staging_vertices
                * self.core.attributes_per_vertex
                * COMPONENTS_PER_ATTRIBUTE
        ];
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.core.vbo));
            gl.buffer_data_size(
                glow::ARRAY_BUFFER,
                gl_size(capacity * self.core.bytes_per_vertex),
                glow::DYNAMIC_DRAW,
            );
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            self.core.configure_attributes();
        }
    }

    /// The CPU staging floats.
    #[must_use]
    pub fn staging(&self) -> &[f32] {
        &self.staging
    }

    /// Mutable access to the CPU staging floats for filling vertex data.
    pub fn staging_mut(&mut self) -> &mut [f32] {
        &mut self.staging
    }

    /// Stream the first `n_vtx` staged vertices into the circular GPU
    /// buffer of `capacity` vertices.
    ///
    /// The write lands at `uploaded % capacity`; when it crosses the end
    /// of the buffer it is split into a tail write and a head write.
    /// Advances the uploaded-vertex counter by `n_vtx` and returns whether
    /// the write reached or passed the end of the circular buffer.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Panics
    ///
    /// Panics if `n_vtx` exceeds the staged vertex count or the circular
    /// capacity.
    pub unsafe fn upload_stream(&mut self, n_vtx: usize, capacity: usize) -> bool {
        assert!(n_vtx <= self.staging_vertices && n_vtx <= capacity);

        let bpv = self.core.bytes_per_vertex;
        let bytes: &[u8] = bytemuck::cast_slice(&self.staging);
        let (first, second, wrapped) = split_stream(self.core.uploaded, n_vtx, capacity);

        let gl = &self.core.gl;
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.core.vbo));
            gl.buffer_sub_data_u8_slice(
                glow::ARRAY_BUFFER,
                gl_size(first.start * bpv),
                &bytes[..first.len * bpv],
            );
            if let Some(head) = second {
                gl.buffer_sub_data_u8_slice(
                    glow::ARRAY_BUFFER,
                    0,
                    &bytes[first.len * bpv..(first.len + head.len) * bpv],
                );
            }
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }

        self.core.uploaded += n_vtx as u64;
        wrapped
    }

    /// Replace the whole GPU store with the first `n_vtx` staged vertices
    /// and set the uploaded counter to `n_vtx`.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Panics
    ///
    /// Panics if `n_vtx` exceeds the staged vertex count.
    pub unsafe fn upload_all(&mut self, n_vtx: usize) {
        let bytes: &[u8] = bytemuck::cast_slice(&self.staging);
        let gl = &self.core.gl;
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.core.vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                &bytes[..n_vtx * self.core.bytes_per_vertex],
                glow::STATIC_DRAW,
            );
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
        self.core.uploaded = n_vtx as u64;
    }

    /// Draw `min(uploaded, max_vertices)` vertices from the start of the
    /// buffer.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Panics
    ///
    /// Panics if the draw count exceeds `i32::MAX`.
    pub unsafe fn draw(&self, max_vertices: u64) {
        unsafe { self.core.draw(max_vertices) };
    }

    /// Draw `count` vertices starting at vertex `first`.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    pub unsafe fn draw_range(&self, first: usize, count: usize) {
        unsafe { self.core.draw_range(first, count) };
    }

    /// Bind the VBO to transform-feedback binding point `index` over the
    /// currently uploaded byte range.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    pub unsafe fn bind_to_feedback(&self, index: u32) {
        unsafe { self.core.bind_to_feedback(index) };
    }

    /// Total vertices uploaded so far (the circular-offset source).
    #[must_use]
    pub fn uploaded(&self) -> u64 {
        self.core.uploaded
    }

    /// Advance the uploaded-vertex counter without a GPU write.
    pub fn add_uploaded(&mut self, n_vtx: u64) {
        self.core.uploaded += n_vtx;
    }

    /// Reset the uploaded-vertex counter.
    pub fn reset_uploaded(&mut self) {
        self.core.uploaded = 0;
    }

    /// The draw primitive this buffer was created with.
    #[must_use]
    pub fn primitive(&self) -> u32 {
        self.core.primitive
    }

    /// Attributes per vertex.
    #[must_use]
    pub fn attributes_per_vertex(&self) -> usize {
        self.core.attributes_per_vertex
    }

    /// Total bytes per vertex across all attributes.
    #[must_use]
    pub fn bytes_per_vertex(&self) -> usize {
        self.core.bytes_per_vertex
    }

    /// Float components per vertex across all attributes.
    #[must_use]
    pub fn components_per_vertex(&self) -> usize {
        self.core.attributes_per_vertex * COMPONENTS_PER_ATTRIBUTE
    }

    /// The underlying GL buffer object.
    #[must_use]
    pub fn raw_buffer(&self) -> glow::Buffer {
        self.core.vbo
    }

    /// Delete the VAO and VBO.
    ///
    /// # Safety
    ///
    /// Must be called with the same GL context used at creation, exactly
    /// once, before the context is dropped.
    pub unsafe fn destroy(&self) {
        unsafe { self.core.destroy() };
    }
}

/// A vertex buffer whose GPU store is persistently mapped for writing.
///
/// Storage is immutable (`glBufferStorage`) with coherent write mapping:
/// vertex data written through [`mapped_mut`](Self::mapped_mut) is visible
/// to subsequent draws without an explicit upload call.
pub struct MappedVertexBuffer {
    core: BufferCore,
    mapped: *mut f32,
    mapped_len: usize,
}

impl MappedVertexBuffer {
    /// Create the VAO and VBO. Storage is allocated and mapped by
    /// [`init_storage`](Self::init_storage).
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns an error if GL object creation fails.
    pub unsafe fn new(
        gl: Arc<glow::Context>,
        primitive: u32,
        attributes_per_vertex: usize,
    ) -> Result<Self, String> {
        Ok(Self {
            core: unsafe { BufferCore::new(gl, primitive, attributes_per_vertex)? },
            mapped: std::ptr::null_mut(),
            mapped_len: 0,
        })
    }

    /// Allocate immutable storage for `capacity` vertices and persistently
    /// map it for coherent writes.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context supporting
    /// `glBufferStorage` (GL 4.4 or `ARB_buffer_storage`).
    ///
    /// # Errors
    ///
    /// Returns an error if the mapping fails.
    pub unsafe fn init_storage(&mut self, capacity: usize) -> Result<(), String> {
        const FLAGS: u32 = glow::MAP_WRITE_BIT | glow::MAP_PERSISTENT_BIT | glow::MAP_COHERENT_BIT;

        let storage_bytes = capacity * self.core.bytes_per_vertex;
        let gl = &self.core.gl;
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.core.vbo));
            gl.buffer_storage(glow::ARRAY_BUFFER, gl_size(storage_bytes), None, FLAGS);
            let ptr = gl.map_buffer_range(glow::ARRAY_BUFFER, 0, gl_size(storage_bytes), FLAGS);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            check_gl_error(gl, "persistent buffer mapping");

            if ptr.is_null() {
                return Err("glMapBufferRange returned null".into());
            }
            self.mapped = ptr.cast::<f32>();
            self.mapped_len = capacity * self.components_per_vertex();

            self.core.configure_attributes();
        }
        Ok(())
    }

    /// The mapped GPU floats.
    ///
    /// # Safety
    ///
    /// The storage must currently be mapped (after a successful
    /// [`init_storage`](Self::init_storage)) and the GL context alive.
    ///
    /// # Panics
    ///
    /// Panics if the storage has never been mapped.
    pub unsafe fn mapped_mut(&mut self) -> &mut [f32] {
        assert!(!self.mapped.is_null(), "buffer storage is not mapped");
        unsafe { std::slice::from_raw_parts_mut(self.mapped, self.mapped_len) }
    }

    /// Draw `min(uploaded, max_vertices)` vertices from the start of the
    /// buffer.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Panics
    ///
    /// Panics if the draw count exceeds `i32::MAX`.
    pub unsafe fn draw(&self, max_vertices: u64) {
        unsafe { self.core.draw(max_vertices) };
    }

    /// Total vertices marked uploaded so far.
    #[must_use]
    pub fn uploaded(&self) -> u64 {
        self.core.uploaded
    }

    /// Mark `n_vtx` more vertices as written through the mapping.
    pub fn add_uploaded(&mut self, n_vtx: u64) {
        self.core.uploaded += n_vtx;
    }

    /// Reset the uploaded-vertex counter.
    pub fn reset_uploaded(&mut self) {
        self.core.uploaded = 0;
    }

    /// Float components per vertex across all attributes.
    #[must_use]
    pub fn components_per_vertex(&self) -> usize {
        self.core.attributes_per_vertex * COMPONENTS_PER_ATTRIBUTE
    }

    /// Unmap the storage and delete the VAO and VBO.
    ///
    /// # Safety
    ///
    /// Must be called with the same GL context used at creation, exactly
    /// once, before the context is dropped.
    pub unsafe fn destroy(&self) {
        let gl = &self.core.gl;
        unsafe {
            if !self.mapped.is_null() {
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.core.vbo));
                gl.unmap_buffer(glow::ARRAY_BUFFER);
                gl.bind_buffer(glow::ARRAY_BUFFER, None);
            }
            self.core.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_within_capacity_is_one_span() {
        let (first, second, wrapped) = split_stream(0, 10, 100);
        assert_eq!(first, Span { start: 0, len: 10 });
        assert_eq!(second, None);
        assert!(!wrapped);
    }

    #[test]
    fn stream_offset_follows_uploaded_counter() {
        let (first, second, wrapped) = split_stream(250, 10, 100);
        assert_eq!(first, Span { start: 50, len: 10 });
        assert_eq!(second, None);
        assert!(!wrapped);
    }

    #[test]
    fn stream_exactly_to_the_end_wraps_without_split() {
        let (first, second, wrapped) = split_stream(90, 10, 100);
        assert_eq!(first, Span { start: 90, len: 10 });
        assert_eq!(second, None);
        assert!(wrapped);
    }

    #[test]
    fn stream_past_the_end_splits_into_tail_and_head() {
        let (first, second, wrapped) = split_stream(95, 10, 100);
        assert_eq!(first, Span { start: 95, len: 5 });
        assert_eq!(second, Some(Span { start: 0, len: 5 }));
        assert!(wrapped);
    }

    #[test]
    fn split_never_writes_more_than_requested() {
        for uploaded in [0_u64, 7, 99, 100, 1234] {
            for n in [1_usize, 13, 100] {
                let (first, second, _) = split_stream(uploaded, n, 100);
                let total = first.len + second.map_or(0, |s| s.len);
                assert_eq!(total, n);
                assert!(first.start + first.len <= 100);
            }
        }
    }
}
