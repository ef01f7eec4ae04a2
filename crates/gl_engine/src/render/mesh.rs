//! GPU-resident indexed triangle meshes
//!
//! A [`Mesh`] owns three OpenGL objects: the vertex buffer, the index buffer
//! and the vertex array describing them. It also keeps the CPU-side vertex and
//! index data it uploaded, for introspection.
//!
//! # Ownership
//!
//! Each object name is owned by exactly one `Mesh`. The type is deliberately
//! not `Clone`: two meshes holding the same names would delete them twice.
//! Moving a `Mesh` moves ownership; [`Mesh::take`] does the same in place and
//! leaves an empty mesh behind. Dropping a mesh releases whatever it still
//! owns.
//!
//! # Binding state
//!
//! Every operation leaves `VERTEX_ARRAY`, `ARRAY_BUFFER` and
//! `ELEMENT_ARRAY_BUFFER` unbound, so one mesh never draws with another's
//! stale bindings.

use std::rc::Rc;

use crate::gl_call;
use crate::render::gl::{BufferKind, GlContext, GlError, ResourceId, VertexArrayKind};
use crate::render::vertex::{self, Vertex};

/// Indexed triangle list stored in GPU buffers
pub struct Mesh {
    gl: Rc<GlContext>,
    vao: ResourceId<VertexArrayKind>,
    vbo: ResourceId<BufferKind>,
    ibo: ResourceId<BufferKind>,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Create an empty mesh that owns no GPU objects yet
    pub fn new(gl: Rc<GlContext>) -> Self {
        Self {
            gl,
            vao: ResourceId::NONE,
            vbo: ResourceId::NONE,
            ibo: ResourceId::NONE,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Create a mesh and upload the given data
    pub fn from_data(gl: Rc<GlContext>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self, GlError> {
        let mut mesh = Self::new(gl);
        mesh.build(vertices, indices)?;
        Ok(mesh)
    }

    /// Unit quad in the XY plane made of two triangles (4 vertices, 6 indices)
    pub fn quad(gl: Rc<GlContext>) -> Result<Self, GlError> {
        let vertices = vec![
            Vertex::new([-0.5, -0.5, 0.0], [0.0, 0.0]),
            Vertex::new([0.5, -0.5, 0.0], [1.0, 0.0]),
            Vertex::new([0.5, 0.5, 0.0], [1.0, 1.0]),
            Vertex::new([-0.5, 0.5, 0.0], [0.0, 1.0]),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        Self::from_data(gl, vertices, indices)
    }

    /// Upload vertex and index data, taking ownership of both
    ///
    /// A mesh that already owns GPU objects is cleared first. On failure, any
    /// object created during this call is released and the mesh is left empty.
    /// An index list too long for one draw call is rejected before anything
    /// changes.
    pub fn build(&mut self, vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<(), GlError> {
        draw_count(indices.len())?;
        if self.is_built() {
            log::debug!("Rebuilding mesh {:?}; releasing previous buffers", self.vao);
            self.clear();
        }
        self.vertices = vertices;
        self.indices = indices;

        if let Err(err) = self.upload() {
            self.clear();
            return Err(err);
        }

        log::debug!(
            "Built mesh {:?} ({:?}, {:?}): {} vertices, {} indices",
            self.vao,
            self.vbo,
            self.ibo,
            self.vertices.len(),
            self.indices.len()
        );
        Ok(())
    }

    fn upload(&mut self) -> Result<(), GlError> {
        let gl = Rc::clone(&self.gl);

        // Vertex buffer
        self.vbo = create_buffer(&gl)?;
        gl_call!(gl, api => api.bind_buffer(glow::ARRAY_BUFFER, self.vbo.raw()));
        gl_call!(gl, api => api.buffer_data(
            glow::ARRAY_BUFFER,
            bytemuck::cast_slice(&self.vertices),
            glow::STATIC_DRAW,
        ));

        // Vertex array object, capturing the bound vertex buffer
        self.vao = vertex::generate_attributes(&gl)?;

        // Index buffer, recorded in the still-bound vertex array
        self.ibo = create_buffer(&gl)?;
        gl_call!(gl, api => api.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, self.ibo.raw()));
        gl_call!(gl, api => api.buffer_data(
            glow::ELEMENT_ARRAY_BUFFER,
            bytemuck::cast_slice(&self.indices),
            glow::STATIC_DRAW,
        ));

        // Vertex array first, so unbinding the element buffer does not detach it
        gl_call!(gl, api => api.bind_vertex_array(0));
        gl_call!(gl, api => api.bind_buffer(glow::ARRAY_BUFFER, 0));
        gl_call!(gl, api => api.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, 0));
        Ok(())
    }

    /// Draw the whole index range as a triangle list
    ///
    /// Drawing a mesh that owns no objects is a defect: it is logged, and the
    /// draw itself raises a GL error that diagnostics handle.
    pub fn render(&self) {
        if self.vao.is_none() {
            log::warn!("Rendering mesh without a vertex array");
        }
        if self.vbo.is_none() {
            log::warn!("Rendering mesh without a vertex buffer");
        }
        if self.ibo.is_none() {
            log::warn!("Rendering mesh without an index buffer");
        }

        let count = match draw_count(self.indices.len()) {
            Ok(count) => count,
            Err(err) => {
                log::error!("Skipping draw: {err}");
                return;
            }
        };
        let gl = &self.gl;
        gl_call!(gl, api => api.bind_vertex_array(self.vao.raw()));
        gl_call!(gl, api => api.bind_buffer(glow::ARRAY_BUFFER, self.vbo.raw()));
        gl_call!(gl, api => api.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, self.ibo.raw()));
        gl_call!(gl, api => api.draw_elements(glow::TRIANGLES, count, glow::UNSIGNED_INT, 0));
        gl_call!(gl, api => api.bind_vertex_array(0));
        gl_call!(gl, api => api.bind_buffer(glow::ARRAY_BUFFER, 0));
        gl_call!(gl, api => api.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, 0));
    }

    /// Release all GPU objects and drop the CPU-side data
    ///
    /// Safe to call any number of times; deleting name 0 is a no-op in GL.
    pub fn clear(&mut self) {
        if self.is_built() {
            log::trace!("Releasing mesh {:?} ({:?}, {:?})", self.vao, self.vbo, self.ibo);
        }
        let gl = &self.gl;
        let ibo = self.ibo.take();
        gl_call!(gl, api => api.delete_buffer(ibo.raw()));
        let vbo = self.vbo.take();
        gl_call!(gl, api => api.delete_buffer(vbo.raw()));
        let vao = self.vao.take();
        gl_call!(gl, api => api.delete_vertex_array(vao.raw()));
        self.indices.clear();
        self.vertices.clear();
    }

    /// Move everything this mesh owns into a new mesh, leaving this one empty
    #[must_use = "the returned mesh owns the GPU objects"]
    pub fn take(&mut self) -> Self {
        Self {
            gl: Rc::clone(&self.gl),
            vao: self.vao.take(),
            vbo: self.vbo.take(),
            ibo: self.ibo.take(),
            vertices: std::mem::take(&mut self.vertices),
            indices: std::mem::take(&mut self.indices),
        }
    }

    /// True when any GPU object is owned
    pub fn is_built(&self) -> bool {
        self.vao.is_some() || self.vbo.is_some() || self.ibo.is_some()
    }

    /// Vertex array object name
    pub fn vertex_array(&self) -> ResourceId<VertexArrayKind> {
        self.vao
    }

    /// Vertex buffer name
    pub fn vertex_buffer(&self) -> ResourceId<BufferKind> {
        self.vbo
    }

    /// Index buffer name
    pub fn index_buffer(&self) -> ResourceId<BufferKind> {
        self.ibo
    }

    /// Uploaded vertices
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Uploaded indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of indices a draw call covers
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

fn create_buffer(gl: &GlContext) -> Result<ResourceId<BufferKind>, GlError> {
    gl_call!(gl, api => api.create_buffer())
        .map(ResourceId::from_raw)
        .map_err(|reason| GlError::Allocation { kind: "buffer", reason })
}

/// Index count as the `GLsizei` taken by `glDrawElements`
fn draw_count(len: usize) -> Result<i32, GlError> {
    i32::try_from(len).map_err(|_| GlError::TooManyIndices { count: len })
}

impl Drop for Mesh {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("vao", &self.vao)
            .field("vbo", &self.vbo)
            .field("ibo", &self.ibo)
            .field("vertices", &self.vertices.len())
            .field("indices", &self.indices.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gl::{ErrorPolicy, HeadlessGl};

    fn headless() -> (Rc<HeadlessGl>, Rc<GlContext>) {
        let gl = Rc::new(HeadlessGl::new());
        let ctx = GlContext::new(Rc::clone(&gl));
        (gl, ctx)
    }

    fn triangle() -> (Vec<Vertex>, Vec<u32>) {
        (
            vec![
                Vertex::from_position(0.0, 0.0, 0.0),
                Vertex::from_position(1.0, 0.0, 0.0),
                Vertex::from_position(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_new_mesh_owns_nothing() {
        let (_gl, ctx) = headless();
        let mesh = Mesh::new(ctx);
        assert!(!mesh.is_built());
        assert!(mesh.vertex_array().is_none());
        assert_eq!(mesh.index_count(), 0);
    }

    #[test]
    fn test_build_uploads_exact_bytes() {
        let (gl, ctx) = headless();
        let (vertices, indices) = triangle();
        let mesh = Mesh::from_data(ctx, vertices.clone(), indices.clone()).unwrap();

        let (vertex_bytes, usage) = gl.buffer_contents(mesh.vertex_buffer().raw()).unwrap();
        assert_eq!(vertex_bytes.len(), 3 * Vertex::STRIDE);
        assert_eq!(vertex_bytes.as_slice(), bytemuck::cast_slice::<Vertex, u8>(&vertices));
        assert_eq!(usage, glow::STATIC_DRAW);

        let (index_bytes, _) = gl.buffer_contents(mesh.index_buffer().raw()).unwrap();
        assert_eq!(index_bytes.len(), 3 * 4);
        assert_eq!(mesh.indices(), indices.as_slice());
    }

    #[test]
    fn test_build_leaves_bindings_clean() {
        let (gl, ctx) = headless();
        let (vertices, indices) = triangle();
        let mesh = Mesh::from_data(ctx, vertices, indices).unwrap();

        assert_eq!(gl.bound_vertex_array(), 0);
        assert_eq!(gl.bound_array_buffer(), 0);
        assert_eq!(gl.bound_element_buffer(), 0);
        // The vertex array keeps its element buffer after unbinding
        assert_eq!(
            gl.vertex_array_element_buffer(mesh.vertex_array().raw()),
            Some(mesh.index_buffer().raw())
        );
    }

    #[test]
    fn test_rebuild_without_clear_does_not_leak() {
        let (gl, ctx) = headless();
        let (vertices, indices) = triangle();
        let mut mesh = Mesh::from_data(ctx, vertices.clone(), indices.clone()).unwrap();
        let first_vbo = mesh.vertex_buffer();

        mesh.build(vertices, indices).unwrap();

        assert!(!gl.is_buffer(first_vbo.raw()));
        assert_eq!(gl.live_object_count(), 3);
    }

    #[test]
    fn test_failed_build_releases_partial_objects() {
        let (gl, ctx) = headless();
        ctx.set_policy(ErrorPolicy::Log);
        gl.set_fail_allocations(true);
        let (vertices, indices) = triangle();

        let result = Mesh::from_data(ctx, vertices, indices);
        assert!(matches!(result, Err(GlError::Allocation { kind: "buffer", .. })));
        assert_eq!(gl.live_object_count(), 0);
    }

    #[test]
    fn test_render_restores_bindings() {
        let (gl, ctx) = headless();
        let (vertices, indices) = triangle();
        let mesh = Mesh::from_data(ctx, vertices, indices).unwrap();
        mesh.render();

        let draws = gl.draw_calls();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].vertex_array, mesh.vertex_array().raw());
        assert_eq!(draws[0].element_buffer, mesh.index_buffer().raw());
        assert_eq!(gl.bound_vertex_array(), 0);
        assert_eq!(gl.bound_array_buffer(), 0);
    }

    #[test]
    fn test_render_empty_mesh_with_log_policy_proceeds() {
        let (gl, ctx) = headless();
        ctx.set_policy(ErrorPolicy::Log);
        let mesh = Mesh::new(ctx);
        mesh.render();
        assert!(gl.draw_calls().is_empty());
    }

    #[test]
    #[should_panic(expected = "draw_elements")]
    fn test_render_empty_mesh_is_fatal_by_default() {
        let (_gl, ctx) = headless();
        let mesh = Mesh::new(ctx);
        mesh.render();
    }

    #[test]
    fn test_draw_count_rejects_oversized_index_lists() {
        assert_eq!(draw_count(6), Ok(6));
        assert_eq!(draw_count(i32::MAX as usize), Ok(i32::MAX));

        let too_many = i32::MAX as usize + 1;
        assert_eq!(draw_count(too_many), Err(GlError::TooManyIndices { count: too_many }));
    }

    #[test]
    fn test_drop_releases_everything() {
        let (gl, ctx) = headless();
        let (vertices, indices) = triangle();
        {
            let _mesh = Mesh::from_data(ctx, vertices, indices).unwrap();
            assert_eq!(gl.live_object_count(), 3);
        }
        assert_eq!(gl.live_object_count(), 0);
    }
}
