//! Vertex definition and its OpenGL attribute layout
//!
//! The engine uses a single interleaved vertex record: a position followed by
//! a texture coordinate. [`Vertex::ATTRIBUTES`] is the authoritative layout;
//! [`generate_attributes`] turns it into a vertex array object.

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

use crate::gl_call;
use crate::render::gl::{GlContext, GlError, ResourceId, VertexArrayKind};

/// Interleaved vertex record uploaded to the GPU
///
/// `#[repr(C)]` fixes the field order and offsets the attribute table below
/// depends on.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    /// Model-space position
    pub position: [f32; 3],

    /// Texture coordinates
    pub uv: [f32; 2],
}

/// One attribute slot of the vertex layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute name used in diagnostics
    pub name: &'static str,
    /// Shader input location
    pub location: u32,
    /// Number of `f32` components
    pub components: i32,
    /// Byte offset of the field inside [`Vertex`]
    pub offset: usize,
}

impl Vertex {
    /// Attribute layout in enable order: position first, then UV
    pub const ATTRIBUTES: [VertexAttribute; 2] = [
        VertexAttribute {
            name: "position",
            location: 0,
            components: 3,
            offset: offset_of!(Vertex, position),
        },
        VertexAttribute {
            name: "uv",
            location: 1,
            components: 2,
            offset: offset_of!(Vertex, uv),
        },
    ];

    /// Size of one record, used as the attribute stride
    pub const STRIDE: usize = size_of::<Self>();

    /// Create a vertex with position and texture coordinates
    pub const fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }

    /// Create a vertex with only a position; UV is zero
    pub const fn from_position(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
            uv: [0.0, 0.0],
        }
    }
}

/// Create a vertex array object describing [`Vertex::ATTRIBUTES`]
///
/// The attribute pointers capture whatever is bound to `ARRAY_BUFFER`, so the
/// vertex buffer must be bound before calling. The new vertex array is left
/// bound; callers unbind it once the element buffer is attached.
pub fn generate_attributes(gl: &GlContext) -> Result<ResourceId<VertexArrayKind>, GlError> {
    let raw = gl_call!(gl, api => api.create_vertex_array()).map_err(|reason| GlError::Allocation {
        kind: "vertex array",
        reason,
    })?;
    let vao = ResourceId::from_raw(raw);
    gl_call!(gl, api => api.bind_vertex_array(vao.raw()));

    // Both values are small compile-time constants
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let stride = Vertex::STRIDE as i32;

    for attribute in &Vertex::ATTRIBUTES {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let offset = attribute.offset as i32;
        gl_call!(gl, api => api.enable_vertex_attrib_array(attribute.location));
        gl_call!(gl, api => api.vertex_attrib_pointer_f32(
            attribute.location,
            attribute.components,
            glow::FLOAT,
            false,
            stride,
            offset,
        ));
        log::trace!(
            "Attribute '{}' at location {}: {} floats, offset {}",
            attribute.name,
            attribute.location,
            attribute.components,
            offset
        );
    }

    Ok(vao)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gl::{GlApi, HeadlessGl};
    use std::rc::Rc;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(Vertex::STRIDE, 20);
        assert_eq!(Vertex::ATTRIBUTES[0].offset, 0);
        assert_eq!(Vertex::ATTRIBUTES[1].offset, 12);
        let total: i32 = Vertex::ATTRIBUTES.iter().map(|a| a.components).sum();
        assert_eq!(total as usize * size_of::<f32>(), Vertex::STRIDE);
    }

    #[test]
    fn test_position_only_vertex_has_zero_uv() {
        let v = Vertex::from_position(1.0, 2.0, 3.0);
        assert_eq!(v, Vertex::new([1.0, 2.0, 3.0], [0.0, 0.0]));
    }

    #[test]
    fn test_vertex_bytes_are_interleaved() {
        let vertices = [Vertex::new([1.0, 2.0, 3.0], [4.0, 5.0])];
        let floats: &[f32] = bytemuck::cast_slice(&vertices);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_generate_attributes_configures_slots_in_order() {
        let gl = Rc::new(HeadlessGl::new());
        let ctx = GlContext::new(Rc::clone(&gl));
        let vbo = gl.create_buffer().unwrap();
        gl.bind_buffer(glow::ARRAY_BUFFER, vbo);

        let vao = generate_attributes(&ctx).unwrap();

        assert!(vao.is_some());
        assert_eq!(gl.bound_vertex_array(), vao.raw());
        assert_eq!(gl.enabled_attributes(vao.raw()), vec![0, 1]);

        let position = gl.attribute_pointer(vao.raw(), 0).unwrap();
        assert_eq!((position.size, position.offset, position.stride), (3, 0, 20));
        assert_eq!(position.data_type, glow::FLOAT);
        assert!(!position.normalized);
        assert_eq!(position.buffer, vbo);

        let uv = gl.attribute_pointer(vao.raw(), 1).unwrap();
        assert_eq!((uv.size, uv.offset, uv.stride), (2, 12, 20));
    }
}
