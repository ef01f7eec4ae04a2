//! # Rendering System
//!
//! Owned GPU resources for a single OpenGL 3.3 core context.
//!
//! ## Architecture
//!
//! - **gl**: the driver seam, error diagnostics and typed object names
//! - **Vertex / Mesh**: interleaved vertex format and indexed meshes that own
//!   their buffers
//! - **Shader**: stage sources, directory discovery and batch program linking
//! - **Camera**: first-person view and projection matrices
//!
//! ## Threading
//!
//! Everything here shares one `Rc<GlContext>` and is therefore `!Send`. All
//! GPU work happens on the thread that made the context current.

pub mod camera;
pub mod gl;
pub mod mesh;
pub mod shader;
pub mod vertex;

pub use camera::Camera;
pub use gl::{GlContext, GlError};
pub use mesh::Mesh;
pub use shader::{
    read_shader_sources, ShadeletSource, ShaderBatch, ShaderCompileError, ShaderError, ShaderProgram, ShaderSource,
    ShaderStage, UniformLocation,
};
pub use vertex::{generate_attributes, Vertex};
