//! GLSL shader sources, discovery and program building

pub mod discovery;
pub mod program;
pub mod source;

pub use discovery::read_shader_sources;
pub use program::{CompileErrorKind, ShaderBatch, ShaderCompileError, ShaderProgram, UniformLocation};
pub use source::{ShadeletSource, ShaderError, ShaderSource, ShaderStage};
