//! OpenGL 3.3 core access layer
//!
//! Everything that talks to the driver goes through the [`GlApi`] trait. The
//! trait exposes raw `u32` object names (0 meaning "no object") so that both the
//! real driver ([`GlowApi`]) and the in-process model (`HeadlessGl`, enabled by
//! the default `headless` feature) can sit behind it. Owning types above this
//! layer wrap names in [`ResourceId`].
//!
//! The [`GlContext`] is handed around as `Rc<GlContext>`. `Rc` keeps every
//! mesh and program `!Send`, so GPU objects cannot leave the thread the context
//! is current on.

pub mod diagnostics;
pub mod glow_backend;
pub mod handle;
#[cfg(any(test, feature = "headless"))]
pub mod headless;

use std::cell::Cell;
use std::rc::Rc;

use thiserror::Error;

pub use diagnostics::{ErrorPolicy, GlErrorKind};
pub use glow_backend::GlowApi;
pub use handle::{BufferKind, ProgramKind, ResourceId, ResourceKind, ShaderKind, VertexArrayKind};
#[cfg(any(test, feature = "headless"))]
pub use headless::{DrawCall, HeadlessGl};

/// Raw OpenGL object name (0 = no object)
pub type RawName = u32;

/// Errors for GPU resources that could not be created
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GlError {
    /// The driver refused to hand out an object name
    #[error("Failed to allocate {kind}: {reason}")]
    Allocation {
        /// Object kind that was requested
        kind: &'static str,
        /// Driver-provided reason
        reason: String,
    },

    /// More indices than a single `glDrawElements` call can address
    #[error("Index count {count} exceeds the GLsizei range")]
    TooManyIndices {
        /// Number of indices supplied
        count: usize,
    },
}

/// The subset of the OpenGL 3.3 core API used by the engine
///
/// Enum parameters take glow's constants (`glow::ARRAY_BUFFER`, ...). Every
/// method mirrors exactly one GL entry point and has its GL semantics,
/// including raising errors into the queue read by [`GlApi::get_error`].
pub trait GlApi {
    /// `glGetError`: pop one pending error, `glow::NO_ERROR` when empty
    fn get_error(&self) -> u32;

    /// `glGenBuffers`
    fn create_buffer(&self) -> Result<RawName, String>;
    /// `glBindBuffer`
    fn bind_buffer(&self, target: u32, buffer: RawName);
    /// `glBufferData`
    fn buffer_data(&self, target: u32, data: &[u8], usage: u32);
    /// `glDeleteBuffers`; name 0 is ignored
    fn delete_buffer(&self, buffer: RawName);

    /// `glGenVertexArrays`
    fn create_vertex_array(&self) -> Result<RawName, String>;
    /// `glBindVertexArray`
    fn bind_vertex_array(&self, vertex_array: RawName);
    /// `glDeleteVertexArrays`; name 0 is ignored
    fn delete_vertex_array(&self, vertex_array: RawName);
    /// `glEnableVertexAttribArray`
    fn enable_vertex_attrib_array(&self, index: u32);
    /// `glVertexAttribPointer` with a byte offset into the bound array buffer
    fn vertex_attrib_pointer_f32(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    /// `glDrawElements` with a byte offset into the bound element buffer
    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32);

    /// `glCreateShader`
    fn create_shader(&self, stage: u32) -> Result<RawName, String>;
    /// `glShaderSource` with a single string
    fn shader_source(&self, shader: RawName, source: &str);
    /// `glCompileShader`
    fn compile_shader(&self, shader: RawName);
    /// `glGetShaderiv(GL_COMPILE_STATUS)`
    fn get_shader_compile_status(&self, shader: RawName) -> bool;
    /// `glGetShaderInfoLog`
    fn get_shader_info_log(&self, shader: RawName) -> String;
    /// `glDeleteShader`; name 0 is ignored
    fn delete_shader(&self, shader: RawName);

    /// `glCreateProgram`
    fn create_program(&self) -> Result<RawName, String>;
    /// `glAttachShader`
    fn attach_shader(&self, program: RawName, shader: RawName);
    /// `glDetachShader`
    fn detach_shader(&self, program: RawName, shader: RawName);
    /// `glLinkProgram`
    fn link_program(&self, program: RawName);
    /// `glGetProgramiv(GL_LINK_STATUS)`
    fn get_program_link_status(&self, program: RawName) -> bool;
    /// `glGetProgramInfoLog`
    fn get_program_info_log(&self, program: RawName) -> String;
    /// `glDeleteProgram`; name 0 is ignored
    fn delete_program(&self, program: RawName);
    /// `glUseProgram`; 0 unbinds
    fn use_program(&self, program: RawName);
    /// `glGetUniformLocation`; `None` where GL would return -1
    fn get_uniform_location(&self, program: RawName, name: &str) -> Option<u32>;
    /// `glUniform4f`
    fn uniform_4_f32(&self, location: u32, x: f32, y: f32, z: f32, w: f32);
    /// `glUniformMatrix4fv` with a single column-major matrix
    fn uniform_matrix_4_f32(&self, location: u32, transpose: bool, value: &[f32; 16]);

    /// `glClearColor`
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    /// `glClear`
    fn clear(&self, mask: u32);
    /// `glViewport`
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    /// `glEnable`
    fn enable(&self, capability: u32);
    /// `glGetString`
    fn get_parameter_string(&self, parameter: u32) -> String;
}

impl<T: GlApi + ?Sized> GlApi for Rc<T> {
    fn get_error(&self) -> u32 {
        (**self).get_error()
    }
    fn create_buffer(&self) -> Result<RawName, String> {
        (**self).create_buffer()
    }
    fn bind_buffer(&self, target: u32, buffer: RawName) {
        (**self).bind_buffer(target, buffer)
    }
    fn buffer_data(&self, target: u32, data: &[u8], usage: u32) {
        (**self).buffer_data(target, data, usage)
    }
    fn delete_buffer(&self, buffer: RawName) {
        (**self).delete_buffer(buffer)
    }
    fn create_vertex_array(&self) -> Result<RawName, String> {
        (**self).create_vertex_array()
    }
    fn bind_vertex_array(&self, vertex_array: RawName) {
        (**self).bind_vertex_array(vertex_array)
    }
    fn delete_vertex_array(&self, vertex_array: RawName) {
        (**self).delete_vertex_array(vertex_array)
    }
    fn enable_vertex_attrib_array(&self, index: u32) {
        (**self).enable_vertex_attrib_array(index)
    }
    fn vertex_attrib_pointer_f32(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        (**self).vertex_attrib_pointer_f32(index, size, data_type, normalized, stride, offset)
    }
    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32) {
        (**self).draw_elements(mode, count, element_type, offset)
    }
    fn create_shader(&self, stage: u32) -> Result<RawName, String> {
        (**self).create_shader(stage)
    }
    fn shader_source(&self, shader: RawName, source: &str) {
        (**self).shader_source(shader, source)
    }
    fn compile_shader(&self, shader: RawName) {
        (**self).compile_shader(shader)
    }
    fn get_shader_compile_status(&self, shader: RawName) -> bool {
        (**self).get_shader_compile_status(shader)
    }
    fn get_shader_info_log(&self, shader: RawName) -> String {
        (**self).get_shader_info_log(shader)
    }
    fn delete_shader(&self, shader: RawName) {
        (**self).delete_shader(shader)
    }
    fn create_program(&self) -> Result<RawName, String> {
        (**self).create_program()
    }
    fn attach_shader(&self, program: RawName, shader: RawName) {
        (**self).attach_shader(program, shader)
    }
    fn detach_shader(&self, program: RawName, shader: RawName) {
        (**self).detach_shader(program, shader)
    }
    fn link_program(&self, program: RawName) {
        (**self).link_program(program)
    }
    fn get_program_link_status(&self, program: RawName) -> bool {
        (**self).get_program_link_status(program)
    }
    fn get_program_info_log(&self, program: RawName) -> String {
        (**self).get_program_info_log(program)
    }
    fn delete_program(&self, program: RawName) {
        (**self).delete_program(program)
    }
    fn use_program(&self, program: RawName) {
        (**self).use_program(program)
    }
    fn get_uniform_location(&self, program: RawName, name: &str) -> Option<u32> {
        (**self).get_uniform_location(program, name)
    }
    fn uniform_4_f32(&self, location: u32, x: f32, y: f32, z: f32, w: f32) {
        (**self).uniform_4_f32(location, x, y, z, w)
    }
    fn uniform_matrix_4_f32(&self, location: u32, transpose: bool, value: &[f32; 16]) {
        (**self).uniform_matrix_4_f32(location, transpose, value)
    }
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        (**self).clear_color(r, g, b, a)
    }
    fn clear(&self, mask: u32) {
        (**self).clear(mask)
    }
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        (**self).viewport(x, y, width, height)
    }
    fn enable(&self, capability: u32) {
        (**self).enable(capability)
    }
    fn get_parameter_string(&self, parameter: u32) -> String {
        (**self).get_parameter_string(parameter)
    }
}

/// A current OpenGL context plus the policy applied to driver errors
///
/// Construct one per window and share it as `Rc<GlContext>` with every object
/// that owns GPU resources.
pub struct GlContext {
    api: Box<dyn GlApi>,
    policy: Cell<ErrorPolicy>,
}

impl GlContext {
    /// Wrap an API implementation with the default (fatal) error policy
    pub fn new(api: impl GlApi + 'static) -> Rc<Self> {
        Self::with_policy(api, ErrorPolicy::default())
    }

    /// Wrap an API implementation with an explicit error policy
    pub fn with_policy(api: impl GlApi + 'static, policy: ErrorPolicy) -> Rc<Self> {
        Rc::new(Self {
            api: Box::new(api),
            policy: Cell::new(policy),
        })
    }

    /// Raw API access; prefer the `gl_call!` macro so errors get checked
    pub fn api(&self) -> &dyn GlApi {
        self.api.as_ref()
    }

    /// Policy applied when a checked call leaves errors behind
    pub fn policy(&self) -> ErrorPolicy {
        self.policy.get()
    }

    /// Change the error policy
    pub fn set_policy(&self, policy: ErrorPolicy) {
        self.policy.set(policy);
    }

    /// Discard errors left over from earlier, unchecked calls
    pub fn clear_errors(&self) {
        diagnostics::clear_errors(self.api());
    }

    /// Report errors raised by the call just made
    ///
    /// # Panics
    /// Panics when errors were found and the policy is [`ErrorPolicy::Fatal`].
    pub fn check_errors(&self, call: &str, file: &str, line: u32) -> Vec<GlErrorKind> {
        let errors = diagnostics::check_errors(self.api(), call, file, line);
        if !errors.is_empty() && self.policy() == ErrorPolicy::Fatal {
            panic!(
                "OpenGL error(s) {:?} raised by `{}` at {}:{}",
                errors, call, file, line
            );
        }
        errors
    }
}

impl std::fmt::Debug for GlContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlContext")
            .field("policy", &self.policy.get())
            .finish_non_exhaustive()
    }
}
