//! Driver-backed [`GlApi`] implementation on top of glow

use std::num::NonZeroU32;

use glow::HasContext;

use super::{GlApi, RawName};

/// Real OpenGL context loaded through glow
///
/// Constructing one requires a context made current on this thread; see
/// [`GlWindow`](crate::window::GlWindow).
pub struct GlowApi {
    gl: glow::Context,
}

impl GlowApi {
    /// Wrap an already loaded glow context
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    /// Load GL entry points through a platform proc-address function
    ///
    /// # Safety
    /// The context the loader resolves against must be current on the calling
    /// thread and must outlive the returned value.
    pub unsafe fn from_loader_function<F>(loader: F) -> Self
    where
        F: FnMut(&str) -> *const std::ffi::c_void,
    {
        Self::new(glow::Context::from_loader_function(loader))
    }
}

fn buffer(raw: RawName) -> Option<glow::NativeBuffer> {
    NonZeroU32::new(raw).map(glow::NativeBuffer)
}

fn vertex_array(raw: RawName) -> Option<glow::NativeVertexArray> {
    NonZeroU32::new(raw).map(glow::NativeVertexArray)
}

fn shader(raw: RawName) -> Option<glow::NativeShader> {
    NonZeroU32::new(raw).map(glow::NativeShader)
}

fn program(raw: RawName) -> Option<glow::NativeProgram> {
    NonZeroU32::new(raw).map(glow::NativeProgram)
}

fn uniform(location: u32) -> glow::NativeUniformLocation {
    glow::NativeUniformLocation(location)
}

// Object names are handed out by the driver and only ever passed back to it.
// Zero names map to `None`, which glow translates back into GL's 0.
impl GlApi for GlowApi {
    fn get_error(&self) -> u32 {
        unsafe { self.gl.get_error() }
    }

    fn create_buffer(&self) -> Result<RawName, String> {
        unsafe { self.gl.create_buffer().map(|b| b.0.get()) }
    }

    fn bind_buffer(&self, target: u32, raw: RawName) {
        unsafe { self.gl.bind_buffer(target, buffer(raw)) }
    }

    fn buffer_data(&self, target: u32, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn delete_buffer(&self, raw: RawName) {
        if let Some(b) = buffer(raw) {
            unsafe { self.gl.delete_buffer(b) }
        }
    }

    fn create_vertex_array(&self) -> Result<RawName, String> {
        unsafe { self.gl.create_vertex_array().map(|v| v.0.get()) }
    }

    fn bind_vertex_array(&self, raw: RawName) {
        unsafe { self.gl.bind_vertex_array(vertex_array(raw)) }
    }

    fn delete_vertex_array(&self, raw: RawName) {
        if let Some(v) = vertex_array(raw) {
            unsafe { self.gl.delete_vertex_array(v) }
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
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
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, data_type, normalized, stride, offset);
        }
    }

    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32) {
        unsafe { self.gl.draw_elements(mode, count, element_type, offset) }
    }

    fn create_shader(&self, stage: u32) -> Result<RawName, String> {
        unsafe { self.gl.create_shader(stage).map(|s| s.0.get()) }
    }

    fn shader_source(&self, raw: RawName, source: &str) {
        if let Some(s) = shader(raw) {
            unsafe { self.gl.shader_source(s, source) }
        }
    }

    fn compile_shader(&self, raw: RawName) {
        if let Some(s) = shader(raw) {
            unsafe { self.gl.compile_shader(s) }
        }
    }

    fn get_shader_compile_status(&self, raw: RawName) -> bool {
        shader(raw).is_some_and(|s| unsafe { self.gl.get_shader_compile_status(s) })
    }

    fn get_shader_info_log(&self, raw: RawName) -> String {
        shader(raw)
            .map(|s| unsafe { self.gl.get_shader_info_log(s) })
            .unwrap_or_default()
    }

    fn delete_shader(&self, raw: RawName) {
        if let Some(s) = shader(raw) {
            unsafe { self.gl.delete_shader(s) }
        }
    }

    fn create_program(&self) -> Result<RawName, String> {
        unsafe { self.gl.create_program().map(|p| p.0.get()) }
    }

    fn attach_shader(&self, raw_program: RawName, raw_shader: RawName) {
        if let (Some(p), Some(s)) = (program(raw_program), shader(raw_shader)) {
            unsafe { self.gl.attach_shader(p, s) }
        }
    }

    fn detach_shader(&self, raw_program: RawName, raw_shader: RawName) {
        if let (Some(p), Some(s)) = (program(raw_program), shader(raw_shader)) {
            unsafe { self.gl.detach_shader(p, s) }
        }
    }

    fn link_program(&self, raw: RawName) {
        if let Some(p) = program(raw) {
            unsafe { self.gl.link_program(p) }
        }
    }

    fn get_program_link_status(&self, raw: RawName) -> bool {
        program(raw).is_some_and(|p| unsafe { self.gl.get_program_link_status(p) })
    }

    fn get_program_info_log(&self, raw: RawName) -> String {
        program(raw)
            .map(|p| unsafe { self.gl.get_program_info_log(p) })
            .unwrap_or_default()
    }

    fn delete_program(&self, raw: RawName) {
        if let Some(p) = program(raw) {
            unsafe { self.gl.delete_program(p) }
        }
    }

    fn use_program(&self, raw: RawName) {
        unsafe { self.gl.use_program(program(raw)) }
    }

    fn get_uniform_location(&self, raw: RawName, name: &str) -> Option<u32> {
        let p = program(raw)?;
        unsafe { self.gl.get_uniform_location(p, name).map(|l| l.0) }
    }

    fn uniform_4_f32(&self, location: u32, x: f32, y: f32, z: f32, w: f32) {
        unsafe { self.gl.uniform_4_f32(Some(&uniform(location)), x, y, z, w) }
    }

    fn uniform_matrix_4_f32(&self, location: u32, transpose: bool, value: &[f32; 16]) {
        unsafe {
            self.gl
                .uniform_matrix_4_f32_slice(Some(&uniform(location)), transpose, value);
        }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&self, mask: u32) {
        unsafe { self.gl.clear(mask) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn enable(&self, capability: u32) {
        unsafe { self.gl.enable(capability) }
    }

    fn get_parameter_string(&self, parameter: u32) -> String {
        unsafe { self.gl.get_parameter_string(parameter) }
    }
}
