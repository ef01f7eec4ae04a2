//! In-process model of the OpenGL object state used by the engine
//!
//! `HeadlessGl` implements [`GlApi`] without a driver. It keeps the object
//! tables, binding points, error queue and draw calls that a GL 3.3 core
//! context would, raising the same error codes for the misuse cases the engine
//! cares about. Test suites drive meshes and programs through it and then
//! inspect the resulting state.
//!
//! The shader "compiler" is a syntax check only: it rejects empty sources and
//! unbalanced `{}`, `()` and `[]`, reporting positions in the
//! `0:<line>(<col>)` form drivers use. The linker requires a vertex and a
//! fragment stage with a `main` entry point. Every declared uniform gets a
//! location; unlike a driver, unused uniforms are not optimized away.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use super::{GlApi, RawName};

/// One recorded `glDrawElements` call with the state it was issued under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Primitive mode (`glow::TRIANGLES`, ...)
    pub mode: u32,
    /// Number of indices requested
    pub count: i32,
    /// Index type (`glow::UNSIGNED_INT`, ...)
    pub element_type: u32,
    /// Byte offset into the element buffer
    pub offset: i32,
    /// Vertex array bound at draw time
    pub vertex_array: RawName,
    /// Element buffer recorded in that vertex array
    pub element_buffer: RawName,
    /// Program in use at draw time
    pub program: RawName,
}

/// Attribute pointer state recorded in a vertex array object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributePointer {
    /// Component count
    pub size: i32,
    /// Component type
    pub data_type: u32,
    /// Whether fixed-point data is normalized
    pub normalized: bool,
    /// Byte stride between records
    pub stride: i32,
    /// Byte offset of the first component
    pub offset: i32,
    /// Array buffer bound when the pointer was set
    pub buffer: RawName,
}

struct BufferObject {
    data: Vec<u8>,
    usage: u32,
}

#[derive(Default)]
struct VertexArrayObject {
    enabled: BTreeSet<u32>,
    pointers: BTreeMap<u32, AttributePointer>,
    element_buffer: RawName,
}

struct ShaderObject {
    stage: u32,
    source: String,
    compiled: bool,
    info_log: String,
    delete_pending: bool,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<RawName>,
    linked: bool,
    info_log: String,
    uniforms: Vec<String>,
}

struct State {
    next_name: RawName,
    buffers: HashMap<RawName, BufferObject>,
    vertex_arrays: HashMap<RawName, VertexArrayObject>,
    shaders: HashMap<RawName, ShaderObject>,
    programs: HashMap<RawName, ProgramObject>,
    array_buffer: RawName,
    // ELEMENT_ARRAY_BUFFER binding while no vertex array is bound
    loose_element_buffer: RawName,
    vertex_array: RawName,
    program: RawName,
    errors: VecDeque<u32>,
    draws: Vec<DrawCall>,
    uniform_values: HashMap<(RawName, u32), Vec<f32>>,
    capabilities: BTreeSet<u32>,
    viewport: [i32; 4],
    clear_color: [f32; 4],
    clears: usize,
    fail_allocations: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            next_name: 1,
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            array_buffer: 0,
            loose_element_buffer: 0,
            vertex_array: 0,
            program: 0,
            errors: VecDeque::new(),
            draws: Vec::new(),
            uniform_values: HashMap::new(),
            capabilities: BTreeSet::new(),
            viewport: [0; 4],
            clear_color: [0.0; 4],
            clears: 0,
            fail_allocations: false,
        }
    }
}

impl State {
    fn raise(&mut self, code: u32) {
        self.errors.push_back(code);
    }

    fn allocate(&mut self, kind: &str) -> Result<RawName, String> {
        if self.fail_allocations {
            self.raise(glow::OUT_OF_MEMORY);
            return Err(format!("no {kind} names available"));
        }
        let name = self.next_name;
        self.next_name += 1;
        Ok(name)
    }

    fn element_buffer(&self) -> RawName {
        self.vertex_arrays
            .get(&self.vertex_array)
            .map_or(self.loose_element_buffer, |vao| vao.element_buffer)
    }

    fn set_element_buffer(&mut self, buffer: RawName) {
        match self.vertex_arrays.get_mut(&self.vertex_array) {
            Some(vao) => vao.element_buffer = buffer,
            None => self.loose_element_buffer = buffer,
        }
    }

    fn bound_buffer(&self, target: u32) -> Option<RawName> {
        match target {
            glow::ARRAY_BUFFER => Some(self.array_buffer),
            glow::ELEMENT_ARRAY_BUFFER => Some(self.element_buffer()),
            _ => None,
        }
    }

    fn release_shader_if_pending(&mut self, shader: RawName) {
        let attached = self.programs.values().any(|p| p.attached.contains(&shader));
        if !attached && self.shaders.get(&shader).is_some_and(|s| s.delete_pending) {
            self.shaders.remove(&shader);
        }
    }
}

/// Headless OpenGL 3.3 core object model
#[derive(Default)]
pub struct HeadlessGl {
    state: RefCell<State>,
}

impl HeadlessGl {
    /// Fresh context with no objects and an empty error queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error as if a driver call had raised it
    pub fn push_error(&self, code: u32) {
        self.state.borrow_mut().raise(code);
    }

    /// Make every subsequent name allocation fail with `GL_OUT_OF_MEMORY`
    pub fn set_fail_allocations(&self, fail: bool) {
        self.state.borrow_mut().fail_allocations = fail;
    }

    /// Draw calls issued so far, oldest first
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.state.borrow().draws.clone()
    }

    /// Forget recorded draw calls
    pub fn clear_draw_calls(&self) {
        self.state.borrow_mut().draws.clear();
    }

    /// Whether `name` is a live buffer object
    pub fn is_buffer(&self, name: RawName) -> bool {
        self.state.borrow().buffers.contains_key(&name)
    }

    /// Whether `name` is a live vertex array object
    pub fn is_vertex_array(&self, name: RawName) -> bool {
        self.state.borrow().vertex_arrays.contains_key(&name)
    }

    /// Whether `name` is a live (not yet released) shader object
    pub fn is_shader(&self, name: RawName) -> bool {
        self.state.borrow().shaders.contains_key(&name)
    }

    /// Whether `name` is a live program object
    pub fn is_program(&self, name: RawName) -> bool {
        self.state.borrow().programs.contains_key(&name)
    }

    /// Total number of live objects of every kind
    pub fn live_object_count(&self) -> usize {
        let state = self.state.borrow();
        state.buffers.len() + state.vertex_arrays.len() + state.shaders.len() + state.programs.len()
    }

    /// Contents and usage hint of a buffer
    pub fn buffer_contents(&self, name: RawName) -> Option<(Vec<u8>, u32)> {
        self.state
            .borrow()
            .buffers
            .get(&name)
            .map(|b| (b.data.clone(), b.usage))
    }

    /// Current `ARRAY_BUFFER` binding
    pub fn bound_array_buffer(&self) -> RawName {
        self.state.borrow().array_buffer
    }

    /// Current `ELEMENT_ARRAY_BUFFER` binding
    pub fn bound_element_buffer(&self) -> RawName {
        self.state.borrow().element_buffer()
    }

    /// Current vertex array binding
    pub fn bound_vertex_array(&self) -> RawName {
        self.state.borrow().vertex_array
    }

    /// Program currently in use
    pub fn current_program(&self) -> RawName {
        self.state.borrow().program
    }

    /// Element buffer recorded in a vertex array
    pub fn vertex_array_element_buffer(&self, vertex_array: RawName) -> Option<RawName> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)
            .map(|vao| vao.element_buffer)
    }

    /// Enabled attribute slots of a vertex array, ascending
    pub fn enabled_attributes(&self, vertex_array: RawName) -> Vec<u32> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)
            .map(|vao| vao.enabled.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Attribute pointer recorded for a slot of a vertex array
    pub fn attribute_pointer(&self, vertex_array: RawName, index: u32) -> Option<AttributePointer> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)
            .and_then(|vao| vao.pointers.get(&index).copied())
    }

    /// Stage enum of a shader object
    pub fn shader_stage(&self, shader: RawName) -> Option<u32> {
        self.state.borrow().shaders.get(&shader).map(|s| s.stage)
    }

    /// Shaders currently attached to a program
    pub fn attached_shaders(&self, program: RawName) -> Vec<RawName> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.attached.clone())
            .unwrap_or_default()
    }

    /// Last value uploaded to a uniform location of a program
    pub fn uniform_value(&self, program: RawName, location: u32) -> Option<Vec<f32>> {
        self.state
            .borrow()
            .uniform_values
            .get(&(program, location))
            .cloned()
    }

    /// Whether a capability was enabled with `glEnable`
    pub fn is_enabled(&self, capability: u32) -> bool {
        self.state.borrow().capabilities.contains(&capability)
    }

    /// Last viewport as `[x, y, width, height]`
    pub fn viewport_rect(&self) -> [i32; 4] {
        self.state.borrow().viewport
    }

    /// Number of `glClear` calls
    pub fn clear_count(&self) -> usize {
        self.state.borrow().clears
    }
}

impl GlApi for HeadlessGl {
    fn get_error(&self) -> u32 {
        self.state
            .borrow_mut()
            .errors
            .pop_front()
            .unwrap_or(glow::NO_ERROR)
    }

    fn create_buffer(&self) -> Result<RawName, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate("buffer")?;
        state.buffers.insert(
            name,
            BufferObject {
                data: Vec::new(),
                usage: glow::STATIC_DRAW,
            },
        );
        Ok(name)
    }

    fn bind_buffer(&self, target: u32, buffer: RawName) {
        let mut state = self.state.borrow_mut();
        if state.bound_buffer(target).is_none() {
            state.raise(glow::INVALID_ENUM);
            return;
        }
        if buffer != 0 && !state.buffers.contains_key(&buffer) {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        match target {
            glow::ARRAY_BUFFER => state.array_buffer = buffer,
            _ => state.set_element_buffer(buffer),
        }
    }

    fn buffer_data(&self, target: u32, data: &[u8], usage: u32) {
        let mut state = self.state.borrow_mut();
        let Some(bound) = state.bound_buffer(target) else {
            state.raise(glow::INVALID_ENUM);
            return;
        };
        if !matches!(usage, glow::STATIC_DRAW | glow::DYNAMIC_DRAW | glow::STREAM_DRAW) {
            state.raise(glow::INVALID_ENUM);
            return;
        }
        match state.buffers.get_mut(&bound) {
            Some(buffer) => {
                buffer.data = data.to_vec();
                buffer.usage = usage;
            }
            None => state.raise(glow::INVALID_OPERATION),
        }
    }

    fn delete_buffer(&self, buffer: RawName) {
        let mut state = self.state.borrow_mut();
        if state.buffers.remove(&buffer).is_none() {
            return;
        }
        if state.array_buffer == buffer {
            state.array_buffer = 0;
        }
        if state.element_buffer() == buffer {
            state.set_element_buffer(0);
        }
    }

    fn create_vertex_array(&self) -> Result<RawName, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate("vertex array")?;
        state.vertex_arrays.insert(name, VertexArrayObject::default());
        Ok(name)
    }

    fn bind_vertex_array(&self, vertex_array: RawName) {
        let mut state = self.state.borrow_mut();
        if vertex_array != 0 && !state.vertex_arrays.contains_key(&vertex_array) {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        state.vertex_array = vertex_array;
    }

    fn delete_vertex_array(&self, vertex_array: RawName) {
        let mut state = self.state.borrow_mut();
        if state.vertex_arrays.remove(&vertex_array).is_some() && state.vertex_array == vertex_array {
            state.vertex_array = 0;
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        let mut state = self.state.borrow_mut();
        if index >= 16 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        let current = state.vertex_array;
        match state.vertex_arrays.get_mut(&current) {
            Some(vao) => {
                vao.enabled.insert(index);
            }
            None => state.raise(glow::INVALID_OPERATION),
        }
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
        let mut state = self.state.borrow_mut();
        if index >= 16 || !(1..=4).contains(&size) || stride < 0 || offset < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        if !matches!(data_type, glow::FLOAT | glow::HALF_FLOAT | glow::DOUBLE) {
            state.raise(glow::INVALID_ENUM);
            return;
        }
        let buffer = state.array_buffer;
        let current = state.vertex_array;
        if buffer == 0 {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        match state.vertex_arrays.get_mut(&current) {
            Some(vao) => {
                vao.pointers.insert(
                    index,
                    AttributePointer {
                        size,
                        data_type,
                        normalized,
                        stride,
                        offset,
                        buffer,
                    },
                );
            }
            None => state.raise(glow::INVALID_OPERATION),
        }
    }

    fn draw_elements(&self, mode: u32, count: i32, element_type: u32, offset: i32) {
        let mut state = self.state.borrow_mut();
        let valid_mode = matches!(
            mode,
            glow::POINTS
                | glow::LINES
                | glow::LINE_STRIP
                | glow::LINE_LOOP
                | glow::TRIANGLES
                | glow::TRIANGLE_STRIP
                | glow::TRIANGLE_FAN
        );
        let valid_type = matches!(
            element_type,
            glow::UNSIGNED_BYTE | glow::UNSIGNED_SHORT | glow::UNSIGNED_INT
        );
        if !valid_mode || !valid_type {
            state.raise(glow::INVALID_ENUM);
            return;
        }
        if count < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        let element_buffer = state.element_buffer();
        if state.vertex_array == 0 || element_buffer == 0 {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        let call = DrawCall {
            mode,
            count,
            element_type,
            offset,
            vertex_array: state.vertex_array,
            element_buffer,
            program: state.program,
        };
        state.draws.push(call);
    }

    fn create_shader(&self, stage: u32) -> Result<RawName, String> {
        let mut state = self.state.borrow_mut();
        let known = matches!(
            stage,
            glow::VERTEX_SHADER
                | glow::FRAGMENT_SHADER
                | glow::GEOMETRY_SHADER
                | glow::TESS_CONTROL_SHADER
                | glow::TESS_EVALUATION_SHADER
                | glow::COMPUTE_SHADER
        );
        if !known {
            state.raise(glow::INVALID_ENUM);
            return Err(format!("unknown shader type 0x{stage:04x}"));
        }
        let name = state.allocate("shader")?;
        state.shaders.insert(
            name,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: false,
                info_log: String::new(),
                delete_pending: false,
            },
        );
        Ok(name)
    }

    fn shader_source(&self, shader: RawName, source: &str) {
        let mut state = self.state.borrow_mut();
        match state.shaders.get_mut(&shader) {
            Some(object) => object.source = source.to_owned(),
            None => state.raise(glow::INVALID_VALUE),
        }
    }

    fn compile_shader(&self, shader: RawName) {
        let mut state = self.state.borrow_mut();
        match state.shaders.get_mut(&shader) {
            Some(object) => match check_syntax(&object.source) {
                Ok(()) => {
                    object.compiled = true;
                    object.info_log.clear();
                }
                Err(log) => {
                    object.compiled = false;
                    object.info_log = log;
                }
            },
            None => state.raise(glow::INVALID_VALUE),
        }
    }

    fn get_shader_compile_status(&self, shader: RawName) -> bool {
        let mut state = self.state.borrow_mut();
        match state.shaders.get(&shader) {
            Some(object) => object.compiled,
            None => {
                state.raise(glow::INVALID_VALUE);
                false
            }
        }
    }

    fn get_shader_info_log(&self, shader: RawName) -> String {
        let mut state = self.state.borrow_mut();
        match state.shaders.get(&shader) {
            Some(object) => object.info_log.clone(),
            None => {
                state.raise(glow::INVALID_VALUE);
                String::new()
            }
        }
    }

    fn delete_shader(&self, shader: RawName) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.shaders.get_mut(&shader) {
            object.delete_pending = true;
            state.release_shader_if_pending(shader);
        }
    }

    fn create_program(&self) -> Result<RawName, String> {
        let mut state = self.state.borrow_mut();
        let name = state.allocate("program")?;
        state.programs.insert(name, ProgramObject::default());
        Ok(name)
    }

    fn attach_shader(&self, program: RawName, shader: RawName) {
        let mut state = self.state.borrow_mut();
        if !state.shaders.contains_key(&shader) {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        let outcome = match state.programs.get_mut(&program) {
            Some(object) if object.attached.contains(&shader) => Err(glow::INVALID_OPERATION),
            Some(object) => {
                object.attached.push(shader);
                Ok(())
            }
            None => Err(glow::INVALID_VALUE),
        };
        if let Err(code) = outcome {
            state.raise(code);
        }
    }

    fn detach_shader(&self, program: RawName, shader: RawName) {
        let mut state = self.state.borrow_mut();
        let Some(object) = state.programs.get_mut(&program) else {
            state.raise(glow::INVALID_VALUE);
            return;
        };
        let before = object.attached.len();
        object.attached.retain(|&s| s != shader);
        if object.attached.len() == before {
            state.raise(glow::INVALID_OPERATION);
            return;
        }
        state.release_shader_if_pending(shader);
    }

    fn link_program(&self, program: RawName) {
        let mut state = self.state.borrow_mut();
        let Some(object) = state.programs.get(&program) else {
            state.raise(glow::INVALID_VALUE);
            return;
        };
        let stages: Vec<&ShaderObject> = object
            .attached
            .iter()
            .filter_map(|name| state.shaders.get(name))
            .collect();
        let outcome = link_stages(&stages);
        if let Some(object) = state.programs.get_mut(&program) {
            match outcome {
                Ok(uniforms) => {
                    object.linked = true;
                    object.info_log.clear();
                    object.uniforms = uniforms;
                }
                Err(log) => {
                    object.linked = false;
                    object.info_log = log;
                    object.uniforms.clear();
                }
            }
        }
    }

    fn get_program_link_status(&self, program: RawName) -> bool {
        let mut state = self.state.borrow_mut();
        match state.programs.get(&program) {
            Some(object) => object.linked,
            None => {
                state.raise(glow::INVALID_VALUE);
                false
            }
        }
    }

    fn get_program_info_log(&self, program: RawName) -> String {
        let mut state = self.state.borrow_mut();
        match state.programs.get(&program) {
            Some(object) => object.info_log.clone(),
            None => {
                state.raise(glow::INVALID_VALUE);
                String::new()
            }
        }
    }

    fn delete_program(&self, program: RawName) {
        let mut state = self.state.borrow_mut();
        let Some(object) = state.programs.remove(&program) else {
            return;
        };
        for shader in object.attached {
            state.release_shader_if_pending(shader);
        }
        state.uniform_values.retain(|(p, _), _| *p != program);
        if state.program == program {
            state.program = 0;
        }
    }

    fn use_program(&self, program: RawName) {
        let mut state = self.state.borrow_mut();
        let refusal = match state.programs.get(&program) {
            _ if program == 0 => None,
            None => Some(glow::INVALID_VALUE),
            Some(object) if !object.linked => Some(glow::INVALID_OPERATION),
            Some(_) => None,
        };
        match refusal {
            Some(code) => state.raise(code),
            None => state.program = program,
        }
    }

    fn get_uniform_location(&self, program: RawName, name: &str) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        let found = match state.programs.get(&program) {
            None => Err(glow::INVALID_VALUE),
            Some(object) if !object.linked => Err(glow::INVALID_OPERATION),
            Some(object) => Ok(object.uniforms.iter().position(|u| u == name)),
        };
        match found {
            Ok(location) => location.and_then(|l| u32::try_from(l).ok()),
            Err(code) => {
                state.raise(code);
                None
            }
        }
    }

    fn uniform_4_f32(&self, location: u32, x: f32, y: f32, z: f32, w: f32) {
        let mut state = self.state.borrow_mut();
        store_uniform(&mut state, location, vec![x, y, z, w]);
    }

    fn uniform_matrix_4_f32(&self, location: u32, transpose: bool, value: &[f32; 16]) {
        let mut state = self.state.borrow_mut();
        if transpose {
            let mut transposed = [0.0; 16];
            for (i, slot) in transposed.iter_mut().enumerate() {
                *slot = value[(i % 4) * 4 + i / 4];
            }
            store_uniform(&mut state, location, transposed.to_vec());
        } else {
            store_uniform(&mut state, location, value.to_vec());
        }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.state.borrow_mut().clear_color = [r, g, b, a];
    }

    fn clear(&self, mask: u32) {
        let mut state = self.state.borrow_mut();
        let allowed = glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT;
        if mask & !allowed != 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        state.clears += 1;
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        let mut state = self.state.borrow_mut();
        if width < 0 || height < 0 {
            state.raise(glow::INVALID_VALUE);
            return;
        }
        state.viewport = [x, y, width, height];
    }

    fn enable(&self, capability: u32) {
        let mut state = self.state.borrow_mut();
        if matches!(capability, glow::DEPTH_TEST | glow::BLEND | glow::CULL_FACE) {
            state.capabilities.insert(capability);
        } else {
            state.raise(glow::INVALID_ENUM);
        }
    }

    fn get_parameter_string(&self, parameter: u32) -> String {
        match parameter {
            glow::VERSION => "3.3 (Core Profile) Headless".to_owned(),
            glow::RENDERER => "HeadlessGl".to_owned(),
            glow::VENDOR => "gl_engine".to_owned(),
            glow::SHADING_LANGUAGE_VERSION => "3.30".to_owned(),
            _ => {
                self.state.borrow_mut().raise(glow::INVALID_ENUM);
                String::new()
            }
        }
    }
}

fn store_uniform(state: &mut State, location: u32, value: Vec<f32>) {
    let program = state.program;
    let declared = state
        .programs
        .get(&program)
        .map_or(0, |p| p.uniforms.len());
    if program == 0 || location as usize >= declared {
        state.raise(glow::INVALID_OPERATION);
        return;
    }
    state.uniform_values.insert((program, location), value);
}

fn stage_name(stage: u32) -> &'static str {
    match stage {
        glow::VERTEX_SHADER => "vertex",
        glow::FRAGMENT_SHADER => "fragment",
        glow::GEOMETRY_SHADER => "geometry",
        glow::TESS_CONTROL_SHADER => "tessellation control",
        glow::TESS_EVALUATION_SHADER => "tessellation evaluation",
        glow::COMPUTE_SHADER => "compute",
        _ => "unknown",
    }
}

/// Iterate over source characters with 1-based line/column, skipping comments
fn code_chars(source: &str) -> Vec<(char, usize, usize)> {
    let mut out = Vec::new();
    let mut chars = source.chars().peekable();
    let (mut line, mut col) = (1, 0);
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while let Some(c) = chars.next() {
        if c == '\n' {
            // Kept so tokens on adjacent lines stay separated
            out.push((c, line, col + 1));
            line += 1;
            col = 0;
            in_line_comment = false;
            continue;
        }
        col += 1;
        if in_line_comment {
            continue;
        }
        if in_block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                col += 1;
                in_block_comment = false;
            }
            continue;
        }
        if c == '/' {
            match chars.peek() {
                Some('/') => {
                    in_line_comment = true;
                    continue;
                }
                Some('*') => {
                    chars.next();
                    col += 1;
                    in_block_comment = true;
                    continue;
                }
                _ => {}
            }
        }
        out.push((c, line, col));
    }
    out
}

fn check_syntax(source: &str) -> Result<(), String> {
    let code = code_chars(source);
    if code.iter().all(|(c, _, _)| c.is_whitespace()) {
        return Err("0:1(1): error: syntax error, unexpected end of file".to_owned());
    }

    let mut open: Vec<(char, usize, usize)> = Vec::new();
    for &(c, line, col) in &code {
        match c {
            '{' | '(' | '[' => open.push((c, line, col)),
            '}' | ')' | ']' => {
                let expected = match c {
                    '}' => '{',
                    ')' => '(',
                    _ => '[',
                };
                match open.pop() {
                    Some((opener, _, _)) if opener == expected => {}
                    _ => {
                        return Err(format!(
                            "0:{line}({col}): error: syntax error, unexpected '{c}'"
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    match open.pop() {
        Some((opener, line, col)) => Err(format!(
            "0:{line}({col}): error: syntax error, unexpected end of file, unmatched '{opener}'"
        )),
        None => Ok(()),
    }
}

fn has_main(source: &str) -> bool {
    let code: String = code_chars(source).into_iter().map(|(c, _, _)| c).collect();
    code.match_indices("main").any(|(at, _)| {
        let before = code[..at].chars().next_back();
        let after = code[at + 4..].trim_start();
        !before.is_some_and(|c| c.is_alphanumeric() || c == '_') && after.starts_with('(')
    })
}

/// Names declared with `uniform <type> a, b[2];`, in declaration order
fn declared_uniforms(source: &str) -> Vec<String> {
    let code: String = code_chars(source).into_iter().map(|(c, _, _)| c).collect();
    let mut names = Vec::new();
    for statement in code.split(';') {
        let mut tokens = statement.split_whitespace().peekable();
        // Skip to the `uniform` qualifier, which may follow a layout qualifier
        if !tokens.any(|t| t == "uniform") {
            continue;
        }
        while tokens
            .peek()
            .is_some_and(|t| matches!(*t, "lowp" | "mediump" | "highp"))
        {
            tokens.next();
        }
        let Some(_type_name) = tokens.next() else {
            continue;
        };
        let rest: String = tokens.collect::<Vec<_>>().join(" ");
        if rest.contains('{') {
            // Uniform blocks are not assigned plain locations
            continue;
        }
        for declarator in rest.split(',') {
            let name = declarator
                .split(|c: char| c == '[' || c == '=')
                .next()
                .unwrap_or("")
                .trim();
            if !name.is_empty() {
                names.push(name.to_owned());
            }
        }
    }
    names
}

fn link_stages(stages: &[&ShaderObject]) -> Result<Vec<String>, String> {
    let mut problems = Vec::new();
    for stage in stages {
        if !stage.compiled {
            problems.push(format!(
                "error: linking with uncompiled/unspecialized {} shader",
                stage_name(stage.stage)
            ));
        } else if !has_main(&stage.source) {
            problems.push(format!("error: {} shader lacks `main'", stage_name(stage.stage)));
        }
    }
    for required in [glow::VERTEX_SHADER, glow::FRAGMENT_SHADER] {
        if !stages.iter().any(|s| s.stage == required) {
            problems.push(format!("error: program lacks a {} shader", stage_name(required)));
        }
    }
    if !problems.is_empty() {
        return Err(problems.join("\n"));
    }

    let mut uniforms: Vec<String> = Vec::new();
    for stage in stages {
        for name in declared_uniforms(&stage.source) {
            if !uniforms.contains(&name) {
                uniforms.push(name);
            }
        }
    }
    Ok(uniforms)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "#version 330 core\n\
        layout (location = 0) in vec3 pos;\n\
        uniform mat4 model;\n\
        uniform mat4 projection;\n\
        void main() { gl_Position = projection * model * vec4(pos, 1.0); }\n";

    const FRAGMENT: &str = "#version 330 core\n\
        out vec4 color;\n\
        uniform vec4 u_Color;\n\
        void main() { color = u_Color; }\n";

    #[test]
    fn test_syntax_check_reports_position() {
        assert!(check_syntax(FRAGMENT).is_ok());

        let log = check_syntax("void main() {\n  x = 1;\n}}\n").unwrap_err();
        assert_eq!(log, "0:3(2): error: syntax error, unexpected '}'");

        let log = check_syntax("void main() {\n").unwrap_err();
        assert!(log.starts_with("0:1(13)"), "{log}");
        assert!(check_syntax("  // only a comment\n").is_err());
    }

    #[test]
    fn test_comments_are_ignored_by_syntax_check() {
        assert!(check_syntax("void main() { /* } */ }\n// {\n").is_ok());
    }

    #[test]
    fn test_uniform_declarations() {
        let names = declared_uniforms("uniform highp mat4 a, b[2];\nlayout(std140) uniform Block { vec4 c; };\nuniform float d = 1.0;");
        assert_eq!(names, vec!["a", "b", "d"]);
    }

    #[test]
    fn test_main_detection() {
        assert!(has_main("void main () {}"));
        assert!(!has_main("void domain() {}"));
        assert!(!has_main("// void main() {}"));
    }

    #[test]
    fn test_main_on_its_own_line() {
        assert!(has_main("void\nmain() {}"));
        assert!(has_main("void\nmain()\n{\n}\n"));
        assert!(!has_main("void\n// main()\nfoo() {}"));
    }

    #[test]
    fn test_uniform_after_directive() {
        let names = declared_uniforms("#version 330 core\nuniform vec4 u_Color;\nvoid main() {}\n");
        assert_eq!(names, vec!["u_Color"]);
    }

    #[test]
    fn test_block_comment_does_not_join_lines() {
        assert!(check_syntax("void main() { /* a\n } b */ }\n").is_ok());
        let names = declared_uniforms("uniform float/* x */\nscale;");
        assert_eq!(names, vec!["scale"]);
    }

    #[test]
    fn test_link_assigns_uniform_locations() {
        let gl = HeadlessGl::new();
        let vs = gl.create_shader(glow::VERTEX_SHADER).unwrap();
        let fs = gl.create_shader(glow::FRAGMENT_SHADER).unwrap();
        gl.shader_source(vs, VERTEX);
        gl.shader_source(fs, FRAGMENT);
        gl.compile_shader(vs);
        gl.compile_shader(fs);
        let program = gl.create_program().unwrap();
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);

        assert!(gl.get_program_link_status(program));
        assert_eq!(gl.get_uniform_location(program, "model"), Some(0));
        assert_eq!(gl.get_uniform_location(program, "u_Color"), Some(2));
        assert_eq!(gl.get_uniform_location(program, "missing"), None);
        assert_eq!(gl.get_error(), glow::NO_ERROR);
    }

    #[test]
    fn test_link_requires_fragment_stage() {
        let gl = HeadlessGl::new();
        let vs = gl.create_shader(glow::VERTEX_SHADER).unwrap();
        gl.shader_source(vs, VERTEX);
        gl.compile_shader(vs);
        let program = gl.create_program().unwrap();
        gl.attach_shader(program, vs);
        gl.link_program(program);

        assert!(!gl.get_program_link_status(program));
        assert!(gl.get_program_info_log(program).contains("lacks a fragment shader"));
    }

    #[test]
    fn test_deleted_shader_lives_until_detached() {
        let gl = HeadlessGl::new();
        let vs = gl.create_shader(glow::VERTEX_SHADER).unwrap();
        let program = gl.create_program().unwrap();
        gl.attach_shader(program, vs);
        gl.delete_shader(vs);
        assert!(gl.is_shader(vs));
        gl.detach_shader(program, vs);
        assert!(!gl.is_shader(vs));
    }

    #[test]
    fn test_element_buffer_binding_is_vertex_array_state() {
        let gl = HeadlessGl::new();
        let vao = gl.create_vertex_array().unwrap();
        let ibo = gl.create_buffer().unwrap();
        gl.bind_vertex_array(vao);
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, ibo);
        gl.bind_vertex_array(0);
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, 0);

        assert_eq!(gl.vertex_array_element_buffer(vao), Some(ibo));
        assert_eq!(gl.bound_element_buffer(), 0);
    }

    #[test]
    fn test_draw_without_vertex_array_is_invalid() {
        let gl = HeadlessGl::new();
        gl.draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_INT, 0);
        assert_eq!(gl.get_error(), glow::INVALID_OPERATION);
        assert!(gl.draw_calls().is_empty());
    }

    #[test]
    fn test_binding_unknown_buffer_is_invalid() {
        let gl = HeadlessGl::new();
        gl.bind_buffer(glow::ARRAY_BUFFER, 42);
        assert_eq!(gl.get_error(), glow::INVALID_OPERATION);
        gl.bind_buffer(0x1234, 0);
        assert_eq!(gl.get_error(), glow::INVALID_ENUM);
    }

    #[test]
    fn test_allocation_failure() {
        let gl = HeadlessGl::new();
        gl.set_fail_allocations(true);
        assert!(gl.create_buffer().is_err());
        assert_eq!(gl.get_error(), glow::OUT_OF_MEMORY);
    }
}
