//! Batch compilation and linking of shader programs
//!
//! [`ShaderProgram::compile_shaders`] turns every [`ShaderSource`] group into
//! a linked program, collecting diagnostics instead of stopping at the first
//! failure:
//!
//! 1. every unit of the group is compiled; a unit that fails contributes a
//!    [`ShaderCompileError`] carrying its path and the driver log, and the
//!    remaining units are still compiled so all of them get reported
//! 2. if any unit failed, the group is abandoned without linking
//! 3. otherwise the units are attached and linked; a link failure contributes
//!    one error carrying the group name
//! 4. intermediate shader objects are deleted on every path
//!
//! A [`ShaderProgram`] value only exists for a group that linked. Failed
//! groups leave no GPU objects behind.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::foundation::math::Mat4;
use crate::gl_call;
use crate::render::gl::{GlContext, ProgramKind, ResourceId, ShaderKind};

use super::source::{ShadeletSource, ShaderSource, ShaderStage};

/// Location of an active uniform in a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(u32);

impl UniformLocation {
    /// Raw location index
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Which step of building a program failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// A stage failed to compile
    Compile {
        /// File the stage source came from
        path: PathBuf,
        /// Stage being compiled
        stage: ShaderStage,
    },
    /// The compiled stages failed to link
    Link {
        /// Group name of the program
        program: String,
    },
    /// The driver refused to create a shader or program object
    Create {
        /// Group name of the program
        program: String,
    },
}

/// One diagnostic produced while building shader programs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderCompileError {
    kind: CompileErrorKind,
    log: String,
}

impl ShaderCompileError {
    /// Step that failed and what it was working on
    pub fn kind(&self) -> &CompileErrorKind {
        &self.kind
    }

    /// Driver info log (or allocation failure reason)
    pub fn log(&self) -> &str {
        &self.log
    }
}

impl fmt::Display for ShaderCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let log = self.log.trim_end();
        match &self.kind {
            CompileErrorKind::Compile { path, stage } => {
                write!(f, "{} ({stage} shader): {log}", path.display())
            }
            CompileErrorKind::Link { program } => write!(f, "program '{program}' failed to link: {log}"),
            CompileErrorKind::Create { program } => {
                write!(f, "program '{program}': could not create GL object: {log}")
            }
        }
    }
}

impl std::error::Error for ShaderCompileError {}

/// Outcome of [`ShaderProgram::compile_shaders`]
#[derive(Debug, Default)]
pub struct ShaderBatch {
    /// Programs that linked, in input order
    pub programs: Vec<ShaderProgram>,
    /// Every diagnostic, in the order it was produced
    pub errors: Vec<ShaderCompileError>,
}

impl ShaderBatch {
    /// True when no diagnostic was produced
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Programs when everything built, otherwise every diagnostic
    ///
    /// On failure the programs that did link are dropped, releasing them.
    pub fn into_result(self) -> Result<Vec<ShaderProgram>, Vec<ShaderCompileError>> {
        if self.errors.is_empty() {
            Ok(self.programs)
        } else {
            Err(self.errors)
        }
    }

    /// Linked program built from the group with this name
    pub fn find(&self, name: &str) -> Option<&ShaderProgram> {
        self.programs.iter().find(|p| p.name() == name)
    }
}

/// A linked GPU program; deleting it is tied to `Drop`
pub struct ShaderProgram {
    gl: Rc<GlContext>,
    program: ResourceId<ProgramKind>,
    name: String,
}

impl ShaderProgram {
    /// Compile and link every group, collecting all diagnostics
    pub fn compile_shaders(gl: &Rc<GlContext>, sources: &[ShaderSource]) -> ShaderBatch {
        let mut batch = ShaderBatch::default();
        for source in sources {
            match build_program(gl, source) {
                Ok(program) => {
                    log::debug!("Linked program '{}' as {:?}", program.name, program.program);
                    batch.programs.push(program);
                }
                Err(errors) => {
                    log::debug!("Program '{}' failed with {} error(s)", source.name(), errors.len());
                    batch.errors.extend(errors);
                }
            }
        }
        log::info!(
            "Shader batch: {} program(s) linked, {} error(s)",
            batch.programs.len(),
            batch.errors.len()
        );
        batch
    }

    /// Make this the current program
    pub fn set_in_use(&self) {
        let gl = &self.gl;
        gl_call!(gl, api => api.use_program(self.program.raw()));
    }

    /// Leave no program current
    pub fn unbind(gl: &GlContext) {
        gl_call!(gl, api => api.use_program(0));
    }

    /// Look up an active uniform; `None` when the program has no such uniform
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        let gl = &self.gl;
        let location = gl_call!(gl, api => api.get_uniform_location(self.program.raw(), name));
        if location.is_none() {
            log::trace!("Uniform '{}' not active in program '{}'", name, self.name);
        }
        location.map(UniformLocation)
    }

    /// Set a `vec4` uniform of the program in use; `None` is ignored
    pub fn set_vec4(&self, location: Option<UniformLocation>, value: [f32; 4]) {
        let Some(location) = location else {
            return;
        };
        let gl = &self.gl;
        let [x, y, z, w] = value;
        gl_call!(gl, api => api.uniform_4_f32(location.raw(), x, y, z, w));
    }

    /// Set a `mat4` uniform of the program in use; `None` is ignored
    pub fn set_mat4(&self, location: Option<UniformLocation>, matrix: &Mat4) {
        let Some(location) = location else {
            return;
        };
        // nalgebra stores column-major, matching GL without transposing
        let mut columns = [0.0_f32; 16];
        columns.copy_from_slice(matrix.as_slice());
        let gl = &self.gl;
        gl_call!(gl, api => api.uniform_matrix_4_f32(location.raw(), false, &columns));
    }

    /// Program object name
    pub fn program(&self) -> ResourceId<ProgramKind> {
        self.program
    }

    /// Name of the source group this program was built from
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        let program = self.program.take();
        log::trace!("Deleting program '{}' {:?}", self.name, program);
        let gl = &self.gl;
        gl_call!(gl, api => api.delete_program(program.raw()));
    }
}

impl fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("name", &self.name)
            .field("program", &self.program)
            .finish()
    }
}

fn build_program(gl: &Rc<GlContext>, source: &ShaderSource) -> Result<ShaderProgram, Vec<ShaderCompileError>> {
    let shaders = compile_units(gl, source)?;
    let linked = link_units(gl, source.name(), &shaders);
    delete_shaders(gl, &shaders);
    linked.map(|program| ShaderProgram {
        gl: Rc::clone(gl),
        program,
        name: source.name().to_owned(),
    })
}

/// Compile every unit; on any failure all compiled units are deleted
fn compile_units(gl: &GlContext, source: &ShaderSource) -> Result<Vec<ResourceId<ShaderKind>>, Vec<ShaderCompileError>> {
    let mut shaders = Vec::with_capacity(source.units().len());
    let mut errors = Vec::new();

    for unit in source.units() {
        match compile_unit(gl, source.name(), unit) {
            Ok(shader) => shaders.push(shader),
            Err(error) => errors.push(error),
        }
    }

    if errors.is_empty() {
        Ok(shaders)
    } else {
        delete_shaders(gl, &shaders);
        Err(errors)
    }
}

fn compile_unit(gl: &GlContext, group: &str, unit: &ShadeletSource) -> Result<ResourceId<ShaderKind>, ShaderCompileError> {
    let raw = gl_call!(gl, api => api.create_shader(unit.stage().gl_enum())).map_err(|reason| ShaderCompileError {
        kind: CompileErrorKind::Create {
            program: group.to_owned(),
        },
        log: reason,
    })?;
    let shader = ResourceId::<ShaderKind>::from_raw(raw);

    gl_call!(gl, api => api.shader_source(shader.raw(), unit.source()));
    gl_call!(gl, api => api.compile_shader(shader.raw()));
    if gl_call!(gl, api => api.get_shader_compile_status(shader.raw())) {
        log::trace!("Compiled {} {:?}", unit.path().display(), shader);
        return Ok(shader);
    }

    let log = gl_call!(gl, api => api.get_shader_info_log(shader.raw()));
    gl_call!(gl, api => api.delete_shader(shader.raw()));
    Err(ShaderCompileError {
        kind: CompileErrorKind::Compile {
            path: unit.path().to_path_buf(),
            stage: unit.stage(),
        },
        log,
    })
}

/// Attach and link; the units stay owned by the caller
fn link_units(
    gl: &GlContext,
    group: &str,
    shaders: &[ResourceId<ShaderKind>],
) -> Result<ResourceId<ProgramKind>, Vec<ShaderCompileError>> {
    let raw = gl_call!(gl, api => api.create_program()).map_err(|reason| {
        vec![ShaderCompileError {
            kind: CompileErrorKind::Create {
                program: group.to_owned(),
            },
            log: reason,
        }]
    })?;
    let program = ResourceId::<ProgramKind>::from_raw(raw);

    for shader in shaders {
        gl_call!(gl, api => api.attach_shader(program.raw(), shader.raw()));
    }
    gl_call!(gl, api => api.link_program(program.raw()));
    let linked = gl_call!(gl, api => api.get_program_link_status(program.raw()));
    let log = if linked {
        String::new()
    } else {
        gl_call!(gl, api => api.get_program_info_log(program.raw()))
    };
    for shader in shaders {
        gl_call!(gl, api => api.detach_shader(program.raw(), shader.raw()));
    }

    if linked {
        return Ok(program);
    }
    gl_call!(gl, api => api.delete_program(program.raw()));
    Err(vec![ShaderCompileError {
        kind: CompileErrorKind::Link {
            program: group.to_owned(),
        },
        log,
    }])
}

fn delete_shaders(gl: &GlContext, shaders: &[ResourceId<ShaderKind>]) {
    for shader in shaders {
        gl_call!(gl, api => api.delete_shader(shader.raw()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{translation, Vec3};
    use crate::render::gl::{ErrorPolicy, HeadlessGl};

    const VERTEX: &str = "#version 330 core\n\
        layout (location = 0) in vec3 a_Position;\n\
        uniform mat4 model;\n\
        void main() { gl_Position = model * vec4(a_Position, 1.0); }\n";

    const FRAGMENT: &str = "#version 330 core\n\
        uniform vec4 u_Color;\n\
        out vec4 FragColor;\n\
        void main() { FragColor = u_Color; }\n";

    const BROKEN: &str = "#version 330 core\nvoid main() {\n    oops(;\n}\n";

    fn headless() -> (Rc<HeadlessGl>, Rc<GlContext>) {
        let gl = Rc::new(HeadlessGl::new());
        let ctx = GlContext::new(Rc::clone(&gl));
        (gl, ctx)
    }

    #[test]
    fn test_valid_pair_links_and_discards_units() {
        let (gl, ctx) = headless();
        let batch = ShaderProgram::compile_shaders(&ctx, &[ShaderSource::from_pair("basic", VERTEX, FRAGMENT)]);

        assert!(batch.is_success());
        assert_eq!(batch.programs.len(), 1);
        let program = batch.find("basic").unwrap();
        assert!(gl.is_program(program.program().raw()));
        assert!(gl.attached_shaders(program.program().raw()).is_empty());
        // Only the program object remains
        assert_eq!(gl.live_object_count(), 1);
    }

    #[test]
    fn test_every_broken_unit_in_a_group_is_reported() {
        let (gl, ctx) = headless();
        let batch = ShaderProgram::compile_shaders(&ctx, &[ShaderSource::from_pair("bad", BROKEN, BROKEN)]);

        assert!(batch.programs.is_empty());
        assert_eq!(batch.errors.len(), 2);
        assert!(matches!(
            batch.errors[0].kind(),
            CompileErrorKind::Compile { stage: ShaderStage::Vertex, .. }
        ));
        assert!(batch.errors[1].to_string().starts_with("bad.frag"));
        assert_eq!(gl.live_object_count(), 0);
    }

    #[test]
    fn test_failed_group_does_not_stop_the_batch() {
        let (_gl, ctx) = headless();
        let sources = [
            ShaderSource::from_pair("bad", VERTEX, BROKEN),
            ShaderSource::from_pair("good", VERTEX, FRAGMENT),
        ];
        let batch = ShaderProgram::compile_shaders(&ctx, &sources);

        assert_eq!(batch.errors.len(), 1);
        assert!(batch.errors[0].to_string().contains("bad.frag"));
        assert!(batch.find("good").is_some());
        assert!(batch.find("bad").is_none());
    }

    #[test]
    fn test_link_failure_names_the_program() {
        let (gl, ctx) = headless();
        let vertex_only = ShaderSource::new(
            "lonely",
            vec![ShadeletSource::new(VERTEX, ShaderStage::Vertex, "lonely.vert")],
        );
        let batch = ShaderProgram::compile_shaders(&ctx, &[vertex_only]);

        assert_eq!(batch.errors.len(), 1);
        let error = &batch.errors[0];
        assert_eq!(
            error.kind(),
            &CompileErrorKind::Link {
                program: "lonely".to_owned()
            }
        );
        assert!(error.log().contains("fragment"));
        assert_eq!(gl.live_object_count(), 0);
    }

    #[test]
    fn test_allocation_failure_is_collected() {
        let (gl, ctx) = headless();
        ctx.set_policy(ErrorPolicy::Log);
        gl.set_fail_allocations(true);
        let batch = ShaderProgram::compile_shaders(&ctx, &[ShaderSource::from_pair("basic", VERTEX, FRAGMENT)]);

        assert_eq!(batch.errors.len(), 2);
        assert!(matches!(batch.errors[0].kind(), CompileErrorKind::Create { .. }));
    }

    #[test]
    fn test_into_result_drops_partial_programs() {
        let (gl, ctx) = headless();
        let sources = [
            ShaderSource::from_pair("good", VERTEX, FRAGMENT),
            ShaderSource::from_pair("bad", VERTEX, BROKEN),
        ];
        let errors = ShaderProgram::compile_shaders(&ctx, &sources).into_result().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(gl.live_object_count(), 0);
    }

    #[test]
    fn test_multiline_sources_link_with_uniforms() {
        let vertex = "#version 330 core\n\
            uniform mat4 model;\n\
            layout (location = 0) in vec3 a_Position;\n\
            \n\
            void\n\
            main()\n\
            {\n\
                gl_Position = model * vec4(a_Position, 1.0);\n\
            }\n";
        let fragment = "#version 330 core\n\
            uniform vec4 u_Color;\n\
            out vec4 FragColor;\n\
            \n\
            void\n\
            main()\n\
            {\n\
                FragColor = u_Color;\n\
            }\n";
        let (_gl, ctx) = headless();
        let batch = ShaderProgram::compile_shaders(&ctx, &[ShaderSource::from_pair("layout", vertex, fragment)]);

        assert!(batch.is_success(), "{:?}", batch.errors);
        let program = batch.find("layout").unwrap();
        assert!(program.uniform_location("model").is_some());
        assert!(program.uniform_location("u_Color").is_some());
    }

    #[test]
    fn test_unknown_uniform_is_none() {
        let (_gl, ctx) = headless();
        let batch = ShaderProgram::compile_shaders(&ctx, &[ShaderSource::from_pair("basic", VERTEX, FRAGMENT)]);
        let program = batch.find("basic").unwrap();

        assert!(program.uniform_location("u_Color").is_some());
        assert_eq!(program.uniform_location("u_Missing"), None);
    }

    #[test]
    fn test_uniform_setters_write_program_state() {
        let (gl, ctx) = headless();
        let batch = ShaderProgram::compile_shaders(&ctx, &[ShaderSource::from_pair("basic", VERTEX, FRAGMENT)]);
        let program = batch.find("basic").unwrap();
        program.set_in_use();
        assert_eq!(gl.current_program(), program.program().raw());

        let color = program.uniform_location("u_Color");
        program.set_vec4(color, [0.8, 0.3, 0.2, 1.0]);
        let model = program.uniform_location("model");
        program.set_mat4(model, &translation(Vec3::new(1.0, 2.0, 3.0)));

        let raw = program.program().raw();
        assert_eq!(gl.uniform_value(raw, color.unwrap().raw()), Some(vec![0.8, 0.3, 0.2, 1.0]));
        let stored = gl.uniform_value(raw, model.unwrap().raw()).unwrap();
        // Translation sits in the last column
        assert_eq!(&stored[12..15], &[1.0, 2.0, 3.0]);

        // Missing locations are silently skipped
        program.set_vec4(None, [0.0; 4]);
        ShaderProgram::unbind(&ctx);
        assert_eq!(gl.current_program(), 0);
    }

    #[test]
    fn test_drop_deletes_program() {
        let (gl, ctx) = headless();
        let batch = ShaderProgram::compile_shaders(&ctx, &[ShaderSource::from_pair("basic", VERTEX, FRAGMENT)]);
        let raw = batch.programs[0].program().raw();
        drop(batch);
        assert!(!gl.is_program(raw));
    }
}
