//! Quad demo application
//!
//! Opens a window, builds every shader program found in the configured
//! directory and draws a colored quad with the first one until the window is
//! closed. Any shader diagnostic is printed and the process exits with
//! status 1 before the first frame.
//!
//! Usage: `quad_demo [config.toml|config.ron]` (defaults to `harness.toml`).

use std::rc::Rc;

use gl_engine::foundation::logging;
use gl_engine::foundation::math::{self, Mat4, Vec3};
use gl_engine::prelude::*;
use gl_engine::render::UniformLocation;
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "harness.toml";
const QUAD_COLOR: [f32; 4] = [0.8, 0.3, 0.2, 1.0];

#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Gl(#[from] GlError),

    #[error("{} shader error(s)", .0.len())]
    Compile(Vec<ShaderCompileError>),

    #[error("No shader programs found in {0}")]
    NoPrograms(String),
}

struct Uniforms {
    color: Option<UniformLocation>,
    model: Option<UniformLocation>,
    view: Option<UniformLocation>,
    projection: Option<UniformLocation>,
}

impl Uniforms {
    fn lookup(program: &ShaderProgram) -> Self {
        Self {
            color: program.uniform_location("u_Color"),
            model: program.uniform_location("model"),
            view: program.uniform_location("view"),
            projection: program.uniform_location("projection"),
        }
    }
}

// Fields drop in declaration order: GPU objects go before the window that
// owns their context.
struct QuadApp {
    quad: Mesh,
    programs: Vec<ShaderProgram>,
    uniforms: Uniforms,
    camera: Camera,
    config: HarnessConfig,
    gl: Rc<GlContext>,
    window: GlWindow,
}

impl QuadApp {
    fn new(config: HarnessConfig) -> Result<Self, AppError> {
        log::info!("Creating window...");
        let (window, gl) = GlWindow::new(&config.window)?;
        gl.set_policy(config.gl_error_policy);

        log::info!("Compiling shaders from {}", config.shaders.directory.display());
        let sources = read_shader_sources(&config.shaders.directory)?;
        let programs = ShaderProgram::compile_shaders(&gl, &sources)
            .into_result()
            .map_err(AppError::Compile)?;
        let Some(program) = programs.first() else {
            return Err(AppError::NoPrograms(config.shaders.directory.display().to_string()));
        };
        log::info!("All shaders compiled successfully; drawing with '{}'", program.name());
        let uniforms = Uniforms::lookup(program);
        ShaderProgram::unbind(&gl);

        let quad = Mesh::quad(Rc::clone(&gl))?;
        let camera = Camera::from_config(&config.camera);

        Ok(Self {
            quad,
            programs,
            uniforms,
            camera,
            config,
            gl,
            window,
        })
    }

    fn run(&mut self) {
        log::info!("Starting frame loop");
        let mut last_time = self.window.time();

        while !self.window.should_close() {
            self.window.poll_events();

            #[allow(clippy::cast_possible_truncation)]
            let dt = {
                let now = self.window.time();
                let dt = (now - last_time) as f32;
                last_time = now;
                dt
            };
            self.update_camera(dt);
            self.render_frame();

            self.window.swap_buffers();
        }

        log::info!("Quad demo completed");
    }

    fn update_camera(&mut self, dt: f32) {
        if self.config.camera.projection != ProjectionKind::Perspective {
            return;
        }
        let (dx, dy) = self.window.input_mut().take_cursor_delta();
        self.camera.handle_mouse(dx, dy);
        self.camera.handle_keys(self.window.input(), dt);
    }

    fn matrices(&self) -> (Mat4, Mat4) {
        match self.config.camera.projection {
            ProjectionKind::Orthographic => (
                Mat4::identity(),
                Camera::orthographic(0.0, 1.0, 1.0, 0.0, self.camera.near, self.camera.far),
            ),
            ProjectionKind::Perspective => (
                self.camera.view_matrix(),
                self.camera.projection_matrix(self.window.aspect_ratio()),
            ),
        }
    }

    fn render_frame(&self) {
        let [r, g, b, a] = self.config.window.clear_color;
        let gl = &self.gl;
        gl_call!(gl, api => api.clear_color(r, g, b, a));
        gl_call!(gl, api => api.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT));

        let program = &self.programs[0];
        let (view, projection) = self.matrices();
        program.set_in_use();
        program.set_vec4(self.uniforms.color, QUAD_COLOR);
        program.set_mat4(self.uniforms.model, &math::translation(Vec3::new(0.0, 0.0, -1.0)));
        program.set_mat4(self.uniforms.view, &view);
        program.set_mat4(self.uniforms.projection, &projection);

        self.quad.render();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = HarnessConfig::load_or_default(&config_path)?;

    logging::init_with_level(&config.log_level);
    if std::path::Path::new(&config_path).exists() {
        log::info!("Loaded config from {}", config_path);
    } else {
        log::info!("No config at {}, using defaults", config_path);
    }

    let mut app = match QuadApp::new(config) {
        Ok(app) => app,
        Err(AppError::Compile(errors)) => {
            for error in &errors {
                eprintln!("{error}");
            }
            log::error!("{} shader error(s), quitting", errors.len());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    app.run();
    Ok(())
}
