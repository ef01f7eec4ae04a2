//! Window management using GLFW
//!
//! Provides an OpenGL 3.3 core window with its context made current on the
//! creating thread, and translates window events into [`InputState`].
//!
//! # Teardown order
//! The GL context dies with the window. Meshes and programs created through
//! the returned [`GlContext`] must be dropped before the [`GlWindow`]; in a
//! `main` that means declaring the window first.

use std::rc::Rc;

use glfw::Context as _;
use thiserror::Error;

use crate::config::WindowConfig;
use crate::gl_call;
use crate::input::{InputState, KeyCode};
use crate::render::gl::{GlContext, GlowApi};

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed: {0}")]
    InitializationFailed(String),

    /// The window or its OpenGL context could not be created
    #[error("Failed to create {width}x{height} window with an OpenGL {major}.{minor} core context")]
    CreationFailed {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Requested major version
        major: u32,
        /// Requested minor version
        minor: u32,
    },
}

/// Result alias for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window owning the current OpenGL context
pub struct GlWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    gl: Rc<GlContext>,
    input: InputState,
}

impl GlWindow {
    /// Open a window, make its context current and load OpenGL
    ///
    /// Depth testing is enabled and the viewport covers the framebuffer.
    pub fn new(config: &WindowConfig) -> WindowResult<(Self, Rc<GlContext>)> {
        let mut glfw =
            glfw::init(glfw::fail_on_errors).map_err(|e| WindowError::InitializationFailed(format!("{e:?}")))?;

        glfw.window_hint(glfw::WindowHint::ContextVersion(config.gl_major, config.gl_minor));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(glfw::OpenGlProfileHint::Core));
        glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed {
                width: config.width,
                height: config.height,
                major: config.gl_major,
                minor: config.gl_minor,
            })?;

        window.make_current();
        glfw.set_swap_interval(if config.vsync {
            glfw::SwapInterval::Sync(1)
        } else {
            glfw::SwapInterval::None
        });

        window.set_key_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_framebuffer_size_polling(true);
        window.set_focus_polling(true);
        if config.capture_cursor {
            window.set_cursor_mode(glfw::CursorMode::Disabled);
        }

        // SAFETY: the context was made current on this thread above and lives
        // as long as `window`, which outlives every use through `GlWindow`.
        let api = unsafe { GlowApi::from_loader_function(|name| window.get_proc_address(name) as *const _) };
        let gl = GlContext::new(api);

        log::info!(
            "OpenGL {} on {} ({}), GLSL {}",
            gl_call!(gl, api => api.get_parameter_string(glow::VERSION)),
            gl_call!(gl, api => api.get_parameter_string(glow::RENDERER)),
            gl_call!(gl, api => api.get_parameter_string(glow::VENDOR)),
            gl_call!(gl, api => api.get_parameter_string(glow::SHADING_LANGUAGE_VERSION)),
        );

        gl_call!(gl, api => api.enable(glow::DEPTH_TEST));
        let (width, height) = window.get_framebuffer_size();
        gl_call!(gl, api => api.viewport(0, 0, width, height));

        let this = Self {
            glfw,
            window,
            events,
            gl: Rc::clone(&gl),
            input: InputState::new(),
        };
        Ok((this, gl))
    }

    /// Whether the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Request or cancel closing
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Process pending events into input state
    ///
    /// Escape closes the window; framebuffer resizes update the viewport.
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
        for (_, event) in glfw::flush_messages(&self.events) {
            match event {
                glfw::WindowEvent::Key(key, _, action, _) => {
                    let Some(code) = key_code(key) else {
                        continue;
                    };
                    let pressed = action != glfw::Action::Release;
                    if code == KeyCode::Escape && pressed {
                        self.window.set_should_close(true);
                    }
                    self.input.handle_key_input(code, pressed);
                }
                glfw::WindowEvent::CursorPos(x, y) => self.input.handle_mouse_move(x, y),
                glfw::WindowEvent::FramebufferSize(width, height) => {
                    log::debug!("Framebuffer resized to {}x{}", width, height);
                    let gl = &self.gl;
                    gl_call!(gl, api => api.viewport(0, 0, width, height));
                }
                glfw::WindowEvent::Focus(false) => self.input.reset(),
                _ => {}
            }
        }
    }

    /// Framebuffer size in pixels
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (u32::try_from(width).unwrap_or(0), u32::try_from(height).unwrap_or(0))
    }

    /// Framebuffer width over height; 1.0 while minimized
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(&self) -> f32 {
        match self.framebuffer_size() {
            (_, 0) | (0, _) => 1.0,
            (width, height) => width as f32 / height as f32,
        }
    }

    /// Present the back buffer
    pub fn swap_buffers(&mut self) {
        self.window.swap_buffers();
    }

    /// Input gathered by [`GlWindow::poll_events`]
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Mutable input, for consuming cursor deltas
    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Seconds since GLFW was initialized
    pub fn time(&self) -> f64 {
        self.glfw.get_time()
    }
}

fn key_code(key: glfw::Key) -> Option<KeyCode> {
    Some(match key {
        glfw::Key::W => KeyCode::W,
        glfw::Key::A => KeyCode::A,
        glfw::Key::S => KeyCode::S,
        glfw::Key::D => KeyCode::D,
        glfw::Key::Space => KeyCode::Space,
        glfw::Key::LeftShift => KeyCode::LeftShift,
        glfw::Key::Escape => KeyCode::Escape,
        _ => return None,
    })
}
