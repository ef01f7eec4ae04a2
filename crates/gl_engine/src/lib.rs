//! # GL Engine
//!
//! A minimal real-time OpenGL 3.3 rendering harness.
//!
//! ## Features
//!
//! - **Checked GL calls**: every driver call goes through [`gl_call!`], which
//!   reports errors with the failing call and source location
//! - **Owned GPU meshes**: a [`Mesh`](render::Mesh) exclusively owns its
//!   vertex array and buffers and releases them on rebuild, clear or drop
//! - **Batch shader builds**: every program in a directory is compiled and
//!   linked in one pass, collecting all diagnostics before anything is reported
//! - **Headless testing**: `HeadlessGl` (the default `headless` feature) models GL
//!   object state so resource lifecycles are testable without a display
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gl_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HarnessConfig::default();
//!     let (mut window, gl) = GlWindow::new(&config.window)?;
//!
//!     let sources = read_shader_sources(&config.shaders.directory)?;
//!     let programs = match ShaderProgram::compile_shaders(&gl, &sources).into_result() {
//!         Ok(programs) => programs,
//!         Err(errors) => {
//!             for error in &errors {
//!                 eprintln!("{error}");
//!             }
//!             std::process::exit(1);
//!         }
//!     };
//!     let quad = Mesh::quad(gl.clone())?;
//!
//!     while !window.should_close() {
//!         window.poll_events();
//!         programs[0].set_in_use();
//!         quad.render();
//!         window.swap_buffers();
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod input;
pub mod render;
pub mod window;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{CameraConfig, Config, ConfigError, HarnessConfig, ProjectionKind, ShaderConfig, WindowConfig},
        foundation::math::{Mat4, Vec3},
        gl_call,
        input::{InputState, KeyCode},
        render::{
            gl::{ErrorPolicy, GlContext, GlError},
            read_shader_sources, Camera, Mesh, ShaderBatch, ShaderCompileError, ShaderError, ShaderProgram,
            ShaderSource, Vertex,
        },
        window::{GlWindow, WindowError},
    };
}
