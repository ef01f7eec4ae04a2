//! Configuration system
//!
//! Settings are plain serde structs with defaults for every field, so a config
//! file only needs to name what it changes. Files are read and written as TOML
//! or RON depending on their extension.

use std::path::{Path, PathBuf};

pub use serde::{Deserialize, Serialize};

use crate::render::gl::ErrorPolicy;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from a `.toml` or `.ron` file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match Format::of(path)? {
            Format::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to a `.toml` or `.ron` file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match Format::of(path)? {
            Format::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Window and context creation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
    /// Window title
    pub title: String,
    /// Requested OpenGL major version
    pub gl_major: u32,
    /// Requested OpenGL minor version
    pub gl_minor: u32,
    /// Synchronize buffer swaps with the display refresh
    pub vsync: bool,
    /// Hide and capture the cursor for mouse look
    pub capture_cursor: bool,
    /// Color the framebuffer is cleared to each frame
    pub clear_color: [f32; 4],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
            title: "Hello World".to_string(),
            gl_major: 3,
            gl_minor: 3,
            vsync: true,
            capture_cursor: false,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Where shader sources are discovered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Directory scanned for stage files
    pub directory: PathBuf,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("res/"),
        }
    }
}

/// Projection the frame loop renders with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    /// Unit-square orthographic projection with Y pointing down; the camera is ignored
    #[default]
    Orthographic,
    /// Camera view with a perspective projection
    Perspective,
}

/// Initial camera placement and control tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Starting position in world space
    pub position: [f32; 3],
    /// Starting yaw in degrees
    pub yaw: f32,
    /// Starting pitch in degrees
    pub pitch: f32,
    /// Movement speed in world units per second
    pub movement_speed: f32,
    /// Degrees turned per pixel of cursor movement
    pub turn_speed: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Projection used by the frame loop
    pub projection: ProjectionKind,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 1.0],
            yaw: -90.0,
            pitch: 0.0,
            movement_speed: 2.5,
            turn_speed: 0.1,
            fov: 45.0,
            near: 0.1,
            far: 100.0,
            projection: ProjectionKind::Orthographic,
        }
    }
}

/// Top-level harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Window settings
    pub window: WindowConfig,
    /// Shader discovery settings
    pub shaders: ShaderConfig,
    /// Camera settings
    pub camera: CameraConfig,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Reaction to OpenGL errors
    pub gl_error_policy: ErrorPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            shaders: ShaderConfig::default(),
            camera: CameraConfig::default(),
            log_level: "info".to_string(),
            gl_error_policy: ErrorPolicy::Fatal,
        }
    }
}

impl Config for HarnessConfig {}

impl HarnessConfig {
    /// Load from `path`, or use defaults when the file does not exist
    ///
    /// Usually called before a logger exists, so it does not log; the caller
    /// can tell the two outcomes apart with `path.exists()`.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the harness cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.shaders.directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("shader directory must not be empty".to_string()));
        }
        if self.camera.movement_speed <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "camera movement speed must be positive, got {}",
                self.camera.movement_speed
            )));
        }
        if self.camera.near <= 0.0 || self.camera.far <= self.camera.near {
            return Err(ConfigError::Invalid(format!(
                "camera clip planes must satisfy 0 < near < far, got {}..{}",
                self.camera.near, self.camera.far
            )));
        }
        Ok(())
    }
}
