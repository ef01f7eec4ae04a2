//! Shader stage sources and their grouping into programs

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while gathering shader sources from disk
#[derive(Error, Debug)]
pub enum ShaderError {
    /// Reading a file or directory failed
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// Path that could not be read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The file extension names no shader stage
    #[error("No shader stage matches the extension of {}", .path.display())]
    UnknownStage {
        /// Offending path
        path: PathBuf,
    },
}

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    /// `.vert`, `.vs`
    Vertex,
    /// `.frag`, `.fs`
    Fragment,
    /// `.geom`, `.gs`
    Geometry,
    /// `.tesc`
    TessControl,
    /// `.tese`
    TessEvaluation,
    /// `.comp`
    Compute,
}

impl ShaderStage {
    /// The GL shader type passed to `glCreateShader`
    pub fn gl_enum(self) -> u32 {
        match self {
            Self::Vertex => glow::VERTEX_SHADER,
            Self::Fragment => glow::FRAGMENT_SHADER,
            Self::Geometry => glow::GEOMETRY_SHADER,
            Self::TessControl => glow::TESS_CONTROL_SHADER,
            Self::TessEvaluation => glow::TESS_EVALUATION_SHADER,
            Self::Compute => glow::COMPUTE_SHADER,
        }
    }

    /// Recognise a stage from a file extension (without the dot)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "vert" | "vs" => Some(Self::Vertex),
            "frag" | "fs" => Some(Self::Fragment),
            "geom" | "gs" => Some(Self::Geometry),
            "tesc" => Some(Self::TessControl),
            "tese" => Some(Self::TessEvaluation),
            "comp" => Some(Self::Compute),
            _ => None,
        }
    }

    /// Recognise a stage from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Lowercase stage name for diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Geometry => "geometry",
            Self::TessControl => "tessellation control",
            Self::TessEvaluation => "tessellation evaluation",
            Self::Compute => "compute",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Source text of one shader stage and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadeletSource {
    source: String,
    stage: ShaderStage,
    path: PathBuf,
}

impl ShadeletSource {
    /// Wrap in-memory source text; `path` is only used in diagnostics
    pub fn new(source: impl Into<String>, stage: ShaderStage, path: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            stage,
            path: path.into(),
        }
    }

    /// Read a stage source, inferring the stage from the file extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        let stage = ShaderStage::from_path(path).ok_or_else(|| ShaderError::UnknownStage {
            path: path.to_path_buf(),
        })?;
        let source = fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(source, stage, path))
    }

    /// GLSL source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Pipeline stage
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Origin reported in compile errors
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A named group of stage sources that link into one program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    name: String,
    units: Vec<ShadeletSource>,
}

impl ShaderSource {
    /// Group stage sources under a program name
    pub fn new(name: impl Into<String>, units: Vec<ShadeletSource>) -> Self {
        Self {
            name: name.into(),
            units,
        }
    }

    /// Convenience for the common vertex + fragment pair held in memory
    pub fn from_pair(name: impl Into<String>, vertex: &str, fragment: &str) -> Self {
        let name = name.into();
        let units = vec![
            ShadeletSource::new(vertex, ShaderStage::Vertex, format!("{name}.vert")),
            ShadeletSource::new(fragment, ShaderStage::Fragment, format!("{name}.frag")),
        ];
        Self { name, units }
    }

    /// Program name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage sources in link order
    pub fn units(&self) -> &[ShadeletSource] {
        &self.units
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_from_extension() {
        assert_eq!(ShaderStage::from_extension("vert"), Some(ShaderStage::Vertex));
        assert_eq!(ShaderStage::from_extension("vs"), Some(ShaderStage::Vertex));
        assert_eq!(ShaderStage::from_extension("FRAG"), Some(ShaderStage::Fragment));
        assert_eq!(ShaderStage::from_extension("gs"), Some(ShaderStage::Geometry));
        assert_eq!(ShaderStage::from_extension("tesc"), Some(ShaderStage::TessControl));
        assert_eq!(ShaderStage::from_extension("tese"), Some(ShaderStage::TessEvaluation));
        assert_eq!(ShaderStage::from_extension("comp"), Some(ShaderStage::Compute));
        assert_eq!(ShaderStage::from_extension("glsl"), None);
    }

    #[test]
    fn test_stage_gl_enum() {
        assert_eq!(ShaderStage::Vertex.gl_enum(), glow::VERTEX_SHADER);
        assert_eq!(ShaderStage::Fragment.gl_enum(), glow::FRAGMENT_SHADER);
        assert_eq!(ShaderStage::Compute.gl_enum(), glow::COMPUTE_SHADER);
    }

    #[test]
    fn test_from_pair_names_units() {
        let source = ShaderSource::from_pair("basic", "void main() {}", "void main() {}");
        assert_eq!(source.name(), "basic");
        assert_eq!(source.units().len(), 2);
        assert_eq!(source.units()[0].stage(), ShaderStage::Vertex);
        assert_eq!(source.units()[1].path(), Path::new("basic.frag"));
    }

    #[test]
    fn test_from_file_rejects_unknown_extension() {
        let err = ShadeletSource::from_file("shader.txt").unwrap_err();
        assert!(matches!(err, ShaderError::UnknownStage { .. }));
    }

    #[test]
    fn test_from_file_reports_missing_file() {
        let err = ShadeletSource::from_file("does/not/exist.vert").unwrap_err();
        assert!(matches!(err, ShaderError::Io { .. }));
        assert!(err.to_string().contains("exist.vert"));
    }
}
