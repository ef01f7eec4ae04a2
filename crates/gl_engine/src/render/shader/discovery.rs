//! Discovering shader sources in a directory
//!
//! Files are grouped into programs by file stem, so `basic.vert` and
//! `basic.frag` form the program `basic`. The stage comes from the extension.
//! The scan is not recursive.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::source::{ShadeletSource, ShaderError, ShaderSource, ShaderStage};

/// Read every shader stage file in `dir`, grouped by base name
///
/// Groups are sorted by name and units by stage, so the result does not
/// depend on directory iteration order. Files without a recognised stage
/// extension are skipped with a warning.
pub fn read_shader_sources(dir: impl AsRef<Path>) -> Result<Vec<ShaderSource>, ShaderError> {
    let dir = dir.as_ref();
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ShaderError::Io { path, source }
    };

    let mut groups: BTreeMap<String, Vec<ShadeletSource>> = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        if !path.is_file() {
            continue;
        }
        let Some(stage) = ShaderStage::from_path(&path) else {
            log::warn!("Skipping {}: not a shader stage file", path.display());
            continue;
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            log::warn!("Skipping {}: file name is not valid UTF-8", path.display());
            continue;
        };
        let stem = stem.to_owned();
        let source = fs::read_to_string(&path).map_err(io_error(&path))?;
        log::trace!("Found {} shader {}", stage, path.display());
        groups.entry(stem).or_default().push(ShadeletSource::new(source, stage, path));
    }

    let sources: Vec<ShaderSource> = groups
        .into_iter()
        .map(|(name, mut units)| {
            units.sort_by(|a, b| a.stage().cmp(&b.stage()).then_with(|| a.path().cmp(b.path())));
            ShaderSource::new(name, units)
        })
        .collect();

    log::debug!("Discovered {} shader group(s) in {}", sources.len(), dir.display());
    Ok(sources)
}
