//! Strategy descriptor files.
//!
//! A descriptor file is an INI document read through `FileConfigAdapter`.
//! A directory of `*.ini` files forms a `StrategyRegistry`.

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::TradesimError;
use crate::domain::registry::StrategyRegistry;
use crate::domain::strategy::StrategyDescriptor;
use log::{debug, error, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Parse descriptor text. Text the INI reader rejects is a `DescriptorParse`.
pub fn parse_descriptor(text: &str) -> Result<StrategyDescriptor, TradesimError> {
    let adapter = FileConfigAdapter::from_string(text)
        .map_err(|reason| TradesimError::DescriptorParse { reason })?;
    StrategyDescriptor::from_config(&adapter)
}

pub fn load_descriptor(path: &Path) -> Result<StrategyDescriptor, TradesimError> {
    let text = fs::read_to_string(path)?;
    parse_descriptor(&text)
}

/// `*.ini` files directly inside `dir`, sorted by file name.
pub fn descriptor_files(dir: &Path) -> Result<Vec<PathBuf>, TradesimError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_ini = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ini"));
        if is_ini && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load every descriptor in `dir`. The first invalid file aborts the load.
pub fn load_registry(dir: &Path) -> Result<StrategyRegistry, TradesimError> {
    let mut registry = StrategyRegistry::new();
    for path in descriptor_files(dir)? {
        let descriptor = load_descriptor(&path).inspect_err(|e| {
            error!("failed to load strategy {}: {}", path.display(), e);
        })?;
        debug!("loaded strategy '{}' from {}", descriptor.name, path.display());
        let name = descriptor.name.clone();
        if registry.insert(descriptor).is_some() {
            warn!(
                "strategy '{}' in {} replaces an earlier definition",
                name,
                path.display()
            );
        }
    }
    Ok(registry)
}
