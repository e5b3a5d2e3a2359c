//! Model discovery
//!
//! Definitions are declared in data files grouped by directory. Each file
//! holds one model definition in TOML, JSON or YAML.

use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ModelsConfig;
use crate::error::{Error, Result};
use crate::models::definition::RawModelDefinition;

/// Source of raw model definitions
pub trait ModelDiscovery: Send + Sync {
    /// Return every definition of the group, fresh on each call
    fn discover(&self) -> Result<Vec<RawModelDefinition>>;
}

impl ModelDiscovery for Vec<RawModelDefinition> {
    fn discover(&self) -> Result<Vec<RawModelDefinition>> {
        Ok(self.clone())
    }
}

/// Reads definition files from `<root>/<group>`
pub struct FileModelDiscovery {
    directory: PathBuf,
    extensions: Vec<String>,
    exclude: Vec<Pattern>,
}

impl FileModelDiscovery {
    /// Create a discovery for one model group
    pub fn new(config: &ModelsConfig, group: &str) -> Result<Self> {
        let exclude = config
            .exclude
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| {
                    Error::ConfigError(format!("Invalid exclude pattern '{}': {}", pattern, e))
                })
            })
            .collect::<Result<Vec<Pattern>>>()?;

        Ok(Self {
            directory: config.root.join(group),
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn is_candidate(&self, path: &Path) -> bool {
        let extension = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => ext.to_lowercase(),
            None => return false,
        };
        if !self.extensions.contains(&extension) {
            return false;
        }

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_lowercase();
        !self.exclude.iter().any(|pattern| pattern.matches(&file_name))
    }
}

impl ModelDiscovery for FileModelDiscovery {
    fn discover(&self) -> Result<Vec<RawModelDefinition>> {
        if !self.directory.is_dir() {
            return Err(Error::DiscoveryError(format!(
                "Model directory does not exist: {}",
                self.directory.display()
            )));
        }

        let mut definitions = Vec::new();

        for entry in WalkDir::new(&self.directory)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || !self.is_candidate(path) {
                continue;
            }

            match read_definition(path) {
                Ok(mut definition) => {
                    debug!(path = %path.display(), "Discovered model definition");
                    definition.source = Some(path.to_path_buf());
                    definitions.push(definition);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not read model definition, skipping");
                }
            }
        }

        Ok(definitions)
    }
}

/// Parse one definition file according to its extension
pub fn read_definition(path: &Path) -> Result<RawModelDefinition> {
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_lowercase();

    match extension.as_str() {
        "toml" => toml::from_str(&content)
            .map_err(|e| Error::SerializationError(format!("{}: {}", path.display(), e))),
        "json" => Ok(serde_json::from_str(&content)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
        other => Err(Error::DiscoveryError(format!(
            "Unsupported definition format '{}' for {}",
            other,
            path.display()
        ))),
    }
}
