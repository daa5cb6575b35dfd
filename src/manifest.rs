//! Generator input manifests.
//!
//! A manifest bundles the symbol snapshot, the targets to generate and (optionally) the link
//! schematic. Manifests are TOML or JSON, chosen by file extension; a directory is loaded as every
//! manifest beneath it, in path order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{
    config::get_content,
    error::LinkGenError,
    schematic::Schematic,
    symbols::{Compilation, TypeSymbol},
    target::LinkTarget,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Toml,
    Json,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> Option<ManifestFormat> {
        match path.extension()?.to_str()? {
            "toml" => Some(ManifestFormat::Toml),
            "json" => Some(ManifestFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Output hint; generated files are named `{name}.g.cs`. Defaults to the manifest's file stem.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "Schematic::standard")]
    pub schematic: Schematic,
    #[serde(default)]
    pub targets: Vec<LinkTarget>,
    #[serde(default)]
    pub types: Vec<TypeSymbol>,
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest {
            name: None,
            schematic: Schematic::standard(),
            targets: Vec::new(),
            types: Vec::new(),
        }
    }
}

impl Manifest {
    pub fn parse(text: &str, format: ManifestFormat) -> Result<Manifest, LinkGenError> {
        Ok(match format {
            ManifestFormat::Toml => toml::from_str(text)?,
            ManifestFormat::Json => serde_json::from_str(text)?,
        })
    }

    pub fn to_string(&self, format: ManifestFormat) -> Result<String, LinkGenError> {
        Ok(match format {
            ManifestFormat::Toml => toml::to_string(self)?,
            ManifestFormat::Json => serde_json::to_string_pretty(self)?,
        })
    }

    /// Reads one manifest file. The name defaults to the file stem.
    pub fn from_file(path: &Path) -> Result<Manifest, LinkGenError> {
        let format = ManifestFormat::from_path(path).ok_or_else(|| {
            LinkGenError::Config(format!("{} is not a .toml or .json manifest", path.display()))
        })?;
        let mut manifest = Manifest::parse(&get_content(path)?, format)?;
        if manifest.name.is_none() {
            manifest.name = path.file_stem().and_then(|s| s.to_str()).map(str::to_string);
        }
        debug!(
            path = %path.display(),
            targets = manifest.targets.len(),
            types = manifest.types.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    /// Loads `path` itself, or every manifest below it when it is a directory.
    ///
    /// Within a directory, a manifest that fails with a non-fatal error is skipped with a warning.
    pub fn load(path: &Path) -> Result<Vec<(PathBuf, Manifest)>, LinkGenError> {
        if !path.is_dir() {
            return Ok(vec![(path.to_path_buf(), Manifest::from_file(path)?)]);
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || ManifestFormat::from_path(entry.path()).is_none() {
                continue;
            }
            match Manifest::from_file(entry.path()) {
                Ok(manifest) => found.push((entry.path().to_path_buf(), manifest)),
                Err(e) if !e.is_fatal() => {
                    warn!(path = %entry.path().display(), error = %e, "skipping manifest");
                }
                Err(e) => return Err(e),
            }
        }
        if found.is_empty() {
            warn!(path = %path.display(), "no manifests found");
        }
        Ok(found)
    }

    pub fn compilation(&self) -> Compilation {
        Compilation::new(self.types.iter().cloned())
    }

    pub fn output_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Links")
    }
}
