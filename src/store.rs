//! Naming and placement of staged uploads and produced artifacts
//!
//! Primary rasters are `<base>_processed.<format>`, world files
//! `<base>_processed.<worldExt>` and archives
//! `EPSG_<code>_<base>_processed.zip`, all inside the output directory.
//! Retrieval relies on these names.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::config::ReprojectConfig;
use crate::reproject::format::OutputFormat;

/// Upload and output directories plus the naming contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        ArtifactStore { upload_dir: upload_dir.into(), output_dir: output_dir.into() }
    }

    pub fn from_config(config: &ReprojectConfig) -> Self {
        Self::new(&config.upload_dir, &config.output_dir)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Creates both directories if needed
    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.upload_dir)?;
        fs::create_dir_all(&self.output_dir)
    }

    /// File name without its final extension
    pub fn base_name(file_name: &str) -> &str {
        match file_name.rfind('.') {
            Some(dot) if dot > 0 => &file_name[..dot],
            _ => file_name,
        }
    }

    pub fn primary_name(base: &str, format: OutputFormat) -> String {
        format!("{}_processed.{}", base, format.extension())
    }

    pub fn world_file_name(base: &str, format: OutputFormat) -> String {
        format!("{}_processed.{}", base, format.world_extension())
    }

    pub fn archive_name(epsg_code: u32, base: &str) -> String {
        format!("EPSG_{}_{}_processed.zip", epsg_code, base)
    }

    pub fn primary_path(&self, base: &str, format: OutputFormat) -> PathBuf {
        self.output_dir.join(Self::primary_name(base, format))
    }

    pub fn world_file_path(&self, base: &str, format: OutputFormat) -> PathBuf {
        self.output_dir.join(Self::world_file_name(base, format))
    }

    pub fn archive_path(&self, epsg_code: u32, base: &str) -> PathBuf {
        self.output_dir.join(Self::archive_name(epsg_code, base))
    }

    /// Writes an uploaded blob into the upload directory
    pub fn stage_upload(&self, file_name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.upload_dir)?;
        let path = self.upload_dir.join(file_name);
        fs::write(&path, contents)?;
        debug!("Staged {} bytes at {}", contents.len(), path.display());
        Ok(path)
    }

    /// Removes whatever a run for (`base`, `format`, `epsg_code`) may have left
    pub fn discard(&self, base: &str, format: OutputFormat, epsg_code: u32) {
        for path in [
            self.primary_path(base, format),
            self.world_file_path(base, format),
            self.archive_path(epsg_code, base),
        ] {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {},
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
    }

    /// Whether `id` is a plain file name that cannot escape the output directory
    pub fn is_valid_artifact_id(id: &str) -> bool {
        !id.is_empty() && !id.contains(['/', '\\']) && !id.contains("..")
    }

    /// Path of an existing artifact named `id`
    pub fn locate(&self, id: &str) -> Option<PathBuf> {
        if !Self::is_valid_artifact_id(id) {
            return None;
        }
        let path = self.output_dir.join(id);
        if path.is_file() { Some(path) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming_contract() {
        let store = ArtifactStore::new("uploads", "processed");
        let png: OutputFormat = "png".parse().unwrap();

        assert_eq!(ArtifactStore::base_name("scene.v2.tif"), "scene.v2");
        assert_eq!(ArtifactStore::base_name("scene"), "scene");
        assert_eq!(store.primary_path("scene", png), PathBuf::from("processed/scene_processed.png"));
        assert_eq!(store.world_file_path("scene", png), PathBuf::from("processed/scene_processed.jgw"));
        assert_eq!(store.archive_path(3857, "scene"), PathBuf::from("processed/EPSG_3857_scene_processed.zip"));
    }

    #[test]
    fn test_locate_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("in"), dir.path());
        fs::write(dir.path().join("a.zip"), b"PK").unwrap();

        assert_eq!(store.locate("a.zip"), Some(dir.path().join("a.zip")));
        assert_eq!(store.locate("b.zip"), None);
        assert_eq!(store.locate("../a.zip"), None);
        assert_eq!(store.locate("sub/a.zip"), None);
        assert_eq!(store.locate(""), None);
    }
}
