use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::{Result, SiteError};

pub const MANIFEST_FILE: &str = ".image_urls.json";

/// Remembers which source URL each downloaded image came from, so a changed
/// URL triggers a fresh download even though the file already exists.
#[derive(Debug)]
pub struct ImageManifest {
    path: PathBuf,
    urls: BTreeMap<String, String>,
}

impl ImageManifest {
    /// Load the manifest in `images_dir`. A missing or unreadable manifest
    /// starts out empty.
    pub fn load(images_dir: &Path) -> Self {
        let path = images_dir.join(MANIFEST_FILE);
        let urls = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("Ignoring corrupt image manifest {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Ignoring unreadable image manifest {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        Self { path, urls }
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.urls.get(file_name).map(String::as_str)
    }

    pub fn record(&mut self, file_name: &str, url: &str) {
        self.urls.insert(file_name.to_string(), url.to_string());
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn save(&self) -> Result<()> {
        let mut json = serde_json::to_string_pretty(&self.urls)?;
        json.push('\n');
        fs::write(&self.path, json).map_err(|e| SiteError::write(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = ImageManifest::load(dir.path());
        assert!(manifest.is_empty());

        manifest.record("abc.jpg", "https://example.com/abc.jpg");
        manifest.save().unwrap();

        let reloaded = ImageManifest::load(dir.path());
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("abc.jpg"), Some("https://example.com/abc.jpg"));
    }

    #[test]
    fn test_corrupt_manifest_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "not json").unwrap();

        let manifest = ImageManifest::load(dir.path());
        assert!(manifest.is_empty());
    }
}
