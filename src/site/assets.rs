use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use crate::config::SiteConfig;
use crate::error::{Result, SiteError};
use crate::images::MANIFEST_FILE;

/// What `copy_static_assets` put into the publish directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetStats {
    pub stylesheet: bool,
    pub htaccess: bool,
    pub images: usize,
}

/// Copy `src` to `dst` if it exists, creating parent directories
fn copy_optional(src: &Path, dst: &Path) -> Result<bool> {
    if !src.is_file() {
        warn!("{} not found, skipping", src.display());
        return Ok(false);
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| SiteError::write(parent, e))?;
    }
    fs::copy(src, dst).map_err(|e| SiteError::write(dst, e))?;
    debug!("Copied {} to {}", src.display(), dst.display());
    Ok(true)
}

/// Copy the about page verbatim from the templates directory
pub fn copy_about_page(templates_dir: &Path, output_dir: &Path) -> Result<bool> {
    copy_optional(&templates_dir.join("about.html"), &output_dir.join("about.html"))
}

/// Copy images into the publish directory, leaving out the URL manifest and
/// unfinished downloads. Returns the number of files copied.
fn copy_images(images_dir: &Path, target: &Path) -> Result<usize> {
    if !images_dir.is_dir() {
        warn!("Images directory {} not found, skipping", images_dir.display());
        return Ok(0);
    }
    if let (Ok(a), Ok(b)) = (images_dir.canonicalize(), target.canonicalize()) {
        if a == b {
            debug!("Images already live in {}", target.display());
            return Ok(0);
        }
    }

    fs::create_dir_all(target).map_err(|e| SiteError::write(target, e))?;

    let mut entries = Vec::new();
    for entry in fs::read_dir(images_dir).map_err(|e| SiteError::read(images_dir, e))? {
        let entry = entry.map_err(|e| SiteError::read(images_dir, e))?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if path.is_file() && name != MANIFEST_FILE && !name.ends_with(".part") {
            entries.push(path);
        }
    }
    entries.sort();

    for src in &entries {
        if let Some(name) = src.file_name() {
            let dst = target.join(name);
            fs::copy(src, &dst).map_err(|e| SiteError::write(&dst, e))?;
        }
    }
    Ok(entries.len())
}

/// Copy the stylesheet, rewrite rules and images into the publish directory
pub fn copy_static_assets(config: &SiteConfig) -> Result<AssetStats> {
    let output = &config.output_dir;

    let stats = AssetStats {
        stylesheet: copy_optional(&config.stylesheet, &output.join("css").join("style.css"))?,
        htaccess: copy_optional(&config.htaccess, &output.join(".htaccess"))?,
        images: copy_images(&config.images_dir, &output.join(&config.image_prefix))?,
    };

    info!(
        "Copied static assets: stylesheet {}, .htaccess {}, {} images",
        if stats.stylesheet { "yes" } else { "no" },
        if stats.htaccess { "yes" } else { "no" },
        stats.images
    );
    Ok(stats)
}
