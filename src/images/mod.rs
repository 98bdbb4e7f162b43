mod http;
mod manifest;

pub use http::HttpDownloader;
pub use manifest::{ImageManifest, MANIFEST_FILE};

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use reqwest::Url;

use crate::error::{Result, SiteError};
use crate::model::{ImageRef, RecipeCollection};
use crate::slug::slugify;

const DEFAULT_EXTENSION: &str = "jpg";

/// Source of image bytes
pub trait Downloader {
    fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Counters for one fetch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// New images written to disk
    pub downloaded: usize,
    /// Existing images re-downloaded because their source URL changed
    pub updated: usize,
    /// Remote references whose file was already present
    pub skipped: usize,
    /// Downloads that failed; the reference stays remote
    pub failed: usize,
    /// References rewritten to a local path
    pub rewritten: usize,
    /// References that were already local
    pub local: usize,
    /// Recipes without any image
    pub without_images: usize,
}

impl FetchStats {
    /// Number of HTTP requests made
    pub fn attempted(&self) -> usize {
        self.downloaded + self.updated + self.failed
    }
}

/// Result of a fetch run: the rewritten collection and what it took
#[derive(Debug)]
pub struct FetchReport {
    pub collection: RecipeCollection,
    pub stats: FetchStats,
}

#[derive(Debug, PartialEq)]
enum Action {
    Skip,
    Download,
    Update,
}

fn plan(exists: bool, recorded: Option<&str>, url: &str) -> Action {
    match (exists, recorded) {
        (false, _) => Action::Download,
        (true, Some(previous)) if previous != url => Action::Update,
        (true, _) => Action::Skip,
    }
}

/// Stem and extension of the local file for the `index`-th image of a recipe
fn file_name_parts(identifier: &str, index: usize, url: &Url) -> (String, String) {
    let stem = slugify(identifier);
    let extension = Path::new(url.path())
        .extension()
        .and_then(OsStr::to_str)
        .filter(|ext| (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    if index == 0 {
        (stem, extension)
    } else {
        (format!("{stem}-{}", index + 1), extension)
    }
}

/// Local file name for the `index`-th image of a recipe.
///
/// The first image is `<identifier>.<ext>`, later ones get a `-<n>` suffix
/// with `n` the 1-based position. The extension comes from the URL path and
/// falls back to `jpg`.
pub fn image_file_name(identifier: &str, index: usize, url: &Url) -> String {
    let (stem, extension) = file_name_parts(identifier, index, url);
    format!("{stem}.{extension}")
}

/// Hands out image file names for one fetch run, in input order.
///
/// A name already given to an earlier image, or used by a local reference,
/// gets the first free `-2`, `-3`, ... suffix on its stem.
#[derive(Debug, Default)]
struct ImageNames {
    taken: HashSet<String>,
}

impl ImageNames {
    fn reserve(&mut self, file_name: &str) {
        self.taken.insert(file_name.to_string());
    }

    fn allocate(&mut self, identifier: &str, index: usize, url: &Url) -> String {
        let (stem, extension) = file_name_parts(identifier, index, url);
        let name = format!("{stem}.{extension}");
        if self.taken.insert(name.clone()) {
            return name;
        }

        let mut n = 2;
        loop {
            let candidate = format!("{stem}-{n}.{extension}");
            if self.taken.insert(candidate.clone()) {
                debug!("Image name '{}' already taken, using '{}'", name, candidate);
                return candidate;
            }
            n += 1;
        }
    }
}

/// Downloads remote recipe images and rewrites references to local paths
pub struct ImageFetcher<D> {
    downloader: D,
    images_dir: PathBuf,
    prefix: String,
}

impl<D: Downloader> ImageFetcher<D> {
    /// `prefix` is the path under which `images_dir` is published, e.g. `images`
    pub fn new(downloader: D, images_dir: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            downloader,
            images_dir: images_dir.into(),
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve every remote image of `collection`, one request at a time.
    ///
    /// The input is left untouched; the returned collection carries the
    /// rewritten references. A failed download keeps its remote URL and is
    /// counted, a failed write to disk aborts the run.
    pub fn fetch(&self, collection: &RecipeCollection) -> Result<FetchReport> {
        fs::create_dir_all(&self.images_dir).map_err(|e| SiteError::write(&self.images_dir, e))?;

        let mut manifest = ImageManifest::load(&self.images_dir);
        let mut stats = FetchStats::default();
        let mut output = collection.clone();
        let total = output.recipes.len();
        let mut names = self.local_names(&output);

        info!("Processing {} recipes...", total);

        for (i, recipe) in output.recipes.iter_mut().enumerate() {
            let position = i + 1;
            if recipe.image.is_empty() {
                debug!("[{}/{}] Skipping '{}' - no image", position, total, recipe.name);
                stats.without_images += 1;
                continue;
            }

            for (index, reference) in recipe.image.iter_mut().enumerate() {
                let url = match ImageRef::parse(reference) {
                    ImageRef::Remote(url) => url,
                    ImageRef::Local(path) => {
                        debug!("[{}/{}] Already local: {}", position, total, path);
                        stats.local += 1;
                        continue;
                    }
                };

                let file_name = names.allocate(&recipe.identifier, index, &url);
                let target = self.images_dir.join(&file_name);

                match plan(target.exists(), manifest.get(&file_name), url.as_str()) {
                    Action::Skip => {
                        debug!("[{}/{}] Already exists: {}", position, total, file_name);
                        stats.skipped += 1;
                    }
                    action => {
                        if action == Action::Update {
                            info!("[{}/{}] Updating '{}' (image URL changed)...", position, total, recipe.name);
                        } else {
                            info!("[{}/{}] Downloading '{}'...", position, total, recipe.name);
                        }

                        let bytes = match self.downloader.download(url.as_str()) {
                            Ok(bytes) => bytes,
                            Err(e) => {
                                warn!("[{}/{}] Failed to download '{}': {}", position, total, recipe.name, e);
                                stats.failed += 1;
                                continue;
                            }
                        };
                        store(&target, &bytes)?;

                        if action == Action::Update {
                            stats.updated += 1;
                        } else {
                            stats.downloaded += 1;
                        }
                    }
                }

                manifest.record(&file_name, url.as_str());
                *reference = format!("{}/{}", self.prefix, file_name);
                stats.rewritten += 1;
            }
        }

        manifest.save()?;

        Ok(FetchReport {
            collection: output,
            stats,
        })
    }
}

impl<D> ImageFetcher<D> {
    /// Names of files in the images directory that local references already use
    fn local_names(&self, collection: &RecipeCollection) -> ImageNames {
        let mut names = ImageNames::default();
        for reference in collection.recipes.iter().flat_map(|recipe| &recipe.image) {
            if let ImageRef::Local(path) = ImageRef::parse(reference) {
                let file_name = path
                    .strip_prefix(self.prefix.as_str())
                    .and_then(|rest| rest.strip_prefix('/'));
                if let Some(file_name) = file_name {
                    names.reserve(file_name);
                }
            }
        }
        names
    }
}

/// Write through a `.part` file so an interrupted download never looks cached
fn store(target: &Path, bytes: &[u8]) -> Result<()> {
    let mut partial = target.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    if let Err(e) = fs::write(&partial, bytes) {
        let _ = fs::remove_file(&partial);
        return Err(SiteError::write(partial, e));
    }
    fs::rename(&partial, target).map_err(|e| SiteError::write(target, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Serves fixed bytes and records every requested URL
    #[derive(Default)]
    struct FakeDownloader {
        requests: RefCell<Vec<String>>,
        failing: Vec<String>,
    }

    impl Downloader for FakeDownloader {
        fn download(&self, url: &str) -> Result<Vec<u8>> {
            self.requests.borrow_mut().push(url.to_string());
            if self.failing.iter().any(|f| f == url) {
                return Err(SiteError::Download {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    fn collection(json: &str) -> RecipeCollection {
        RecipeCollection::from_json(json).unwrap()
    }

    #[test]
    fn test_image_file_name() {
        let url = Url::parse("https://cdn.example.com/photos/Pie.JPEG?w=800").unwrap();
        assert_eq!(image_file_name("abc-123", 0, &url), "abc-123.jpeg");
        assert_eq!(image_file_name("abc-123", 1, &url), "abc-123-2.jpeg");

        let no_ext = Url::parse("https://cdn.example.com/photo").unwrap();
        assert_eq!(image_file_name("ABC 123", 0, &no_ext), "abc-123.jpg");

        let odd_ext = Url::parse("https://cdn.example.com/photo.php-generated").unwrap();
        assert_eq!(image_file_name("x", 0, &odd_ext), "x.jpg");
    }

    #[test]
    fn test_plan() {
        let url = "https://example.com/a.jpg";
        assert_eq!(plan(false, None, url), Action::Download);
        assert_eq!(plan(false, Some(url), url), Action::Download);
        assert_eq!(plan(true, None, url), Action::Skip);
        assert_eq!(plan(true, Some(url), url), Action::Skip);
        assert_eq!(plan(true, Some("https://example.com/old.jpg"), url), Action::Update);
    }

    #[test]
    fn test_fetch_rewrites_and_keeps_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = collection(
            r#"{"recipes": [
                {"identifier": "r1", "name": "Pie", "image": ["https://example.com/pie.png", "https://example.com/slice.png"]},
                {"identifier": "r2", "name": "Toast"}
            ]}"#,
        );
        let fetcher = ImageFetcher::new(FakeDownloader::default(), dir.path(), "images/");

        let report = fetcher.fetch(&input).unwrap();

        assert_eq!(
            report.collection.recipes[0].image,
            vec!["images/r1.png", "images/r1-2.png"]
        );
        assert_eq!(input.recipes[0].image[0], "https://example.com/pie.png");
        assert_eq!(report.stats.downloaded, 2);
        assert_eq!(report.stats.rewritten, 2);
        assert_eq!(report.stats.without_images, 1);
        assert_eq!(
            fs::read(dir.path().join("r1.png")).unwrap(),
            b"https://example.com/pie.png"
        );
        assert!(!dir.path().join("r1.png.part").exists());
    }

    #[test]
    fn test_second_run_downloads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = collection(
            r#"{"recipes": [{"identifier": "r1", "name": "Pie", "image": "https://example.com/pie.png"}]}"#,
        );

        let first = ImageFetcher::new(FakeDownloader::default(), dir.path(), "images")
            .fetch(&input)
            .unwrap();

        let downloader = FakeDownloader::default();
        let fetcher = ImageFetcher::new(downloader, dir.path(), "images");
        let second = fetcher.fetch(&input).unwrap();

        assert!(fetcher.downloader.requests.borrow().is_empty());
        assert_eq!(second.stats.skipped, 1);
        assert_eq!(second.stats.attempted(), 0);
        assert_eq!(first.collection, second.collection);
    }

    #[test]
    fn test_changed_url_is_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        let old = collection(
            r#"{"recipes": [{"identifier": "r1", "image": "https://example.com/old.jpg"}]}"#,
        );
        let new = collection(
            r#"{"recipes": [{"identifier": "r1", "image": "https://example.com/new.jpg"}]}"#,
        );

        ImageFetcher::new(FakeDownloader::default(), dir.path(), "images")
            .fetch(&old)
            .unwrap();
        let report = ImageFetcher::new(FakeDownloader::default(), dir.path(), "images")
            .fetch(&new)
            .unwrap();

        assert_eq!(report.stats.updated, 1);
        assert_eq!(
            fs::read(dir.path().join("r1.jpg")).unwrap(),
            b"https://example.com/new.jpg"
        );
        let manifest = ImageManifest::load(dir.path());
        assert_eq!(manifest.get("r1.jpg"), Some("https://example.com/new.jpg"));
    }

    #[test]
    fn test_failed_download_keeps_remote_url() {
        let dir = tempfile::tempdir().unwrap();
        let input = collection(
            r#"{"recipes": [
                {"identifier": "r1", "image": "https://example.com/broken.jpg"},
                {"identifier": "r2", "image": "https://example.com/fine.jpg"}
            ]}"#,
        );
        let downloader = FakeDownloader {
            failing: vec!["https://example.com/broken.jpg".to_string()],
            ..Default::default()
        };

        let report = ImageFetcher::new(downloader, dir.path(), "images")
            .fetch(&input)
            .unwrap();

        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.stats.downloaded, 1);
        assert_eq!(
            report.collection.recipes[0].image,
            vec!["https://example.com/broken.jpg"]
        );
        assert_eq!(report.collection.recipes[1].image, vec!["images/r2.jpg"]);
        assert!(!dir.path().join("r1.jpg").exists());
    }

    #[test]
    fn test_local_references_are_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let input = collection(r#"{"recipes": [{"identifier": "r1", "image": "images/r1.jpg"}]}"#);
        let fetcher = ImageFetcher::new(FakeDownloader::default(), dir.path(), "images");

        let report = fetcher.fetch(&input).unwrap();

        assert_eq!(report.collection, input);
        assert_eq!(report.stats.local, 1);
        assert!(fetcher.downloader.requests.borrow().is_empty());
    }

    #[test]
    fn test_names_never_collide_across_recipes() {
        let dir = tempfile::tempdir().unwrap();
        let input = collection(
            r#"{"recipes": [
                {"identifier": "abc", "image": ["https://x.test/a.jpg", "https://x.test/b.jpg"]},
                {"identifier": "abc-2", "image": "https://x.test/c.jpg"},
                {"identifier": "ABC", "image": "https://x.test/d.jpg"}
            ]}"#,
        );

        let first = ImageFetcher::new(FakeDownloader::default(), dir.path(), "images")
            .fetch(&input)
            .unwrap();

        let images: Vec<Vec<&str>> = first
            .collection
            .recipes
            .iter()
            .map(|recipe| recipe.image.iter().map(String::as_str).collect())
            .collect();
        assert_eq!(
            images,
            vec![
                vec!["images/abc.jpg", "images/abc-2.jpg"],
                vec!["images/abc-2-2.jpg"],
                vec!["images/abc-3.jpg"],
            ]
        );
        assert_eq!(first.stats.downloaded, 4);
        assert_eq!(fs::read(dir.path().join("abc-2.jpg")).unwrap(), b"https://x.test/b.jpg");
        assert_eq!(fs::read(dir.path().join("abc-2-2.jpg")).unwrap(), b"https://x.test/c.jpg");

        let fetcher = ImageFetcher::new(FakeDownloader::default(), dir.path(), "images");
        let second = fetcher.fetch(&input).unwrap();

        assert!(fetcher.downloader.requests.borrow().is_empty());
        assert_eq!(second.stats.attempted(), 0);
        assert_eq!(second.stats.skipped, 4);
        assert_eq!(first.collection, second.collection);
    }

    #[test]
    fn test_local_reference_names_are_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let input = collection(
            r#"{"recipes": [
                {"identifier": "r1", "image": "https://example.com/new.jpg"},
                {"identifier": "r2", "image": "images/r1.jpg"}
            ]}"#,
        );

        let report = ImageFetcher::new(FakeDownloader::default(), dir.path(), "images")
            .fetch(&input)
            .unwrap();

        assert_eq!(report.collection.recipes[0].image, vec!["images/r1-2.jpg"]);
        assert_eq!(report.collection.recipes[1].image, vec!["images/r1.jpg"]);
        assert!(!dir.path().join("r1.jpg").exists());
    }
}
