use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Build configuration for fetching images and generating the site
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    /// Recipe export to read
    pub input: PathBuf,
    /// Rewritten export with local image paths, written by the image fetcher
    pub local_input: PathBuf,
    /// Directory downloaded images are stored in
    pub images_dir: PathBuf,
    /// Prefix used for local image references inside the published site
    pub image_prefix: String,
    /// Publish directory
    pub output_dir: PathBuf,
    /// Directory holding recipe.html, index.html and about.html
    pub templates_dir: PathBuf,
    /// Stylesheet copied to css/style.css
    pub stylesheet: PathBuf,
    /// Apache rewrite rules copied next to the pages
    pub htaccess: PathBuf,
    /// Absolute site URL used in meta tags, JSON-LD and the sitemap
    pub base_url: String,
    /// Link to pages without the .html extension
    pub clean_urls: bool,
    /// Request timeout in seconds
    pub timeout: u64,
    /// User agent sent with image requests
    pub user_agent: String,
    /// Word limit for descriptions shown on index cards
    pub description_words: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/recipes.json"),
            local_input: PathBuf::from("data/recipes_with_local_images.json"),
            images_dir: PathBuf::from("images"),
            image_prefix: "images".to_string(),
            output_dir: PathBuf::from("public"),
            templates_dir: PathBuf::from("templates"),
            stylesheet: PathBuf::from("static/style.css"),
            htaccess: PathBuf::from("static/.htaccess"),
            base_url: "http://localhost:8000".to_string(),
            clean_urls: true,
            timeout: 30,
            user_agent: "Mozilla/5.0 (compatible; RecipeSiteBot/1.0)".to_string(),
            description_words: 20,
        }
    }
}

impl SiteConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE_SITE__ prefix
    /// 2. The given config file, or recipe-site.toml in the current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE_SITE__BASE_URL
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("recipe-site").required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("RECIPE_SITE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Resolve every relative path against `root`
    pub fn relative_to(mut self, root: &Path) -> Self {
        for path in [
            &mut self.input,
            &mut self.local_input,
            &mut self.images_dir,
            &mut self.output_dir,
            &mut self.templates_dir,
            &mut self.stylesheet,
            &mut self.htaccess,
        ] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// The base URL without a trailing slash
    pub fn site_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
