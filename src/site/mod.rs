mod assets;
mod index_page;
mod recipe_page;
mod sitemap;
mod template;
mod text;

pub use assets::{copy_about_page, copy_static_assets, AssetStats};
pub use index_page::{category_counts, render_index_page, SearchEntry};
pub use recipe_page::render_recipe_page;
pub use sitemap::render_sitemap;
pub use template::{Template, Values};
pub use text::{format_duration, truncate_description};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, info};

use crate::config::SiteConfig;
use crate::error::{Result, SiteError};
use crate::model::{ImageRef, Recipe, RecipeCollection};
use crate::slug::SlugAllocator;

/// Settings shared by every rendered page
#[derive(Debug, Clone, PartialEq)]
pub struct PageSettings {
    pub base_url: String,
    pub clean_urls: bool,
    pub description_words: usize,
}

impl From<&SiteConfig> for PageSettings {
    fn from(config: &SiteConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            clean_urls: config.clean_urls,
            description_words: config.description_words,
        }
    }
}

impl PageSettings {
    pub fn site_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Link target for a page, relative to the site root
    pub fn page_href(&self, slug: &str) -> String {
        if self.clean_urls {
            slug.to_string()
        } else {
            format!("{slug}.html")
        }
    }

    pub fn absolute(&self, path: &str) -> String {
        format!("{}/{}", self.site_url(), path.trim_start_matches('/'))
    }

    /// Absolute URL for an image reference
    pub fn absolute_image(&self, reference: &str) -> String {
        match ImageRef::parse(reference) {
            ImageRef::Remote(url) => url.into(),
            ImageRef::Local(path) => self.absolute(path),
        }
    }
}

/// A recipe together with the page name it was given
#[derive(Debug, Clone)]
pub struct PageRef<'a> {
    pub recipe: &'a Recipe,
    pub slug: String,
}

/// Give every recipe a unique slug, in collection order
pub fn assign_slugs(recipes: &[Recipe]) -> Vec<PageRef<'_>> {
    let mut slugs = SlugAllocator::new();
    recipes
        .iter()
        .map(|recipe| PageRef {
            recipe,
            slug: slugs.allocate(&recipe.name),
        })
        .collect()
}

/// Counters for one generate run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateStats {
    pub recipe_pages: usize,
    pub categories: usize,
    pub about_copied: bool,
    pub sitemap_urls: usize,
}

impl GenerateStats {
    /// Pages written, counting the index page
    pub fn total_pages(&self) -> usize {
        self.recipe_pages + 1
    }
}

/// Renders a recipe collection into the publish directory
pub struct SiteGenerator {
    recipe_template: Template,
    index_template: Template,
    templates_dir: PathBuf,
    output_dir: PathBuf,
    settings: PageSettings,
    build_date: NaiveDate,
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| SiteError::write(path, e))
}

impl SiteGenerator {
    /// Load the recipe and index templates. Both are required.
    pub fn new(config: &SiteConfig, build_date: NaiveDate) -> Result<Self> {
        let templates_dir = config.templates_dir.clone();
        Ok(Self {
            recipe_template: Template::load(&templates_dir.join("recipe.html"))?,
            index_template: Template::load(&templates_dir.join("index.html"))?,
            templates_dir,
            output_dir: config.output_dir.clone(),
            settings: PageSettings::from(config),
            build_date,
        })
    }

    /// Write one page per recipe, the index, the about page and the sitemap.
    ///
    /// Stops at the first file that cannot be written.
    pub fn generate(&self, collection: &RecipeCollection) -> Result<GenerateStats> {
        fs::create_dir_all(&self.output_dir).map_err(|e| SiteError::write(&self.output_dir, e))?;

        let pages = assign_slugs(&collection.recipes);
        let total = pages.len();
        info!("Generating site for {} recipes...", total);

        for (i, page) in pages.iter().enumerate() {
            debug!("[{}/{}] Generating page for '{}'...", i + 1, total, page.recipe.name);
            let html = render_recipe_page(page.recipe, &page.slug, &self.recipe_template, &self.settings);
            write_file(&self.output_dir.join(format!("{}.html", page.slug)), &html)?;
        }

        info!("Generating index page...");
        let index = render_index_page(&pages, &self.index_template, &self.settings);
        write_file(&self.output_dir.join("index.html"), &index)?;

        let about_copied = copy_about_page(&self.templates_dir, &self.output_dir)?;

        let slugs: Vec<String> = pages.iter().map(|page| page.slug.clone()).collect();
        let sitemap = render_sitemap(&slugs, &self.settings, self.build_date);
        write_file(&self.output_dir.join("sitemap.xml"), &sitemap)?;

        Ok(GenerateStats {
            recipe_pages: total,
            categories: category_counts(&pages).len(),
            about_copied,
            sitemap_urls: slugs.len() + 2,
        })
    }
}
