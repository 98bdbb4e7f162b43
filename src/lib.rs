pub mod config;
pub mod error;
pub mod images;
pub mod model;
pub mod site;
pub mod slug;

pub use config::SiteConfig;
pub use error::{Result, SiteError};
pub use images::{Downloader, FetchReport, FetchStats, HttpDownloader, ImageFetcher};
pub use model::{ImageRef, Recipe, RecipeCollection};
pub use site::{AssetStats, GenerateStats, SiteGenerator};

use std::path::Path;

use chrono::NaiveDate;
use log::info;

/// Download every remote image of the recipe export and write the rewritten
/// export to `config.local_input`.
pub fn fetch_images(config: &SiteConfig) -> Result<FetchStats> {
    if !config.input.exists() {
        return Err(SiteError::InputNotFound(config.input.clone()));
    }
    let downloader = HttpDownloader::new(config.timeout(), &config.user_agent)?;
    fetch_images_with(config, downloader)
}

/// Same as [`fetch_images`] with a caller-provided [`Downloader`]
pub fn fetch_images_with<D: Downloader>(config: &SiteConfig, downloader: D) -> Result<FetchStats> {
    let collection = RecipeCollection::load(&config.input)?;
    let fetcher = ImageFetcher::new(downloader, &config.images_dir, &config.image_prefix);
    let report = fetcher.fetch(&collection)?;
    report.collection.save(&config.local_input)?;

    let stats = report.stats;
    info!(
        "Images: {} downloaded, {} updated, {} skipped, {} failed, {} recipes without image",
        stats.downloaded, stats.updated, stats.skipped, stats.failed, stats.without_images
    );
    info!("Updated recipes saved to: {}", config.local_input.display());
    Ok(stats)
}

/// The collection the generator should read: the export with local images
/// when it exists, otherwise the original export.
pub fn site_input(config: &SiteConfig) -> &Path {
    if config.local_input.exists() {
        &config.local_input
    } else {
        &config.input
    }
}

/// Render every page of the site into `config.output_dir`
pub fn generate_site(config: &SiteConfig) -> Result<GenerateStats> {
    generate_site_on(config, chrono::Local::now().date_naive())
}

/// Same as [`generate_site`] with a fixed build date for the sitemap
pub fn generate_site_on(config: &SiteConfig, build_date: NaiveDate) -> Result<GenerateStats> {
    let input = site_input(config);
    let collection = RecipeCollection::load(input)?;
    info!("Reading recipes from {}", input.display());

    let generator = SiteGenerator::new(config, build_date)?;
    let stats = generator.generate(&collection)?;

    info!(
        "Generated {} pages ({} recipes, {} categories) in {}",
        stats.total_pages(),
        stats.recipe_pages,
        stats.categories,
        config.output_dir.display()
    );
    Ok(stats)
}

/// Result of a full build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub images: FetchStats,
    pub site: GenerateStats,
    pub assets: AssetStats,
}

/// Fetch images, generate the site and copy static assets.
///
/// Fails before doing anything when the recipe export is missing.
pub fn build(config: &SiteConfig) -> Result<BuildSummary> {
    let downloader = HttpDownloader::new(config.timeout(), &config.user_agent)?;
    build_with(config, downloader, chrono::Local::now().date_naive())
}

/// Same as [`build`] with a caller-provided [`Downloader`] and build date
pub fn build_with<D: Downloader>(
    config: &SiteConfig,
    downloader: D,
    build_date: NaiveDate,
) -> Result<BuildSummary> {
    if !config.input.exists() {
        return Err(SiteError::InputNotFound(config.input.clone()));
    }

    info!("Downloading images...");
    let images = fetch_images_with(config, downloader)?;

    info!("Generating site...");
    let site = generate_site_on(config, build_date)?;

    info!("Copying static assets...");
    let assets = site::copy_static_assets(config)?;

    info!("Build complete: {}", config.output_dir.display());
    Ok(BuildSummary {
        images,
        site,
        assets,
    })
}
