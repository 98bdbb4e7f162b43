use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;

use recipe_site::SiteConfig;

#[derive(Parser)]
#[command(name = "recipe-site")]
#[command(version, about = "Static site generator for recipe exports", long_about = None)]
struct Cli {
    /// Config file (defaults to recipe-site.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Download recipe images and write the export with local image paths
    FetchImages,

    /// Render recipe pages, the index and the sitemap
    GenerateSite,

    /// Fetch images, generate the site and copy static assets (default)
    Build,
}

fn run(cli: Cli) -> recipe_site::Result<()> {
    let config = SiteConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Build) {
        Command::FetchImages => recipe_site::fetch_images(&config).map(|_| ()),
        Command::GenerateSite => recipe_site::generate_site(&config).map(|_| ()),
        Command::Build => recipe_site::build(&config).map(|_| ()),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
