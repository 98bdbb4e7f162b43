use std::fs;
use std::path::Path;
use std::time::Duration;

use recipe_site::{
    fetch_images_with, HttpDownloader, ImageRef, RecipeCollection, SiteConfig, SiteError,
};

fn write_export(root: &Path, json: &str) {
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(root.join("data/recipes.json"), json).unwrap();
}

fn downloader() -> HttpDownloader {
    HttpDownloader::new(Duration::from_secs(5), "recipe-site-test").unwrap()
}

fn two_recipe_export(server_url: &str) -> String {
    format!(
        r#"{{
            "recipes": [
                {{
                    "identifier": "a1b2",
                    "name": "Lemon Tart",
                    "image": ["{server_url}/photos/tart.png"],
                    "recipeCategory": ["Dessert"],
                    "recipeIngredient": ["3 lemons"],
                    "recipeInstructions": [{{"@type": "HowToStep", "text": "Bake."}}]
                }},
                {{
                    "identifier": "c3d4",
                    "name": "Green Salad",
                    "recipeCategory": ["Salad", "Vegan"],
                    "recipeIngredient": ["lettuce"],
                    "recipeInstructions": ["Toss."]
                }}
            ]
        }}"#
    )
}

#[test]
fn test_downloads_new_image_and_rewrites_reference() {
    let mut server = mockito::Server::new();
    let m = server
        .mock("GET", "/photos/tart.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body("PNGDATA")
        .expect(1)
        .create();

    let dir = tempfile::tempdir().unwrap();
    write_export(dir.path(), &two_recipe_export(&server.url()));
    let config = SiteConfig::default().relative_to(dir.path());

    let stats = fetch_images_with(&config, downloader()).unwrap();

    m.assert();
    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.rewritten, 1);
    assert_eq!(stats.without_images, 1);

    let output = RecipeCollection::load(&config.local_input).unwrap();
    assert_eq!(output.recipes.len(), 2);
    assert_eq!(output.recipes[0].image, vec!["images/a1b2.png"]);
    assert!(output.recipes[1].image.is_empty());
    assert_eq!(
        fs::read_to_string(config.images_dir.join("a1b2.png")).unwrap(),
        "PNGDATA"
    );

    // the original export is never modified
    let original = RecipeCollection::load(&config.input).unwrap();
    assert!(ImageRef::parse(&original.recipes[0].image[0]).is_remote());
}

#[test]
fn test_rerun_is_idempotent() {
    let mut server = mockito::Server::new();
    let m = server
        .mock("GET", "/photos/tart.png")
        .with_status(200)
        .with_body("PNGDATA")
        .expect(1)
        .create();

    let dir = tempfile::tempdir().unwrap();
    write_export(dir.path(), &two_recipe_export(&server.url()));
    let config = SiteConfig::default().relative_to(dir.path());

    fetch_images_with(&config, downloader()).unwrap();
    let first = fs::read_to_string(&config.local_input).unwrap();

    let stats = fetch_images_with(&config, downloader()).unwrap();
    let second = fs::read_to_string(&config.local_input).unwrap();

    // exactly one request across both runs
    m.assert();
    assert_eq!(stats.attempted(), 0);
    assert_eq!(stats.skipped, 1);
    assert_eq!(first, second);
}

#[test]
fn test_every_local_reference_exists_on_disk() {
    let mut server = mockito::Server::new();
    let _a = server.mock("GET", "/a.jpg").with_body("a").create();
    let _b = server.mock("GET", "/b.webp").with_body("b").create();
    let _c = server.mock("GET", "/gone.jpg").with_status(404).create();

    let url = server.url();
    let dir = tempfile::tempdir().unwrap();
    write_export(
        dir.path(),
        &format!(
            r#"{{"recipes": [
                {{"identifier": "one", "name": "One", "image": ["{url}/a.jpg", "{url}/b.webp"]}},
                {{"identifier": "two", "name": "Two", "image": "{url}/gone.jpg"}}
            ]}}"#
        ),
    );
    let config = SiteConfig::default().relative_to(dir.path());

    let stats = fetch_images_with(&config, downloader()).unwrap();
    assert_eq!(stats.downloaded, 2);
    assert_eq!(stats.failed, 1);

    let output = RecipeCollection::load(&config.local_input).unwrap();
    for reference in output.recipes.iter().flat_map(|r| r.image.iter()) {
        if let ImageRef::Local(path) = ImageRef::parse(reference) {
            let file = path.strip_prefix("images/").unwrap();
            assert!(config.images_dir.join(file).is_file(), "{path} missing");
        }
    }
    assert_eq!(
        output.recipes[0].image,
        vec!["images/one.jpg", "images/one-2.webp"]
    );
    assert_eq!(output.recipes[1].image, vec![format!("{url}/gone.jpg")]);
}

#[test]
fn test_failed_download_does_not_abort() {
    let mut server = mockito::Server::new();
    let _broken = server.mock("GET", "/broken.jpg").with_status(500).create();
    let _fine = server.mock("GET", "/fine.jpg").with_body("ok").create();

    let url = server.url();
    let dir = tempfile::tempdir().unwrap();
    write_export(
        dir.path(),
        &format!(
            r#"{{"recipes": [
                {{"identifier": "x", "name": "X", "image": "{url}/broken.jpg"}},
                {{"identifier": "y", "name": "Y", "image": "{url}/fine.jpg"}}
            ]}}"#
        ),
    );
    let config = SiteConfig::default().relative_to(dir.path());

    let stats = fetch_images_with(&config, downloader()).unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.downloaded, 1);
    assert!(!config.images_dir.join("x.jpg").exists());
    assert!(config.images_dir.join("y.jpg").exists());
}

#[test]
fn test_missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = SiteConfig::default().relative_to(dir.path());

    let result = fetch_images_with(&config, downloader());

    assert!(matches!(result, Err(SiteError::InputNotFound(_))));
    assert!(!config.local_input.exists());
    assert!(!config.images_dir.exists());
}
