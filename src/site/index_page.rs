use std::collections::BTreeMap;

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use serde::Serialize;

use super::recipe_page::category_chips;
use super::template::{Template, Values};
use super::text::truncate_description;
use super::{PageRef, PageSettings};

/// One entry of the search data embedded in the index page
#[derive(Debug, Serialize, PartialEq)]
pub struct SearchEntry<'a> {
    pub slug: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    /// Lower-cased ingredients joined by spaces
    pub ingredients: String,
    pub categories: Vec<&'a str>,
}

impl<'a> SearchEntry<'a> {
    fn new(page: &'a PageRef<'a>) -> Self {
        let recipe = page.recipe;
        Self {
            slug: &page.slug,
            name: &recipe.name,
            description: recipe.description(),
            ingredients: recipe.ingredients.join(" ").to_lowercase(),
            categories: recipe.unique_categories(),
        }
    }
}

/// Number of recipes per category label, alphabetically by label
pub fn category_counts(pages: &[PageRef<'_>]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for page in pages {
        for category in page.recipe.unique_categories() {
            *counts.entry(category.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Render the index page listing every recipe
pub fn render_index_page(pages: &[PageRef<'_>], template: &Template, settings: &PageSettings) -> String {
    template.render(&index_values(pages, settings))
}

pub(crate) fn index_values(pages: &[PageRef<'_>], settings: &PageSettings) -> Values {
    let first_image = pages
        .iter()
        .find_map(|page| page.recipe.image.first())
        .map(|image| settings.absolute_image(image));

    let image_meta = |property: &str| {
        first_image
            .as_deref()
            .map(|url| format!(r#"<meta property="{}" content="{}">"#, property, attr(url)))
            .unwrap_or_default()
    };

    let mut values = Values::new();
    values.insert("RECIPE_COUNT", pages.len().to_string());
    values.insert("BASE_URL", settings.site_url().to_string());
    values.insert("ABOUT_URL", attr(&settings.page_href("about")).into_owned());
    values.insert("OG_IMAGE", image_meta("og:image"));
    values.insert("TWITTER_IMAGE", image_meta("twitter:image"));
    values.insert("CATEGORY_FILTERS", category_filters(pages));
    values.insert(
        "RECIPE_CARDS",
        pages.iter().map(|page| card_html(page, settings)).collect(),
    );
    values.insert("SEARCH_DATA", search_data(pages));
    values.insert("JAVASCRIPT", SCRIPT.to_string());
    values
}

fn category_filters(pages: &[PageRef<'_>]) -> String {
    category_counts(pages)
        .iter()
        .map(|(category, count)| {
            format!(
                r#"<button class="filter-btn" data-category="{0}" aria-pressed="false" aria-label="Filter by {0} recipes">{1} ({2})</button>"#,
                attr(category),
                text(category),
                count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn card_html(page: &PageRef<'_>, settings: &PageSettings) -> String {
    let recipe = page.recipe;
    let name = text(&recipe.name);

    let image = match recipe.image.first() {
        Some(src) => format!(
            r#"<img src="{}" alt="{} recipe photo" loading="lazy">"#,
            attr(src),
            attr(&recipe.name)
        ),
        None => r#"<div class="no-image" role="img" aria-label="No image available">No Image</div>"#
            .to_string(),
    };

    let description = truncate_description(recipe.description(), settings.description_words);
    let description = if description.is_empty() {
        String::new()
    } else {
        format!(r#"<p class="card-description">{}</p>"#, text(&description))
    };

    let chips = category_chips(&recipe.unique_categories());
    let categories = if chips.is_empty() {
        String::new()
    } else {
        format!(r#"<div class="categories">{chips}</div>"#)
    };

    format!(
        r#"
        <article class="recipe-card" role="listitem" data-slug="{slug}">
            <a href="{href}" class="card-link" aria-label="View recipe for {label}">
                <div class="card-image">
                    {image}
                </div>
                <div class="card-content">
                    <h2>{name}</h2>
                    {description}
                    {categories}
                </div>
            </a>
        </article>"#,
        slug = attr(&page.slug),
        href = attr(&settings.page_href(&page.slug)),
        label = attr(&recipe.name),
    )
}

/// The search index as a JSON `<script>` block. `<` is escaped so recipe
/// text can never end the element early.
fn search_data(pages: &[PageRef<'_>]) -> String {
    let entries: Vec<SearchEntry<'_>> = pages.iter().map(SearchEntry::new).collect();
    let json = serde_json::to_string(&entries)
        .unwrap_or_else(|_| "[]".to_string())
        .replace('<', "\\u003c");
    format!(r#"<script type="application/json" id="recipe-data">{json}</script>"#)
}

const SCRIPT: &str = r#"<script>
        // Search and filter functionality
        const recipeDataElement = document.getElementById('recipe-data');
        const recipeData = recipeDataElement ? JSON.parse(recipeDataElement.textContent) : [];
        const recipesBySlug = new Map(recipeData.map(recipe => [recipe.slug, recipe]));
        const searchInput = document.getElementById('search');
        const filterBtns = document.querySelectorAll('.filter-btn');
        const recipeCards = document.querySelectorAll('.recipe-card');
        const noResults = document.getElementById('no-results');

        let currentCategory = 'all';
        let currentSearch = '';

        function matchesSearch(recipe) {
            if (currentSearch === '') {
                return true;
            }
            const name = recipe.name.toLowerCase();
            if (currentSearch.length === 1) {
                // For single character, match word-initial letters in title only
                return name.split(/\s+/).some(word => word.startsWith(currentSearch));
            }
            return name.includes(currentSearch) ||
                recipe.description.toLowerCase().includes(currentSearch) ||
                recipe.ingredients.includes(currentSearch) ||
                recipe.categories.some(category => category.toLowerCase().includes(currentSearch));
        }

        function filterRecipes() {
            let visibleCount = 0;

            recipeCards.forEach(card => {
                const recipe = recipesBySlug.get(card.dataset.slug);
                const visible = recipe !== undefined &&
                    matchesSearch(recipe) &&
                    (currentCategory === 'all' || recipe.categories.includes(currentCategory));

                card.style.display = visible ? '' : 'none';
                if (visible) {
                    visibleCount++;
                }
            });

            if (noResults) {
                noResults.style.display = visibleCount === 0 ? 'block' : 'none';
            }
        }

        function activate(btn) {
            filterBtns.forEach(b => {
                b.classList.remove('active');
                b.setAttribute('aria-pressed', 'false');
            });
            btn.classList.add('active');
            btn.setAttribute('aria-pressed', 'true');
            currentCategory = btn.dataset.category;
        }

        if (searchInput) {
            searchInput.addEventListener('input', (e) => {
                currentSearch = e.target.value.trim().toLowerCase();
                filterRecipes();
            });
        }

        filterBtns.forEach(btn => {
            btn.addEventListener('click', () => {
                // Clicking the active category again goes back to all recipes
                const allBtn = Array.from(filterBtns).find(b => b.dataset.category === 'all');
                if (btn.classList.contains('active') && btn.dataset.category !== 'all' && allBtn) {
                    activate(allBtn);
                } else {
                    activate(btn);
                }
                filterRecipes();
            });
        });

        // Hamburger menu
        const hamburgerMenu = document.getElementById('hamburgerMenu');
        if (hamburgerMenu) {
            hamburgerMenu.querySelector('.hamburger-icon').addEventListener('click', () => {
                hamburgerMenu.classList.toggle('active');
            });

            document.addEventListener('click', (e) => {
                if (!hamburgerMenu.contains(e.target)) {
                    hamburgerMenu.classList.remove('active');
                }
            });

            hamburgerMenu.querySelectorAll('.menu a').forEach(link => {
                link.addEventListener('click', () => {
                    hamburgerMenu.classList.remove('active');
                });
            });
        }
    </script>"#;
