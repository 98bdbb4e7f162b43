use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use serde_json::{json, Value};

use super::template::{Template, Values};
use super::text::{format_duration, paragraphs, truncate_chars};
use super::PageSettings;
use crate::model::Recipe;

const META_DESCRIPTION_CHARS: usize = 155;

/// Render the page for one recipe. Every optional section collapses to an
/// empty string when the recipe has no data for it.
pub fn render_recipe_page(
    recipe: &Recipe,
    slug: &str,
    template: &Template,
    settings: &PageSettings,
) -> String {
    template.render(&recipe_values(recipe, slug, settings))
}

pub(crate) fn recipe_values(recipe: &Recipe, slug: &str, settings: &PageSettings) -> Values {
    let name = text(&recipe.name);
    let description = recipe.description();
    let steps = recipe.steps();
    let main_image = recipe.image.first().map(|image| settings.absolute_image(image));

    let mut values = Values::new();
    values.insert("RECIPE_NAME", name.to_string());
    values.insert(
        "META_DESCRIPTION",
        attr(&meta_description(recipe, &steps)).into_owned(),
    );
    values.insert("RECIPE_URL", settings.absolute(&settings.page_href(slug)));
    values.insert("OG_IMAGE", meta_image("og:image", main_image.as_deref()));
    values.insert(
        "TWITTER_IMAGE",
        meta_image("twitter:image", main_image.as_deref()),
    );
    values.insert("JSON_LD", json_ld(recipe, &steps, main_image.as_deref()));
    values.insert(
        "DESCRIPTION",
        optional(description, |d| {
            format!(r#"<p class="description">{}</p>"#, text(d))
        }),
    );
    values.insert("CATEGORIES", categories_html(recipe));
    values.insert("RECIPE_IMAGE", images_html(recipe));
    values.insert("PREP_TIME", meta_item("Prep Time", recipe.prep_time.as_deref()));
    values.insert("COOK_TIME", meta_item("Cook Time", recipe.cook_time.as_deref()));
    values.insert(
        "TOTAL_TIME",
        meta_item("Total Time", recipe.total_time.as_deref()),
    );
    values.insert(
        "YIELD",
        optional(recipe.recipe_yield.as_deref().unwrap_or_default(), |y| {
            format!(
                r#"<div class="meta-item"><strong>Yield:</strong> {}</div>"#,
                text(y)
            )
        }),
    );
    values.insert("INGREDIENTS", ingredients_html(&recipe.ingredients));
    values.insert(
        "INSTRUCTIONS",
        steps
            .iter()
            .map(|step| format!("<li><p>{}</p></li>\n", text(step)))
            .collect(),
    );
    values.insert("NOTES", notes_html(recipe));
    values.insert("FOOTER", footer_html(recipe));
    values
}

fn optional(value: &str, render: impl FnOnce(&str) -> String) -> String {
    if value.is_empty() {
        String::new()
    } else {
        render(value)
    }
}

fn meta_description(recipe: &Recipe, steps: &[&str]) -> String {
    let description = match (recipe.description(), steps.first()) {
        ("", Some(step)) => truncate_chars(step, 150),
        ("", None) => format!("Recipe for {}", recipe.name),
        (description, _) => description.to_string(),
    };
    truncate_chars(&description, META_DESCRIPTION_CHARS)
}

fn meta_image(property: &str, url: Option<&str>) -> String {
    url.map(|url| format!(r#"<meta property="{}" content="{}">"#, property, attr(url)))
        .unwrap_or_default()
}

fn meta_item(label: &str, duration: Option<&str>) -> String {
    optional(&format_duration(duration.unwrap_or_default()), |d| {
        format!(
            r#"<div class="meta-item"><strong>{}:</strong> {}</div>"#,
            label,
            text(d)
        )
    })
}

pub(crate) fn category_chips(categories: &[&str]) -> String {
    categories
        .iter()
        .map(|category| format!(r#"<span class="category">{}</span>"#, text(category)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn categories_html(recipe: &Recipe) -> String {
    optional(&category_chips(&recipe.unique_categories()), |chips| {
        format!(r#"<div class="categories">{chips}</div>"#)
    })
}

fn images_html(recipe: &Recipe) -> String {
    let alt = attr(&recipe.name);
    recipe
        .image
        .iter()
        .enumerate()
        .map(|(i, src)| {
            let label = if i == 0 {
                format!("Photo of {alt}")
            } else {
                format!("Photo {} of {alt}", i + 1)
            };
            format!(
                r#"<div class="recipe-image"><img src="{}" alt="{}"></div>"#,
                attr(src),
                label
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn ingredients_html(ingredients: &[String]) -> String {
    ingredients
        .iter()
        .map(|ingredient| {
            format!(
                r#"<li><label class="ingredient-checkbox"><input type="checkbox" aria-label="Check off {}"><span>{}</span></label></li>"#,
                attr(ingredient),
                text(ingredient)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn notes_html(recipe: &Recipe) -> String {
    let body: String = recipe
        .notes()
        .into_iter()
        .flat_map(paragraphs)
        .map(|paragraph| format!("<p>{}</p>\n", text(paragraph)))
        .collect();

    optional(&body, |body| {
        format!(
            r#"<section class="recipe-section notes" aria-labelledby="notes-heading"><h2 id="notes-heading">Notes</h2>{body}</section>"#
        )
    })
}

fn footer_html(recipe: &Recipe) -> String {
    let credit = recipe.credit_text.as_deref();
    let source = recipe.is_based_on.as_deref();
    if credit.is_none() && source.is_none() {
        return String::new();
    }

    let mut footer = String::from(r#"<footer class="recipe-footer" role="contentinfo">"#);
    if let Some(credit) = credit {
        footer.push_str(&format!("<p><strong>Source:</strong> {}</p>", text(credit)));
    }
    if let Some(source) = source {
        footer.push_str(&format!(
            r#"<p><a href="{}" target="_blank" rel="noopener" aria-label="View original recipe on {}">View Original Recipe</a></p>"#,
            attr(source),
            attr(credit.unwrap_or("source website"))
        ));
    }
    footer.push_str("</footer>");
    footer
}

/// schema.org Recipe markup, safe to place inside a `<script>` element
fn json_ld(recipe: &Recipe, steps: &[&str], image: Option<&str>) -> String {
    let mut data = json!({
        "@context": "https://schema.org",
        "@type": "Recipe",
        "name": recipe.name,
        "description": recipe.description(),
        "image": image.into_iter().collect::<Vec<_>>(),
        "recipeCategory": recipe.unique_categories(),
        "recipeIngredient": recipe.ingredients,
        "recipeInstructions": steps
            .iter()
            .map(|step| json!({"@type": "HowToStep", "text": step}))
            .collect::<Vec<_>>(),
    });

    let optional_fields = [
        ("recipeYield", recipe.recipe_yield.as_deref()),
        ("prepTime", recipe.prep_time.as_deref()),
        ("cookTime", recipe.cook_time.as_deref()),
        ("totalTime", recipe.total_time.as_deref()),
        ("url", recipe.is_based_on.as_deref()),
        ("datePublished", recipe.date_published.as_deref()),
    ];
    for (key, value) in optional_fields {
        if let Some(value) = value {
            data[key] = Value::from(value);
        }
    }
    if let Some(credit) = recipe.credit_text.as_deref() {
        data["author"] = json!({"@type": "Person", "name": credit});
    }

    serde_json::to_string_pretty(&data)
        .unwrap_or_default()
        .replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecipeCollection;

    fn recipe(json: &str) -> Recipe {
        RecipeCollection::from_json(&format!(r#"{{"recipes": [{json}]}}"#))
            .unwrap()
            .recipes
            .remove(0)
    }

    fn settings() -> PageSettings {
        PageSettings {
            base_url: "https://recipes.example.org".to_string(),
            clean_urls: true,
            description_words: 20,
        }
    }

    #[test]
    fn test_full_recipe_values() {
        let recipe = recipe(
            r#"{
                "name": "Fish & Chips",
                "description": "Crispy <b>and</b> golden.",
                "image": ["images/fish.jpg"],
                "recipeCategory": ["Dinner", "British"],
                "recipeIngredient": ["2 fillets cod"],
                "recipeInstructions": ["Batter the fish.", "Fry."],
                "prepTime": "PT20M",
                "creditText": "Nan",
                "isBasedOn": "https://example.com/fish"
            }"#,
        );

        let values = recipe_values(&recipe, "fish-chips", &settings());

        assert_eq!(values["RECIPE_NAME"], "Fish &amp; Chips");
        assert_eq!(values["RECIPE_URL"], "https://recipes.example.org/fish-chips");
        assert!(values["DESCRIPTION"].contains("Crispy &lt;b&gt;and&lt;/b&gt; golden."));
        assert!(values["OG_IMAGE"].contains("https://recipes.example.org/images/fish.jpg"));
        assert!(values["RECIPE_IMAGE"].contains(r#"src="images/fish.jpg""#));
        assert_eq!(
            values["INSTRUCTIONS"],
            "<li><p>Batter the fish.</p></li>\n<li><p>Fry.</p></li>\n"
        );
        assert!(values["PREP_TIME"].contains("20m"));
        assert!(values["FOOTER"].contains("View Original Recipe"));
        assert!(values["CATEGORIES"].contains(r#"<span class="category">British</span>"#));
    }

    #[test]
    fn test_missing_optional_fields_render_empty() {
        let recipe = recipe(r#"{"name": "Water"}"#);

        let values = recipe_values(&recipe, "water", &settings());

        for key in [
            "DESCRIPTION",
            "CATEGORIES",
            "RECIPE_IMAGE",
            "OG_IMAGE",
            "TWITTER_IMAGE",
            "PREP_TIME",
            "COOK_TIME",
            "TOTAL_TIME",
            "YIELD",
            "INGREDIENTS",
            "INSTRUCTIONS",
            "NOTES",
            "FOOTER",
        ] {
            assert_eq!(values[key], "", "{key} should be empty");
        }
        assert_eq!(values["META_DESCRIPTION"], "Recipe for Water");
    }

    #[test]
    fn test_meta_description_falls_back_to_first_step() {
        let long_step = "Stir ".repeat(60);
        let recipe = recipe(&format!(
            r#"{{"name": "Risotto", "recipeInstructions": ["{long_step}"]}}"#
        ));

        let values = recipe_values(&recipe, "risotto", &settings());

        assert!(values["META_DESCRIPTION"].starts_with("Stir Stir"));
        assert!(values["META_DESCRIPTION"].ends_with("..."));
        assert!(values["META_DESCRIPTION"].chars().count() <= 155);
    }

    #[test]
    fn test_notes_paragraphs() {
        let recipe = recipe(
            r#"{"name": "Stew", "comment": [{"text": "Better next day.\n\nFreezes well."}]}"#,
        );

        let values = recipe_values(&recipe, "stew", &settings());

        assert!(values["NOTES"].contains("<p>Better next day.</p>\n<p>Freezes well.</p>"));
    }

    #[test]
    fn test_json_ld_cannot_close_script() {
        let recipe = recipe(r#"{"name": "</script><script>alert(1)</script>"}"#);

        let values = recipe_values(&recipe, "x", &settings());

        assert!(!values["JSON_LD"].contains("</script>"));
        let parsed: Value = serde_json::from_str(&values["JSON_LD"]).unwrap();
        assert_eq!(parsed["name"], "</script><script>alert(1)</script>");
        assert_eq!(parsed["@type"], "Recipe");
    }

    #[test]
    fn test_multiple_images_and_remote_fallback() {
        let recipe = recipe(
            r#"{"name": "Tart", "image": ["https://cdn.example.com/tart.jpg", "images/tart-2.jpg"]}"#,
        );

        let values = recipe_values(&recipe, "tart", &settings());

        assert_eq!(values["RECIPE_IMAGE"].matches("<img").count(), 2);
        assert!(values["OG_IMAGE"].contains(r#"content="https://cdn.example.com/tart.jpg""#));
    }
}
