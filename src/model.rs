use std::fs;
use std::path::Path;

use log::debug;
use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SiteError};

pub const UNTITLED: &str = "Untitled Recipe";

/// A recipe export: the ordered `recipes` array plus whatever else the
/// exporting application put at the top level.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecipeCollection {
    pub recipes: Vec<Recipe>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub image: Vec<String>,
    #[serde(rename = "recipeCategory", default, deserialize_with = "string_list")]
    pub categories: Vec<String>,
    #[serde(rename = "recipeIngredient", default, deserialize_with = "string_list")]
    pub ingredients: Vec<String>,
    #[serde(rename = "recipeInstructions", default, deserialize_with = "entry_list")]
    pub instructions: Vec<TextEntry>,
    #[serde(
        default,
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub recipe_yield: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_based_on: Option<String>,
    #[serde(
        rename = "comment",
        default,
        deserialize_with = "entry_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub comments: Vec<TextEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An instruction step or a note: either a bare string or an object with a
/// `text` field (schema.org `HowToStep`, Recipe Sage comments).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TextEntry {
    Plain(String),
    Structured(TextObject),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextObject {
    #[serde(default)]
    pub text: String,
    // HowToSection
    #[serde(
        rename = "itemListElement",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub item_list_element: Vec<TextEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TextEntry {
    /// All non-empty texts of this entry, descending into sections
    pub fn texts(&self) -> Vec<&str> {
        let texts = match self {
            TextEntry::Plain(text) => vec![text.as_str()],
            TextEntry::Structured(object) if object.item_list_element.is_empty() => {
                vec![object.text.as_str()]
            }
            TextEntry::Structured(object) => object
                .item_list_element
                .iter()
                .flat_map(|entry| entry.texts())
                .collect(),
        };
        texts
            .into_iter()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect()
    }
}

/// Where an image reference points
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRef<'a> {
    /// Absolute http(s) URL
    Remote(Url),
    /// Path on the local filesystem, relative to the publish directory
    Local(&'a str),
}

impl<'a> ImageRef<'a> {
    /// Protocol-relative references (`//host/path`) count as https URLs
    pub fn parse(reference: &'a str) -> Self {
        let parsed = match reference.strip_prefix("//") {
            Some(rest) if !rest.is_empty() && !rest.starts_with('/') => {
                Url::parse(&format!("https://{rest}"))
            }
            _ => Url::parse(reference),
        };
        match parsed {
            Ok(url) if matches!(url.scheme(), "http" | "https") => ImageRef::Remote(url),
            _ => ImageRef::Local(reference),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ImageRef::Remote(_))
    }
}

impl Recipe {
    /// Instruction texts in order, with sections flattened
    pub fn steps(&self) -> Vec<&str> {
        self.instructions.iter().flat_map(TextEntry::texts).collect()
    }

    /// Note texts in order
    pub fn notes(&self) -> Vec<&str> {
        self.comments.iter().flat_map(TextEntry::texts).collect()
    }

    /// Category labels without duplicates, in first-seen order
    pub fn unique_categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.categories.len());
        for category in &self.categories {
            if !seen.contains(&category.as_str()) {
                seen.push(category);
            }
        }
        seen
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().map(str::trim).unwrap_or_default()
    }

    /// Fill in defaults and drop blank values. `position` is 1-based.
    fn normalize(&mut self, position: usize) {
        if self.identifier.trim().is_empty() {
            self.identifier = format!("recipe-{position}");
        }
        if self.name.trim().is_empty() {
            self.name = UNTITLED.to_string();
        }
        for list in [&mut self.image, &mut self.categories] {
            list.iter_mut().for_each(|value| *value = value.trim().to_string());
            list.retain(|value| !value.is_empty());
        }
        for field in [
            &mut self.description,
            &mut self.recipe_yield,
            &mut self.prep_time,
            &mut self.cook_time,
            &mut self.total_time,
            &mut self.credit_text,
            &mut self.is_based_on,
            &mut self.date_published,
        ] {
            if field.as_deref().is_some_and(|value| value.trim().is_empty()) {
                *field = None;
            }
        }
    }
}

impl RecipeCollection {
    /// Parse an export and apply per-recipe defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut collection: RecipeCollection = serde_json::from_str(json)?;
        for (index, recipe) in collection.recipes.iter_mut().enumerate() {
            recipe.normalize(index + 1);
        }
        Ok(collection)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SiteError::InputNotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path).map_err(|e| SiteError::read(path, e))?;
        let collection = Self::from_json(&json).map_err(|source| SiteError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "Loaded {} recipes from {}",
            collection.recipes.len(),
            path.display()
        );
        Ok(collection)
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SiteError::write(parent, e))?;
        }
        fs::write(path, self.to_json()?).map_err(|e| SiteError::write(path, e))
    }
}

/// Loose shapes seen in the wild for list-like fields
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Number(serde_json::Number),
    Url { url: String },
    Many(Vec<Loose>),
    Other(serde::de::IgnoredAny),
}

impl Loose {
    fn collect_into(self, out: &mut Vec<String>) {
        match self {
            Loose::Text(text) => out.push(text),
            Loose::Number(number) => out.push(number.to_string()),
            Loose::Url { url } => out.push(url),
            Loose::Many(items) => items.into_iter().for_each(|item| item.collect_into(out)),
            Loose::Other(_) => {}
        }
    }
}

fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut out = Vec::new();
    if let Some(loose) = Option::<Loose>::deserialize(deserializer)? {
        loose.collect_into(&mut out);
    }
    Ok(out)
}

fn optional_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = string_list(deserializer)?;
    Ok((!values.is_empty()).then(|| values.join(", ")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntryList {
    Many(Vec<TextEntry>),
    One(TextEntry),
}

fn entry_list<'de, D>(deserializer: D) -> std::result::Result<Vec<TextEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<EntryList>::deserialize(deserializer)? {
        Some(EntryList::One(entry)) => vec![entry],
        Some(EntryList::Many(entries)) => entries,
        None => Vec::new(),
    })
}
