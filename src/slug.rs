use std::collections::HashSet;

use log::debug;

/// Slugs never exceed this many characters
const MAX_SLUG_CHARS: usize = 80;

/// Page names the generator writes itself
const RESERVED: &[&str] = &["index", "about", "sitemap"];

/// Turn a title into a filesystem- and URL-safe name.
///
/// Lower-cases, collapses every run of non-alphanumeric characters into a
/// single `-` and trims separators from both ends. A title with nothing
/// usable in it becomes `recipe`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut chars = 0;
    let mut separator = false;

    for c in text.chars() {
        if !c.is_alphanumeric() {
            separator = true;
            continue;
        }
        let separate = separator && !slug.is_empty();
        if chars + usize::from(separate) + 1 > MAX_SLUG_CHARS {
            break;
        }
        if separate {
            slug.push('-');
            chars += 1;
        }
        separator = false;
        for lower in c.to_lowercase() {
            slug.push(lower);
            chars += 1;
        }
    }

    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "recipe".to_string()
    } else {
        slug.to_string()
    }
}

/// Hands out unique slugs in call order.
///
/// The first title to claim a slug keeps it; later collisions get the first
/// free `-2`, `-3`, ... suffix. Names of the generated index, about and
/// sitemap files are never handed out.
#[derive(Debug)]
pub struct SlugAllocator {
    taken: HashSet<String>,
}

impl Default for SlugAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SlugAllocator {
    pub fn new() -> Self {
        Self {
            taken: RESERVED.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn allocate(&mut self, title: &str) -> String {
        let base = slugify(title);
        if self.taken.insert(base.clone()) {
            return base;
        }

        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if self.taken.insert(candidate.clone()) {
                debug!("Slug '{}' already taken, using '{}'", base, candidate);
                return candidate;
            }
            n += 1;
        }
    }
}
