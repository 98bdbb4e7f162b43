use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{Result, SiteError};

/// Values for one render, keyed by placeholder name
pub type Values = BTreeMap<&'static str, String>;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Placeholder(String),
}

/// A page template with `{{NAME}}` placeholders.
///
/// Names are upper-case ASCII letters, digits and underscores. Anything else
/// between braces is plain text. Placeholders without a value are kept
/// verbatim, and substituted values are never scanned again.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) if is_placeholder_name(&after[..end]) => {
                    text.push_str(&rest[..start]);
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Placeholder(after[..end].to_string()));
                    rest = &after[end + 2..];
                }
                _ => {
                    text.push_str(&rest[..start + 2]);
                    rest = after;
                }
            }
        }
        text.push_str(rest);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Self { segments }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SiteError::TemplateNotFound(path.to_path_buf()));
        }
        let source = fs::read_to_string(path).map_err(|e| SiteError::read(path, e))?;
        Ok(Self::parse(&source))
    }

    /// Placeholder names in order of appearance
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn render(&self, values: &Values) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(name) => match values.get(name.as_str()) {
                    Some(value) => out.push_str(value),
                    None => {
                        debug!("No value for placeholder {{{{{}}}}}, leaving it as is", name);
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                },
            }
        }
        out
    }
}
