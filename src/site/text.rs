/// Shorten a description for index cards.
///
/// Uses the first sentence when it has at most `max_words` words, otherwise
/// cuts at `max_words` words and appends `...`.
pub fn truncate_description(text: &str, max_words: usize) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    if let Some(end) = text.find(&['.', '!', '?'][..]).filter(|&end| end > 0) {
        let sentence = text[..=end].trim();
        if sentence.split_whitespace().count() <= max_words {
            return sentence.to_string();
        }
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > max_words {
        return format!("{}...", words[..max_words].join(" "));
    }

    text.to_string()
}

/// Render an ISO-8601 time duration like `PT1H30M` as `1h 30m`.
///
/// Values that are not `PT` durations are returned unchanged.
pub fn format_duration(iso: &str) -> String {
    let iso = iso.trim();
    let Some(mut rest) = iso.strip_prefix("PT") else {
        return iso.to_string();
    };

    let mut parts = Vec::new();
    for unit in ['H', 'M'] {
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits > 0 && rest[digits..].starts_with(unit) {
            parts.push(format!("{}{}", &rest[..digits], unit.to_ascii_lowercase()));
            rest = &rest[digits + 1..];
        }
    }

    parts.join(" ")
}

/// Cut `text` to at most `max` characters, marking the cut with `...`
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

/// Split a note into paragraphs: on blank lines when there are any,
/// otherwise on single newlines.
pub fn paragraphs(text: &str) -> Vec<&str> {
    let separator = if text.contains("\n\n") { "\n\n" } else { "\n" };
    text.split(separator)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}
