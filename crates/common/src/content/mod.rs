//! Article markdown as typed spans
//!
//! Generated markdown carries `[IMAGE: <prompt>]` placeholders that are later
//! swapped for `![<alt>](<url>)` images. Content is parsed once into spans so
//! a resolution replaces exactly one placeholder and leaves every other byte
//! untouched.
//!
//! Each placeholder and each markdown image occupies one *slot*, numbered in
//! document order. Resolving a placeholder turns it into an image at the same
//! position, so slot numbers do not shift between resolutions.

use regex_lite::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Longest slug we produce
pub const MAX_SLUG_LEN: usize = 200;

fn span_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?P<ph>\[IMAGE:[ \t]*(?P<prompt>[^\]\n]*?)[ \t]*\])|(?P<img>!\[(?P<alt>[^\]\n]*)\]\((?P<url>[^)\s]*)\))",
        )
        .expect("span pattern is valid")
    })
}

/// One piece of article content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Placeholder { raw: String, prompt: String },
    Image { raw: String, alt: String, url: String },
}

impl Span {
    fn occupies_slot(&self) -> bool {
        !matches!(self, Span::Text(_))
    }

    fn as_str(&self) -> &str {
        match self {
            Span::Text(text) => text,
            Span::Placeholder { raw, .. } | Span::Image { raw, .. } => raw,
        }
    }
}

/// An unresolved placeholder and its slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSlot {
    pub slot: usize,
    pub prompt: String,
}

/// Parsed article content
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Content {
    spans: Vec<Span>,
}

impl Content {
    /// Split markdown into text, placeholder and image spans
    pub fn parse(markdown: &str) -> Self {
        let mut spans = Vec::new();
        let mut cursor = 0;

        for caps in span_pattern().captures_iter(markdown) {
            let Some(whole) = caps.get(0) else { continue };

            if whole.start() > cursor {
                spans.push(Span::Text(markdown[cursor..whole.start()].to_string()));
            }

            let raw = whole.as_str().to_string();
            if caps.name("ph").is_some() {
                let prompt = caps.name("prompt").map(|m| m.as_str()).unwrap_or_default();
                spans.push(Span::Placeholder {
                    raw,
                    prompt: prompt.to_string(),
                });
            } else {
                let alt = caps.name("alt").map(|m| m.as_str()).unwrap_or_default();
                let url = caps.name("url").map(|m| m.as_str()).unwrap_or_default();
                spans.push(Span::Image {
                    raw,
                    alt: alt.to_string(),
                    url: url.to_string(),
                });
            }

            cursor = whole.end();
        }

        if cursor < markdown.len() {
            spans.push(Span::Text(markdown[cursor..].to_string()));
        }

        Self { spans }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Unresolved placeholders in document order
    pub fn placeholders(&self) -> Vec<PlaceholderSlot> {
        self.spans
            .iter()
            .filter(|span| span.occupies_slot())
            .enumerate()
            .filter_map(|(slot, span)| match span {
                Span::Placeholder { prompt, .. } => Some(PlaceholderSlot {
                    slot,
                    prompt: prompt.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn has_placeholders(&self) -> bool {
        self.spans
            .iter()
            .any(|span| matches!(span, Span::Placeholder { .. }))
    }

    /// Replace one placeholder with a markdown image.
    ///
    /// Targets `slot` when it holds an unresolved placeholder with this prompt,
    /// otherwise the first unresolved placeholder whose prompt matches exactly.
    /// Returns the slot that was resolved, or `None` when nothing matched.
    pub fn resolve(&mut self, slot: usize, prompt: &str, url: &str) -> Option<usize> {
        let prompt = prompt.trim();
        let candidates = self.placeholders();

        let target = candidates
            .iter()
            .find(|p| p.slot == slot && p.prompt == prompt)
            .or_else(|| candidates.iter().find(|p| p.prompt == prompt))?
            .slot;

        let index = self.span_index_of_slot(target)?;
        let alt = alt_text(prompt);
        self.spans[index] = Span::Image {
            raw: format!("![{}]({})", alt, url),
            alt,
            url: url.to_string(),
        };

        Some(target)
    }

    fn span_index_of_slot(&self, slot: usize) -> Option<usize> {
        self.spans
            .iter()
            .enumerate()
            .filter(|(_, span)| span.occupies_slot())
            .nth(slot)
            .map(|(index, _)| index)
    }

    /// Concatenate every span back into markdown
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for span in &self.spans {
            f.write_str(span.as_str())?;
        }
        Ok(())
    }
}

/// Alt text for an image prompt: surrounding double quotes removed
pub fn alt_text(prompt: &str) -> String {
    prompt.trim().trim_matches('"').trim().to_string()
}

/// URL-safe slug, capped at [`MAX_SLUG_LEN`]
pub fn slugify(text: &str) -> String {
    let mut slug = slug::slugify(text);
    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}
