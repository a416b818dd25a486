//! HTML parsing via scraper.

use crate::{Document, Parser};
use scraper::{Html, Selector};

/// Parses markup with html5ever (through scraper) and keeps the serialized tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        HtmlParser
    }
}

impl Parser for HtmlParser {
    fn parse_html(&self, html: &str) -> Document {
        Document::new(normalize_markup(html))
    }
}

/// Parse and re-serialize `html` so it always has `html`, `head` and `body`.
pub(crate) fn normalize_markup(html: &str) -> String {
    Html::parse_document(html).root_element().html()
}

/// Text of every classic inline `<script>` of `markup`, in document order.
pub(crate) fn inline_scripts(markup: &str) -> Vec<String> {
    let doc = Html::parse_document(markup);
    let sel = match Selector::parse("script") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    doc.select(&sel)
        .filter(|el| el.value().attr("src").is_none())
        .filter(|el| {
            el.value()
                .attr("type")
                .map(|t| {
                    t.is_empty()
                        || t.eq_ignore_ascii_case("text/javascript")
                        || t.eq_ignore_ascii_case("application/javascript")
                })
                .unwrap_or(true)
        })
        .map(|el| el.text().collect::<String>())
        .filter(|code| !code.trim().is_empty())
        .collect()
}

/// Whether `selector` is a valid CSS selector.
pub(crate) fn is_valid_selector(selector: &str) -> bool {
    Selector::parse(selector).is_ok()
}
