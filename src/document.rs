//! Documents flowing through the pipeline and the images produced from them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a document, stable across every stage of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

/// A page being rasterized
///
/// A document is owned by exactly one pipeline at a time. Stages receive it
/// by value or by exclusive reference and hand the same document on, so it
/// deliberately does not implement `Clone`.
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    url: Option<String>,
    markup: String,
    form_state: BTreeMap<String, String>,
}

impl Document {
    /// Create a document from serialized markup.
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            id: DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed)),
            url: None,
            markup: markup.into(),
            form_state: BTreeMap::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// URL the document was loaded from, if any
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn set_markup(&mut self, markup: impl Into<String>) {
        self.markup = markup.into();
    }

    /// Live values of form controls keyed by control name, as left behind by
    /// scripts. They are not part of the markup until persisted.
    pub fn form_state(&self) -> &BTreeMap<String, String> {
        &self.form_state
    }

    pub fn set_form_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.form_state.insert(name.into(), value.into());
    }

    pub fn take_form_state(&mut self) -> BTreeMap<String, String> {
        std::mem::take(&mut self.form_state)
    }
}

/// An image synthesized from a document. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    width: u32,
    height: u32,
    content_type: String,
    data: Vec<u8>,
}

impl RenderedImage {
    pub fn new(width: u32, height: u32, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            content_type: content_type.into(),
            data,
        }
    }

    pub fn svg(width: u32, height: u32, svg: impl Into<String>) -> Self {
        Self::new(width, height, "image/svg+xml", svg.into().into_bytes())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The image payload as text, when it is textual (SVG).
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_get_distinct_ids() {
        let a = Document::new("<p>a</p>");
        let b = Document::new("<p>a</p>");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.markup(), b.markup());
    }

    #[test]
    fn form_state_is_taken_once() {
        let mut doc = Document::new("<input name=q>").with_url("http://x/");
        doc.set_form_value("q", "hello");
        assert_eq!(doc.url(), Some("http://x/"));
        assert_eq!(doc.take_form_state().get("q").map(String::as_str), Some("hello"));
        assert!(doc.form_state().is_empty());
    }

    #[test]
    fn svg_image_is_textual() {
        let img = RenderedImage::svg(10, 20, "<svg/>");
        assert_eq!(img.content_type(), "image/svg+xml");
        assert_eq!(img.as_text(), Some("<svg/>"));
        assert!(!img.is_empty());
    }
}
