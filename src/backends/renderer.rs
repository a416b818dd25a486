//! SVG `foreignObject` renderer.

use super::dom;
use super::parser::is_valid_selector;
use crate::{Canvas, Document, Error, ImageOptions, RenderedImage, Renderer, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use kuchiki::NodeRef;

pub const DEFAULT_WIDTH: u32 = 300;
pub const DEFAULT_HEIGHT: u32 = 200;

/// Serializes a document into an SVG image embedding it as XHTML
///
/// The image size comes from the options, then from the canvas, then falls
/// back to 300x200. `zoom` scales the content inside a fixed outer size.
/// `hover`/`active` selectors force the matching elements into that state by
/// rewriting the corresponding pseudo-classes in the document's style blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRenderer;

impl SvgRenderer {
    pub fn new() -> Self {
        SvgRenderer
    }

    /// Produce the image synchronously.
    pub fn render(
        &self,
        document: &Document,
        canvas: Option<&Canvas>,
        options: &ImageOptions,
    ) -> Result<RenderedImage> {
        let width = options.width.or(canvas.map(Canvas::width)).unwrap_or(DEFAULT_WIDTH);
        let height = options.height.or(canvas.map(Canvas::height)).unwrap_or(DEFAULT_HEIGHT);
        let zoom = options.zoom.unwrap_or(1.0);
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(Error::RenderError(format!("Invalid zoom factor {}", zoom)));
        }

        let tree = dom::parse(document.markup());
        for (pseudo, selector) in [("hover", &options.hover), ("active", &options.active)] {
            if let Some(selector) = selector {
                if !is_valid_selector(selector) {
                    return Err(Error::RenderError(format!(
                        "Invalid {} selector {}",
                        pseudo, selector
                    )));
                }
                force_pseudo_class(&tree, pseudo, selector);
            }
        }

        let mut body = String::new();
        dom::write_xhtml(&tree, &mut body);

        let svg = format!(
            concat!(
                "<svg xmlns=\"http://www.w3.org/2000/svg\" ",
                "xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{w}\" height=\"{h}\">",
                "<foreignObject x=\"0\" y=\"0\" width=\"{iw}\" height=\"{ih}\" ",
                "transform=\"scale({z})\" externalResourcesRequired=\"true\">",
                "{body}</foreignObject></svg>"
            ),
            w = width,
            h = height,
            iw = f64::from(width) / zoom,
            ih = f64::from(height) / zoom,
            z = zoom,
            body = body,
        );
        Ok(RenderedImage::svg(width, height, svg))
    }
}

impl Renderer for SvgRenderer {
    fn render_document_image<'a>(
        &'a self,
        document: &'a Document,
        canvas: Option<&'a Canvas>,
        options: &'a ImageOptions,
    ) -> BoxFuture<'a, Result<RenderedImage>> {
        async move { self.render(document, canvas, options) }.boxed()
    }
}

/// Replace `:pseudo` in every style block with `:is(selector)`.
fn force_pseudo_class(tree: &NodeRef, pseudo: &str, selector: &str) {
    let needle = format!(":{}", pseudo);
    let replacement = format!(":is({})", selector);
    let styles: Vec<_> = match tree.select("style") {
        Ok(found) => found.collect(),
        Err(()) => return,
    };
    for style in styles {
        let css = style.as_node().text_contents();
        if css.contains(&needle) {
            dom::set_text(style.as_node(), &css.replace(&needle, &replacement));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svg(markup: &str, options: &ImageOptions) -> String {
        let img = SvgRenderer::new().render(&Document::new(markup), None, options).unwrap();
        img.as_text().unwrap().to_string()
    }

    #[test]
    fn size_precedence() {
        let doc = Document::new("<html><body></body></html>");
        let r = SvgRenderer::new();
        let img = r.render(&doc, None, &ImageOptions::default()).unwrap();
        assert_eq!((img.width(), img.height()), (DEFAULT_WIDTH, DEFAULT_HEIGHT));

        let canvas = Canvas::new(123, 456);
        let img = r.render(&doc, Some(&canvas), &ImageOptions::default()).unwrap();
        assert_eq!((img.width(), img.height()), (123, 456));

        let opts = ImageOptions { width: Some(10), ..Default::default() };
        let img = r.render(&doc, Some(&canvas), &opts).unwrap();
        assert_eq!((img.width(), img.height()), (10, 456));
    }

    #[test]
    fn zoom_scales_the_content() {
        let opts = ImageOptions {
            width: Some(200),
            height: Some(100),
            zoom: Some(2.0),
            ..Default::default()
        };
        let out = svg("<html><body></body></html>", &opts);
        assert!(out.contains("width=\"100\" height=\"50\" transform=\"scale(2)\""));
        assert!(out.contains("<html xmlns=\"http://www.w3.org/1999/xhtml\">"));
    }

    #[test]
    fn invalid_inputs_fail_rendering() {
        let doc = Document::new("<html></html>");
        let bad_zoom = ImageOptions { zoom: Some(0.0), ..Default::default() };
        assert!(matches!(
            SvgRenderer::new().render(&doc, None, &bad_zoom),
            Err(Error::RenderError(_))
        ));
        let bad_hover = ImageOptions { hover: Some("a[[[".into()), ..Default::default() };
        assert!(matches!(
            SvgRenderer::new().render(&doc, None, &bad_hover),
            Err(Error::RenderError(_))
        ));
    }

    #[test]
    fn forces_hover_and_closes_void_elements() {
        let opts = ImageOptions { hover: Some(".x".into()), ..Default::default() };
        let out = svg(
            concat!(
                "<html><head><style>a:hover { color: red }</style></head>",
                "<body><a class=\"x\">l</a><br><img src=\"data:,\"></body></html>"
            ),
            &opts,
        );
        assert!(out.contains("a:is(.x) { color: red }"));
        assert!(out.contains("<br/>"));
        assert!(out.contains("<img src=\"data:,\"/>"));
    }

    #[test]
    fn output_is_well_formed_xml() {
        let pages = [
            "<p>x</p><script>if (a && b < c) {}</script>",
            "<style>p > a::after { content: \"&\" }</style><p title=\"&lt;&amp;&quot;\">t</p>",
            "<p>x</p><brü",
            concat!(
                "<div data-x='1' class=\"a\n b\">\u{1}ctl &nbsp; ",
                "<svg><use xlink:href=\"#i\"/></svg></div>"
            ),
            "<!-- comment --><!DOCTYPE html><title>a &amp; b</title><textarea><b></textarea>",
        ];
        for page in pages {
            let out = svg(page, &ImageOptions::default());
            let xml = roxmltree::Document::parse(&out)
                .unwrap_or_else(|e| panic!("invalid XML for {:?}: {}\n{}", page, e, out));
            assert_eq!(xml.root_element().tag_name().name(), "svg");
        }

        let out = svg("<script>if (a && b < c) {}</script>", &ImageOptions::default());
        let xml = roxmltree::Document::parse(&out).unwrap();
        let script = xml
            .descendants()
            .find(|n| n.has_tag_name(("http://www.w3.org/1999/xhtml", "script")))
            .unwrap();
        assert_eq!(script.text(), Some("if (a && b < c) {}"));
    }
}
