//! Default collaborator implementations
//!
//! These back a [`Rasterizer`] with scraper for parsing, reqwest and the
//! filesystem for loading, Boa for scripts, kuchiki for editing markup, and
//! an SVG `foreignObject` serializer for images. Any of them can be swapped through
//! [`RasterizerBuilder`] while keeping the rest.

pub(crate) mod dom;
pub mod forms;
pub mod inliner;
pub mod loader;
pub mod painter;
pub mod parser;
pub mod renderer;
pub mod script;

pub use forms::InputValuePersister;
pub use inliner::DataUriInliner;
pub use loader::{Fetched, Fetcher, HttpLoader, LoaderConfig, ResponseCache, LOAD_FAILURE_MESSAGE};
pub use painter::DisplayListPainter;
pub use parser::HtmlParser;
pub use renderer::SvgRenderer;
pub use script::{BoaScriptExecutor, SCRIPT_RESOURCE_TYPE};

use crate::{Rasterizer, RasterizerBuilder, Result};
use std::sync::Arc;

impl RasterizerBuilder {
    /// Fill every collaborator not set yet with its default backend.
    pub fn with_default_backends(mut self, config: &LoaderConfig) -> Result<Self> {
        let fetcher = Arc::new(Fetcher::new(config)?);
        if self.parser.is_none() {
            self.parser = Some(Arc::new(HtmlParser::new()));
        }
        if self.loader.is_none() {
            self.loader = Some(Arc::new(HttpLoader::with_fetcher(fetcher.clone())));
        }
        if self.script_executor.is_none() {
            self.script_executor = Some(Arc::new(BoaScriptExecutor::new()));
        }
        if self.inliner.is_none() {
            self.inliner = Some(Arc::new(DataUriInliner::new(fetcher)));
        }
        if self.renderer.is_none() {
            self.renderer = Some(Arc::new(SvgRenderer::new()));
        }
        if self.painter.is_none() {
            self.painter = Some(Arc::new(DisplayListPainter::new()));
        }
        if self.form_state.is_none() {
            self.form_state = Some(Arc::new(InputValuePersister::new()));
        }
        Ok(self)
    }
}

impl Rasterizer {
    /// A rasterizer wired entirely with the default backends.
    pub fn with_default_backends() -> Result<Self> {
        Self::with_loader_config(&LoaderConfig::default())
    }

    pub fn with_loader_config(config: &LoaderConfig) -> Result<Self> {
        Rasterizer::builder().with_default_backends(config)?.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Canvas, Document, DrawCall, PaintCommand, RenderOptions};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn default_rasterizer_draws_html() {
        let r = Rasterizer::with_default_backends().unwrap();
        let canvas = Canvas::new(320, 240);
        let res = r
            .draw_html(
                "<title>t</title><p>Hello&nbsp;world<br></p>",
                DrawCall::new().canvas(canvas.clone()),
            )
            .await
            .unwrap();
        assert!(res.errors.is_empty());
        assert_eq!((res.image.width(), res.image.height()), (320, 240));
        let svg = res.image.as_text().unwrap();
        assert!(svg.contains("Hello\u{a0}world<br/>"));
        roxmltree::Document::parse(svg).unwrap();
        assert!(matches!(canvas.commands().as_slice(), [PaintCommand::DrawImage { .. }]));
    }

    #[tokio::test]
    async fn partial_override_keeps_other_defaults() {
        let r = Rasterizer::builder()
            .renderer(SvgRenderer::new())
            .with_default_backends(&LoaderConfig::default())
            .unwrap()
            .build()
            .unwrap();
        let opts = RenderOptions::default().with_size(10, 10);
        let res = r.draw_html("<p>x</p>", DrawCall::new().options(opts)).await.unwrap();
        assert_eq!(res.image.width(), 10);
    }

    #[tokio::test]
    async fn unterminated_trailing_tag_settles_both_channels() {
        let r = Rasterizer::with_default_backends().unwrap();
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let call = DrawCall::new().callback(move |image, errors| {
            assert!(image.is_some());
            assert!(errors.is_empty());
            flag.store(true, Ordering::SeqCst);
        });

        let doc = Document::new("<p>x</p><brü");
        let res = tokio::spawn(async move { r.draw_document(doc, call).await })
            .await
            .unwrap();

        let svg = res.unwrap().image;
        roxmltree::Document::parse(svg.as_text().unwrap()).unwrap();
        assert!(called.load(Ordering::SeqCst));
    }
}
