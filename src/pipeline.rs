//! The rasterization pipeline and its entry points.

use crate::collaborators::{
    FormStatePersister, Inliner, Loader, Painter, Parser, Renderer, ScriptExecutor,
};
use crate::params::{DrawCall, NormalizedCall};
use crate::report::{self, HardFailure, SoftErrors};
use crate::{Canvas, Document, Error, RenderOptions, RenderResult, Result};
use log::debug;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    ExecutingJs,
    Inlining,
    Rendering,
    Painting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ExecutingJs => "executing-js",
            Stage::Inlining => "inlining",
            Stage::Rendering => "rendering",
            Stage::Painting => "painting",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Renders documents, markup and URLs into images
///
/// A `Rasterizer` owns its collaborators and holds no per-call state, so one
/// instance can serve any number of concurrent draw calls.
///
/// # Example
///
/// ```no_run
/// use rasterhtml::{Canvas, DrawCall, Rasterizer, RenderOptions};
///
/// # async fn run() -> rasterhtml::Result<()> {
/// let rasterizer = Rasterizer::with_default_backends()?;
/// let canvas = Canvas::new(640, 480);
/// let result = rasterizer
///     .draw_url("https://example.com", DrawCall::new().canvas(canvas.clone()))
///     .await?;
/// println!("{} soft errors", result.errors.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Rasterizer {
    parser: Arc<dyn Parser>,
    loader: Arc<dyn Loader>,
    script_executor: Arc<dyn ScriptExecutor>,
    inliner: Arc<dyn Inliner>,
    renderer: Arc<dyn Renderer>,
    painter: Arc<dyn Painter>,
    form_state: Arc<dyn FormStatePersister>,
}

impl Rasterizer {
    pub fn builder() -> RasterizerBuilder {
        RasterizerBuilder::default()
    }

    /// Render an already parsed document.
    pub async fn draw_document(&self, document: Document, call: DrawCall) -> Result<RenderResult> {
        let NormalizedCall { canvas, options, callback } = call.normalize();
        let outcome = self.run(document, canvas.as_ref(), &options).await;
        report::settle(outcome, callback)
    }

    /// Parse `html` and render it exactly as [`draw_document`](Self::draw_document) would.
    pub async fn draw_html(&self, html: &str, call: DrawCall) -> Result<RenderResult> {
        let document = self.parser.parse_html(html);
        self.draw_document(document, call).await
    }

    /// Load `url` and render the resulting document.
    ///
    /// A load failure is reported to the legacy callback as a single `page`
    /// record; the returned future carries the loader's error unchanged.
    pub async fn draw_url(&self, url: &str, call: DrawCall) -> Result<RenderResult> {
        let NormalizedCall { canvas, mut options, callback } = call.normalize();
        debug!("loading {} (cache: {:?})", url, options.cache);
        let outcome = match self.loader.load_document(url, &options.load_options()).await {
            Ok(document) => {
                if options.base_url.is_none() {
                    options.base_url = Some(url.to_string());
                }
                self.run(document, canvas.as_ref(), &options).await
            }
            Err(error) => Err(HardFailure::Load {
                url: url.to_string(),
                error,
            }),
        };
        report::settle(outcome, callback)
    }

    async fn run(
        &self,
        mut document: Document,
        canvas: Option<&Canvas>,
        options: &RenderOptions,
    ) -> std::result::Result<RenderResult, HardFailure> {
        let mut soft = SoftErrors::default();
        let image_options = options.image_options();

        if options.execute_js {
            debug!("{:?}: {}", document.id(), Stage::ExecutingJs);
            let outcome = self
                .script_executor
                .execute_javascript(
                    document,
                    options.base_url.as_deref(),
                    options.script_timeout_ms(),
                    &image_options,
                )
                .await;
            document = outcome.document;
            soft.extend("script execution", outcome.errors);
            self.form_state.persist(&mut document);
        }

        debug!("{:?}: {}", document.id(), Stage::Inlining);
        let inline_options = options.inline_options();
        let errors = self.inliner.inline_references(&mut document, &inline_options).await;
        soft.extend("inlining", errors);

        debug!("{:?}: {}", document.id(), Stage::Rendering);
        let image = self
            .renderer
            .render_document_image(&document, canvas, &image_options)
            .await
            .map_err(HardFailure::Render)?;

        if let Some(canvas) = canvas {
            debug!("{:?}: {}", document.id(), Stage::Painting);
            self.painter.paint(&image, canvas).map_err(HardFailure::Paint)?;
        }

        debug!("{:?}: {}", document.id(), Stage::Done);
        Ok(soft.into_result(image))
    }
}

/// Collects the collaborators of a [`Rasterizer`].
#[derive(Default)]
pub struct RasterizerBuilder {
    pub(crate) parser: Option<Arc<dyn Parser>>,
    pub(crate) loader: Option<Arc<dyn Loader>>,
    pub(crate) script_executor: Option<Arc<dyn ScriptExecutor>>,
    pub(crate) inliner: Option<Arc<dyn Inliner>>,
    pub(crate) renderer: Option<Arc<dyn Renderer>>,
    pub(crate) painter: Option<Arc<dyn Painter>>,
    pub(crate) form_state: Option<Arc<dyn FormStatePersister>>,
}

impl RasterizerBuilder {
    pub fn parser(mut self, parser: impl Parser + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn script_executor(mut self, executor: impl ScriptExecutor + 'static) -> Self {
        self.script_executor = Some(Arc::new(executor));
        self
    }

    pub fn inliner(mut self, inliner: impl Inliner + 'static) -> Self {
        self.inliner = Some(Arc::new(inliner));
        self
    }

    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn painter(mut self, painter: impl Painter + 'static) -> Self {
        self.painter = Some(Arc::new(painter));
        self
    }

    pub fn form_state_persister(mut self, persister: impl FormStatePersister + 'static) -> Self {
        self.form_state = Some(Arc::new(persister));
        self
    }

    /// Fails when a collaborator is missing.
    pub fn build(self) -> Result<Rasterizer> {
        fn required<T: ?Sized>(slot: Option<Arc<T>>, name: &str) -> Result<Arc<T>> {
            slot.ok_or_else(|| Error::ConfigError(format!("no {} configured", name)))
        }

        Ok(Rasterizer {
            parser: required(self.parser, "parser")?,
            loader: required(self.loader, "loader")?,
            script_executor: required(self.script_executor, "script executor")?,
            inliner: required(self.inliner, "inliner")?,
            renderer: required(self.renderer, "renderer")?,
            painter: required(self.painter, "painter")?,
            form_state: required(self.form_state, "form state persister")?,
        })
    }
}
