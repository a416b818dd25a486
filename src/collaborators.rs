//! Interfaces of the services the pipeline coordinates.
//!
//! Every trait is object safe so a [`Rasterizer`](crate::Rasterizer) can hold
//! them behind `Arc<dyn _>`; asynchronous methods return boxed futures.

use crate::{
    Canvas, Document, ErrorRecord, ImageOptions, InlineOptions, LoadOptions, RenderedImage, Result,
};
use futures::future::BoxFuture;

/// Turns markup into a document.
pub trait Parser: Send + Sync {
    fn parse_html(&self, html: &str) -> Document;
}

/// Fetches and parses a document from a URL.
pub trait Loader: Send + Sync {
    /// Fails with the underlying error on network or parse failure.
    fn load_document<'a>(
        &'a self,
        url: &'a str,
        options: &'a LoadOptions,
    ) -> BoxFuture<'a, Result<Document>>;
}

/// Document and soft errors left behind by running page scripts.
#[derive(Debug)]
pub struct ScriptOutcome {
    pub document: Document,
    pub errors: Vec<ErrorRecord>,
}

/// Runs page scripts in a sandbox.
pub trait ScriptExecutor: Send + Sync {
    /// `timeout_ms` of 0 means no timeout. Script failures are reported as
    /// records in the outcome, never as an error.
    fn execute_javascript<'a>(
        &'a self,
        document: Document,
        base_url: Option<&'a str>,
        timeout_ms: u64,
        options: &'a ImageOptions,
    ) -> BoxFuture<'a, ScriptOutcome>;
}

/// Replaces external references with inline data.
pub trait Inliner: Send + Sync {
    /// Never fails: every reference that cannot be inlined becomes one record.
    fn inline_references<'a>(
        &'a self,
        document: &'a mut Document,
        options: &'a InlineOptions,
    ) -> BoxFuture<'a, Vec<ErrorRecord>>;
}

/// Serializes a document into an image.
pub trait Renderer: Send + Sync {
    fn render_document_image<'a>(
        &'a self,
        document: &'a Document,
        canvas: Option<&'a Canvas>,
        options: &'a ImageOptions,
    ) -> BoxFuture<'a, Result<RenderedImage>>;
}

/// Draws an image onto a canvas.
pub trait Painter: Send + Sync {
    fn paint(&self, image: &RenderedImage, canvas: &Canvas) -> Result<()>;
}

/// Copies live form-control state into the document markup.
pub trait FormStatePersister: Send + Sync {
    fn persist(&self, document: &mut Document);
}
