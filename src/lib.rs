//! rasterhtml
//!
//! Turns an HTML source (a parsed document, a markup string or a URL) into a
//! self-contained image, optionally painted onto a caller-supplied canvas.
//!
//! # Features
//!
//! - **Pipeline**: optional script execution, reference inlining, image
//!   rendering and canvas painting, run strictly in sequence
//! - **Pluggable collaborators**: parsing, loading, scripting, inlining,
//!   rendering and painting are traits injected through [`RasterizerBuilder`]
//! - **Two reporting channels**: the returned future and an optional legacy
//!   callback, both fed from the same outcome
//! - **Default backends** (`backends` feature, on by default): scraper,
//!   reqwest and Boa based implementations of every collaborator
//!
//! # Example
//!
//! ```no_run
//! use rasterhtml::{DrawCall, Rasterizer, RenderOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let rasterizer = Rasterizer::with_default_backends()?;
//! let options = RenderOptions::default().with_size(800, 600);
//! let result = rasterizer
//!     .draw_html("<h1>Hello</h1>", DrawCall::new().options(options))
//!     .await?;
//! println!("{} bytes, {} errors", result.image.data().len(), result.errors.len());
//! # Ok(())
//! # }
//! ```

pub mod canvas;
pub mod collaborators;
pub mod document;
pub mod error;
pub mod options;
pub mod params;
pub mod pipeline;
pub mod report;

// Default collaborator implementations (scraper / reqwest / Boa)
#[cfg(feature = "backends")]
pub mod backends;

pub use canvas::{Canvas, PaintCommand};
pub use collaborators::{
    FormStatePersister, Inliner, Loader, Painter, Parser, Renderer, ScriptExecutor, ScriptOutcome,
};
pub use document::{Document, DocumentId, RenderedImage};
pub use error::{Error, Result};
pub use options::{CacheBucket, CacheMode, ImageOptions, InlineOptions, LoadOptions, RenderOptions};
pub use params::{DrawArg, DrawCall, NormalizedCall};
pub use pipeline::{Rasterizer, RasterizerBuilder};
pub use report::{ErrorRecord, LegacyCallback, RenderResult, ResourceType, RENDER_FAILURE_MESSAGE};
