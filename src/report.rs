//! Error records, results, and the composition of both reporting channels.

use crate::{Error, RenderedImage, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed message reported to legacy callbacks on render and paint failures.
pub const RENDER_FAILURE_MESSAGE: &str = "Error rendering page";

/// Kind of resource an [`ErrorRecord`] refers to
///
/// Only `page` and `document` are produced by the rasterizer itself. Other
/// values come from the inliner and script executor and are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    Page,
    Document,
    Other(String),
}

impl ResourceType {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Page => "page",
            ResourceType::Document => "document",
            ResourceType::Other(s) => s,
        }
    }
}

impl From<String> for ResourceType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "page" => ResourceType::Page,
            "document" => ResourceType::Document,
            _ => ResourceType::Other(s),
        }
    }
}

impl From<&str> for ResourceType {
    fn from(s: &str) -> Self {
        ResourceType::from(s.to_string())
    }
}

impl From<ResourceType> for String {
    fn from(t: ResourceType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single problem encountered while rasterizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub resource_type: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub msg: String,
}

impl ErrorRecord {
    pub fn new(resource_type: impl Into<ResourceType>, msg: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            url: None,
            msg: msg.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Record handed to legacy callbacks when the page itself cannot be loaded.
    pub fn page_load_failure(url: &str, error: &Error) -> Self {
        ErrorRecord::new(ResourceType::Page, format!("{} {}", error.message(), url)).with_url(url)
    }

    /// Record handed to legacy callbacks when rendering or painting fails.
    pub fn render_failure() -> Self {
        ErrorRecord::new(ResourceType::Document, RENDER_FAILURE_MESSAGE)
    }
}

/// Successful outcome of a draw call
#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    pub image: RenderedImage,
    /// Soft errors in stage order: script execution first, then inlining
    pub errors: Vec<ErrorRecord>,
}

/// Completion handler for callers that do not await the returned future.
pub type LegacyCallback = Box<dyn FnOnce(Option<&RenderedImage>, &[ErrorRecord]) + Send + 'static>;

/// A failure that aborted the pipeline, tagged with the stage it came from.
#[derive(Debug)]
pub(crate) enum HardFailure {
    Load { url: String, error: Error },
    Render(Error),
    Paint(Error),
}

impl HardFailure {
    fn legacy_record(&self) -> ErrorRecord {
        match self {
            HardFailure::Load { url, error } => ErrorRecord::page_load_failure(url, error),
            HardFailure::Render(_) | HardFailure::Paint(_) => ErrorRecord::render_failure(),
        }
    }

    fn into_error(self) -> Error {
        match self {
            HardFailure::Load { error, .. } => error,
            HardFailure::Render(error) | HardFailure::Paint(error) => error,
        }
    }
}

/// Accumulates soft errors in the order the stages report them.
#[derive(Debug, Default)]
pub(crate) struct SoftErrors(Vec<ErrorRecord>);

impl SoftErrors {
    pub(crate) fn extend(&mut self, stage: &str, errors: Vec<ErrorRecord>) {
        if !errors.is_empty() {
            log::warn!("{} reported {} error(s)", stage, errors.len());
        }
        self.0.extend(errors);
    }

    pub(crate) fn into_result(self, image: RenderedImage) -> RenderResult {
        RenderResult { image, errors: self.0 }
    }
}

/// Settle one pipeline outcome on both channels.
///
/// The callback, when present, observes the same outcome the returned value
/// carries: the image and soft errors on success, `None` plus a single
/// normalized record on failure.
pub(crate) fn settle(
    outcome: std::result::Result<RenderResult, HardFailure>,
    callback: Option<LegacyCallback>,
) -> Result<RenderResult> {
    match outcome {
        Ok(result) => {
            if let Some(cb) = callback {
                cb(Some(&result.image), &result.errors);
            }
            Ok(result)
        }
        Err(failure) => {
            log::warn!("pipeline failed: {:?}", failure);
            if let Some(cb) = callback {
                let record = failure.legacy_record();
                cb(None, std::slice::from_ref(&record));
            }
            Err(failure.into_error())
        }
    }
}
