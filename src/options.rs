//! Call options and the per-stage views derived from them.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Cache policy requested from the loader and the inliner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Bypass every cache
    None,
    /// Reuse responses within the supplied cache bucket
    Repeated,
    /// Let the transport cache decide
    Persistent,
}

/// Opaque store handle shared between invocations.
///
/// The rasterizer never looks inside; loaders and inliners may downcast it
/// to the store type they understand.
#[derive(Clone)]
pub struct CacheBucket(Arc<dyn Any + Send + Sync>);

impl CacheBucket {
    pub fn new<T: Any + Send + Sync>(store: T) -> Self {
        CacheBucket(Arc::new(store))
    }

    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for CacheBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CacheBucket").field(&Arc::as_ptr(&self.0)).finish()
    }
}

impl PartialEq for CacheBucket {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Options accepted by every draw entry point
///
/// Keys the rasterizer does not know about are kept in `extra` and passed
/// through to the collaborators untouched.
///
/// # Examples
///
/// ```
/// let json = r#"{"width": 640, "executeJs": true}"#;
/// let opts = rasterhtml::RenderOptions::from_json(json).unwrap();
/// assert_eq!(opts.width, Some(640));
/// assert!(opts.execute_js);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    /// Base URL used to resolve relative references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheMode>,
    #[serde(skip)]
    pub cache_bucket: Option<CacheBucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Selector of the element rendered in `:hover` state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hover: Option<String>,
    /// Selector of the element rendered in `:active` state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    /// Run the page's scripts before inlining
    #[serde(default)]
    pub execute_js: bool,
    /// Script budget in milliseconds, 0 or absent means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_js_timeout: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RenderOptions {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_cache(mut self, cache: CacheMode) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cache_bucket(mut self, bucket: CacheBucket) -> Self {
        self.cache_bucket = Some(bucket);
        self
    }

    pub fn with_execute_js(mut self, timeout_ms: Option<u64>) -> Self {
        self.execute_js = true;
        self.execute_js_timeout = timeout_ms;
        self
    }

    /// Timeout handed to the script executor.
    pub fn script_timeout_ms(&self) -> u64 {
        self.execute_js_timeout.unwrap_or(0)
    }

    pub fn image_options(&self) -> ImageOptions {
        ImageOptions {
            width: self.width,
            height: self.height,
            hover: self.hover.clone(),
            active: self.active.clone(),
            zoom: self.zoom,
        }
    }

    pub fn inline_options(&self) -> InlineOptions {
        InlineOptions {
            inline_scripts: self.execute_js,
            options: self.clone(),
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            cache: self.cache,
            cache_bucket: self.cache_bucket.clone(),
        }
    }
}

/// The render-related subset of [`RenderOptions`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub hover: Option<String>,
    pub active: Option<String>,
    pub zoom: Option<f64>,
}

/// Options handed to the inliner: everything the caller passed plus the
/// script inlining flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineOptions {
    pub inline_scripts: bool,
    pub options: RenderOptions,
}

impl InlineOptions {
    pub fn base_url(&self) -> Option<&str> {
        self.options.base_url.as_deref()
    }
}

/// Options handed to the loader.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    pub cache: Option<CacheMode>,
    pub cache_bucket: Option<CacheBucket>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keys_and_passthrough() {
        let opts = RenderOptions::from_json(concat!(
            r#"{"baseUrl":"http://a/","cache":"none","zoom":2.0,"#,
            r#""executeJsTimeout":42,"custom":{"k":1}}"#,
        ))
        .unwrap();
        assert_eq!(opts.base_url.as_deref(), Some("http://a/"));
        assert_eq!(opts.cache, Some(CacheMode::None));
        assert_eq!(opts.zoom, Some(2.0));
        assert!(!opts.execute_js);
        assert_eq!(opts.script_timeout_ms(), 42);
        assert_eq!(opts.extra.get("custom"), Some(&serde_json::json!({"k": 1})));

        let back = serde_json::to_value(&opts).unwrap();
        assert_eq!(back["custom"], serde_json::json!({"k": 1}));
    }

    #[test]
    fn inline_flag_follows_execute_js() {
        assert!(!RenderOptions::default().inline_options().inline_scripts);
        let opts = RenderOptions::default().with_execute_js(None);
        assert!(opts.inline_options().inline_scripts);
        assert_eq!(opts.script_timeout_ms(), 0);
    }

    #[test]
    fn image_subset_keeps_only_render_keys() {
        let opts = RenderOptions {
            width: Some(123),
            hover: Some(".a".into()),
            base_url: Some("x".into()),
            ..Default::default()
        };
        assert_eq!(
            opts.image_options(),
            ImageOptions { width: Some(123), hover: Some(".a".into()), ..Default::default() }
        );
    }

    #[test]
    fn cache_bucket_is_identity_compared() {
        let a = CacheBucket::new(5u32);
        let b = CacheBucket::new(5u32);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<u32>(), Some(&5));
        assert!(a.downcast_ref::<String>().is_none());
    }
}
