//! Optional draw arguments and their normalization.

use crate::{Canvas, Error, ErrorRecord, LegacyCallback, RenderOptions, RenderedImage, Result};
use std::fmt;

/// One optional argument to a draw call, classified by what it is.
pub enum DrawArg {
    Canvas(Canvas),
    Options(RenderOptions),
    Callback(LegacyCallback),
}

impl DrawArg {
    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce(Option<&RenderedImage>, &[ErrorRecord]) + Send + 'static,
    {
        DrawArg::Callback(Box::new(f))
    }

    fn role(&self) -> &'static str {
        match self {
            DrawArg::Canvas(_) => "canvas",
            DrawArg::Options(_) => "options",
            DrawArg::Callback(_) => "callback",
        }
    }
}

impl From<Canvas> for DrawArg {
    fn from(c: Canvas) -> Self {
        DrawArg::Canvas(c)
    }
}

impl From<RenderOptions> for DrawArg {
    fn from(o: RenderOptions) -> Self {
        DrawArg::Options(o)
    }
}

/// The optional part of a draw call: target canvas, options, legacy callback
///
/// # Examples
///
/// ```
/// use rasterhtml::{Canvas, DrawCall, RenderOptions};
///
/// let call = DrawCall::new()
///     .canvas(Canvas::new(300, 200))
///     .options(RenderOptions::default().with_size(300, 200))
///     .callback(|image, errors| println!("{:?} {:?}", image.map(|i| i.width()), errors));
/// assert!(call.has_canvas());
/// ```
#[derive(Default)]
pub struct DrawCall {
    canvas: Option<Canvas>,
    options: Option<RenderOptions>,
    callback: Option<LegacyCallback>,
}

impl DrawCall {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn canvas(mut self, canvas: Canvas) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn options(mut self, options: RenderOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn callback<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Option<&RenderedImage>, &[ErrorRecord]) + Send + 'static,
    {
        self.callback = Some(Box::new(f));
        self
    }

    pub fn has_canvas(&self) -> bool {
        self.canvas.is_some()
    }

    /// Build a call from loosely ordered arguments.
    ///
    /// Each argument is placed by its kind, not by its position, so options
    /// may come first when no canvas is given. Supplying two arguments of the
    /// same kind is rejected.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = DrawArg>,
    {
        let mut call = DrawCall::new();
        for arg in args {
            let role = arg.role();
            let duplicate = match arg {
                DrawArg::Canvas(c) => call.canvas.replace(c).is_some(),
                DrawArg::Options(o) => call.options.replace(o).is_some(),
                DrawArg::Callback(cb) => call.callback.replace(cb).is_some(),
            };
            if duplicate {
                return Err(Error::ConfigError(format!("{} given more than once", role)));
            }
        }
        Ok(call)
    }

    /// Resolve absent arguments to their defaults.
    pub fn normalize(self) -> NormalizedCall {
        NormalizedCall {
            canvas: self.canvas,
            options: self.options.unwrap_or_default(),
            callback: self.callback,
        }
    }
}

impl fmt::Debug for DrawCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawCall")
            .field("canvas", &self.canvas)
            .field("options", &self.options)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Canonical (canvas, options, callback) tuple.
pub struct NormalizedCall {
    pub canvas: Option<Canvas>,
    pub options: RenderOptions,
    pub callback: Option<LegacyCallback>,
}
