use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use rasterhtml::backends::LoaderConfig;
use rasterhtml::{CacheMode, DrawCall, Rasterizer, RenderOptions};
use std::io::Write;
use std::path::PathBuf;

/// Render an HTML page into a self-contained SVG image
#[derive(Parser, Debug)]
#[command(name = "rasterhtml", version, about)]
#[command(group(ArgGroup::new("input").required(true).args(["url", "file", "html"])))]
struct Cli {
    /// URL (or path) of the page to render
    #[arg(long)]
    url: Option<String>,
    /// HTML file to render
    #[arg(long)]
    file: Option<PathBuf>,
    /// Inline HTML markup to render
    #[arg(long)]
    html: Option<String>,

    /// JSON file with render options (camelCase keys)
    #[arg(long)]
    options: Option<PathBuf>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    zoom: Option<f64>,
    /// Selector of the element to render hovered
    #[arg(long)]
    hover: Option<String>,
    /// Selector of the element to render active
    #[arg(long)]
    active: Option<String>,
    #[arg(long)]
    base_url: Option<String>,
    /// Run the page's inline scripts before rendering
    #[arg(long)]
    execute_js: bool,
    /// Script budget in milliseconds (0 = unbounded)
    #[arg(long)]
    execute_js_timeout: Option<u64>,
    /// Bypass caches when loading
    #[arg(long)]
    no_cache: bool,

    /// User agent for HTTP requests
    #[arg(long)]
    user_agent: Option<String>,
    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 30000)]
    timeout_ms: u64,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn render_options(&self) -> Result<RenderOptions> {
        let mut opts = match &self.options {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading options from {}", path.display()))?;
                RenderOptions::from_json(&json)?
            }
            None => RenderOptions::default(),
        };
        if self.width.is_some() {
            opts.width = self.width;
        }
        if self.height.is_some() {
            opts.height = self.height;
        }
        if self.zoom.is_some() {
            opts.zoom = self.zoom;
        }
        if self.hover.is_some() {
            opts.hover = self.hover.clone();
        }
        if self.active.is_some() {
            opts.active = self.active.clone();
        }
        if self.base_url.is_some() {
            opts.base_url = self.base_url.clone();
        }
        if self.execute_js {
            opts.execute_js = true;
        }
        if self.execute_js_timeout.is_some() {
            opts.execute_js_timeout = self.execute_js_timeout;
        }
        if self.no_cache {
            opts.cache = Some(CacheMode::None);
        }
        Ok(opts)
    }

    fn loader_config(&self) -> LoaderConfig {
        let mut cfg = LoaderConfig {
            timeout_ms: self.timeout_ms,
            ..Default::default()
        };
        if let Some(ua) = &self.user_agent {
            cfg.user_agent = ua.clone();
        }
        cfg
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let rasterizer = Rasterizer::with_loader_config(&cli.loader_config())?;
    let call = DrawCall::new().options(cli.render_options()?);

    let result = if let Some(url) = &cli.url {
        rasterizer.draw_url(url, call).await
    } else if let Some(path) = &cli.file {
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut opts = cli.render_options()?;
        if opts.base_url.is_none() {
            opts.base_url = Some(path.to_string_lossy().into_owned());
        }
        rasterizer.draw_html(&html, DrawCall::new().options(opts)).await
    } else if let Some(html) = &cli.html {
        rasterizer.draw_html(html, call).await
    } else {
        bail!("one of --url, --file or --html is required");
    };

    let result = result.context("rendering failed")?;
    if !result.errors.is_empty() {
        eprintln!("{}", serde_json::to_string_pretty(&result.errors)?);
    }

    match &cli.out {
        Some(path) => std::fs::write(path, result.image.data())
            .with_context(|| format!("writing {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(result.image.data())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
