//! Default reference inliner: images, stylesheets, scripts and CSS `url()`s.

use super::loader::{Fetched, Fetcher};
use super::dom;
use crate::{Document, ErrorRecord, InlineOptions, Inliner, LoadOptions};
use base64::Engine as _;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use kuchiki::{ElementData, NodeDataRef, NodeRef};
use log::debug;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Image,
    Stylesheet,
    Script,
    BackgroundImage,
    FontFace,
}

impl Kind {
    fn resource_type(self) -> &'static str {
        match self {
            Kind::Image => "image",
            Kind::Stylesheet => "stylesheet",
            Kind::Script => "script",
            Kind::BackgroundImage => "backgroundImage",
            Kind::FontFace => "fontFace",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = match self {
            Kind::Image | Kind::BackgroundImage => "image",
            Kind::Stylesheet => "stylesheet",
            Kind::Script => "script",
            Kind::FontFace => "font",
        };
        f.write_str(noun)
    }
}

/// An external reference, resolved against the document base
#[derive(Debug, Clone, PartialEq)]
struct Reference {
    kind: Kind,
    url: String,
}

/// Inlines external references as `data:` URIs and inline elements
///
/// `<img src>` becomes a `data:` URI, `<link rel=stylesheet>` becomes a
/// `<style>` block, and `<script src>` gets its source inlined when
/// `inline_scripts` is set. `url()` references inside style blocks and
/// inlined stylesheets are embedded too. Every reference that cannot be
/// fetched is left in place and reported once.
#[derive(Clone)]
pub struct DataUriInliner {
    fetcher: Arc<Fetcher>,
}

impl DataUriInliner {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }

    async fn fetch(
        &self,
        kind: Kind,
        url: &str,
        options: &LoadOptions,
    ) -> Result<Fetched, ErrorRecord> {
        self.fetcher.fetch(url, options).await.map_err(|e| {
            debug!("inlining {} failed: {}", url, e);
            let msg = format!("Unable to load {} {}", kind, url);
            ErrorRecord::new(kind.resource_type(), msg).with_url(url)
        })
    }

    /// Embed every `url()` of `css`, resolved against `base`.
    async fn inline_css(
        &self,
        css: &str,
        base: Option<&str>,
        options: &LoadOptions,
    ) -> (String, Vec<ErrorRecord>) {
        let refs = css_urls(css);
        if refs.is_empty() {
            return (css.to_string(), Vec::new());
        }

        let fetches = refs.iter().map(|(_, raw, kind)| {
            let url = resolve(base, raw);
            async move {
                let fetched = self.fetch(*kind, &url, options).await;
                fetched.map(|f| data_uri(&f, &url))
            }
        });
        let results = join_all(fetches).await;

        let mut out = String::with_capacity(css.len());
        let mut last = 0;
        let mut errors = Vec::new();
        for ((range, _, _), result) in refs.into_iter().zip(results) {
            match result {
                Ok(uri) => {
                    out.push_str(&css[last..range.start]);
                    out.push_str(&format!("url(\"{}\")", uri));
                    last = range.end;
                }
                Err(record) => errors.push(record),
            }
        }
        out.push_str(&css[last..]);
        (out, errors)
    }
}

impl Inliner for DataUriInliner {
    fn inline_references<'a>(
        &'a self,
        document: &'a mut Document,
        options: &'a InlineOptions,
    ) -> BoxFuture<'a, Vec<ErrorRecord>> {
        async move {
            let base = options
                .base_url()
                .map(str::to_string)
                .or_else(|| document.url().map(str::to_string));
            let load_options = options.options.load_options();
            let (refs, styles) =
                collect_references(document.markup(), base.as_deref(), options.inline_scripts);
            debug!("inlining {} reference(s)", refs.len());

            let fetches = refs.iter().map(|r| self.fetch(r.kind, &r.url, &load_options));
            let results = join_all(fetches).await;

            let mut errors = Vec::new();
            let mut replacements = Vec::with_capacity(refs.len());
            for (reference, result) in refs.iter().zip(results) {
                let fetched = match result {
                    Ok(f) => f,
                    Err(record) => {
                        errors.push(record);
                        replacements.push(None);
                        continue;
                    }
                };
                let text = match reference.kind {
                    Kind::Image => data_uri(&fetched, &reference.url),
                    Kind::Stylesheet => {
                        let (css, nested) = self
                            .inline_css(&fetched.text(), Some(&fetched.url), &load_options)
                            .await;
                        errors.extend(nested);
                        dom::escape_raw_text(&css, "style")
                    }
                    _ => dom::escape_raw_text(&fetched.text(), "script"),
                };
                replacements.push(Some(text));
            }

            let mut restyled = Vec::with_capacity(styles.len());
            for css in &styles {
                let (inlined, nested) = self.inline_css(css, base.as_deref(), &load_options).await;
                errors.extend(nested);
                restyled.push((inlined != *css).then(|| dom::escape_raw_text(&inlined, "style")));
            }

            let changed = replacements.iter().chain(restyled.iter()).any(Option::is_some);
            if changed {
                let html = apply_replacements(
                    document.markup(),
                    options.inline_scripts,
                    &replacements,
                    &restyled,
                );
                document.set_markup(html);
            }
            errors
        }
        .boxed()
    }
}

/// Elements holding an external reference, in a fixed order: images,
/// stylesheets, then scripts when requested.
fn reference_targets(
    tree: &NodeRef,
    inline_scripts: bool,
) -> Vec<(Kind, NodeDataRef<ElementData>, String)> {
    let mut found = Vec::new();
    let mut scan = |selector: &str, attr: &str, kind: Kind| {
        let Ok(elements) = tree.select(selector) else {
            return;
        };
        for el in elements {
            let raw = el.attributes.borrow().get(attr).map(str::to_string);
            let Some(raw) = raw.filter(|r| is_external(r)) else {
                continue;
            };
            if kind == Kind::Stylesheet && !is_stylesheet(&el) {
                continue;
            }
            found.push((kind, el, raw));
        }
    };
    scan("img[src]", "src", Kind::Image);
    scan("link[rel][href]", "href", Kind::Stylesheet);
    if inline_scripts {
        scan("script[src]", "src", Kind::Script);
    }
    found
}

fn is_stylesheet(link: &NodeDataRef<ElementData>) -> bool {
    let attrs = link.attributes.borrow();
    attrs
        .get("rel")
        .map(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")))
        .unwrap_or(false)
}

fn style_blocks(tree: &NodeRef) -> Vec<NodeDataRef<ElementData>> {
    match tree.select("style") {
        Ok(found) => found.collect(),
        Err(()) => Vec::new(),
    }
}

/// The references of `html` and the text of its style blocks.
fn collect_references(
    html: &str,
    base: Option<&str>,
    inline_scripts: bool,
) -> (Vec<Reference>, Vec<String>) {
    let tree = dom::parse(html);
    let refs = reference_targets(&tree, inline_scripts)
        .into_iter()
        .map(|(kind, _, raw)| Reference { kind, url: resolve(base, &raw) })
        .collect();
    let styles = style_blocks(&tree)
        .iter()
        .map(|style| style.as_node().text_contents())
        .collect();
    (refs, styles)
}

/// Write fetched content back into the elements [`collect_references`] found.
fn apply_replacements(
    html: &str,
    inline_scripts: bool,
    replacements: &[Option<String>],
    styles: &[Option<String>],
) -> String {
    let tree = dom::parse(html);
    let targets = reference_targets(&tree, inline_scripts);
    let blocks = style_blocks(&tree);

    for ((kind, el, _), text) in targets.into_iter().zip(replacements) {
        let Some(text) = text else {
            continue;
        };
        match kind {
            Kind::Image => {
                el.attributes.borrow_mut().insert("src", text.clone());
            }
            Kind::Stylesheet => {
                let style = dom::new_element("style");
                if let (Some(media), Some(style_el)) =
                    (el.attributes.borrow().get("media"), style.as_element())
                {
                    style_el.attributes.borrow_mut().insert("media", media.to_string());
                }
                dom::set_text(&style, text);
                el.as_node().insert_before(style);
                el.as_node().detach();
            }
            _ => {
                el.attributes.borrow_mut().remove("src");
                dom::set_text(el.as_node(), text);
            }
        }
    }

    for (block, css) in blocks.into_iter().zip(styles) {
        if let Some(css) = css {
            dom::set_text(block.as_node(), css);
        }
    }
    dom::to_html(&tree)
}

fn is_external(reference: &str) -> bool {
    let r = reference.trim();
    !r.is_empty() && !r.starts_with("data:") && !r.starts_with('#') && !r.starts_with("javascript:")
}

/// Every external `url(...)` of a stylesheet: (range of the whole token, raw url, kind)
fn css_urls(css: &str) -> Vec<(std::ops::Range<usize>, String, Kind)> {
    let lower = css.to_ascii_lowercase();
    let mut out = Vec::new();
    let mut i = 0;
    while let Some(off) = lower[i..].find("url(") {
        let start = i + off;
        let open = start + 4;
        let close = match css[open..].find(')') {
            Some(c) => open + c,
            None => break,
        };
        let raw = css[open..close].trim().trim_matches(|c| c == '"' || c == '\'').trim();
        if is_external(raw) {
            let rule_start = css[..start].rfind('}').map(|p| p + 1).unwrap_or(0);
            let kind = if lower[rule_start..start].contains("@font-face") {
                Kind::FontFace
            } else {
                Kind::BackgroundImage
            };
            out.push((start..close + 1, raw.to_string(), kind));
        }
        i = close + 1;
    }
    out
}

/// Resolve `reference` against a base URL or file path.
pub(crate) fn resolve(base: Option<&str>, reference: &str) -> String {
    let reference = reference.trim();
    if Url::parse(reference).is_ok() {
        return reference.to_string();
    }
    match base {
        Some(base) => match Url::parse(base) {
            Ok(base_url) => base_url
                .join(reference)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| reference.to_string()),
            Err(_) => {
                let dir = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
                dir.join(reference).to_string_lossy().into_owned()
            }
        },
        None => reference.to_string(),
    }
}

fn data_uri(fetched: &Fetched, url: &str) -> String {
    let mime = fetched
        .content_type
        .clone()
        .unwrap_or_else(|| guess_mime(url).to_string());
    let encoded = base64::engine::general_purpose::STANDARD.encode(&fetched.body);
    format!("data:{};base64,{}", mime, encoded)
}

fn guess_mime(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "css" => "text/css",
        "js" => "text/javascript",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::LoaderConfig;
    use crate::{RenderOptions, ResourceType};
    use std::path::PathBuf;

    fn fixture_dir(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("rasterhtml-inliner-{}-{}", std::process::id(), name));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn inliner() -> DataUriInliner {
        DataUriInliner::new(Arc::new(Fetcher::new(&LoaderConfig::default()).unwrap()))
    }

    #[test]
    fn resolves_against_urls_and_paths() {
        assert_eq!(
            resolve(Some("http://a.com/dir/page.html"), "img.png"),
            "http://a.com/dir/img.png"
        );
        assert_eq!(resolve(Some("fixtures/page.html"), "img.png"), "fixtures/img.png");
        assert_eq!(resolve(None, "http://b.com/x.png"), "http://b.com/x.png");
        assert_eq!(resolve(None, "x.png"), "x.png");
    }

    #[test]
    fn finds_css_urls_with_kinds() {
        let css = concat!(
            "@font-face { src: url('f.woff'); } ",
            "div { background: URL(bg.png) } p { background: url(data:x) }"
        );
        let urls = css_urls(css);
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].1, "f.woff");
        assert_eq!(urls[0].2, Kind::FontFace);
        assert_eq!(urls[1].1, "bg.png");
        assert_eq!(urls[1].2, Kind::BackgroundImage);
        assert_eq!(&css[urls[1].0.clone()], "URL(bg.png)");
    }

    #[test]
    fn scripts_only_collected_when_requested() {
        let html = concat!(
            r#"<script src="a.js"></script><img src="data:image/png;base64,AA">"#,
            r#"<img src="b.png"><link rel="icon" href="i.ico"><style>p {}</style>"#
        );
        let (refs, styles) = collect_references(html, None, false);
        assert_eq!(refs, vec![Reference { kind: Kind::Image, url: "b.png".into() }]);
        assert_eq!(styles, vec!["p {}".to_string()]);
        let (refs, _) = collect_references(html, None, true);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].kind, Kind::Script);
    }

    #[tokio::test]
    async fn inlines_local_resources_and_reports_failures() {
        let dir = fixture_dir("local");
        std::fs::write(dir.join("img.png"), [1u8, 2, 3]).unwrap();
        std::fs::write(dir.join("style.css"), "body { background: url(img.png) }").unwrap();
        std::fs::write(dir.join("app.js"), "var x = 1;").unwrap();
        let page = dir.join("page.html");

        let mut doc = Document::new(concat!(
            r#"<html><head><link rel="stylesheet" href="style.css">"#,
            r#"<script src="app.js"></script></head>"#,
            r#"<body><img src="img.png"><img src="missing.png"></body></html>"#
        ))
        .with_url(page.to_string_lossy());
        let opts = RenderOptions::default().with_execute_js(None).inline_options();
        let errors = inliner().inline_references(&mut doc, &opts).await;

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].resource_type, ResourceType::from("image"));
        let missing = dir.join("missing.png").to_string_lossy().into_owned();
        assert_eq!(errors[0].url.as_deref(), Some(missing.as_str()));
        assert_eq!(errors[0].msg, format!("Unable to load image {}", missing));

        let html = doc.markup();
        assert!(html.contains(r#"<img src="data:image/png;base64,AQID">"#));
        assert!(html
            .contains(r#"<style>body { background: url("data:image/png;base64,AQID") }</style>"#));
        assert!(html.contains("<script>var x = 1;</script>"));
        assert!(html.contains(r#"<img src="missing.png">"#));
        assert!(!html.contains("<link"));
    }

    #[tokio::test]
    async fn inlined_content_replaces_element_bodies() {
        let dir = fixture_dir("bodies");
        std::fs::write(dir.join("app.js"), "var s = '</script>';").unwrap();
        std::fs::write(dir.join("print.css"), "p::after { content: \"</style>\" }").unwrap();
        let mut doc = Document::new(concat!(
            r#"<link rel="stylesheet" media="print" href="print.css">"#,
            r#"<script src="app.js">fallback()</script><p>after</p>"#
        ))
        .with_url(dir.join("p.html").to_string_lossy());
        let opts = RenderOptions::default().with_execute_js(None).inline_options();
        let errors = inliner().inline_references(&mut doc, &opts).await;
        assert!(errors.is_empty());

        let tree = dom::parse(doc.markup());
        let script = tree.select_first("script").unwrap();
        assert_eq!(script.as_node().text_contents(), "var s = '<\\/script>';");
        assert!(script.attributes.borrow().get("src").is_none());
        let styles: Vec<_> = tree.select("style").unwrap().collect();
        assert_eq!(styles.len(), 1);
        assert_eq!(styles[0].attributes.borrow().get("media"), Some("print"));
        assert_eq!(styles[0].as_node().text_contents(), "p::after { content: \"<\\/style>\" }");
        assert_eq!(tree.select_first("p").unwrap().as_node().text_contents(), "after");
    }

    #[tokio::test]
    async fn scripts_stay_external_without_the_flag() {
        let dir = fixture_dir("noscript");
        std::fs::write(dir.join("app.js"), "var x = 1;").unwrap();
        let mut doc = Document::new(r#"<script src="app.js"></script>"#)
            .with_url(dir.join("p.html").to_string_lossy());
        let errors = inliner()
            .inline_references(&mut doc, &RenderOptions::default().inline_options())
            .await;
        assert!(errors.is_empty());
        assert_eq!(doc.markup(), r#"<script src="app.js"></script>"#);
    }
}
