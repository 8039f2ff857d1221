//! HTML rendering for crawled pages
//!
//! This module turns fetched HTML into:
//! - Markdown-flavoured text (headings as `#` lines, blank lines between blocks)
//! - The page title
//! - Same-host links for frontier expansion

use crate::url::{host_of, resolve_link};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Tags that never contribute text
const ALWAYS_EXCLUDED: &[&str] = &["script", "style", "noscript", "svg", "template", "iframe"];

/// Layout tags dropped below the seed page to cut boilerplate
const DEEP_EXCLUDED: &[&str] = &["form", "header", "footer", "nav"];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "aside", "ul", "ol", "dl", "dt", "dd", "table",
    "thead", "tbody", "tr", "blockquote", "pre", "header", "footer", "nav", "form", "figure",
    "address", "hr",
];

/// Rendering options for one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Element names whose subtree is skipped when rendering text
    pub excluded_tags: Vec<&'static str>,

    /// Keep only links on the page's own host
    pub internal_links_only: bool,
}

impl RenderConfig {
    /// Options used for a page at the given crawl depth
    ///
    /// The seed page (depth 0) keeps its layout elements since company
    /// contact details often live in headers and footers.
    pub fn for_depth(depth: u32) -> Self {
        let mut excluded_tags = ALWAYS_EXCLUDED.to_vec();
        if depth > 0 {
            excluded_tags.extend_from_slice(DEEP_EXCLUDED);
        }
        Self {
            excluded_tags,
            internal_links_only: true,
        }
    }
}

/// Output of rendering one HTML document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    pub title: String,
    pub text: String,
    pub links: Vec<String>,
}

/// Renders an HTML document
///
/// # Arguments
///
/// * `html` - The HTML content
/// * `page_url` - URL the document was served from, used to resolve links
/// * `config` - Tag exclusions and link filtering
///
/// # Returns
///
/// The rendered page. Text may be empty; callers decide what that means.
///
/// # Example
///
/// ```
/// use lead_crawler::crawler::{render_html, RenderConfig};
/// use url::Url;
///
/// let html = r#"<html><head><title>Gloves</title></head>
///   <body><h1>Pro Grip</h1><p>Made in Spain.</p><a href="/shop">Shop</a></body></html>"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// let page = render_html(html, &base, &RenderConfig::for_depth(0));
///
/// assert_eq!(page.title, "Gloves");
/// assert!(page.text.starts_with("# Pro Grip"));
/// assert_eq!(page.links, vec!["https://example.com/shop"]);
/// ```
pub fn render_html(html: &str, page_url: &Url, config: &RenderConfig) -> RenderedPage {
    let document = Html::parse_document(html);

    let excluded: HashSet<&str> = config.excluded_tags.iter().copied().collect();
    let mut raw = String::new();
    match body_element(&document) {
        Some(body) => render_children(body, &excluded, &mut raw),
        None => render_children(document.root_element(), &excluded, &mut raw),
    }

    RenderedPage {
        title: extract_title(&document).unwrap_or_default(),
        text: tidy(&raw),
        links: extract_links(&document, page_url, config.internal_links_only),
    }
}

fn body_element(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("body").ok()?;
    document.select(&selector).next()
}

/// Extracts the page title, falling back to the first `<h1>`
fn extract_title(document: &Html) -> Option<String> {
    for query in ["title", "h1"] {
        let Ok(selector) = Selector::parse(query) else {
            continue;
        };
        let title = document
            .select(&selector)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .filter(|s| !s.is_empty());
        if title.is_some() {
            return title;
        }
    }
    None
}

fn render_children(element: ElementRef<'_>, excluded: &HashSet<&str>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            push_inline(out, text);
            continue;
        }

        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child.value().name();
        if excluded.contains(name) {
            continue;
        }

        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                let heading = collapse_whitespace(&child.text().collect::<String>());
                if !heading.is_empty() {
                    out.push_str("\n\n");
                    out.push_str(&"#".repeat(level));
                    out.push(' ');
                    out.push_str(&heading);
                    out.push_str("\n\n");
                }
            }
            "br" => out.push('\n'),
            "li" => {
                out.push_str("\n- ");
                render_children(child, excluded, out);
            }
            "td" | "th" => {
                out.push(' ');
                render_children(child, excluded, out);
                out.push(' ');
            }
            _ if BLOCK_TAGS.contains(&name) => {
                out.push_str("\n\n");
                render_children(child, excluded, out);
                out.push_str("\n\n");
            }
            _ => render_children(child, excluded, out),
        }
    }
}

fn push_inline(out: &mut String, text: &str) {
    if text.trim().is_empty() {
        if !text.is_empty() && !out.ends_with(char::is_whitespace) {
            out.push(' ');
        }
        return;
    }

    if text.starts_with(char::is_whitespace) && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(&collapse_whitespace(text));
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trims every line and keeps at most one blank line between blocks
fn tidy(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in raw.split('\n').map(str::trim) {
        if line.is_empty() && lines.last().map_or(true, |last| last.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

fn extract_links(document: &Html, page_url: &Url, internal_only: bool) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let page_host = host_of(page_url.as_str());
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(absolute) = resolve_link(page_url, href) else {
            continue;
        };
        if internal_only && host_of(&absolute) != page_host {
            continue;
        }
        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }

    links
}
