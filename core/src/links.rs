use scraper::{Html, Selector};

/// Produces the raw link targets of a document.
///
/// Targets are document names; the graph builder keeps only those that name
/// a corpus document.
pub trait LinkExtractor: Send + Sync {
    fn extract(&self, content: &str) -> Vec<String>;
}

/// Extracts `<a href>` targets from HTML.
#[derive(Debug, Clone)]
pub struct HtmlLinkExtractor {
    anchors: Selector,
}

impl Default for HtmlLinkExtractor {
    fn default() -> Self {
        Self { anchors: Selector::parse("a[href]").expect("valid selector") }
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract(&self, content: &str) -> Vec<String> {
        let html = Html::parse_document(content);
        html.select(&self.anchors)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(link_target)
            .collect()
    }
}

/// Reduce an href to the document name it points at: the last path segment,
/// without fragment or query. Non-navigational schemes yield nothing.
pub fn link_target(href: &str) -> Option<String> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    if ["mailto:", "javascript:", "tel:", "data:"].iter().any(|s| lower.starts_with(s)) {
        return None;
    }
    let end = href.find(|c: char| c == '#' || c == '?').unwrap_or(href.len());
    let path = href[..end].trim_end_matches('/');
    let name = path.rsplit('/').next()?;
    (!name.is_empty() && !name.contains(':')).then(|| name.to_string())
}
