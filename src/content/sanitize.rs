use scraper::{Html, Selector};

/// CSS selectors for the main article container, most specific first.
/// The encyclopedia's desktop and mobile HTML use the first two; the rest
/// are generic fallbacks for summary extracts and odd page layouts.
const CONTENT_SELECTORS: &[&str] = &[
    "#mw-content-text",
    ".mw-parser-output",
    "#bodyContent",
    "main",
    "article",
    "body",
];

/// Strips inert/executable nodes from raw article HTML and returns the
/// inner HTML of the main content container.
///
/// Removes `<style>`, `<script>`, and `<noscript>` subtrees, then walks
/// [`CONTENT_SELECTORS`] in order and returns the first match, falling back
/// to the whole document when nothing matches (e.g. a bare fragment).
pub fn sanitize_html(html: &str) -> String {
    let mut document = Html::parse_document(html);
    strip_inert_nodes(&mut document);
    select_main_content(&document)
}

fn strip_inert_nodes(document: &mut Html) {
    let selector = Selector::parse("style, script, noscript").expect("static selector");
    let ids: Vec<_> = document.select(&selector).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn select_main_content(document: &Html) -> String {
    for raw in CONTENT_SELECTORS {
        let selector = Selector::parse(raw).expect("static selector");
        if let Some(element) = document.select(&selector).next() {
            return element.inner_html();
        }
    }
    document.root_element().inner_html()
}
